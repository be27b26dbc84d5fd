//! Structural IR verification: run immediately after a function body is
//! lowered, and again over the whole module once every function and
//! global has been assembled. This only checks shapes the builder itself
//! could get wrong (a block id or value id that doesn't exist, a
//! duplicated top-level name) — it is not a re-run of type checking.

use crate::ir::{IrFunction, IrInst, IrModule, IrOperand, IrTerminator};
use brc_diagnostic::{Diagnostics, Error};
use brc_ir::Location;
use std::collections::HashSet;
use std::rc::Rc;

fn value_operands(inst: &IrInst) -> Vec<&IrOperand> {
    match inst {
        IrInst::IntBin { lhs, rhs, .. } | IrInst::FloatBin { lhs, rhs, .. } => vec![lhs, rhs],
        IrInst::ICmp { lhs, rhs, .. } | IrInst::FCmp { lhs, rhs, .. } => vec![lhs, rhs],
        IrInst::Not { operand, .. } | IrInst::Neg { operand, .. } | IrInst::FNeg { operand, .. } => vec![operand],
        IrInst::Cast { operand, .. } => vec![operand],
        IrInst::ArrayCast { source, .. } => vec![source],
        IrInst::Alloca { .. } => vec![],
        IrInst::Load { ptr, .. } => vec![ptr],
        IrInst::Store { ptr, value, .. } => vec![ptr, value],
        IrInst::Gep { base, indices, .. } => {
            let mut ops = vec![base];
            for index in indices {
                if let crate::ir::GepIndex::Value(v) = index {
                    ops.push(v);
                }
            }
            ops
        }
        IrInst::PtrToInt { operand, .. } => vec![operand],
        IrInst::Select { cond, if_true, if_false, .. } => vec![cond, if_true, if_false],
        IrInst::Call { callee, args, .. } => {
            let mut ops = vec![callee];
            ops.extend(args.iter());
            ops
        }
        IrInst::Phi { incoming, .. } => incoming.iter().map(|(_, v)| v).collect(),
        IrInst::StackSave { .. } => vec![],
        IrInst::StackRestore { ptr } => vec![ptr],
        IrInst::Param { .. } => vec![],
    }
}

fn check_value_operand(
    operand: &IrOperand,
    value_count: usize,
    function_name: &Rc<str>,
    diagnostics: &mut Diagnostics,
    location: &Location,
) {
    if let IrOperand::Value(id) = operand {
        if id.0 as usize >= value_count {
            diagnostics.push(Error::function_verification(
                function_name.clone(),
                format!("instruction references undefined value %{}", id.0),
                location.clone(),
            ));
        }
    }
}

/// Verifies one function's block graph: every branch/conditional-branch
/// target and every Phi incoming block must name a block that actually
/// exists in the function, and every value-typed operand must reference a
/// value id the function actually produced.
pub(crate) fn verify_function(function: &IrFunction, diagnostics: &mut Diagnostics, location: &Location) {
    let IrFunction::Body { name, value_types, blocks, .. } = function else {
        return;
    };

    let block_count = blocks.len();
    let value_count = value_types.len();
    let mut seen_ids = HashSet::with_capacity(block_count);

    for block in blocks {
        if !seen_ids.insert(block.id) {
            diagnostics.push(Error::function_verification(name.clone(), format!("duplicate block id in \"{}\"", block.name), location.clone()));
        }

        for inst in &block.insts {
            for operand in value_operands(inst) {
                check_value_operand(operand, value_count, name, diagnostics, location);
            }
            if let IrInst::Phi { incoming, .. } = inst {
                for (block_id, _) in incoming {
                    if block_id.0 as usize >= block_count {
                        diagnostics.push(Error::function_verification(
                            name.clone(),
                            format!("phi in block \"{}\" names nonexistent incoming block {}", block.name, block_id.0),
                            location.clone(),
                        ));
                    }
                }
            }
        }

        match &block.terminator {
            None => {
                diagnostics.push(Error::function_verification(name.clone(), format!("block \"{}\" has no terminator", block.name), location.clone()));
            }
            Some(IrTerminator::Br(target)) => {
                if target.0 as usize >= block_count {
                    diagnostics.push(Error::function_verification(name.clone(), format!("branch in \"{}\" targets nonexistent block {}", block.name, target.0), location.clone()));
                }
            }
            Some(IrTerminator::CondBr { cond, then_block, else_block }) => {
                check_value_operand(cond, value_count, name, diagnostics, location);
                for target in [then_block, else_block] {
                    if target.0 as usize >= block_count {
                        diagnostics.push(Error::function_verification(
                            name.clone(),
                            format!("conditional branch in \"{}\" targets nonexistent block {}", block.name, target.0),
                            location.clone(),
                        ));
                    }
                }
            }
            Some(IrTerminator::Ret(value)) => {
                if let Some(operand) = value {
                    check_value_operand(operand, value_count, name, diagnostics, location);
                }
            }
        }
    }
}

/// Verifies whole-module invariants once every function, global, and
/// struct is assembled: no two top-level items of the same kind share a
/// name.
pub(crate) fn verify_module(module: &IrModule, diagnostics: &mut Diagnostics, location: &Location) {
    let mut function_names = HashSet::with_capacity(module.functions.len());
    for function in &module.functions {
        if !function_names.insert(function.name().clone()) {
            diagnostics.push(Error::module_verification(module.name.clone(), format!("duplicate function \"{}\"", function.name()), location.clone()));
        }
    }

    let mut global_names = HashSet::with_capacity(module.globals.len());
    for global in &module.globals {
        if !global_names.insert(global.name.clone()) {
            diagnostics.push(Error::module_verification(module.name.clone(), format!("duplicate global \"{}\"", global.name), location.clone()));
        }
    }

    let mut struct_names = HashSet::with_capacity(module.structs.len());
    for s in &module.structs {
        if !struct_names.insert(s.name.clone()) {
            diagnostics.push(Error::module_verification(module.name.clone(), format!("duplicate blob \"{}\"", s.name), location.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CallingConvention;
    use crate::ir::{BlockId, IrBlock, IrType, Linkage, ValueId};

    fn location() -> Location {
        Location::synthetic(Rc::from("t.brc"))
    }

    fn empty_function(name: &str, blocks: Vec<IrBlock>, value_types: Vec<IrType>) -> IrFunction {
        IrFunction::Body {
            name: Rc::from(name),
            args: vec![],
            arg_names: vec![],
            return_type: IrType::Void,
            calling_convention: CallingConvention::Cdecl,
            linkage: Linkage::Internal,
            value_types,
            blocks,
        }
    }

    #[test]
    fn well_formed_function_has_no_diagnostics() {
        let mut block = IrBlock::new(BlockId(0), "entry");
        block.terminator = Some(IrTerminator::Ret(None));
        let function = empty_function("f", vec![block], vec![]);
        let mut diagnostics = Diagnostics::new();
        verify_function(&function, &mut diagnostics, &location());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn branch_to_missing_block_is_reported() {
        let mut block = IrBlock::new(BlockId(0), "entry");
        block.terminator = Some(IrTerminator::Br(BlockId(7)));
        let function = empty_function("f", vec![block], vec![]);
        let mut diagnostics = Diagnostics::new();
        verify_function(&function, &mut diagnostics, &location());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn missing_terminator_is_reported() {
        let block = IrBlock::new(BlockId(0), "entry");
        let function = empty_function("f", vec![block], vec![]);
        let mut diagnostics = Diagnostics::new();
        verify_function(&function, &mut diagnostics, &location());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn use_of_undefined_value_is_reported() {
        let mut block = IrBlock::new(BlockId(0), "entry");
        block.terminator = Some(IrTerminator::Ret(Some(IrOperand::Value(ValueId(3)))));
        let function = empty_function("f", vec![block], vec![]);
        let mut diagnostics = Diagnostics::new();
        verify_function(&function, &mut diagnostics, &location());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn raw_asm_function_is_trivially_valid() {
        let function = IrFunction::RawAsm {
            name: Rc::from("raw"),
            args: vec![],
            return_type: IrType::Void,
            constraints: Rc::from(""),
            assembly_lines: vec![],
            side_effect: true,
            not_align_stack: true,
        };
        let mut diagnostics = Diagnostics::new();
        verify_function(&function, &mut diagnostics, &location());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn duplicate_function_names_are_reported() {
        let f1 = empty_function("dup", vec![], vec![]);
        let f2 = empty_function("dup", vec![], vec![]);
        let module = IrModule { name: Rc::from("m"), structs: vec![], globals: vec![], functions: vec![f1, f2] };
        let mut diagnostics = Diagnostics::new();
        verify_module(&module, &mut diagnostics, &location());
        assert_eq!(diagnostics.len(), 1);
    }
}
