//! `build_module`: the module builder's entry point. Walks a module's
//! header (declarations, import replay) the same way the analyzer does,
//! then its body (definitions), emitting an [`IrModule`].

use crate::config::CompileConfig;
use crate::context::FunctionContext;
use crate::function_builder::FunctionBuilder;
use crate::ir::{IrConst, IrFunction, IrGlobal, IrInst, IrModule, IrOperand, IrStruct, IrTerminator, IrType, Linkage};
use crate::lower::expr::lower_expr;
use crate::lower::types::lower_type;
use crate::scope::{BuilderScope, ScopeBlob, ScopeFunction, ScopeVariable};
use brc_diagnostic::{BuilderErrorKind, Diagnostics, Error};
use brc_ir::{BlobField, ExprKind, Expression, ExportedHeaderMap, FunctionArg, Location, LiteralValue, Module, Statement, UnaryOp, ValueType};
use std::rc::Rc;

struct ModuleBuilder<'a> {
    exported_headers: &'a ExportedHeaderMap,
    scope: BuilderScope,
    structs: Vec<IrStruct>,
    globals: Vec<IrGlobal>,
    functions: Vec<IrFunction>,
    diagnostics: Diagnostics,
    import_prefix: Option<Rc<str>>,
    module_name: Rc<str>,
    string_counter: u32,
    config: CompileConfig,
}

impl<'a> ModuleBuilder<'a> {
    fn new(module_name: Rc<str>, exported_headers: &'a ExportedHeaderMap, config: CompileConfig) -> Self {
        ModuleBuilder {
            exported_headers,
            scope: BuilderScope::new(),
            structs: Vec::new(),
            globals: Vec::new(),
            functions: Vec::new(),
            diagnostics: Diagnostics::new(),
            import_prefix: None,
            module_name,
            string_counter: 0,
            config,
        }
    }

    fn qualify_name(&self, name: &Rc<str>) -> Rc<str> {
        match &self.import_prefix {
            Some(prefix) => Rc::from(format!("{prefix}{name}")),
            None => name.clone(),
        }
    }

    fn build_header_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::MetaImport { module_name, location } => {
                self.process_import(module_name.clone(), location.clone());
            }
            Statement::Blob { name, fields, .. } => {
                let declared_name = self.qualify_name(name);
                self.register_blob(declared_name, fields);
            }
            Statement::MetaExternFunction { name, args, return_type, .. } => {
                let declared_name = self.qualify_name(name);
                self.register_function(declared_name, args, return_type);
            }
            Statement::MetaExternVariable { name, value_type, .. } => {
                let declared_name = self.qualify_name(name);
                self.globals.push(IrGlobal { name: declared_name.clone(), ty: lower_type(value_type), linkage: Linkage::External, initializer: None });
                self.scope.define_variable(declared_name.clone(), ScopeVariable { address: IrOperand::GlobalAddr(declared_name), ty: value_type.clone() });
            }
            // Forward declarations synthesized by module assembly for every
            // `Variable`/`Function` definition — registering them here, before
            // any body statement runs, is what lets one module-level
            // definition reference another declared later in source order.
            Statement::VariableDeclaration { name, value_type, .. } => {
                let declared_name = self.qualify_name(name);
                self.scope.define_variable(declared_name.clone(), ScopeVariable { address: IrOperand::GlobalAddr(declared_name), ty: value_type.clone() });
            }
            Statement::FunctionDeclaration { name, args, return_type, .. } => {
                let declared_name = self.qualify_name(name);
                self.register_function(declared_name, args, return_type);
            }
            _ => {}
        }
    }

    fn register_blob(&mut self, declared_name: Rc<str>, fields: &[BlobField]) {
        let members: Vec<(Rc<str>, IrType)> = fields.iter().map(|f| (f.name.clone(), lower_type(&f.value_type))).collect();
        self.structs.push(IrStruct { name: declared_name.clone(), members });
        let value_members = fields.iter().map(|f| (f.name.clone(), f.value_type.clone())).collect();
        self.scope.define_blob(declared_name, ScopeBlob { members: value_members });
    }

    fn register_function(&mut self, declared_name: Rc<str>, args: &[FunctionArg], return_type: &ValueType) {
        let arg_types = args.iter().map(|a| a.value_type.clone()).collect();
        self.scope.define_function(declared_name, ScopeFunction { args: arg_types, return_type: return_type.clone() });
    }

    /// Mirrors the analyzer's `@import` handling: replays the imported
    /// module's exported header under the `module.` qualification prefix.
    fn process_import(&mut self, module_name: Rc<str>, location: Location) {
        let Some(exported) = self.exported_headers.get(&module_name).cloned() else {
            self.diagnostics.push(Error::builder(BuilderErrorKind::NotDeclared(module_name), location));
            return;
        };
        let previous_prefix = self.import_prefix.replace(Rc::from(format!("{module_name}.")));
        for stmt in &exported {
            self.build_header_statement(stmt);
        }
        self.import_prefix = previous_prefix;
    }

    fn build_body_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Variable { name, value_type, initializer, should_export, location } => {
                self.build_global_variable(name, value_type, initializer.as_ref(), *should_export, location);
            }
            Statement::Function { name, args, return_type, body, should_export, location } => {
                self.build_function(name, args, return_type, body, *should_export, location);
            }
            Statement::RawFunction { name, constraints, args, return_type, assembly_lines, location } => {
                self.build_raw_function(name, constraints, args, return_type, assembly_lines, location);
            }
            _ => {}
        }
    }

    fn build_global_variable(
        &mut self,
        name: &Rc<str>,
        value_type: &ValueType,
        initializer: Option<&Expression>,
        should_export: bool,
        location: &Location,
    ) {
        let declared_name = self.qualify_name(name);
        let const_value = initializer.and_then(|init| self.try_const_eval(init, value_type));
        if initializer.is_some() && const_value.is_none() {
            self.diagnostics.push(Error::builder(BuilderErrorKind::InvalidConstantInitializer(name.clone()), location.clone()));
        }
        let linkage = if should_export { Linkage::External } else { Linkage::Internal };
        self.globals.push(IrGlobal { name: declared_name.clone(), ty: lower_type(value_type), linkage, initializer: const_value });
        self.scope.define_variable(declared_name.clone(), ScopeVariable { address: IrOperand::GlobalAddr(declared_name), ty: value_type.clone() });
    }

    /// Folds a global initializer to a constant. Only literal
    /// bools/ints/floats and composite literals built from them fold;
    /// anything else (string/pointer initializers, in particular, which
    /// need backend-specific relocations this phase doesn't model) is
    /// reported and the global is left zero-initialized.
    fn try_const_eval(&mut self, expr: &Expression, target_ty: &ValueType) -> Option<IrConst> {
        match &expr.kind {
            ExprKind::Literal(LiteralValue::Bool(b)) => Some(IrConst::Int(u64::from(*b), IrType::Bool)),
            ExprKind::Literal(LiteralValue::Int(v)) => {
                let irty = lower_type(target_ty);
                match irty {
                    IrType::F32 | IrType::F64 => Some(IrConst::Float(*v as f64, irty)),
                    _ => Some(IrConst::Int(*v, irty)),
                }
            }
            ExprKind::Literal(LiteralValue::Float(v)) => Some(IrConst::Float(*v, lower_type(target_ty))),
            ExprKind::Grouping(inner) => self.try_const_eval(inner, target_ty),
            ExprKind::Unary(UnaryOp::Minus, inner) => match self.try_const_eval(inner, target_ty)? {
                IrConst::Int(v, ty) => Some(IrConst::Int((v as i64).wrapping_neg() as u64, ty)),
                IrConst::Float(v, ty) => Some(IrConst::Float(-v, ty)),
                other => Some(other),
            },
            ExprKind::CompositeLiteral(elements) => self.try_const_eval_composite(elements, target_ty),
            _ => None,
        }
    }

    fn try_const_eval_composite(&mut self, elements: &[Expression], target_ty: &ValueType) -> Option<IrConst> {
        match target_ty {
            ValueType::Data(sub, _) => {
                let elem_ty = lower_type(sub);
                let values: Option<Vec<IrConst>> = elements.iter().map(|e| self.try_const_eval(e, sub)).collect();
                Some(IrConst::Array(values?, elem_ty))
            }
            ValueType::Blob(name) => {
                let blob = self.scope.lookup_blob(name).cloned()?;
                let values: Option<Vec<IrConst>> = elements
                    .iter()
                    .zip(blob.members.iter())
                    .map(|(e, (_, field_ty))| self.try_const_eval(e, field_ty))
                    .collect();
                Some(IrConst::Struct(values?, name.clone()))
            }
            _ => None,
        }
    }

    fn build_function(&mut self, name: &Rc<str>, args: &[FunctionArg], return_type: &ValueType, body: &Expression, should_export: bool, location: &Location) {
        let declared_name = self.qualify_name(name);
        let arg_irtypes: Vec<IrType> = args.iter().map(|a| lower_type(&a.value_type)).collect();
        let arg_names: Vec<Rc<str>> = args.iter().map(|a| a.name.clone()).collect();
        let return_irtype = lower_type(return_type);

        self.scope.push();
        let mut fb = FunctionBuilder::new();
        for (i, arg) in args.iter().enumerate() {
            let param_value = fb.new_value(arg_irtypes[i].clone());
            fb.emit(IrInst::Param { index: i as u32, result: param_value });
            let slot = fb.new_value(IrType::Ptr);
            fb.emit(IrInst::Alloca { ty: arg_irtypes[i].clone(), result: slot });
            fb.emit(IrInst::Store { ptr: IrOperand::Value(slot), value: IrOperand::Value(param_value), volatile: false });
            self.scope.define_variable(arg.name.clone(), ScopeVariable { address: IrOperand::Value(slot), ty: arg.value_type.clone() });
        }

        let mut extra_globals = Vec::new();
        {
            let mut ctx = FunctionContext {
                scope: &mut self.scope,
                structs: &self.structs,
                diagnostics: &mut self.diagnostics,
                extra_globals: &mut extra_globals,
                string_counter: &mut self.string_counter,
                module_name: self.module_name.clone(),
            };
            lower_function_body(&mut fb, &mut ctx, body, return_type);
        }
        self.globals.extend(extra_globals);
        self.scope.pop();

        let (blocks, value_types) = fb.finish();
        let function = IrFunction::Body {
            name: declared_name,
            args: arg_irtypes,
            arg_names,
            return_type: return_irtype,
            calling_convention: self.config.calling_convention,
            linkage: if should_export { Linkage::External } else { Linkage::Internal },
            value_types,
            blocks,
        };
        crate::verify::verify_function(&function, &mut self.diagnostics, location);
        self.functions.push(function);
    }

    fn build_raw_function(&mut self, name: &Rc<str>, constraints: &Rc<str>, args: &[FunctionArg], return_type: &ValueType, assembly_lines: &[Rc<str>], location: &Location) {
        let declared_name = self.qualify_name(name);
        let function = IrFunction::RawAsm {
            name: declared_name,
            args: args.iter().map(|a| lower_type(&a.value_type)).collect(),
            return_type: lower_type(return_type),
            constraints: constraints.clone(),
            assembly_lines: assembly_lines.to_vec(),
            side_effect: true,
            not_align_stack: true,
        };
        crate::verify::verify_function(&function, &mut self.diagnostics, location);
        self.functions.push(function);
    }
}

/// Lowers a function's body expression (always a `Block`, by grammar) and
/// makes sure every reachable block ends in a terminator: a trailing
/// non-`None` block result becomes the return value, `NONE` becomes a
/// bare `ret`.
fn lower_function_body(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, body: &Expression, return_type: &ValueType) {
    match &body.kind {
        ExprKind::CompositeLiteral(_) => unreachable!("function body is always a block expression"),
        _ => {
            let value = lower_expr(fb, ctx, body);
            if !fb.current_is_terminated() {
                if *return_type == ValueType::None {
                    fb.set_terminator(IrTerminator::Ret(None));
                } else {
                    fb.set_terminator(IrTerminator::Ret(Some(value)));
                }
            }
        }
    }
}

/// Runs the module builder over `module`: header first (declarations,
/// import replay), then body (definitions). Returns the emitted IR
/// alongside whatever diagnostics accumulated — never aborts early, so a
/// caller gets the fullest possible IR even out of a module with errors.
pub fn build_module(module: &Module, exported_headers: &ExportedHeaderMap, config: CompileConfig) -> (IrModule, Diagnostics) {
    let mut builder = ModuleBuilder::new(module.name.clone(), exported_headers, config);

    for stmt in &module.header {
        builder.build_header_statement(stmt);
    }
    for stmt in &module.body {
        builder.build_body_statement(stmt);
    }

    let ir_module = IrModule { name: module.name.clone(), structs: builder.structs, globals: builder.globals, functions: builder.functions };
    let mut diagnostics = builder.diagnostics;
    let module_location = Location::synthetic(module.name.clone());
    crate::verify::verify_module(&ir_module, &mut diagnostics, &module_location);
    (ir_module, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brc_ir::DEFAULT_MODULE_NAME;
    use rustc_hash::FxHashMap;

    fn location() -> Location {
        Location::new(Rc::from("t.brc"), 0, 0)
    }

    #[test]
    fn empty_module_builds_to_empty_ir_module() {
        let module = Module::new(Rc::from(DEFAULT_MODULE_NAME));
        let exported: ExportedHeaderMap = FxHashMap::default();
        let (ir_module, diagnostics) = build_module(&module, &exported, CompileConfig::default());
        assert!(diagnostics.is_empty());
        assert!(ir_module.functions.is_empty());
        assert!(ir_module.globals.is_empty());
    }

    #[test]
    fn global_int_variable_folds_to_a_constant() {
        let mut module = Module::new(Rc::from(DEFAULT_MODULE_NAME));
        module.body.push(Statement::Variable {
            should_export: false,
            name: Rc::from("count"),
            value_type: ValueType::S32,
            initializer: Some(Expression { kind: ExprKind::Literal(LiteralValue::Int(7)), location: location(), value_type: Some(ValueType::S32) }),
            location: location(),
        });
        let exported: ExportedHeaderMap = FxHashMap::default();
        let (ir_module, diagnostics) = build_module(&module, &exported, CompileConfig::default());
        assert!(diagnostics.is_empty());
        assert_eq!(ir_module.globals.len(), 1);
        assert_eq!(ir_module.globals[0].initializer, Some(IrConst::Int(7, IrType::Int(32))));
    }
}
