//! `FunctionContext`: everything a function's statement/expression
//! lowering needs besides the block-local [`crate::function_builder::FunctionBuilder`] —
//! the shared symbol scope, the module's struct table, the diagnostics
//! sink, and the handful of counters used to synthesize new module-level
//! globals (string constants) mid-lowering.

use crate::ir::{IrGlobal, IrStruct, IrType};
use crate::scope::BuilderScope;
use brc_diagnostic::Diagnostics;
use std::rc::Rc;

pub(crate) struct FunctionContext<'a> {
    pub(crate) scope: &'a mut BuilderScope,
    pub(crate) structs: &'a [IrStruct],
    pub(crate) diagnostics: &'a mut Diagnostics,
    pub(crate) extra_globals: &'a mut Vec<IrGlobal>,
    pub(crate) string_counter: &'a mut u32,
    pub(crate) module_name: Rc<str>,
}

impl FunctionContext<'_> {
    /// Registers a fresh, internally-linked string constant and returns the
    /// symbol name it was given.
    pub(crate) fn intern_string(&mut self, bytes: Rc<str>) -> Rc<str> {
        let name: Rc<str> = Rc::from(format!("{}.$str{}", self.module_name, self.string_counter));
        *self.string_counter += 1;
        let chars: Vec<_> = bytes
            .as_bytes()
            .iter()
            .map(|b| crate::ir::IrConst::Int(u64::from(*b), IrType::Int(8)))
            .collect();
        let len = chars.len();
        self.extra_globals.push(IrGlobal {
            name: name.clone(),
            ty: IrType::Array(Box::new(IrType::Int(8)), len),
            linkage: crate::ir::Linkage::Internal,
            initializer: Some(crate::ir::IrConst::Array(chars, IrType::Int(8))),
        });
        name
    }

    pub(crate) fn find_struct(&self, name: &str) -> Option<&IrStruct> {
        self.structs.iter().find(|s| &*s.name == name)
    }
}
