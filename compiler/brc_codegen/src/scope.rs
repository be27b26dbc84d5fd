//! The module builder's `Scope` stack: maps names to
//! IR-level wrapped values (pointer form + type), functions, raw-function
//! routines, and named struct types with their ordered member lists.

use crate::ir::IrOperand;
use brc_ir::ValueType;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// A variable's IR-level binding: its address (always a pointer — every
/// local is allocated on the function entry stack, every global gets a
/// static slot) plus its source-level pointee type. Kept as `ValueType`
/// rather than the already-lowered `IrType` so lowering sites still have
/// the signedness/float/blob distinctions `lower_type` erases.
#[derive(Clone, Debug)]
pub struct ScopeVariable {
    pub address: IrOperand,
    pub ty: ValueType,
}

#[derive(Clone, Debug)]
pub struct ScopeFunction {
    pub args: Vec<ValueType>,
    pub return_type: ValueType,
}

#[derive(Clone, Debug)]
pub struct ScopeBlob {
    pub members: Vec<(Rc<str>, ValueType)>,
}

#[derive(Default)]
struct Frame {
    variables: FxHashMap<Rc<str>, ScopeVariable>,
}

/// One builder's scope stack. Functions and blobs are module-wide (one
/// flat map, no shadowing) since they are registered once per module;
/// only variables are frame-scoped.
pub struct BuilderScope {
    frames: Vec<Frame>,
    functions: FxHashMap<Rc<str>, ScopeFunction>,
    blobs: FxHashMap<Rc<str>, ScopeBlob>,
}

impl Default for BuilderScope {
    fn default() -> Self {
        BuilderScope { frames: vec![Frame::default()], functions: FxHashMap::default(), blobs: FxHashMap::default() }
    }
}

impl BuilderScope {
    pub fn new() -> Self {
        BuilderScope::default()
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn define_variable(&mut self, name: Rc<str>, variable: ScopeVariable) {
        if let Some(frame) = self.frames.last_mut() {
            frame.variables.insert(name, variable);
        }
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&ScopeVariable> {
        self.frames.iter().rev().find_map(|frame| frame.variables.get(name))
    }

    pub fn define_function(&mut self, name: Rc<str>, function: ScopeFunction) {
        self.functions.insert(name, function);
    }

    pub fn lookup_function(&self, name: &str) -> Option<&ScopeFunction> {
        self.functions.get(name)
    }

    pub fn define_blob(&mut self, name: Rc<str>, blob: ScopeBlob) {
        self.blobs.insert(name, blob);
    }

    pub fn lookup_blob(&self, name: &str) -> Option<&ScopeBlob> {
        self.blobs.get(name)
    }
}
