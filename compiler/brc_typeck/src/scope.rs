//! `AnalyzerScope`: a stack of frames, each holding four maps (variable
//! types, function types, blob member lists, and a "defined" flag per
//! entry). Pushed on entry to a function, repeat loop, if-arm, or block;
//! popped on exit.

use brc_ir::{BlobField, ValueType};
use rustc_hash::FxHashMap;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct VariableEntry {
    pub value_type: ValueType,
    pub defined: bool,
}

#[derive(Clone, Debug)]
pub struct FunctionEntry {
    pub args: Vec<ValueType>,
    pub return_type: ValueType,
    pub defined: bool,
}

#[derive(Clone, Debug)]
pub struct BlobEntry {
    pub fields: Vec<BlobField>,
    pub defined: bool,
}

#[derive(Default)]
struct Frame {
    variables: FxHashMap<Rc<str>, VariableEntry>,
    functions: FxHashMap<Rc<str>, FunctionEntry>,
    blobs: FxHashMap<Rc<str>, BlobEntry>,
}

/// The scope stack. Frame 0 is the module-level (global) frame, created
/// once per module and never popped; every deeper frame corresponds to a
/// lexical scope the analyzer is currently inside.
pub struct AnalyzerScope {
    frames: Vec<Frame>,
}

impl Default for AnalyzerScope {
    fn default() -> Self {
        AnalyzerScope { frames: vec![Frame::default()] }
    }
}

impl AnalyzerScope {
    pub fn new() -> Self {
        AnalyzerScope::default()
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().unwrap_or_else(|| unreachable!("scope stack is never empty"))
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&VariableEntry> {
        self.frames.iter().rev().find_map(|frame| frame.variables.get(name))
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionEntry> {
        self.frames.iter().rev().find_map(|frame| frame.functions.get(name))
    }

    pub fn lookup_blob(&self, name: &str) -> Option<&BlobEntry> {
        self.frames.iter().rev().find_map(|frame| frame.blobs.get(name))
    }

    /// Inserts a fresh (not-yet-defined) variable into the top frame.
    /// Returns `false` without overwriting if the name already exists
    /// there.
    pub fn declare_variable(&mut self, name: Rc<str>, value_type: ValueType) -> bool {
        let frame = self.top_mut();
        if frame.variables.contains_key(&name) {
            return false;
        }
        frame.variables.insert(name, VariableEntry { value_type, defined: false });
        true
    }

    /// Marks a top-frame variable defined, refreshing its type (e.g. once
    /// a `DATA` variable's count has been inferred from its initializer).
    /// Inserts fresh (already defined) if no prior declaration exists.
    pub fn define_variable(&mut self, name: Rc<str>, value_type: ValueType) {
        let frame = self.top_mut();
        frame.variables.insert(name, VariableEntry { value_type, defined: true });
    }

    pub fn declare_function(&mut self, name: Rc<str>, args: Vec<ValueType>, return_type: ValueType) -> bool {
        let frame = self.top_mut();
        if frame.functions.contains_key(&name) {
            return false;
        }
        frame.functions.insert(name, FunctionEntry { args, return_type, defined: false });
        true
    }

    pub fn mark_function_defined(&mut self, name: &str) {
        if let Some(entry) = self.top_mut().functions.get_mut(name) {
            entry.defined = true;
        }
    }

    pub fn declare_blob(&mut self, name: Rc<str>, fields: Vec<BlobField>) -> bool {
        let frame = self.top_mut();
        if frame.blobs.contains_key(&name) {
            return false;
        }
        frame.blobs.insert(name, BlobEntry { fields, defined: true });
        true
    }
}
