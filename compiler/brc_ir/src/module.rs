//! Module: the unit produced by module assembly and consumed by the
//! analyzer and module builder.

use crate::Statement;
use rustc_hash::FxHashMap;
use std::rc::Rc;

pub const DEFAULT_MODULE_NAME: &str = "main";

/// A single named module: import/blob/variable/function declarations in
/// `header`, definitions in `body`. `exported_header` is the subset of
/// `header` (plus exported blob/variable/function definitions) visible to
/// importers, with cross-module blob references qualified.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub name: Rc<str>,
    pub header: Vec<Statement>,
    pub body: Vec<Statement>,
    pub exported_header: Vec<Statement>,
}

impl Module {
    pub fn new(name: Rc<str>) -> Self {
        Module {
            name,
            header: Vec::new(),
            body: Vec::new(),
            exported_header: Vec::new(),
        }
    }
}

/// Shared, read-only after module assembly: every module's exported
/// header, keyed by module name, used by `@import` resolution in the
/// analyzer and module builder.
pub type ExportedHeaderMap = FxHashMap<Rc<str>, Vec<Statement>>;
