//! Semantic analysis: name resolution, type inference with
//! implicit cast insertion, composite-literal promotion, built-in member
//! resolution, and operation validation. One `Analyzer` per module.

mod casts;
mod expr;
mod scope;
mod stack;
mod stmt;

use brc_diagnostic::{Diagnostics, Error, SemanticErrorKind};
use brc_ir::{ExportedHeaderMap, Location, Module, Statement, ValueType};
use scope::AnalyzerScope;
use std::rc::Rc;

pub use scope::{BlobEntry, FunctionEntry, VariableEntry};

/// One analyzer run over one module. Consumes `header`, `body`, and the
/// shared exported-header map; mutates the module's AST in place with
/// resolved value types and inserted casts.
pub struct Analyzer<'a> {
    exported_headers: &'a ExportedHeaderMap,
    scope: AnalyzerScope,
    diagnostics: Diagnostics,
    return_type_stack: Vec<ValueType>,
    /// `Some("m.")` while processing the statements pulled in by `@import
    /// m`.
    import_prefix: Option<Rc<str>>,
}

impl<'a> Analyzer<'a> {
    fn new(exported_headers: &'a ExportedHeaderMap) -> Self {
        Analyzer {
            exported_headers,
            scope: AnalyzerScope::new(),
            diagnostics: Diagnostics::new(),
            return_type_stack: Vec::new(),
            import_prefix: None,
        }
    }

    pub(crate) fn push_error(&mut self, error: Error) {
        self.diagnostics.push(error);
    }

    pub(crate) fn push_semantic(&mut self, kind: SemanticErrorKind, location: Location) {
        self.diagnostics.push(Error::semantic(kind, location));
    }

    pub(crate) fn push_builtin_error(&mut self, builtin: &str, location: &Location) {
        self.push_semantic(SemanticErrorKind::InvalidBuiltIn(Rc::from(builtin)), location.clone());
    }

    /// The name a declaration is registered under: unqualified in the
    /// module's own scope, `prefix.name` while replaying an imported
    /// module's exported header.
    pub(crate) fn qualify_name(&self, name: &Rc<str>) -> Rc<str> {
        match &self.import_prefix {
            Some(prefix) => Rc::from(format!("{prefix}{name}")),
            None => name.clone(),
        }
    }

    /// Types a DATA/PTR/FUN type's embedded count expressions (and, for
    /// FUN, its argument/return sub-types) without altering the type
    /// itself — used wherever a `ValueType` appears in a declaration.
    pub(crate) fn type_embedded_exprs(&mut self, value_type: &mut ValueType) {
        match value_type {
            ValueType::Data(sub, count) => {
                self.analyze_expr(count, None);
                self.type_embedded_exprs(sub);
            }
            ValueType::Ptr(sub) => self.type_embedded_exprs(sub),
            ValueType::Fun(args, ret) => {
                for arg in args.iter_mut() {
                    self.type_embedded_exprs(arg);
                }
                self.type_embedded_exprs(ret);
            }
            _ => {}
        }
    }
}

/// Runs one analyzer pass over `module`: header statements
/// first (declarations, in the order `brc_modules` assembled them), then
/// body statements (definitions); finally mirrors each variable's
/// inferred type back into its header declaration so cross-module
/// readers see the final type.
pub fn analyze_module(module: &mut Module, exported_headers: &ExportedHeaderMap) -> Diagnostics {
    let mut analyzer = Analyzer::new(exported_headers);

    for stmt in &mut module.header {
        analyzer.analyze_header_statement(stmt);
    }
    for stmt in &mut module.body {
        analyzer.analyze_body_statement(stmt);
    }

    sync_header_variable_types(&mut module.header, &module.body);

    analyzer.diagnostics
}

fn sync_header_variable_types(header: &mut [Statement], body: &[Statement]) {
    for stmt in body {
        let Statement::Variable { name, value_type, .. } = stmt else { continue };
        let declaration = header.iter_mut().find(
            |h| matches!(h, Statement::VariableDeclaration { name: decl_name, .. } if decl_name == name),
        );
        if let Some(Statement::VariableDeclaration { value_type: declared, .. }) = declaration {
            *declared = value_type.clone();
        }
    }
}
