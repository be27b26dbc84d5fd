//! Statement checking.

use crate::Analyzer;
use brc_diagnostic::SemanticErrorKind;
use brc_ir::{literal_uint_value, Location, Statement, ValueType};
use std::rc::Rc;

impl Analyzer<'_> {
    /// Processes one header statement: declarations only, never bodies.
    pub(crate) fn analyze_header_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::MetaImport { module_name, location } => {
                self.process_import(module_name.clone(), location.clone());
            }
            Statement::Blob { name, fields, location, .. } => {
                for field in fields.iter_mut() {
                    self.type_embedded_exprs(&mut field.value_type);
                }
                let declared_name = self.qualify_name(name);
                if !self.scope.declare_blob(declared_name, fields.clone()) {
                    self.push_semantic(SemanticErrorKind::DuplicateDefinition(name.clone()), location.clone());
                }
            }
            // The full `Blob` statement immediately following in header
            // order performs the actual declaration; the synthesized
            // forward-reference itself carries no field list to register.
            Statement::BlobDeclaration { .. } => {}
            Statement::VariableDeclaration { name, value_type, location, .. } => {
                self.type_embedded_exprs(value_type);
                let declared_name = self.qualify_name(name);
                if !self.scope.declare_variable(declared_name, value_type.clone()) {
                    self.push_semantic(SemanticErrorKind::DuplicateDefinition(name.clone()), location.clone());
                }
            }
            Statement::FunctionDeclaration { name, args, return_type, location, .. } => {
                for arg in args.iter_mut() {
                    self.type_embedded_exprs(&mut arg.value_type);
                }
                self.type_embedded_exprs(return_type);
                let declared_name = self.qualify_name(name);
                let arg_types = args.iter().map(|a| a.value_type.clone()).collect();
                if !self.scope.declare_function(declared_name, arg_types, return_type.clone()) {
                    self.push_semantic(SemanticErrorKind::DuplicateDefinition(name.clone()), location.clone());
                }
            }
            Statement::MetaExternFunction { name, args, return_type, location } => {
                for arg in args.iter_mut() {
                    self.type_embedded_exprs(&mut arg.value_type);
                }
                self.type_embedded_exprs(return_type);
                let declared_name = self.qualify_name(name);
                let arg_types = args.iter().map(|a| a.value_type.clone()).collect();
                if self.scope.declare_function(declared_name.clone(), arg_types, return_type.clone()) {
                    self.scope.mark_function_defined(&declared_name);
                } else {
                    self.push_semantic(SemanticErrorKind::DuplicateDefinition(name.clone()), location.clone());
                }
            }
            Statement::MetaExternVariable { name, value_type, .. } => {
                self.type_embedded_exprs(value_type);
                let declared_name = self.qualify_name(name);
                self.scope.define_variable(declared_name, value_type.clone());
            }
            _ => {}
        }
    }

    /// `@import m`: looks `m` up in the frozen exported-
    /// header map, replays its statements with the `m.` prefix active,
    /// then restores whatever prefix (if any) was active before.
    fn process_import(&mut self, module_name: Rc<str>, location: Location) {
        let Some(exported) = self.exported_headers.get(&module_name).cloned() else {
            self.push_semantic(SemanticErrorKind::InvalidImport(module_name), location);
            return;
        };
        let previous_prefix = self.import_prefix.replace(Rc::from(format!("{module_name}.")));
        let mut exported = exported;
        for stmt in &mut exported {
            self.analyze_header_statement(stmt);
        }
        self.import_prefix = previous_prefix;
    }

    /// Processes one body statement: definitions, assignments, control
    /// flow.
    pub(crate) fn analyze_body_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::Variable { name, value_type, initializer, location, .. } => {
                self.analyze_variable_definition(name, value_type, initializer, location);
            }
            Statement::Function { name, args, return_type, body, .. } => {
                for arg in args.iter_mut() {
                    self.type_embedded_exprs(&mut arg.value_type);
                }
                self.type_embedded_exprs(return_type);
                let declared_name = self.qualify_name(name);
                if self.scope.lookup_function(&declared_name).is_none() {
                    let arg_types = args.iter().map(|a| a.value_type.clone()).collect();
                    self.scope.declare_function(declared_name.clone(), arg_types, return_type.clone());
                }
                self.scope.mark_function_defined(&declared_name);

                self.scope.push();
                for arg in args.iter() {
                    self.scope.define_variable(arg.name.clone(), arg.value_type.clone());
                }
                self.return_type_stack.push(return_type.clone());
                self.analyze_expr(body, None);
                self.return_type_stack.pop();
                self.scope.pop();
            }
            Statement::RawFunction { name, args, return_type, .. } => {
                for arg in args.iter_mut() {
                    self.type_embedded_exprs(&mut arg.value_type);
                }
                self.type_embedded_exprs(return_type);
                let declared_name = self.qualify_name(name);
                if self.scope.lookup_function(&declared_name).is_none() {
                    let arg_types = args.iter().map(|a| a.value_type.clone()).collect();
                    self.scope.declare_function(declared_name.clone(), arg_types, return_type.clone());
                }
                self.scope.mark_function_defined(&declared_name);
            }
            Statement::Return { value, location } => {
                let expected = self.return_type_stack.last().cloned().unwrap_or(ValueType::None);
                match value {
                    Some(expr) => {
                        let ty = self.check_and_try_casting(expr, &expected);
                        if ty != expected {
                            self.push_semantic(
                                SemanticErrorKind::InvalidCast { from: ty, to: expected },
                                location.clone(),
                            );
                        }
                    }
                    None if expected != ValueType::None => {
                        self.push_semantic(
                            SemanticErrorKind::InvalidCast { from: ValueType::None, to: expected },
                            location.clone(),
                        );
                    }
                    None => {}
                }
            }
            Statement::Repeat { init, pre_condition, post_statement, post_condition, body, .. } => {
                self.scope.push();
                if let Some(init_stmt) = init {
                    self.analyze_body_statement(init_stmt);
                }
                if let Some(cond) = pre_condition {
                    self.check_and_try_casting(cond, &ValueType::Bool);
                }
                self.analyze_body_statement(body);
                if let Some(post) = post_statement {
                    self.analyze_body_statement(post);
                }
                if let Some(cond) = post_condition {
                    self.check_and_try_casting(cond, &ValueType::Bool);
                }
                self.scope.pop();
            }
            Statement::Block { statements, .. } => {
                self.scope.push();
                for inner in statements.iter_mut() {
                    self.analyze_body_statement(inner);
                }
                self.scope.pop();
            }
            Statement::Assignment { target, value, location } => {
                let target_ty = self.analyze_expr(target, None);
                let value_ty = self.check_and_try_casting(value, &target_ty);
                if value_ty != target_ty {
                    self.push_semantic(
                        SemanticErrorKind::InvalidCast { from: value_ty, to: target_ty },
                        location.clone(),
                    );
                }
            }
            Statement::Expression { expr, .. } => {
                self.analyze_expr(expr, None);
            }
            _ => {}
        }
    }

    fn analyze_variable_definition(
        &mut self,
        name: &Rc<str>,
        value_type: &mut ValueType,
        initializer: &mut Option<brc_ir::Expression>,
        location: &Location,
    ) {
        self.type_embedded_exprs(value_type);
        if let Some(init) = initializer {
            let init_ty = self.check_and_try_casting(init, value_type);
            // DATA without an explicit count (written `data sub[0]`, the
            // grammar's only count-less spelling) adopts the
            // initializer's count.
            if let (ValueType::Data(_, count_expr), ValueType::Data(init_sub, init_count)) = (&*value_type, &init_ty) {
                if matches!(literal_uint_value(count_expr), None | Some(0)) {
                    *value_type = ValueType::Data(init_sub.clone(), init_count.clone());
                }
            }
            if init_ty != *value_type {
                self.push_semantic(
                    SemanticErrorKind::InvalidCast { from: init_ty, to: value_type.clone() },
                    location.clone(),
                );
            }
        }
        let declared_name = self.qualify_name(name);
        self.scope.define_variable(declared_name, value_type.clone());
    }
}
