//! Expression type inference.

use crate::Analyzer;
use brc_diagnostic::SemanticErrorKind;
use brc_ir::{BinaryOp, ExprKind, Expression, LiteralValue, Location, Statement, UnaryOp, ValueSubKind, ValueType};
use std::rc::Rc;

impl Analyzer<'_> {
    /// Types `expr` if it isn't already typed, optionally steering literal promotion via `target`.
    pub(crate) fn analyze_expr(&mut self, expr: &mut Expression, target: Option<&ValueType>) -> ValueType {
        if let Some(existing) = expr.value_type.clone() {
            return existing;
        }
        let ty = crate::stack::ensure_sufficient_stack(|| self.infer_bare(expr, target));
        expr.value_type = Some(ty.clone());
        ty
    }

    fn infer_bare(&mut self, expr: &mut Expression, target: Option<&ValueType>) -> ValueType {
        let location = expr.location.clone();
        match &mut expr.kind {
            ExprKind::Literal(lit) => infer_literal(lit, target),
            ExprKind::CompositeLiteral(elements) => {
                for element in elements.iter_mut() {
                    self.analyze_expr(element, None);
                }
                let types = elements.iter().map(|e| e.value_type.clone().unwrap_or(ValueType::None)).collect();
                ValueType::Composite(types, elements.len())
            }
            ExprKind::Grouping(inner) => self.analyze_expr(inner, target),
            ExprKind::Unary(op, operand) => self.infer_unary(*op, operand, &location),
            ExprKind::Binary(op, lhs, rhs) => self.infer_binary(*op, lhs, rhs, &location),
            ExprKind::Chained(links) => self.infer_chained(links.as_mut_slice(), &location),
            ExprKind::Cast(target_type) => target_type.clone(),
            ExprKind::Call { callee, args } => self.infer_call(callee, args, &location),
            ExprKind::Value { name, index, sub_kind } => {
                let name = name.clone();
                let (ty, resolved_kind) = self.resolve_value_access(None, &name, index.as_deref_mut(), &location);
                *sub_kind = resolved_kind;
                ty
            }
            ExprKind::IfElse { cond, then_branch, else_branch } => {
                self.infer_if_else(cond, then_branch, else_branch.as_deref_mut())
            }
            ExprKind::Block { statements, result } => self.infer_block(statements, result),
            ExprKind::None => ValueType::None,
        }
    }

    fn infer_unary(&mut self, op: UnaryOp, operand: &mut Expression, location: &Location) -> ValueType {
        match op {
            UnaryOp::Not => {
                let ty = self.check_and_try_casting(operand, &ValueType::Bool);
                if ty == ValueType::Bool {
                    ValueType::Bool
                } else {
                    self.push_semantic(
                        SemanticErrorKind::InvalidOperation(format!("NOT requires BOOL, found {ty}")),
                        location.clone(),
                    );
                    ValueType::None
                }
            }
            UnaryOp::Plus | UnaryOp::BitNot => {
                let ty = self.analyze_expr(operand, None);
                if ty.is_numeric() {
                    ty
                } else {
                    self.push_semantic(
                        SemanticErrorKind::InvalidOperation(format!("unary operator requires numeric, found {ty}")),
                        location.clone(),
                    );
                    ValueType::None
                }
            }
            UnaryOp::Minus => {
                let ty = self.analyze_expr(operand, None);
                if !ty.is_numeric() {
                    self.push_semantic(
                        SemanticErrorKind::InvalidOperation(format!("unary minus requires numeric, found {ty}")),
                        location.clone(),
                    );
                    return ValueType::None;
                }
                ty.signed_counterpart().unwrap_or(ty)
            }
        }
    }

    fn infer_binary(&mut self, op: BinaryOp, lhs: &mut Expression, rhs: &mut Expression, location: &Location) -> ValueType {
        if op.is_shift() {
            let left = self.analyze_expr(lhs, None);
            let right = self.analyze_expr(rhs, None);
            if !right.is_numeric() {
                self.push_semantic(
                    SemanticErrorKind::InvalidOperation(format!("shift requires numeric right operand, found {right}")),
                    location.clone(),
                );
                return ValueType::None;
            }
            if !left.is_numeric() {
                self.push_semantic(
                    SemanticErrorKind::InvalidOperation(format!("shift requires numeric left operand, found {left}")),
                    location.clone(),
                );
                return ValueType::None;
            }
            return left;
        }

        let left_initial = self.analyze_expr(lhs, None);
        let right = self.check_and_try_casting(rhs, &left_initial);
        let left = self.check_and_try_casting(lhs, &right);
        if left != right {
            self.push_semantic(
                SemanticErrorKind::InvalidOperation(format!("{left} and {right}")),
                location.clone(),
            );
            return ValueType::None;
        }

        if op.is_logical() {
            if left.is_bool() {
                ValueType::Bool
            } else {
                self.push_semantic(
                    SemanticErrorKind::InvalidOperation(format!("logical operator requires BOOL, found {left}")),
                    location.clone(),
                );
                ValueType::None
            }
        } else if op.is_equality() {
            if left.is_bool() || left.is_numeric() {
                ValueType::Bool
            } else {
                self.push_semantic(
                    SemanticErrorKind::InvalidOperation(format!("equality requires BOOL or numeric, found {left}")),
                    location.clone(),
                );
                ValueType::None
            }
        } else if op.is_ordering() {
            if left.is_numeric() {
                ValueType::Bool
            } else {
                self.push_semantic(
                    SemanticErrorKind::InvalidOperation(format!("comparison requires numeric, found {left}")),
                    location.clone(),
                );
                ValueType::None
            }
        } else if left.is_numeric() {
            left
        } else {
            self.push_semantic(
                SemanticErrorKind::InvalidOperation(format!("arithmetic/bitwise operator requires numeric, found {left}")),
                location.clone(),
            );
            ValueType::None
        }
    }

    fn infer_call(&mut self, callee: &Rc<str>, args: &mut [Expression], location: &Location) -> ValueType {
        let Some(entry) = self.scope.lookup_function(callee).cloned() else {
            self.push_semantic(SemanticErrorKind::UnknownIdentifier(callee.clone()), location.clone());
            for arg in args.iter_mut() {
                self.analyze_expr(arg, None);
            }
            return ValueType::None;
        };
        if entry.args.len() != args.len() {
            self.push_semantic(
                SemanticErrorKind::InvalidArgumentsCount { expected: entry.args.len(), found: args.len() },
                location.clone(),
            );
            for arg in args.iter_mut() {
                self.analyze_expr(arg, None);
            }
            return entry.return_type;
        }
        for (arg, expected) in args.iter_mut().zip(entry.args.iter()) {
            self.check_and_try_casting(arg, expected);
        }
        entry.return_type
    }

    fn infer_if_else(
        &mut self,
        cond: &mut Expression,
        then_branch: &mut Expression,
        else_branch: Option<&mut Expression>,
    ) -> ValueType {
        self.check_and_try_casting(cond, &ValueType::Bool);
        let then_ty = self.analyze_expr(then_branch, None);
        match else_branch {
            Some(else_expr) => {
                let else_ty = self.check_and_try_casting(else_expr, &then_ty);
                let then_ty = self.check_and_try_casting(then_branch, &else_ty);
                if then_ty == else_ty {
                    then_ty
                } else {
                    ValueType::None
                }
            }
            None => ValueType::None,
        }
    }

    fn infer_block(&mut self, statements: &mut [Statement], result: &mut Expression) -> ValueType {
        self.scope.push();
        for stmt in statements.iter_mut() {
            self.analyze_body_statement(stmt);
        }
        let ty = self.analyze_expr(result, None);
        self.scope.pop();
        ty
    }

    /// Resolves one VALUE-kind access, either bare (`parent.is_none()`,
    /// variable/function lookup) or as a chain link against `parent`
    /// (built-ins `count`/`size`/`adr`/`vadr`/`val`, blob field access, or
    /// DATA element indexing).
    pub(crate) fn resolve_value_access(
        &mut self,
        parent: Option<&ValueType>,
        name: &Rc<str>,
        index: Option<&mut Expression>,
        location: &Location,
    ) -> (ValueType, ValueSubKind) {
        let Some(parent_type) = parent else {
            return self.resolve_bare_value(name, index, location);
        };

        match name.as_ref() {
            "count" => {
                if matches!(parent_type, ValueType::Data(..)) {
                    (ValueType::Int, ValueSubKind::BuiltInCount)
                } else {
                    self.push_builtin_error("count", location);
                    (ValueType::None, ValueSubKind::BuiltInCount)
                }
            }
            "size" => (ValueType::Int, ValueSubKind::BuiltInSize),
            "adr" => (ValueType::A, ValueSubKind::BuiltInAdr),
            "vadr" => {
                if parent_type.is_pointer() {
                    (ValueType::A, ValueSubKind::BuiltInVadr)
                } else {
                    self.push_builtin_error("vadr", location);
                    (ValueType::None, ValueSubKind::BuiltInVadr)
                }
            }
            "val" => self.resolve_val_builtin(parent_type, index, location),
            _ => self.resolve_blob_field(parent_type, name, index, location),
        }
    }

    fn resolve_bare_value(
        &mut self,
        name: &Rc<str>,
        index: Option<&mut Expression>,
        location: &Location,
    ) -> (ValueType, ValueSubKind) {
        if let Some(var) = self.scope.lookup_variable(name).cloned() {
            return self.apply_index(var.value_type, ValueSubKind::Simple, ValueSubKind::Data, index, location);
        }
        if let Some(func) = self.scope.lookup_function(name).cloned() {
            return (ValueType::ptr(ValueType::fun(func.args, func.return_type)), ValueSubKind::Fun);
        }
        self.push_semantic(SemanticErrorKind::UnknownIdentifier(name.clone()), location.clone());
        (ValueType::None, ValueSubKind::Simple)
    }

    fn resolve_val_builtin(
        &mut self,
        parent_type: &ValueType,
        index: Option<&mut Expression>,
        location: &Location,
    ) -> (ValueType, ValueSubKind) {
        let ValueType::Ptr(pointee) = parent_type else {
            self.push_builtin_error("val", location);
            return (ValueType::None, ValueSubKind::BuiltInValSimple);
        };
        self.apply_index((**pointee).clone(), ValueSubKind::BuiltInValSimple, ValueSubKind::BuiltInValData, index, location)
    }

    fn resolve_blob_field(
        &mut self,
        parent_type: &ValueType,
        name: &Rc<str>,
        index: Option<&mut Expression>,
        location: &Location,
    ) -> (ValueType, ValueSubKind) {
        let ValueType::Blob(blob_name) = parent_type else {
            self.push_semantic(SemanticErrorKind::UnknownIdentifier(name.clone()), location.clone());
            return (ValueType::None, ValueSubKind::Simple);
        };
        let Some(blob) = self.scope.lookup_blob(blob_name).cloned() else {
            self.push_semantic(SemanticErrorKind::UnknownIdentifier(blob_name.clone()), location.clone());
            return (ValueType::None, ValueSubKind::Simple);
        };
        let Some(field) = blob.fields.iter().find(|f| &f.name == name) else {
            self.push_semantic(SemanticErrorKind::UnknownIdentifier(name.clone()), location.clone());
            return (ValueType::None, ValueSubKind::Simple);
        };
        self.apply_index(field.value_type.clone(), ValueSubKind::Simple, ValueSubKind::Data, index, location)
    }

    /// Shared tail of every VALUE resolution path: if an index expression
    /// is present, `base` must be a DATA type and the result narrows to
    /// its element type; otherwise `base` is the result as-is.
    fn apply_index(
        &mut self,
        base: ValueType,
        no_index_kind: ValueSubKind,
        index_kind: ValueSubKind,
        index: Option<&mut Expression>,
        location: &Location,
    ) -> (ValueType, ValueSubKind) {
        let Some(index_expr) = index else {
            return (base, no_index_kind);
        };
        self.analyze_expr(index_expr, None);
        match base {
            ValueType::Data(elem, _) => (*elem, index_kind),
            _ => {
                self.push_semantic(
                    SemanticErrorKind::InvalidOperation(format!("cannot index non-DATA value of type {base}")),
                    location.clone(),
                );
                (ValueType::None, index_kind)
            }
        }
    }

    /// Walks a dot-chain left to right,
    /// threading each typed link as `parent` to the next.
    fn infer_chained(&mut self, links: &mut [Expression], location: &Location) -> ValueType {
        let (mut parent_type, start) = if self.try_flatten_import_prefix(links, location) {
            (links[1].value_type.clone().unwrap_or(ValueType::None), 2)
        } else {
            (self.analyze_expr(&mut links[0], None), 1)
        };
        for link in &mut links[start..] {
            parent_type = self.infer_chain_link(&parent_type, link, location);
        }
        parent_type
    }

    fn infer_chain_link(&mut self, parent_type: &ValueType, link: &mut Expression, location: &Location) -> ValueType {
        let ty = match &mut link.kind {
            ExprKind::Cast(target) => {
                if self.can_cast(parent_type, target) {
                    target.clone()
                } else {
                    self.push_semantic(
                        SemanticErrorKind::InvalidCast { from: parent_type.clone(), to: target.clone() },
                        location.clone(),
                    );
                    ValueType::None
                }
            }
            ExprKind::Call { callee, args } => self.infer_val_call(parent_type, callee, args, location),
            ExprKind::Value { name, index, sub_kind } => {
                let name = name.clone();
                let (ty, resolved_kind) =
                    self.resolve_value_access(Some(parent_type), &name, index.as_deref_mut(), location);
                *sub_kind = resolved_kind;
                ty
            }
            _ => self.infer_bare(link, None),
        };
        link.value_type = Some(ty.clone());
        ty
    }

    /// `fnPtr.val(args)` — invoking the function a PTR-to-FUN value
    /// points at. Argument count is validated before the function-type
    /// promotion is applied to the arguments.
    fn infer_val_call(
        &mut self,
        parent_type: &ValueType,
        callee: &Rc<str>,
        args: &mut [Expression],
        location: &Location,
    ) -> ValueType {
        if &**callee != "val" {
            self.push_semantic(SemanticErrorKind::InvalidBuiltIn(callee.clone()), location.clone());
            for arg in args.iter_mut() {
                self.analyze_expr(arg, None);
            }
            return ValueType::None;
        }
        let ValueType::Ptr(pointee) = parent_type else {
            self.push_builtin_error("val", location);
            for arg in args.iter_mut() {
                self.analyze_expr(arg, None);
            }
            return ValueType::None;
        };
        let ValueType::Fun(arg_types, ret) = &**pointee else {
            self.push_builtin_error("val", location);
            for arg in args.iter_mut() {
                self.analyze_expr(arg, None);
            }
            return ValueType::None;
        };
        if args.len() != arg_types.len() {
            self.push_semantic(
                SemanticErrorKind::InvalidArgumentsCount { expected: arg_types.len(), found: args.len() },
                location.clone(),
            );
            for arg in args.iter_mut() {
                self.analyze_expr(arg, None);
            }
            return (**ret).clone();
        }
        for (arg, expected) in args.iter_mut().zip(arg_types.iter()) {
            self.check_and_try_casting(arg, expected);
        }
        (**ret).clone()
    }

    /// Collapses a leading `moduleAlias.symbolName` pair of chain links
    /// into one qualified lookup when it resolves against a name declared
    /// under an `@import` prefix.
    fn try_flatten_import_prefix(&mut self, links: &mut [Expression], location: &Location) -> bool {
        if links.len() < 2 {
            return false;
        }
        let Some((first_name, second_name)) = (match (&links[0].kind, &links[1].kind) {
            (ExprKind::Value { name: n1, index: None, .. }, ExprKind::Value { name: n2, .. }) => {
                Some((n1.clone(), n2.clone()))
            }
            _ => None,
        }) else {
            return false;
        };
        let joined: Rc<str> = Rc::from(format!("{first_name}.{second_name}"));

        let resolved = if let Some(var) = self.scope.lookup_variable(&joined).cloned() {
            Some((var.value_type, ValueSubKind::Simple))
        } else {
            self.scope
                .lookup_function(&joined)
                .cloned()
                .map(|func| (ValueType::ptr(ValueType::fun(func.args, func.return_type)), ValueSubKind::Fun))
        };
        let Some((mut ty, sub_kind)) = resolved else { return false };

        links[0].value_type = Some(ValueType::None);
        if let ExprKind::Value { index, sub_kind: link_sub_kind, .. } = &mut links[1].kind {
            if let Some(index_expr) = index.as_deref_mut() {
                self.analyze_expr(index_expr, None);
                match ty {
                    ValueType::Data(elem, _) => {
                        ty = *elem;
                        *link_sub_kind = ValueSubKind::Data;
                    }
                    _ => {
                        self.push_semantic(
                            SemanticErrorKind::InvalidOperation(format!("cannot index non-DATA value of type {ty}")),
                            location.clone(),
                        );
                        ty = ValueType::None;
                    }
                }
            } else {
                *link_sub_kind = sub_kind;
            }
        }
        links[1].value_type = Some(ty);
        true
    }
}

fn infer_literal(lit: &LiteralValue, target: Option<&ValueType>) -> ValueType {
    match lit {
        LiteralValue::Bool(_) => ValueType::Bool,
        LiteralValue::Int(_) => match target {
            Some(t) if t.is_integer() || t.is_float() => t.clone(),
            _ => ValueType::Int,
        },
        LiteralValue::Float(_) => match target {
            Some(t) if t.is_float() => t.clone(),
            _ => ValueType::Float,
        },
        LiteralValue::Str(_) => ValueType::ptr(ValueType::U8),
    }
}
