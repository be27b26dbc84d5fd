//! `canCast` and `checkAndTryCasting`.

use crate::Analyzer;
use brc_ir::{ExprKind, Expression, ValueType};

impl Analyzer<'_> {
    /// `canCast(source, target)`: pure type-level question,
    /// no diagnostics, no AST mutation.
    pub(crate) fn can_cast(&self, from: &ValueType, to: &ValueType) -> bool {
        if from == to {
            return true;
        }
        if from.is_unsigned_integer() {
            return to.is_integer() || to.is_float();
        }
        if from.is_signed_integer() {
            return to.is_signed_integer() || to.is_float();
        }
        if from.is_float() && to.is_float() {
            return true;
        }
        match (from, to) {
            (ValueType::Data(a, _), ValueType::Data(b, _)) => self.can_cast(a, b),
            (ValueType::Composite(elems, count), ValueType::Blob(name)) => {
                let Some(blob) = self.scope.lookup_blob(name) else { return false };
                blob.fields.len() == *count
                    && elems.iter().zip(blob.fields.iter()).all(|(e, f)| self.can_cast(e, &f.value_type))
            }
            (ValueType::Composite(elems, _), ValueType::Data(sub, _)) => {
                elems.iter().all(|e| self.can_cast(e, sub))
            }
            (ValueType::Composite(elems, count), ValueType::Ptr(_)) => {
                *count == 1 && elems.first().is_some_and(|e| e.is_unsigned_integer() || *e == ValueType::Int)
            }
            (ValueType::Blob(a), ValueType::Blob(b)) => a == b,
            _ => false,
        }
    }

    /// `checkAndTryCasting`: types `expr` (if not already
    /// typed), then, if its type differs from `target` and `canCast`
    /// allows it, rewrites `expr` in place and returns `target`. If
    /// casting is not possible, returns the source type unchanged — the
    /// caller is responsible for reporting the mismatch.
    pub(crate) fn check_and_try_casting(&mut self, expr: &mut Expression, target: &ValueType) -> ValueType {
        let source = self.analyze_expr(expr, None);
        if &source == target {
            return source;
        }
        if !self.can_cast(&source, target) {
            return source;
        }
        self.apply_cast(expr, target);
        target.clone()
    }

    /// Performs the rewrite step of `checkAndTryCasting`, assuming
    /// `can_cast(source, target)` already holds.
    pub(crate) fn apply_cast(&mut self, expr: &mut Expression, target: &ValueType) {
        match &mut expr.kind {
            ExprKind::Literal(_) => {
                expr.value_type = Some(target.clone());
            }
            ExprKind::CompositeLiteral(elements) => match target {
                ValueType::Blob(name) => {
                    let fields = self.scope.lookup_blob(name).map(|b| b.fields.clone());
                    if let Some(fields) = fields {
                        for (elem, field) in elements.iter_mut().zip(fields.iter()) {
                            self.check_and_try_casting(elem, &field.value_type);
                        }
                    }
                    expr.value_type = Some(target.clone());
                }
                ValueType::Data(sub, _) => {
                    for elem in elements.iter_mut() {
                        self.check_and_try_casting(elem, sub);
                    }
                    expr.value_type = Some(target.clone());
                }
                ValueType::Ptr(_) => {
                    expr.value_type = Some(target.clone());
                }
                _ => {
                    expr.value_type = Some(target.clone());
                }
            },
            ExprKind::Chained(links) if matches!(links.last(), Some(last) if matches!(last.kind, ExprKind::Cast(_))) => {
                expr.value_type = Some(target.clone());
            }
            _ => wrap_in_cast(expr, target.clone()),
        }
    }
}

/// Wraps `expr` in `CHAINED(expr, CAST(target))`, the generic fallback
/// rewrite of `checkAndTryCasting`.
fn wrap_in_cast(expr: &mut Expression, target: ValueType) {
    let location = expr.location.clone();
    let placeholder = Expression::none(location.clone());
    let original = std::mem::replace(expr, placeholder);
    let cast_link = Expression::new(ExprKind::Cast(target.clone()), location.clone());
    *expr = Expression::new(ExprKind::Chained(vec![original, cast_link]), location);
    expr.value_type = Some(target);
}
