//! Statement lowering: the handful of statement kinds that can appear in
//! a function body (as opposed to a module header, which `builder.rs`
//! walks on its own).

use crate::context::FunctionContext;
use crate::function_builder::FunctionBuilder;
use crate::ir::{IrInst, IrOperand, IrTerminator, IrType};
use crate::lower::expr::{lower_composite_into, lower_expr, lower_lvalue};
use crate::lower::types::lower_type;
use crate::scope::ScopeVariable;
use brc_ir::{ExprKind, Statement};

pub(crate) fn lower_statement(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, stmt: &Statement) {
    if fb.current_is_terminated() {
        return;
    }
    match stmt {
        Statement::Variable { name, value_type, initializer, .. } => {
            let irty = lower_type(value_type);
            let slot = fb.new_value(IrType::Ptr);
            fb.emit(IrInst::Alloca { ty: irty, result: slot });
            ctx.scope.define_variable(name.clone(), ScopeVariable { address: IrOperand::Value(slot), ty: value_type.clone() });
            if let Some(init) = initializer {
                match &init.kind {
                    ExprKind::CompositeLiteral(elements) => lower_composite_into(fb, ctx, IrOperand::Value(slot), value_type, elements),
                    _ => {
                        let value = lower_expr(fb, ctx, init);
                        fb.emit(IrInst::Store { ptr: IrOperand::Value(slot), value, volatile: false });
                    }
                }
            }
        }
        Statement::Assignment { target, value, .. } => {
            let addr = lower_lvalue(fb, ctx, target);
            match &value.kind {
                ExprKind::CompositeLiteral(elements) => {
                    let target_ty = target.value_type.clone().unwrap_or(brc_ir::ValueType::None);
                    lower_composite_into(fb, ctx, addr, &target_ty, elements);
                }
                _ => {
                    let v = lower_expr(fb, ctx, value);
                    fb.emit(IrInst::Store { ptr: addr, value: v, volatile: false });
                }
            }
        }
        Statement::Return { value, .. } => {
            let operand = value.as_ref().map(|v| lower_expr(fb, ctx, v));
            fb.set_terminator(IrTerminator::Ret(operand));
        }
        Statement::Block { statements, .. } => {
            ctx.scope.push();
            for s in statements {
                lower_statement(fb, ctx, s);
            }
            ctx.scope.pop();
        }
        Statement::Expression { expr, .. } => {
            lower_expr(fb, ctx, expr);
        }
        Statement::Repeat { init, pre_condition, post_statement, post_condition, body, .. } => {
            lower_repeat(fb, ctx, init.as_deref(), pre_condition.as_ref(), post_statement.as_deref(), post_condition.as_ref(), body);
        }
        Statement::Module { .. }
        | Statement::MetaImport { .. }
        | Statement::MetaExternFunction { .. }
        | Statement::MetaExternVariable { .. }
        | Statement::Blob { .. }
        | Statement::BlobDeclaration { .. }
        | Statement::VariableDeclaration { .. }
        | Statement::Function { .. }
        | Statement::FunctionDeclaration { .. }
        | Statement::RawFunction { .. } => {
            unreachable!("header-only statement cannot appear in a function body")
        }
    }
}

/// Lowers the general `repeat` loop — an optional init, an optional
/// pre-condition (checked before each body execution), an optional
/// per-iteration post-statement, and an optional post-condition (checked
/// after the body, like a `do...while`). A `StackSave`/`StackRestore`
/// pair wraps each iteration so composite-literal allocas inside the body
/// don't accumulate stack space across iterations.
fn lower_repeat(
    fb: &mut FunctionBuilder,
    ctx: &mut FunctionContext,
    init: Option<&Statement>,
    pre_condition: Option<&brc_ir::Expression>,
    post_statement: Option<&Statement>,
    post_condition: Option<&brc_ir::Expression>,
    body: &Statement,
) {
    ctx.scope.push();
    if let Some(init) = init {
        lower_statement(fb, ctx, init);
    }

    let save_slot = fb.new_value(IrType::Ptr);
    fb.emit(IrInst::StackSave { result: save_slot });

    let cond_block = fb.new_block("repeat.cond");
    let body_block = fb.new_block("repeat.body");
    let post_block = fb.new_block("repeat.post");
    let exit_block = fb.new_block("repeat.exit");

    fb.set_terminator(IrTerminator::Br(cond_block));

    fb.switch_to(cond_block);
    match pre_condition {
        Some(cond) => {
            let v = lower_expr(fb, ctx, cond);
            fb.set_terminator(IrTerminator::CondBr { cond: v, then_block: body_block, else_block: exit_block });
        }
        None => fb.set_terminator(IrTerminator::Br(body_block)),
    }

    fb.switch_to(body_block);
    lower_statement(fb, ctx, body);
    if !fb.current_is_terminated() {
        fb.emit(IrInst::StackRestore { ptr: IrOperand::Value(save_slot) });
        fb.set_terminator(IrTerminator::Br(post_block));
    }

    fb.switch_to(post_block);
    if let Some(post_stmt) = post_statement {
        lower_statement(fb, ctx, post_stmt);
    }
    match post_condition {
        Some(cond) => {
            let v = lower_expr(fb, ctx, cond);
            fb.set_terminator(IrTerminator::CondBr { cond: v, then_block: body_block, else_block: exit_block });
        }
        None => fb.set_terminator(IrTerminator::Br(cond_block)),
    }

    fb.switch_to(exit_block);
    ctx.scope.pop();
}
