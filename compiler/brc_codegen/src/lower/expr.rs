//! Expression lowering: turns an analyzed [`Expression`] into IR
//! instructions appended to the current block of a [`FunctionBuilder`],
//! returning the [`IrOperand`] that carries its value.

use crate::context::FunctionContext;
use crate::function_builder::FunctionBuilder;
use crate::ir::{
    CastKind, FloatPredicate, GepIndex, IntPredicate, IrConst, IrInst, IrOperand, IrTerminator, IrType,
};
use crate::lower::types::lower_type;
use brc_diagnostic::{BuilderErrorKind, Error};
use brc_ir::{BinaryOp, ExprKind, Expression, LiteralValue, Location, Statement, UnaryOp, ValueSubKind, ValueType};
use std::rc::Rc;

/// The result of lowering one link of a dot-chain: its loaded value, the
/// address it was loaded from (when it has one — bare variables and blob
/// fields do, computed values and built-ins don't), and its source type.
struct ChainVal {
    addr: Option<IrOperand>,
    value: IrOperand,
    ty: ValueType,
}

pub(crate) fn lower_expr(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, expr: &Expression) -> IrOperand {
    match &expr.kind {
        ExprKind::Literal(lit) => lower_literal(ctx, lit, expr.value_type.as_ref()),
        ExprKind::CompositeLiteral(elements) => lower_composite(fb, ctx, elements, expr.value_type.as_ref(), &expr.location),
        ExprKind::Grouping(inner) => lower_expr(fb, ctx, inner),
        ExprKind::Unary(op, operand) => lower_unary(fb, ctx, *op, operand, expr.value_type.as_ref()),
        ExprKind::Binary(op, lhs, rhs) => lower_binary(fb, ctx, *op, lhs, rhs),
        ExprKind::Chained(links) => lower_chained(fb, ctx, links).value,
        ExprKind::Cast(_) => unreachable!("Cast only occurs as a chain link"),
        ExprKind::Call { callee, args } => lower_direct_call(fb, ctx, callee, args, expr.value_type.as_ref(), &expr.location),
        ExprKind::Value { name, index, sub_kind } => {
            lower_value_link(fb, ctx, None, name, index.as_deref(), *sub_kind, &expr.location).value
        }
        ExprKind::IfElse { cond, then_branch, else_branch } => {
            lower_if_else(fb, ctx, cond, then_branch, else_branch.as_deref(), expr.value_type.as_ref())
        }
        ExprKind::Block { statements, result } => lower_block_expr(fb, ctx, statements, result),
        ExprKind::None => IrOperand::Const(IrConst::NullPtr),
    }
}

/// Lowers an assignment target (always a bare `VALUE` or `CHAINED` whose
/// last link is addressable) to the address that should be stored into.
pub(crate) fn lower_lvalue(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, expr: &Expression) -> IrOperand {
    let chain_val = match &expr.kind {
        ExprKind::Chained(links) => lower_chained(fb, ctx, links),
        ExprKind::Value { name, index, sub_kind } => {
            lower_value_link(fb, ctx, None, name, index.as_deref(), *sub_kind, &expr.location)
        }
        _ => {
            let value = lower_expr(fb, ctx, expr);
            ChainVal { addr: None, value, ty: expr.value_type.clone().unwrap_or(ValueType::None) }
        }
    };
    ensure_address(fb, &chain_val)
}

/// Stores a composite literal's elements directly into an already-
/// allocated address, skipping the materialize-then-copy a bare
/// [`lower_composite`] would otherwise do — used for `x blob <- { ... }`
/// variable initializers.
pub(crate) fn lower_composite_into(
    fb: &mut FunctionBuilder,
    ctx: &mut FunctionContext,
    target_addr: IrOperand,
    target_ty: &ValueType,
    elements: &[Expression],
) {
    if let ValueType::Ptr(_) = target_ty {
        let value = lower_composite(fb, ctx, elements, Some(target_ty), &elements.first().map(|e| e.location.clone()).unwrap_or_else(|| unreachable!("composite literal always has at least one element")));
        fb.emit(IrInst::Store { ptr: target_addr, value, volatile: false });
        return;
    }
    let base_ty = lower_type(target_ty);
    store_composite_fields(fb, ctx, target_addr, &base_ty, elements, target_ty);
}

fn lower_literal(ctx: &mut FunctionContext, lit: &LiteralValue, vt: Option<&ValueType>) -> IrOperand {
    match lit {
        LiteralValue::Bool(b) => IrOperand::Const(IrConst::Int(u64::from(*b), IrType::Bool)),
        LiteralValue::Int(v) => {
            let ty = vt.cloned().unwrap_or(ValueType::Int);
            let irty = lower_type(&ty);
            match irty {
                IrType::F32 | IrType::F64 => IrOperand::Const(IrConst::Float(*v as f64, irty)),
                _ => IrOperand::Const(IrConst::Int(*v, irty)),
            }
        }
        LiteralValue::Float(v) => {
            let ty = vt.cloned().unwrap_or(ValueType::Float);
            IrOperand::Const(IrConst::Float(*v, lower_type(&ty)))
        }
        LiteralValue::Str(s) => IrOperand::GlobalAddr(ctx.intern_string(s.clone())),
    }
}

fn lower_unary(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, op: UnaryOp, operand: &Expression, result_ty: Option<&ValueType>) -> IrOperand {
    match op {
        UnaryOp::Plus => lower_expr(fb, ctx, operand),
        UnaryOp::BitNot | UnaryOp::Not => {
            let value = lower_expr(fb, ctx, operand);
            let ty = lower_type(result_ty.unwrap_or(&ValueType::Bool));
            let result = fb.new_value(ty);
            fb.emit(IrInst::Not { operand: value, result });
            IrOperand::Value(result)
        }
        UnaryOp::Minus => {
            let value = lower_expr(fb, ctx, operand);
            let source_ty = operand.value_type.clone().unwrap_or(ValueType::None);
            if source_ty.is_float() {
                let result = fb.new_value(lower_type(&source_ty));
                fb.emit(IrInst::FNeg { operand: value, result });
                IrOperand::Value(result)
            } else {
                let promoted = result_ty.cloned().unwrap_or(source_ty.clone());
                let result = fb.new_value(lower_type(&promoted));
                fb.emit(IrInst::Neg { signed: promoted.is_signed_integer(), operand: value, result });
                IrOperand::Value(result)
            }
        }
    }
}

fn int_predicate(op: BinaryOp) -> IntPredicate {
    match op {
        BinaryOp::Equal => IntPredicate::Eq,
        BinaryOp::NotEqual => IntPredicate::Ne,
        BinaryOp::Less => IntPredicate::Lt,
        BinaryOp::LessEqual => IntPredicate::Le,
        BinaryOp::Greater => IntPredicate::Gt,
        BinaryOp::GreaterEqual => IntPredicate::Ge,
        _ => unreachable!("not a comparison operator"),
    }
}

fn float_predicate(op: BinaryOp) -> FloatPredicate {
    match op {
        BinaryOp::Equal => FloatPredicate::Oeq,
        BinaryOp::NotEqual => FloatPredicate::One,
        BinaryOp::Less => FloatPredicate::Olt,
        BinaryOp::LessEqual => FloatPredicate::Ole,
        BinaryOp::Greater => FloatPredicate::Ogt,
        BinaryOp::GreaterEqual => FloatPredicate::Oge,
        _ => unreachable!("not a comparison operator"),
    }
}

fn lower_binary(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, op: BinaryOp, lhs: &Expression, rhs: &Expression) -> IrOperand {
    use crate::ir::{FloatBinOp, IntBinOp};

    let lv = lower_expr(fb, ctx, lhs);
    let rv = lower_expr(fb, ctx, rhs);
    let operand_ty = lhs.value_type.clone().unwrap_or(ValueType::None);
    let signed = operand_ty.is_signed_integer();

    if op.is_shift() {
        let shift_op = if matches!(op, BinaryOp::Shl) {
            IntBinOp::Shl
        } else if signed {
            IntBinOp::AShr
        } else {
            IntBinOp::LShr
        };
        let result = fb.new_value(lower_type(&operand_ty));
        fb.emit(IrInst::IntBin { op: shift_op, signed, lhs: lv, rhs: rv, result });
        return IrOperand::Value(result);
    }

    if op.is_equality() || op.is_ordering() {
        return if operand_ty.is_float() {
            let result = fb.new_value(IrType::Bool);
            fb.emit(IrInst::FCmp { pred: float_predicate(op), lhs: lv, rhs: rv, result });
            IrOperand::Value(result)
        } else {
            let result = fb.new_value(IrType::Bool);
            fb.emit(IrInst::ICmp { pred: int_predicate(op), signed, lhs: lv, rhs: rv, result });
            IrOperand::Value(result)
        };
    }

    if op.is_logical() {
        let bop = match op {
            BinaryOp::Or => IntBinOp::Or,
            BinaryOp::And => IntBinOp::And,
            BinaryOp::Xor => IntBinOp::Xor,
            _ => unreachable!("not a logical operator"),
        };
        let result = fb.new_value(IrType::Bool);
        fb.emit(IrInst::IntBin { op: bop, signed: false, lhs: lv, rhs: rv, result });
        return IrOperand::Value(result);
    }

    if operand_ty.is_float() {
        let fop = match op {
            BinaryOp::Add => FloatBinOp::Add,
            BinaryOp::Sub => FloatBinOp::Sub,
            BinaryOp::Mul => FloatBinOp::Mul,
            BinaryOp::Div => FloatBinOp::Div,
            BinaryOp::Mod => FloatBinOp::Rem,
            _ => unreachable!("not an arithmetic operator"),
        };
        let result = fb.new_value(lower_type(&operand_ty));
        fb.emit(IrInst::FloatBin { op: fop, lhs: lv, rhs: rv, result });
        IrOperand::Value(result)
    } else {
        let iop = match op {
            BinaryOp::Add => IntBinOp::Add,
            BinaryOp::Sub => IntBinOp::Sub,
            BinaryOp::Mul => IntBinOp::Mul,
            BinaryOp::Div if signed => IntBinOp::SDiv,
            BinaryOp::Div => IntBinOp::UDiv,
            BinaryOp::Mod if signed => IntBinOp::SRem,
            BinaryOp::Mod => IntBinOp::URem,
            BinaryOp::BitOr => IntBinOp::Or,
            BinaryOp::BitXor => IntBinOp::Xor,
            BinaryOp::BitAnd => IntBinOp::And,
            _ => unreachable!("not an arithmetic/bitwise operator"),
        };
        let result = fb.new_value(lower_type(&operand_ty));
        fb.emit(IrInst::IntBin { op: iop, signed, lhs: lv, rhs: rv, result });
        IrOperand::Value(result)
    }
}

fn lower_direct_call(
    fb: &mut FunctionBuilder,
    ctx: &mut FunctionContext,
    callee: &Rc<str>,
    args: &[Expression],
    ret_vt: Option<&ValueType>,
    location: &Location,
) -> IrOperand {
    let arg_values: Vec<IrOperand> = args.iter().map(|a| lower_expr(fb, ctx, a)).collect();
    if ctx.scope.lookup_function(callee).is_none() {
        ctx.diagnostics.push(Error::builder(BuilderErrorKind::NotDeclared(callee.clone()), location.clone()));
    }
    let ret_ty = lower_type(ret_vt.unwrap_or(&ValueType::None));
    if ret_ty == IrType::Void {
        fb.emit(IrInst::Call { callee: IrOperand::FuncAddr(callee.clone()), args: arg_values, ty: ret_ty, result: None });
        IrOperand::Const(IrConst::NullPtr)
    } else {
        let result = fb.new_value(ret_ty.clone());
        fb.emit(IrInst::Call { callee: IrOperand::FuncAddr(callee.clone()), args: arg_values, ty: ret_ty, result: Some(result) });
        IrOperand::Value(result)
    }
}

fn int_or_float_width(ty: &ValueType) -> u32 {
    match lower_type(ty) {
        IrType::Int(w) => w,
        IrType::F32 => 32,
        IrType::F64 => 64,
        IrType::Addr => 64,
        IrType::Bool => 1,
        _ => 0,
    }
}

/// One `(source, target)` step of a cast chain link. `can_cast` has
/// already validated the pair; this only picks the IR-level recipe.
fn lower_cast(fb: &mut FunctionBuilder, value: IrOperand, from: &ValueType, to: &ValueType) -> IrOperand {
    if from == to {
        return value;
    }
    if from.is_numeric() && to.is_numeric() {
        let from_w = int_or_float_width(from);
        let to_w = int_or_float_width(to);
        let (kind, to_irty) = if from.is_float() && to.is_float() {
            (if to_w > from_w { CastKind::FpExt } else { CastKind::FpTrunc }, lower_type(to))
        } else if from.is_integer() && to.is_integer() {
            if to_w == from_w {
                return value;
            }
            let kind = if to_w > from_w {
                if from.is_signed_integer() { CastKind::SExt } else { CastKind::ZExt }
            } else {
                CastKind::Trunc
            };
            (kind, lower_type(to))
        } else if from.is_integer() {
            (if from.is_signed_integer() { CastKind::SiToFp } else { CastKind::UiToFp }, lower_type(to))
        } else {
            (if to.is_signed_integer() { CastKind::FpToSi } else { CastKind::FpToUi }, lower_type(to))
        };
        let result = fb.new_value(to_irty.clone());
        fb.emit(IrInst::Cast { kind, operand: value, from: lower_type(from), to: to_irty, result });
        return IrOperand::Value(result);
    }
    match (from, to) {
        (ValueType::Data(sub_a, count), ValueType::Data(sub_b, _)) if sub_a != sub_b => {
            let n = brc_ir::literal_uint_value(count).unwrap_or(0);
            let result = fb.new_value(lower_type(to));
            fb.emit(IrInst::ArrayCast {
                source: value,
                source_elem: lower_type(sub_a),
                target_elem: lower_type(sub_b),
                count: usize::try_from(n).unwrap_or(0),
                result,
            });
            IrOperand::Value(result)
        }
        // PTR/BLOB identity-shaped recasts and same-sub DATA casts carry no
        // representation change.
        _ => value,
    }
}

/// Spills a value with no known address into a fresh stack slot so a GEP
/// or `adr` built-in has something to compute from.
fn ensure_address(fb: &mut FunctionBuilder, val: &ChainVal) -> IrOperand {
    if let Some(addr) = &val.addr {
        return addr.clone();
    }
    let irty = lower_type(&val.ty);
    let slot = fb.new_value(IrType::Ptr);
    fb.emit(IrInst::Alloca { ty: irty, result: slot });
    fb.emit(IrInst::Store { ptr: IrOperand::Value(slot), value: val.value.clone(), volatile: false });
    IrOperand::Value(slot)
}

fn lower_chained(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, links: &[Expression]) -> ChainVal {
    let (mut current, start) = lower_chain_prefix(fb, ctx, links);
    for link in &links[start..] {
        current = lower_chain_link(fb, ctx, &current, link);
    }
    current
}

/// Mirrors the analyzer's import-prefix flattening: when the first two
/// links are a `moduleAlias.symbolName` pair the analyzer resolved as one
/// qualified lookup (marked by setting the first link's type to `NONE`),
/// lower both links as a single qualified reference instead of trying to
/// look up the bare alias as its own variable.
fn lower_chain_prefix(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, links: &[Expression]) -> (ChainVal, usize) {
    if links.len() >= 2 {
        if let (ExprKind::Value { name: n1, .. }, ExprKind::Value { name: n2, index, sub_kind }) = (&links[0].kind, &links[1].kind) {
            if links[0].value_type == Some(ValueType::None) {
                let joined: Rc<str> = Rc::from(format!("{n1}.{n2}"));
                if matches!(sub_kind, ValueSubKind::Fun) {
                    return (lower_fun_ref(ctx, &joined), 2);
                }
                let value = lower_simple(fb, ctx, None, &joined, index.as_deref(), &links[1].location);
                return (value, 2);
            }
        }
    }
    (lower_chain_first(fb, ctx, &links[0]), 1)
}

fn lower_chain_first(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, link: &Expression) -> ChainVal {
    match &link.kind {
        ExprKind::Value { name, index, sub_kind } => lower_value_link(fb, ctx, None, name, index.as_deref(), *sub_kind, &link.location),
        _ => {
            let value = lower_expr(fb, ctx, link);
            ChainVal { addr: None, value, ty: link.value_type.clone().unwrap_or(ValueType::None) }
        }
    }
}

fn lower_chain_link(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, parent: &ChainVal, link: &Expression) -> ChainVal {
    match &link.kind {
        ExprKind::Cast(target) => {
            let value = lower_cast(fb, parent.value.clone(), &parent.ty, target);
            ChainVal { addr: None, value, ty: target.clone() }
        }
        // `.val(args)`: an indirect call through a PTR(FUN) value.
        ExprKind::Call { args, .. } => {
            let arg_values: Vec<IrOperand> = args.iter().map(|a| lower_expr(fb, ctx, a)).collect();
            let ret_vt = link.value_type.clone().unwrap_or(ValueType::None);
            let ret_ty = lower_type(&ret_vt);
            if ret_ty == IrType::Void {
                fb.emit(IrInst::Call { callee: parent.value.clone(), args: arg_values, ty: ret_ty, result: None });
                ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ret_vt }
            } else {
                let result = fb.new_value(ret_ty.clone());
                fb.emit(IrInst::Call { callee: parent.value.clone(), args: arg_values, ty: ret_ty, result: Some(result) });
                ChainVal { addr: None, value: IrOperand::Value(result), ty: ret_vt }
            }
        }
        ExprKind::Value { name, index, sub_kind } => {
            lower_value_link(fb, ctx, Some(parent), name, index.as_deref(), *sub_kind, &link.location)
        }
        _ => unreachable!("chain link must be Cast, Call, or Value"),
    }
}

fn lower_value_link(
    fb: &mut FunctionBuilder,
    ctx: &mut FunctionContext,
    parent: Option<&ChainVal>,
    name: &Rc<str>,
    index: Option<&Expression>,
    sub_kind: ValueSubKind,
    location: &Location,
) -> ChainVal {
    match sub_kind {
        ValueSubKind::Simple | ValueSubKind::Data => lower_simple(fb, ctx, parent, name, index, location),
        ValueSubKind::Fun => lower_fun_ref(ctx, name),
        ValueSubKind::BuiltInCount => lower_builtin_count(parent),
        ValueSubKind::BuiltInSize => lower_builtin_size(ctx, parent),
        ValueSubKind::BuiltInAdr => lower_builtin_adr(fb, parent),
        ValueSubKind::BuiltInVadr => lower_builtin_vadr(fb, parent),
        ValueSubKind::BuiltInValSimple | ValueSubKind::BuiltInValData => lower_builtin_val(fb, ctx, parent, index),
    }
}

/// A bare variable (`parent.is_none()`) or a blob field access
/// (`parent.is_some()`), optionally followed by a DATA-element index.
fn lower_simple(
    fb: &mut FunctionBuilder,
    ctx: &mut FunctionContext,
    parent: Option<&ChainVal>,
    name: &Rc<str>,
    index: Option<&Expression>,
    location: &Location,
) -> ChainVal {
    let (base_addr, base_ty) = match parent {
        None => match ctx.scope.lookup_variable(name).cloned() {
            Some(var) => (var.address, var.ty),
            None => {
                ctx.diagnostics.push(Error::builder(BuilderErrorKind::NotDeclared(name.clone()), location.clone()));
                (IrOperand::Const(IrConst::NullPtr), ValueType::None)
            }
        },
        Some(p) => {
            let struct_name = match &p.ty {
                ValueType::Blob(n) => n.clone(),
                _ => Rc::from(""),
            };
            let field = ctx
                .scope
                .lookup_blob(&struct_name)
                .and_then(|blob| blob.members.iter().position(|(n, _)| n == name).map(|i| (i, blob.members[i].1.clone())));
            let Some((field_index, field_ty)) = field else {
                ctx.diagnostics.push(Error::builder(BuilderErrorKind::NotDeclared(name.clone()), location.clone()));
                return ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ValueType::None };
            };
            let parent_addr = ensure_address(fb, p);
            let base_irty = lower_type(&p.ty);
            let result = fb.new_value(IrType::Ptr);
            fb.emit(IrInst::Gep { base: parent_addr, base_ty: base_irty, indices: vec![GepIndex::Const(field_index as u32)], result });
            (IrOperand::Value(result), field_ty)
        }
    };

    match index {
        None => {
            let loaded_ty = lower_type(&base_ty);
            let result = fb.new_value(loaded_ty.clone());
            fb.emit(IrInst::Load { ptr: base_addr.clone(), ty: loaded_ty, volatile: false, result });
            ChainVal { addr: Some(base_addr), value: IrOperand::Value(result), ty: base_ty }
        }
        Some(idx_expr) => {
            let ValueType::Data(elem_ty, _) = &base_ty else {
                ctx.diagnostics.push(Error::builder(
                    BuilderErrorKind::NoTypeForPointer(name.clone()),
                    location.clone(),
                ));
                return ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ValueType::None };
            };
            let idx_val = lower_expr(fb, ctx, idx_expr);
            let base_irty = lower_type(&base_ty);
            let addr_result = fb.new_value(IrType::Ptr);
            fb.emit(IrInst::Gep { base: base_addr, base_ty: base_irty, indices: vec![GepIndex::Value(idx_val)], result: addr_result });
            let elem_irty = lower_type(elem_ty);
            let load_result = fb.new_value(elem_irty.clone());
            fb.emit(IrInst::Load { ptr: IrOperand::Value(addr_result), ty: elem_irty, volatile: false, result: load_result });
            ChainVal { addr: Some(IrOperand::Value(addr_result)), value: IrOperand::Value(load_result), ty: (**elem_ty).clone() }
        }
    }
}

fn lower_fun_ref(ctx: &mut FunctionContext, name: &Rc<str>) -> ChainVal {
    match ctx.scope.lookup_function(name).cloned() {
        Some(f) => ChainVal {
            addr: None,
            value: IrOperand::FuncAddr(name.clone()),
            ty: ValueType::ptr(ValueType::fun(f.args, f.return_type)),
        },
        None => ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ValueType::None },
    }
}

fn lower_builtin_count(parent: Option<&ChainVal>) -> ChainVal {
    let n = match parent.map(|p| &p.ty) {
        Some(ValueType::Data(_, count)) => brc_ir::literal_uint_value(count).unwrap_or(0),
        _ => 0,
    };
    ChainVal { addr: None, value: IrOperand::Const(IrConst::Int(n, IrType::Int(64))), ty: ValueType::Int }
}

fn lower_builtin_size(ctx: &mut FunctionContext, parent: Option<&ChainVal>) -> ChainVal {
    let Some(parent) = parent else {
        return ChainVal { addr: None, value: IrOperand::Const(IrConst::Int(0, IrType::Int(64))), ty: ValueType::Int };
    };
    let irty = lower_type(&parent.ty);
    let structs: rustc_hash::FxHashMap<Rc<str>, crate::ir::IrStruct> =
        ctx.structs.iter().cloned().map(|s| (s.name.clone(), s)).collect();
    let bytes = irty.size_in_bytes(&structs, 64);
    ChainVal { addr: None, value: IrOperand::Const(IrConst::Int(u64::from(bytes), IrType::Int(64))), ty: ValueType::Int }
}

fn lower_builtin_adr(fb: &mut FunctionBuilder, parent: Option<&ChainVal>) -> ChainVal {
    let Some(parent) = parent else {
        return ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ValueType::A };
    };
    let addr = ensure_address(fb, parent);
    let result = fb.new_value(IrType::Addr);
    fb.emit(IrInst::PtrToInt { operand: addr, result });
    ChainVal { addr: None, value: IrOperand::Value(result), ty: ValueType::A }
}

fn lower_builtin_vadr(fb: &mut FunctionBuilder, parent: Option<&ChainVal>) -> ChainVal {
    let Some(parent) = parent else {
        return ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ValueType::A };
    };
    let result = fb.new_value(IrType::Addr);
    fb.emit(IrInst::PtrToInt { operand: parent.value.clone(), result });
    ChainVal { addr: None, value: IrOperand::Value(result), ty: ValueType::A }
}

fn lower_builtin_val(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, parent: Option<&ChainVal>, index: Option<&Expression>) -> ChainVal {
    let Some(parent) = parent else {
        return ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ValueType::None };
    };
    let ValueType::Ptr(pointee) = &parent.ty else {
        return ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ValueType::None };
    };
    match index {
        None => {
            let irty = lower_type(pointee);
            let result = fb.new_value(irty.clone());
            fb.emit(IrInst::Load { ptr: parent.value.clone(), ty: irty, volatile: false, result });
            ChainVal { addr: Some(parent.value.clone()), value: IrOperand::Value(result), ty: (**pointee).clone() }
        }
        Some(idx_expr) => {
            let ValueType::Data(elem_ty, _) = &**pointee else {
                return ChainVal { addr: None, value: IrOperand::Const(IrConst::NullPtr), ty: ValueType::None };
            };
            let idx_val = lower_expr(fb, ctx, idx_expr);
            let base_irty = lower_type(pointee);
            let addr_result = fb.new_value(IrType::Ptr);
            fb.emit(IrInst::Gep { base: parent.value.clone(), base_ty: base_irty, indices: vec![GepIndex::Value(idx_val)], result: addr_result });
            let elem_irty = lower_type(elem_ty);
            let load_result = fb.new_value(elem_irty.clone());
            fb.emit(IrInst::Load { ptr: IrOperand::Value(addr_result), ty: elem_irty, volatile: false, result: load_result });
            ChainVal { addr: Some(IrOperand::Value(addr_result)), value: IrOperand::Value(load_result), ty: (**elem_ty).clone() }
        }
    }
}

fn lower_composite(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, elements: &[Expression], vt: Option<&ValueType>, location: &Location) -> IrOperand {
    let target_ty = vt.cloned().unwrap_or(ValueType::None);
    match &target_ty {
        ValueType::Ptr(_) => {
            let elem_value = elements.first().map(|e| lower_expr(fb, ctx, e)).unwrap_or(IrOperand::Const(IrConst::Int(0, IrType::Int(64))));
            let result = fb.new_value(IrType::Ptr);
            fb.emit(IrInst::Cast { kind: CastKind::IntToPtr, operand: elem_value, from: IrType::Int(64), to: IrType::Ptr, result });
            IrOperand::Value(result)
        }
        ValueType::Blob(_) | ValueType::Data(..) => {
            let irty = lower_type(&target_ty);
            let slot = fb.new_value(IrType::Ptr);
            fb.emit(IrInst::Alloca { ty: irty.clone(), result: slot });
            store_composite_fields(fb, ctx, IrOperand::Value(slot), &irty, elements, &target_ty);
            let loaded = fb.new_value(irty.clone());
            fb.emit(IrInst::Load { ptr: IrOperand::Value(slot), ty: irty, volatile: false, result: loaded });
            IrOperand::Value(loaded)
        }
        // A composite literal that reached codegen without ever being
        // promoted to BLOB/DATA/PTR by the analyzer. Materialize it as an
        // array of its first element's type so the builder still has a
        // concrete shape to allocate.
        _ => {
            let elem_vt = elements.first().and_then(|e| e.value_type.clone()).unwrap_or(ValueType::None);
            let count_expr = Expression::new(ExprKind::Literal(LiteralValue::Int(elements.len() as u64)), location.clone());
            let array_ty = ValueType::data(elem_vt, count_expr);
            let irty = lower_type(&array_ty);
            let slot = fb.new_value(IrType::Ptr);
            fb.emit(IrInst::Alloca { ty: irty.clone(), result: slot });
            store_composite_fields(fb, ctx, IrOperand::Value(slot), &irty, elements, &array_ty);
            let loaded = fb.new_value(irty.clone());
            fb.emit(IrInst::Load { ptr: IrOperand::Value(slot), ty: irty, volatile: false, result: loaded });
            IrOperand::Value(loaded)
        }
    }
}

fn store_composite_fields(
    fb: &mut FunctionBuilder,
    ctx: &mut FunctionContext,
    base_addr: IrOperand,
    base_irty: &IrType,
    elements: &[Expression],
    target_ty: &ValueType,
) {
    match target_ty {
        ValueType::Blob(name) => {
            let Some(blob) = ctx.scope.lookup_blob(name).cloned() else { return };
            for (i, (elem, _)) in elements.iter().zip(blob.members.iter()).enumerate() {
                let value = lower_expr(fb, ctx, elem);
                let result = fb.new_value(IrType::Ptr);
                fb.emit(IrInst::Gep { base: base_addr.clone(), base_ty: base_irty.clone(), indices: vec![GepIndex::Const(i as u32)], result });
                fb.emit(IrInst::Store { ptr: IrOperand::Value(result), value, volatile: false });
            }
        }
        ValueType::Data(..) => {
            for (i, elem) in elements.iter().enumerate() {
                let value = lower_expr(fb, ctx, elem);
                let result = fb.new_value(IrType::Ptr);
                fb.emit(IrInst::Gep { base: base_addr.clone(), base_ty: base_irty.clone(), indices: vec![GepIndex::Const(i as u32)], result });
                fb.emit(IrInst::Store { ptr: IrOperand::Value(result), value, volatile: false });
            }
        }
        _ => {}
    }
}

fn lower_if_else(
    fb: &mut FunctionBuilder,
    ctx: &mut FunctionContext,
    cond: &Expression,
    then_branch: &Expression,
    else_branch: Option<&Expression>,
    result_vt: Option<&ValueType>,
) -> IrOperand {
    let cond_val = lower_expr(fb, ctx, cond);
    let then_block = fb.new_block("if.then");
    let else_block = fb.new_block("if.else");
    let merge_block = fb.new_block("if.merge");
    fb.set_terminator(IrTerminator::CondBr { cond: cond_val, then_block, else_block });

    fb.switch_to(then_block);
    let then_val = lower_expr(fb, ctx, then_branch);
    let then_end = fb.current_block();
    fb.set_terminator(IrTerminator::Br(merge_block));

    fb.switch_to(else_block);
    let else_val = match else_branch {
        Some(e) => lower_expr(fb, ctx, e),
        None => IrOperand::Const(IrConst::NullPtr),
    };
    let else_end = fb.current_block();
    fb.set_terminator(IrTerminator::Br(merge_block));

    fb.switch_to(merge_block);
    match result_vt {
        Some(vt) if *vt != ValueType::None && else_branch.is_some() => {
            let irty = lower_type(vt);
            let result = fb.new_value(irty.clone());
            fb.emit(IrInst::Phi { ty: irty, incoming: vec![(then_end, then_val), (else_end, else_val)], result });
            IrOperand::Value(result)
        }
        _ => IrOperand::Const(IrConst::NullPtr),
    }
}

fn lower_block_expr(fb: &mut FunctionBuilder, ctx: &mut FunctionContext, statements: &[Statement], result: &Expression) -> IrOperand {
    ctx.scope.push();
    for stmt in statements {
        crate::lower::stmt::lower_statement(fb, ctx, stmt);
    }
    let value = lower_expr(fb, ctx, result);
    ctx.scope.pop();
    value
}
