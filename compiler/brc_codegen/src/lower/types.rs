//! `ValueType` → `IrType`.

use crate::ir::IrType;
use brc_ir::{literal_uint_value, ValueType};

/// Target pointer width in bits. `brcc` threads the driver's requested
/// triple through to a real backend; `brc_codegen` itself only needs one
/// width to size `A`/`PTR` and to give the `INT` literal type a concrete
/// platform width.
pub const POINTER_WIDTH: u32 = 64;

/// Lowers one `ValueType` by direct correspondence:
/// NONE → void; BOOL → i1; `Uk`/`Sk` → ik (signedness is operational, not
/// type-level); F32/F64 → float/double; A → pointer-width integer;
/// PTR(_) → opaque pointer; DATA(sub, n) → array of sub sized n (n is the
/// count expression's reduced literal value); BLOB(name) → the named
/// struct type; FUN(args, ret) → function type.
pub fn lower_type(value_type: &ValueType) -> IrType {
    match value_type {
        ValueType::None => IrType::Void,
        ValueType::Bool => IrType::Bool,
        ValueType::Int | ValueType::U64 | ValueType::S64 => IrType::Int(POINTER_WIDTH.max(64)),
        ValueType::U32 | ValueType::S32 => IrType::Int(32),
        ValueType::U8 | ValueType::S8 => IrType::Int(8),
        ValueType::Float | ValueType::F64 => IrType::F64,
        ValueType::F32 => IrType::F32,
        ValueType::A => IrType::Addr,
        ValueType::Ptr(_) => IrType::Ptr,
        ValueType::Data(sub, count) => {
            let n = literal_uint_value(count).unwrap_or(0);
            IrType::Array(Box::new(lower_type(sub)), usize::try_from(n).unwrap_or(0))
        }
        ValueType::Blob(name) => IrType::Struct(name.clone()),
        ValueType::Fun(args, ret) => IrType::Function(args.iter().map(lower_type).collect(), Box::new(lower_type(ret))),
        ValueType::Composite(elems, count) => {
            // A COMPOSITE reaching codegen without having been promoted by
            // the analyzer has no structural IR
            // counterpart; lower it as the array-of-first-element shape so
            // the builder at least has something concrete to allocate.
            let elem = elems.first().map_or(IrType::Void, lower_type);
            IrType::Array(Box::new(elem), *count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brc_ir::Expression;
    use std::rc::Rc;

    fn literal_count(n: u64) -> Expression {
        Expression::new(brc_ir::ExprKind::Literal(brc_ir::LiteralValue::Int(n)), brc_ir::Location::new(Rc::from("t.brc"), 0, 0))
    }

    #[test]
    fn scalar_widths() {
        assert_eq!(lower_type(&ValueType::Bool), IrType::Bool);
        assert_eq!(lower_type(&ValueType::U8), IrType::Int(8));
        assert_eq!(lower_type(&ValueType::S32), IrType::Int(32));
        assert_eq!(lower_type(&ValueType::F32), IrType::F32);
        assert_eq!(lower_type(&ValueType::F64), IrType::F64);
        assert_eq!(lower_type(&ValueType::A), IrType::Addr);
    }

    #[test]
    fn data_lowers_to_sized_array() {
        let ty = ValueType::Data(Box::new(ValueType::S32), Box::new(literal_count(4)));
        assert_eq!(lower_type(&ty), IrType::Array(Box::new(IrType::Int(32)), 4));
    }

    #[test]
    fn blob_lowers_to_named_struct() {
        let ty = ValueType::Blob(Rc::from("point"));
        assert_eq!(lower_type(&ty), IrType::Struct(Rc::from("point")));
    }

    #[test]
    fn fun_lowers_to_function_type() {
        let ty = ValueType::Fun(vec![ValueType::S32], Box::new(ValueType::Bool));
        assert_eq!(lower_type(&ty), IrType::Function(vec![IrType::Int(32)], Box::new(IrType::Bool)));
    }
}
