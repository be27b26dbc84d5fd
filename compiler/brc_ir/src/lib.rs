//! Core data types shared across every phase of the BRC compiler:
//! locations, tokens, value types, the expression/statement AST, and the
//! per-module statement sets produced by module assembly.

mod expr;
mod location;
mod module;
mod stmt;
mod token;
mod value_type;

pub use expr::{literal_uint_value, BinaryOp, ExprKind, Expression, LiteralValue, UnaryOp, ValueSubKind};
pub use location::Location;
pub use module::{ExportedHeaderMap, Module, DEFAULT_MODULE_NAME};
pub use stmt::{BlobField, FunctionArg, Statement};
pub use token::{PrimitiveTypeName, Token, TokenKind};
pub use value_type::ValueType;
