//! Diagnostic kinds and the `Error` value that carries one
//! plus its source location.

use brc_ir::{Location, TokenKind, ValueType};
use std::rc::Rc;
use thiserror::Error as ThisError;

/// A named sub-grammar the parser expected at a given point — shows up in
/// parser diagnostics as a recognizable noun, e.g. "expected parsee
/// `blob field`".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parsee(pub &'static str);

#[derive(Clone, Debug, ThisError)]
pub enum SemanticErrorKind {
    #[error("invalid type: {0}")]
    InvalidType(String),
    #[error("invalid cast from {from} to {to}")]
    InvalidCast { from: ValueType, to: ValueType },
    #[error("invalid built-in `{0}`")]
    InvalidBuiltIn(Rc<str>),
    #[error("invalid operation for type(s): {0}")]
    InvalidOperation(String),
    #[error("\"{0}\" not defined")]
    UnknownIdentifier(Rc<str>),
    #[error("duplicate definition of \"{0}\"")]
    DuplicateDefinition(Rc<str>),
    #[error("invalid import \"{0}\"")]
    InvalidImport(Rc<str>),
    #[error("invalid arguments count: expected {expected}, found {found}")]
    InvalidArgumentsCount { expected: usize, found: usize },
}

#[derive(Clone, Debug, ThisError)]
pub enum BuilderErrorKind {
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),
    #[error("invalid constant in global initializer for \"{0}\"")]
    InvalidConstantInitializer(Rc<str>),
    #[error("invalid constraints for raw function \"{0}\": {1}")]
    InvalidRawConstraints(Rc<str>, String),
    #[error("\"{0}\" not declared")]
    NotDeclared(Rc<str>),
    #[error("\"{0}\" not defined")]
    NotDefined(Rc<str>),
    #[error("no type for pointer in \"{0}\"")]
    NoTypeForPointer(Rc<str>),
}

#[derive(Clone, Debug, ThisError)]
pub enum ErrorKind {
    #[error("Unexpected token \"{0}\"")]
    Lexer(char),

    #[error("parser error")]
    Parser {
        found: TokenKind,
        found_lexeme: Rc<str>,
        expected_token: Option<TokenKind>,
        expected_parsee: Option<Parsee>,
        message: Option<String>,
    },

    #[error(transparent)]
    Semantic(#[from] SemanticErrorKind),

    #[error(transparent)]
    Builder(#[from] BuilderErrorKind),

    #[error("Building module \"{module_name}\" failed: {message}")]
    ModuleVerification { module_name: Rc<str>, message: String },

    #[error("Building function \"{function_name}\" failed: {message}")]
    FunctionVerification { function_name: Rc<str>, message: String },
}

/// One diagnostic: a kind plus where it happened. Accumulated per-phase,
/// never short-circuiting.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub location: Location,
}

impl Error {
    pub fn new(kind: ErrorKind, location: Location) -> Self {
        Error { kind, location }
    }

    pub fn lexer(found: char, location: Location) -> Self {
        Error::new(ErrorKind::Lexer(found), location)
    }

    pub fn parser(
        found: TokenKind,
        found_lexeme: Rc<str>,
        expected_token: Option<TokenKind>,
        expected_parsee: Option<Parsee>,
        message: Option<String>,
        location: Location,
    ) -> Self {
        Error::new(
            ErrorKind::Parser {
                found,
                found_lexeme,
                expected_token,
                expected_parsee,
                message,
            },
            location,
        )
    }

    pub fn semantic(kind: SemanticErrorKind, location: Location) -> Self {
        Error::new(ErrorKind::Semantic(kind), location)
    }

    pub fn builder(kind: BuilderErrorKind, location: Location) -> Self {
        Error::new(ErrorKind::Builder(kind), location)
    }

    pub fn module_verification(module_name: Rc<str>, message: String, location: Location) -> Self {
        Error::new(ErrorKind::ModuleVerification { module_name, message }, location)
    }

    pub fn function_verification(function_name: Rc<str>, message: String, location: Location) -> Self {
        Error::new(ErrorKind::FunctionVerification { function_name, message }, location)
    }
}
