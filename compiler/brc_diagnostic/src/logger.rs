//! Human-facing diagnostic/trace printer.
//!
//! Every diagnostic is prefixed with 🔥 and locations print as
//! `file F, line L, column C` (1-based).

use crate::error::{BuilderErrorKind, Error, ErrorKind, SemanticErrorKind};
use brc_ir::{PrimitiveTypeName, TokenKind};
use std::fmt::Write as _;

/// Verbosity levels: v0 errors only, v1 + phase status (default), v2 +
/// timings, v3 + token/AST dumps.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug, Default)]
pub enum Verbosity {
    V0,
    #[default]
    V1,
    V2,
    V3,
}

#[derive(Default)]
pub struct Logger {
    pub verbosity: Verbosity,
}

impl Logger {
    pub fn new(verbosity: Verbosity) -> Self {
        Logger { verbosity }
    }

    /// Render one diagnostic as a single, emoji-prefixed line.
    pub fn format_error(&self, error: &Error) -> String {
        let location = &error.location;
        match &error.kind {
            ErrorKind::Lexer(found) => {
                format!("🔥 In {location}: Unexpected token \"{found}\"")
            }
            ErrorKind::Parser {
                found,
                found_lexeme,
                expected_token,
                expected_parsee,
                message,
            } => {
                let mut text = if let Some(parsee) = expected_parsee {
                    format!(
                        "🔥 In {location}: Expected parsee {} but found {} instead",
                        parsee.0,
                        token_kind_symbol(found, found_lexeme)
                    )
                } else if let Some(expected) = expected_token {
                    format!(
                        "🔥 In {location}: Expected token {} but found {} instead",
                        token_kind_symbol(expected, found_lexeme),
                        token_kind_symbol(found, found_lexeme)
                    )
                } else {
                    format!(
                        "🔥 In {location}: Unexpected token {} found",
                        token_kind_symbol(found, found_lexeme)
                    )
                };
                if let Some(message) = message {
                    let _ = write!(text, ". {message}");
                }
                text
            }
            ErrorKind::Semantic(kind) => format!("🔥 In {location}: {}", semantic_message(kind)),
            ErrorKind::Builder(kind) => format!("🔥 At {location}: {}", builder_message(kind)),
            ErrorKind::ModuleVerification { module_name, message } => {
                format!("🔥 Building module \"{module_name}\" failed: {message}")
            }
            ErrorKind::FunctionVerification { function_name, message } => {
                format!("🔥 Building function \"{function_name}\" failed: {message}")
            }
        }
    }

    pub fn print_error(&self, error: &Error) {
        println!("{}", self.format_error(error));
    }

    /// Print every accumulated error in a phase, in order.
    pub fn print_errors<'a>(&self, errors: impl IntoIterator<Item = &'a Error>) {
        for error in errors {
            self.print_error(error);
        }
    }

    pub fn print_phase_status(&self, phase: &str) {
        if self.verbosity >= Verbosity::V1 {
            println!("-- {phase}");
        }
    }

    pub fn print_phase_timing(&self, phase: &str, millis: f64) {
        if self.verbosity >= Verbosity::V2 {
            println!("-- {phase} took {millis:.3}ms");
        }
    }

    pub fn dumps_enabled(&self) -> bool {
        self.verbosity >= Verbosity::V3
    }
}

fn semantic_message(kind: &SemanticErrorKind) -> String {
    match kind {
        SemanticErrorKind::InvalidType(msg) => format!("Invalid type: {msg}"),
        SemanticErrorKind::InvalidCast { from, to } => format!("Invalid cast from {from} to {to}"),
        SemanticErrorKind::InvalidBuiltIn(name) => format!("Invalid built-in `{name}`"),
        SemanticErrorKind::InvalidOperation(msg) => format!("Invalid operation for type(s): {msg}"),
        SemanticErrorKind::UnknownIdentifier(name) => format!("\"{name}\" not defined"),
        SemanticErrorKind::DuplicateDefinition(name) => format!("Duplicate definition of \"{name}\""),
        SemanticErrorKind::InvalidImport(name) => format!("Invalid import \"{name}\""),
        SemanticErrorKind::InvalidArgumentsCount { expected, found } => {
            format!("Invalid arguments count: expected {expected}, found {found}")
        }
    }
}

fn builder_message(kind: &BuilderErrorKind) -> String {
    match kind {
        BuilderErrorKind::InvalidAssignment(msg) => format!("Invalid assignment: {msg}"),
        BuilderErrorKind::InvalidConstantInitializer(name) => {
            format!("Invalid constant in global initializer for \"{name}\"")
        }
        BuilderErrorKind::InvalidRawConstraints(name, msg) => {
            format!("Invalid constraints for raw function \"{name}\": {msg}")
        }
        BuilderErrorKind::NotDeclared(name) => format!("\"{name}\" not declared"),
        BuilderErrorKind::NotDefined(name) => format!("\"{name}\" not defined"),
        BuilderErrorKind::NoTypeForPointer(name) => format!("No type for pointer in \"{name}\""),
    }
}

/// Symbolic rendering of a token kind (e.g. `!=` renders as its operator
/// glyph rather than a variant name).
pub fn token_kind_symbol(kind: &TokenKind, lexeme: &str) -> String {
    match kind {
        TokenKind::Plus => "+".into(),
        TokenKind::Minus => "-".into(),
        TokenKind::Star => "*".into(),
        TokenKind::Slash => "/".into(),
        TokenKind::Percent => "%".into(),
        TokenKind::Or => "OR".into(),
        TokenKind::Xor => "XOR".into(),
        TokenKind::And => "AND".into(),
        TokenKind::Not => "NOT".into(),
        TokenKind::BitOr => "|".into(),
        TokenKind::BitXor => "^".into(),
        TokenKind::BitAnd => "&".into(),
        TokenKind::BitNot => "~".into(),
        TokenKind::Shl => "<<".into(),
        TokenKind::Shr => ">>".into(),
        TokenKind::Equal => "=".into(),
        TokenKind::NotEqual => "≠".into(),
        TokenKind::Less => "<".into(),
        TokenKind::LessEqual => "≤".into(),
        TokenKind::Greater => ">".into(),
        TokenKind::GreaterEqual => "≥".into(),
        TokenKind::LParen => "(".into(),
        TokenKind::RParen => ")".into(),
        TokenKind::LBracket => "[".into(),
        TokenKind::RBracket => "]".into(),
        TokenKind::LBrace => "{".into(),
        TokenKind::RBrace => "}".into(),
        TokenKind::Comma => ",".into(),
        TokenKind::Colon => ":".into(),
        TokenKind::Semicolon => ";".into(),
        TokenKind::Assign => "<-".into(),
        TokenKind::RetArrow => "->".into(),
        TokenKind::Dot => ".".into(),
        TokenKind::Question => "?".into(),
        TokenKind::DoubleQuestion => "??".into(),
        TokenKind::Function => "fun".into(),
        TokenKind::Data => "data".into(),
        TokenKind::Blob => "blob".into(),
        TokenKind::Ptr => "ptr".into(),
        TokenKind::Return => "ret".into(),
        TokenKind::Repeat => "rep".into(),
        TokenKind::If => "if".into(),
        TokenKind::Else => "else".into(),
        TokenKind::MetaModule => "@module".into(),
        TokenKind::MetaImport => "@import".into(),
        TokenKind::MetaExport => "@export".into(),
        TokenKind::MetaExtern => "@extern".into(),
        TokenKind::At => "@".into(),
        TokenKind::NewLine => "NEW_LINE".into(),
        TokenKind::End => "END".into(),
        TokenKind::Bool(v) => v.to_string(),
        TokenKind::IntegerDec(v) | TokenKind::IntegerHex(v) | TokenKind::IntegerBin(v) => v.to_string(),
        TokenKind::IntegerChar(v) => format!("'{}'", char::from_u32(*v).unwrap_or('\u{FFFD}')),
        TokenKind::Float(v) => v.to_string(),
        TokenKind::String(s) => format!("\"{s}\""),
        TokenKind::Identifier(_) => lexeme.to_string(),
        TokenKind::Type(t) => primitive_type_symbol(*t).to_string(),
        TokenKind::Invalid(c) => c.to_string(),
    }
}

fn primitive_type_symbol(t: PrimitiveTypeName) -> &'static str {
    PrimitiveTypeName::ALL
        .iter()
        .find(|(_, kind)| *kind == t)
        .map(|(name, _)| *name)
        .unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use brc_ir::Location;
    use std::rc::Rc;

    #[test]
    fn lexer_error_has_emoji_prefix_and_location() {
        let logger = Logger::default();
        let err = Error::lexer('$', Location::new(Rc::from("a.brc"), 0, 2));
        let text = logger.format_error(&err);
        assert_eq!(text, "🔥 In file a.brc, line 1, column 3: Unexpected token \"$\"");
    }

    #[test]
    fn unknown_identifier_matches_original_wording() {
        let logger = Logger::default();
        let err = Error::semantic(
            SemanticErrorKind::UnknownIdentifier(Rc::from("zzz")),
            Location::new(Rc::from("a.brc"), 0, 4),
        );
        assert!(logger.format_error(&err).ends_with("\"zzz\" not defined"));
    }
}
