//! Diagnostics for the BRC compiler: error kinds, a phase-scoped
//! accumulator, and the logger that renders them.

mod error;
mod logger;

pub use error::{BuilderErrorKind, Error, ErrorKind, Parsee, SemanticErrorKind};
pub use logger::{token_kind_symbol, Logger, Verbosity};

/// Errors accumulated over one phase (lexer, parser, analyzer, or module
/// builder run). Every phase collects into one of these and only aborts
/// at its own end if it ends up non-empty.
#[derive(Default, Debug)]
pub struct Diagnostics {
    errors: Vec<Error>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<Error> {
        self.errors
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl FromIterator<Error> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Error>>(iter: T) -> Self {
        Diagnostics {
            errors: iter.into_iter().collect(),
        }
    }
}

/// Internal, non-diagnostic failures (I/O, invariant violations) that are
/// not part of the collect-and-continue model.
#[derive(Debug, thiserror::Error)]
pub enum BrcError {
    #[error("cannot open file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Other(String),
}
