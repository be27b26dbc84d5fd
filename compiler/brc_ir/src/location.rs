//! Source locations.

use std::fmt;
use std::rc::Rc;

/// A position in a source file: file name, 0-based line, 0-based column.
///
/// `file` is a reference-counted string so every token in a file can share
/// the same allocation instead of cloning the file name per-token.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Location {
    pub file: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    #[inline]
    pub fn new(file: Rc<str>, line: u32, column: u32) -> Self {
        Location { file, line, column }
    }

    /// Location for generated/synthesized nodes with no real source position.
    pub fn synthetic(file: Rc<str>) -> Self {
        Location { file, line: 0, column: 0 }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line + 1, self.column + 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file {}, line {}, column {}",
            self.file,
            self.line + 1,
            self.column + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based() {
        let loc = Location::new(Rc::from("a.brc"), 0, 0);
        assert_eq!(format!("{loc}"), "file a.brc, line 1, column 1");
    }
}
