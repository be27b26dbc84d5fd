//! Tokenizer: converts a UTF-8 source buffer into a stream of `Token`s
//! ending in `End`.

mod cursor;

use brc_diagnostic::Error;
use brc_ir::{Location, PrimitiveTypeName, Token, TokenKind};
use cursor::Cursor;
use std::rc::Rc;

/// Fixed keyword/operator-word/primitive-type table, all matched with the
/// same separator-bounded rule. Longest-lexeme-first order doesn't matter
/// here: every entry is a distinct whole word.
fn word_table() -> Vec<(&'static str, TokenKind)> {
    let mut table = vec![
        ("fun", TokenKind::Function),
        ("ret", TokenKind::Return),
        ("rep", TokenKind::Repeat),
        ("if", TokenKind::If),
        ("else", TokenKind::Else),
        ("data", TokenKind::Data),
        ("blob", TokenKind::Blob),
        ("ptr", TokenKind::Ptr),
        ("or", TokenKind::Or),
        ("xor", TokenKind::Xor),
        ("and", TokenKind::And),
        ("not", TokenKind::Not),
    ];
    for (lexeme, kind) in PrimitiveTypeName::ALL {
        table.push((lexeme, TokenKind::Type(*kind)));
    }
    table
}

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    file: Rc<str>,
    tokens: Vec<Token>,
    last_was_newline: bool,
    words: Vec<(&'static str, TokenKind)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: impl Into<Rc<str>>) -> Self {
        Lexer {
            cursor: Cursor::new(source),
            file: file.into(),
            tokens: Vec::new(),
            last_was_newline: false,
            words: word_table(),
        }
    }

    fn here(&self) -> Location {
        Location::new(self.file.clone(), self.cursor.line(), self.cursor.column())
    }

    fn emit(&mut self, kind: TokenKind, lexeme: &str, location: Location) {
        self.last_was_newline = matches!(kind, TokenKind::NewLine);
        self.tokens.push(Token::new(kind, lexeme, location));
    }

    /// Run the lexer to completion. On success returns the full token
    /// stream (always ending in `End`); on the first unmatched character
    /// or unterminated block comment, returns a single `Error` and no
    /// tokens — the lexer does not recover.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        loop {
            self.skip_horizontal_whitespace();

            if self.cursor.is_at_end() {
                let loc = self.here();
                self.emit(TokenKind::End, "", loc);
                return Ok(self.tokens);
            }

            if self.try_line_comment() {
                continue;
            }

            match self.try_block_comment()? {
                BlockCommentResult::NotAComment => {}
                BlockCommentResult::Consumed => continue,
            }

            if self.try_multi_char_punct() {
                continue;
            }
            if self.try_single_char_punct() {
                continue;
            }
            if self.try_word() {
                continue;
            }
            if self.try_bool_literal() {
                continue;
            }
            if self.try_real_literal() {
                continue;
            }
            if self.try_hex_literal() {
                continue;
            }
            if self.try_bin_literal() {
                continue;
            }
            if self.try_decimal_literal() {
                continue;
            }
            if self.try_char_literal()? {
                continue;
            }
            if self.try_string_literal()? {
                continue;
            }
            if self.try_identifier() {
                continue;
            }
            if self.try_meta_marker() {
                continue;
            }
            if self.try_newline() {
                continue;
            }

            let c = self.cursor.peek().unwrap_or_else(|| unreachable!("loop only reaches here when not at end"));
            let loc = self.here();
            return Err(Error::lexer(c, loc));
        }
    }

    fn skip_horizontal_whitespace(&mut self) {
        while matches!(self.cursor.peek(), Some(' ') | Some('\t')) {
            self.cursor.advance(1);
        }
    }

    fn try_line_comment(&mut self) -> bool {
        if self.cursor.peek() == Some('/') && self.cursor.peek_at(1) == Some('/') {
            while !self.cursor.is_at_end() && self.cursor.peek() != Some('\n') {
                self.cursor.advance(1);
            }
            true
        } else {
            false
        }
    }

    fn try_block_comment(&mut self) -> Result<BlockCommentResult, Error> {
        if !(self.cursor.peek() == Some('/') && self.cursor.peek_at(1) == Some('*')) {
            return Ok(BlockCommentResult::NotAComment);
        }
        let start_loc = self.here();
        self.cursor.advance(2);
        let mut depth = 1usize;
        let mut first_newline_loc: Option<Location> = None;

        while depth > 0 {
            if self.cursor.is_at_end() {
                return Err(Error::lexer('\0', start_loc));
            }
            if self.cursor.peek() == Some('/') && self.cursor.peek_at(1) == Some('*') {
                depth += 1;
                self.cursor.advance(2);
                continue;
            }
            if self.cursor.peek() == Some('*') && self.cursor.peek_at(1) == Some('/') {
                depth -= 1;
                self.cursor.advance(2);
                continue;
            }
            if self.cursor.peek() == Some('\n') && first_newline_loc.is_none() {
                first_newline_loc = Some(self.here());
            }
            self.cursor.advance(1);
        }

        if let Some(loc) = first_newline_loc {
            if !self.last_was_newline {
                self.emit(TokenKind::NewLine, "\n", loc);
            }
        }
        Ok(BlockCommentResult::Consumed)
    }

    fn try_multi_char_punct(&mut self) -> bool {
        const TWO_CHAR: &[(char, char, &str, TokenKind)] = &[
            ('<', '=', "<=", TokenKind::LessEqual),
            ('>', '=', ">=", TokenKind::GreaterEqual),
            ('!', '=', "!=", TokenKind::NotEqual),
            ('?', '?', "??", TokenKind::DoubleQuestion),
            ('<', '-', "<-", TokenKind::Assign),
            ('-', '>', "->", TokenKind::RetArrow),
            ('<', '<', "<<", TokenKind::Shl),
            ('>', '>', ">>", TokenKind::Shr),
        ];
        for (a, b, lexeme, kind) in TWO_CHAR {
            if self.cursor.peek() == Some(*a) && self.cursor.peek_at(1) == Some(*b) {
                let loc = self.here();
                self.cursor.advance(2);
                self.emit(kind.clone(), lexeme, loc);
                return true;
            }
        }
        false
    }

    fn try_single_char_punct(&mut self) -> bool {
        let Some(c) = self.cursor.peek() else { return false };
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '|' => TokenKind::BitOr,
            '^' => TokenKind::BitXor,
            '&' => TokenKind::BitAnd,
            '~' => TokenKind::BitNot,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            '=' => TokenKind::Equal,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            _ => return false,
        };
        let loc = self.here();
        let lexeme = c.to_string();
        self.cursor.advance(1);
        self.emit(kind, &lexeme, loc);
        true
    }

    fn try_word(&mut self) -> bool {
        let Some(ident_end) = self.identifier_shaped_len() else {
            return false;
        };
        let lexeme = self.cursor.slice_from_len(ident_end);
        for (word, kind) in self.words.clone() {
            if lexeme == word && self.cursor.is_separator_at(ident_end) {
                let loc = self.here();
                self.cursor.advance(ident_end);
                self.emit(kind, word, loc);
                return true;
            }
        }
        false
    }

    fn try_bool_literal(&mut self) -> bool {
        for (word, value) in [("true", true), ("false", false)] {
            let len = word.chars().count();
            if self.matches_word(word) && self.cursor.is_separator_at(len) {
                let loc = self.here();
                self.cursor.advance(len);
                self.emit(TokenKind::Bool(value), word, loc);
                return true;
            }
        }
        false
    }

    fn matches_word(&self, word: &str) -> bool {
        word.chars()
            .enumerate()
            .all(|(i, c)| self.cursor.peek_at(i) == Some(c))
    }

    fn try_real_literal(&mut self) -> bool {
        // digits '.' digits, optional underscores, no exponent.
        let mut len = 0;
        while matches!(self.cursor.peek_at(len), Some(c) if c.is_ascii_digit() || c == '_') {
            len += 1;
        }
        if len == 0 || self.cursor.peek_at(len) != Some('.') {
            return false;
        }
        let int_part_len = len;
        let mut frac_len = 0;
        while matches!(self.cursor.peek_at(len + 1 + frac_len), Some(c) if c.is_ascii_digit() || c == '_') {
            frac_len += 1;
        }
        if frac_len == 0 {
            return false; // bare trailing dot isn't a float literal
        }
        let total = int_part_len + 1 + frac_len;
        let loc = self.here();
        let lexeme = self.cursor.slice_from_len(total);
        let cleaned: String = lexeme.chars().filter(|c| *c != '_').collect();
        let value: f64 = cleaned.parse().unwrap_or(0.0);
        self.cursor.advance(total);
        self.emit(TokenKind::Float(value), lexeme, loc);
        true
    }

    fn try_hex_literal(&mut self) -> bool {
        if !(self.cursor.peek() == Some('0') && self.cursor.peek_at(1) == Some('x')) {
            return false;
        }
        let mut len = 2;
        while matches!(self.cursor.peek_at(len), Some(c) if c.is_ascii_hexdigit() || c == '_') {
            len += 1;
        }
        if len == 2 {
            return false;
        }
        let loc = self.here();
        let lexeme = self.cursor.slice_from_len(len);
        let digits: String = lexeme[2..].chars().filter(|c| *c != '_').collect();
        let value = u64::from_str_radix(&digits, 16).unwrap_or(0);
        self.cursor.advance(len);
        self.emit(TokenKind::IntegerHex(value), lexeme, loc);
        true
    }

    fn try_bin_literal(&mut self) -> bool {
        if !(self.cursor.peek() == Some('0') && self.cursor.peek_at(1) == Some('b')) {
            return false;
        }
        let mut len = 2;
        while matches!(self.cursor.peek_at(len), Some(c) if c == '0' || c == '1' || c == '_') {
            len += 1;
        }
        if len == 2 {
            return false;
        }
        let loc = self.here();
        let lexeme = self.cursor.slice_from_len(len);
        let digits: String = lexeme[2..].chars().filter(|c| *c != '_').collect();
        let value = u64::from_str_radix(&digits, 2).unwrap_or(0);
        self.cursor.advance(len);
        self.emit(TokenKind::IntegerBin(value), lexeme, loc);
        true
    }

    fn try_decimal_literal(&mut self) -> bool {
        let mut len = 0;
        while matches!(self.cursor.peek_at(len), Some(c) if c.is_ascii_digit() || c == '_') {
            len += 1;
        }
        if len == 0 {
            return false;
        }
        let loc = self.here();
        let lexeme = self.cursor.slice_from_len(len);
        let digits: String = lexeme.chars().filter(|c| *c != '_').collect();
        let value: u64 = digits.parse().unwrap_or(0);
        self.cursor.advance(len);
        self.emit(TokenKind::IntegerDec(value), lexeme, loc);
        true
    }

    fn try_char_literal(&mut self) -> Result<bool, Error> {
        if self.cursor.peek() != Some('\'') {
            return Ok(false);
        }
        let loc = self.here();
        let start = self.cursor.index();
        self.cursor.advance(1);
        let value = match self.cursor.peek() {
            Some('\\') => {
                self.cursor.advance(1);
                let escaped = self.cursor.peek().unwrap_or('\0');
                self.cursor.advance(1);
                match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                }
            }
            Some(c) => {
                self.cursor.advance(1);
                c
            }
            None => return Err(Error::lexer('\'', loc)),
        };
        if self.cursor.peek() != Some('\'') {
            return Err(Error::lexer('\'', loc));
        }
        self.cursor.advance(1);
        let lexeme = self.cursor.slice_from(start);
        self.emit(TokenKind::IntegerChar(value as u32), lexeme, loc);
        Ok(true)
    }

    fn try_string_literal(&mut self) -> Result<bool, Error> {
        if self.cursor.peek() != Some('"') {
            return Ok(false);
        }
        let loc = self.here();
        self.cursor.advance(1);
        let mut content = String::new();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => return Err(Error::lexer('"', loc)),
                Some('"') => {
                    self.cursor.advance(1);
                    break;
                }
                Some('\\') => {
                    self.cursor.advance(1);
                    let escaped = self.cursor.peek().unwrap_or('\0');
                    content.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                    self.cursor.advance(1);
                }
                Some(c) => {
                    content.push(c);
                    self.cursor.advance(1);
                }
            }
        }
        self.emit(TokenKind::String(Rc::from(content.as_str())), &content, loc);
        Ok(true)
    }

    fn identifier_shaped_len(&self) -> Option<usize> {
        let first = self.cursor.peek()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        let mut len = 1;
        while matches!(self.cursor.peek_at(len), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            len += 1;
        }
        Some(len)
    }

    fn try_identifier(&mut self) -> bool {
        let Some(len) = self.identifier_shaped_len() else {
            return false;
        };
        let loc = self.here();
        let lexeme = self.cursor.slice_from_len(len);
        let name: Rc<str> = Rc::from(lexeme);
        self.cursor.advance(len);
        self.emit(TokenKind::Identifier(name), lexeme, loc);
        true
    }

    fn try_meta_marker(&mut self) -> bool {
        if self.cursor.peek() != Some('@') {
            return false;
        }
        const MARKERS: &[(&str, TokenKind)] = &[
            ("@module", TokenKind::MetaModule),
            ("@import", TokenKind::MetaImport),
            ("@export", TokenKind::MetaExport),
            ("@extern", TokenKind::MetaExtern),
        ];
        for (word, kind) in MARKERS {
            if self.matches_word(word) {
                let len = word.chars().count();
                if self.cursor.is_separator_at(len) {
                    let loc = self.here();
                    self.cursor.advance(len);
                    self.emit(kind.clone(), word, loc);
                    return true;
                }
            }
        }
        let loc = self.here();
        self.cursor.advance(1);
        self.emit(TokenKind::At, "@", loc);
        true
    }

    fn try_newline(&mut self) -> bool {
        if self.cursor.peek() != Some('\n') {
            return false;
        }
        let loc = self.here();
        self.cursor.advance(1);
        if !self.last_was_newline {
            self.emit(TokenKind::NewLine, "\n", loc);
        }
        true
    }
}

enum BlockCommentResult {
    NotAComment,
    Consumed,
}

/// Tokenize `source` (from file `file`) to completion.
pub fn tokenize(source: &str, file: impl Into<Rc<str>>) -> Result<Vec<Token>, Error> {
    Lexer::new(source, file).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src, "t.brc").unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn ends_in_end() {
        assert!(matches!(kinds("")[0], TokenKind::End));
    }

    #[test]
    fn collapses_consecutive_newlines() {
        let ks = kinds("a\n\n\nb");
        let newline_count = ks.iter().filter(|k| matches!(k, TokenKind::NewLine)).count();
        assert_eq!(newline_count, 1);
    }

    #[test]
    fn block_comment_newline_after_newline_does_not_duplicate() {
        let ks = kinds("a\n/* x\ny */ b");
        let newline_count = ks.iter().filter(|k| matches!(k, TokenKind::NewLine)).count();
        assert_eq!(newline_count, 1);
        assert!(matches!(ks[0], TokenKind::Identifier(_)));
        assert!(matches!(ks[1], TokenKind::NewLine));
        assert!(matches!(ks[2], TokenKind::Identifier(_)));
    }

    #[test]
    fn nested_block_comments_balance() {
        let ks = kinds("/* /* */ */ a");
        assert!(matches!(ks[0], TokenKind::Identifier(_)));
    }

    #[test]
    fn unterminated_nested_block_comment_errors() {
        let err = tokenize("/* /* */", "t.brc").unwrap_err();
        assert_eq!(err.location.column, 0);
    }

    #[test]
    fn keywords_require_separator() {
        let ks = kinds("iffy");
        assert!(matches!(ks[0], TokenKind::Identifier(_)));
    }

    #[test]
    fn multi_char_before_single() {
        let ks = kinds("<= <- ->");
        assert!(matches!(ks[0], TokenKind::LessEqual));
        assert!(matches!(ks[1], TokenKind::Assign));
        assert!(matches!(ks[2], TokenKind::RetArrow));
    }

    #[test]
    fn hex_and_bin_and_underscore_literals() {
        let ks = kinds("0x1_0 0b1_1 1_000");
        assert!(matches!(ks[0], TokenKind::IntegerHex(0x10)));
        assert!(matches!(ks[1], TokenKind::IntegerBin(0b11)));
        assert!(matches!(ks[2], TokenKind::IntegerDec(1000)));
    }

    #[test]
    fn logical_words_are_separate_from_identifiers() {
        let ks = kinds("a or b");
        assert!(matches!(ks[0], TokenKind::Identifier(_)));
        assert!(matches!(ks[1], TokenKind::Or));
    }

    proptest::proptest! {
        #[test]
        fn totality_ends_in_end_or_errors(s in "[ -~\\n]{0,64}") {
            match tokenize(&s, "fuzz.brc") {
                Ok(tokens) => proptest::prop_assert!(matches!(tokens.last().unwrap().kind, TokenKind::End)),
                Err(_) => {}
            }
        }

        #[test]
        fn no_consecutive_newlines_around_commented_newlines(
            pre_newlines in 0u8..4,
            comment_body in "[a-z ]{0,8}",
            post_newlines in 0u8..4,
        ) {
            let mut src = "a".to_string();
            src.push_str(&"\n".repeat(pre_newlines as usize));
            src.push_str("/* ");
            src.push_str(&comment_body);
            src.push('\n');
            src.push_str(&comment_body);
            src.push_str(" */");
            src.push_str(&"\n".repeat(post_newlines as usize));
            src.push('b');
            if let Ok(tokens) = tokenize(&src, "fuzz.brc") {
                let mut prev_was_newline = false;
                for token in &tokens {
                    let is_newline = matches!(token.kind, TokenKind::NewLine);
                    proptest::prop_assert!(!(is_newline && prev_was_newline));
                    prev_was_newline = is_newline;
                }
            }
        }
    }
}
