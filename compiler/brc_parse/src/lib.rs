//! Recursive-descent parser: Token stream → per-file statement lists.
//!
//! Output is intentionally *not* a full `Module` — declaration synthesis
//! and exported-header qualification are `brc_modules`' job. The parser
//! only knows how to split what's literally written in one file into a
//! header list (imports, externs, blob definitions) and a body list
//! (variable/function/raw-function definitions).

mod stack;

use brc_diagnostic::{Error, Parsee};
use brc_ir::{
    BinaryOp, BlobField, Expression, ExprKind, FunctionArg, LiteralValue, Location, Statement,
    Token, TokenKind, UnaryOp, ValueSubKind, ValueType, DEFAULT_MODULE_NAME,
};
use std::rc::Rc;

/// One file's parsed statements, already split into header/body, plus the
/// module name declared by an optional leading `@module` directive.
#[derive(Debug)]
pub struct ParsedModule {
    pub name: Rc<str>,
    pub header: Vec<Statement>,
    pub body: Vec<Statement>,
}

pub fn parse(tokens: &[Token]) -> Result<ParsedModule, Error> {
    Parser::new(tokens).parse_module()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

fn starts_type(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Type(_) | TokenKind::Identifier(_) | TokenKind::Data | TokenKind::Ptr | TokenKind::Function
    )
}

fn is_raw_keyword(kind: &TokenKind) -> bool {
    matches!(kind, TokenKind::Identifier(word) if &**word == "raw")
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn is_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::End)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, TokenKind::NewLine) {
            self.advance();
        }
    }

    fn expect(&mut self, want: TokenKind, parsee: Option<Parsee>) -> Result<Token, Error> {
        if self.peek().kind == want {
            Ok(self.advance())
        } else {
            Err(self.error_here(Some(want), parsee))
        }
    }

    fn expect_identifier(&mut self) -> Result<(Rc<str>, Location), Error> {
        match self.peek().kind.clone() {
            TokenKind::Identifier(name) => {
                let loc = self.peek().location.clone();
                self.advance();
                Ok((name, loc))
            }
            _ => Err(self.error_here(None, Some(Parsee("identifier")))),
        }
    }

    fn expect_string(&mut self) -> Result<Rc<str>, Error> {
        match self.peek().kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.error_here(None, Some(Parsee("string literal")))),
        }
    }

    fn error_here(&self, expected_token: Option<TokenKind>, expected_parsee: Option<Parsee>) -> Error {
        let tok = self.peek();
        Error::parser(
            tok.kind.clone(),
            tok.lexeme.clone(),
            expected_token,
            expected_parsee,
            None,
            tok.location.clone(),
        )
    }

    // ---- module ----

    fn parse_module(mut self) -> Result<ParsedModule, Error> {
        self.skip_newlines();
        let mut name: Rc<str> = Rc::from(DEFAULT_MODULE_NAME);
        if matches!(self.peek().kind, TokenKind::MetaModule) {
            self.advance();
            let (declared, _) = self.expect_identifier()?;
            name = declared;
            self.expect_statement_end()?;
            self.skip_newlines();
        }

        let mut header = Vec::new();
        let mut body = Vec::new();
        while !self.is_end() {
            let statement = self.parse_top_level_statement()?;
            match statement {
                Statement::MetaImport { .. }
                | Statement::MetaExternFunction { .. }
                | Statement::MetaExternVariable { .. }
                | Statement::Blob { .. } => header.push(statement),
                _ => body.push(statement),
            }
            self.expect_statement_end()?;
            self.skip_newlines();
        }

        Ok(ParsedModule { name, header, body })
    }

    fn expect_statement_end(&mut self) -> Result<(), Error> {
        if matches!(self.peek().kind, TokenKind::NewLine) {
            self.advance();
            Ok(())
        } else if self.is_end() {
            Ok(())
        } else {
            Err(self.error_here(Some(TokenKind::NewLine), Some(Parsee("end of statement"))))
        }
    }

    fn parse_top_level_statement(&mut self) -> Result<Statement, Error> {
        match &self.peek().kind {
            TokenKind::MetaImport => self.parse_meta_import(),
            TokenKind::MetaExtern => self.parse_meta_extern(),
            TokenKind::MetaExport => {
                self.advance();
                self.parse_definition(true)
            }
            TokenKind::Identifier(_) => self.parse_definition(false),
            _ => Err(self.error_here(None, Some(Parsee("top-level statement")))),
        }
    }

    fn parse_meta_import(&mut self) -> Result<Statement, Error> {
        let loc = self.peek().location.clone();
        self.advance();
        let (module_name, _) = self.expect_identifier()?;
        Ok(Statement::MetaImport { module_name, location: loc })
    }

    fn parse_meta_extern(&mut self) -> Result<Statement, Error> {
        let loc = self.peek().location.clone();
        self.advance();
        let (name, _) = self.expect_identifier()?;
        if matches!(self.peek().kind, TokenKind::Function) {
            self.advance();
            let args = self.parse_optional_arg_list()?;
            let return_type = self.parse_optional_return_type()?;
            Ok(Statement::MetaExternFunction { name, args, return_type, location: loc })
        } else {
            let value_type = self.parse_type()?;
            Ok(Statement::MetaExternVariable { name, value_type, location: loc })
        }
    }

    fn parse_definition(&mut self, should_export: bool) -> Result<Statement, Error> {
        let (name, location) = self.expect_identifier()?;
        if matches!(self.peek().kind, TokenKind::Function) {
            self.parse_function(should_export, name, location)
        } else if matches!(self.peek().kind, TokenKind::Blob) {
            self.parse_blob(should_export, name, location)
        } else if is_raw_keyword(&self.peek().kind) {
            self.advance();
            self.parse_raw_function(name, location)
        } else {
            self.parse_variable(should_export, name, location)
        }
    }

    fn parse_function(&mut self, should_export: bool, name: Rc<str>, location: Location) -> Result<Statement, Error> {
        self.advance(); // fun
        let args = self.parse_optional_arg_list()?;
        let return_type = self.parse_optional_return_type()?;
        self.expect(TokenKind::Colon, Some(Parsee("function body")))?;
        self.expect(TokenKind::NewLine, Some(Parsee("newline after function header")))?;
        let mut statements = self.parse_statement_sequence(&TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon, Some(Parsee("function body terminator")))?;
        ensure_implicit_return(&mut statements, &location);
        let body = Box::new(Expression::new(
            ExprKind::Block { statements, result: Box::new(Expression::none(location.clone())) },
            location.clone(),
        ));
        Ok(Statement::Function { should_export, name, args, return_type, body, location })
    }

    fn parse_raw_function(&mut self, name: Rc<str>, location: Location) -> Result<Statement, Error> {
        let constraints = self.expect_string()?;
        let args = self.parse_optional_arg_list()?;
        let return_type = self.parse_optional_return_type()?;
        self.expect(TokenKind::Colon, Some(Parsee("raw function body")))?;
        self.expect(TokenKind::NewLine, Some(Parsee("newline after raw function header")))?;
        let mut assembly_lines = Vec::new();
        loop {
            if matches!(self.peek().kind, TokenKind::Semicolon) {
                break;
            }
            assembly_lines.push(self.expect_string()?);
            if matches!(self.peek().kind, TokenKind::NewLine) {
                self.advance();
                self.skip_newlines();
            } else {
                break;
            }
        }
        self.expect(TokenKind::Semicolon, Some(Parsee("raw function terminator")))?;
        Ok(Statement::RawFunction { name, constraints, args, return_type, assembly_lines, location })
    }

    fn parse_blob(&mut self, should_export: bool, name: Rc<str>, location: Location) -> Result<Statement, Error> {
        self.advance(); // blob
        self.expect(TokenKind::Colon, Some(Parsee("blob field list")))?;
        self.skip_newlines();
        let mut fields = Vec::new();
        loop {
            let (field_name, _) = self.expect_identifier()?;
            let value_type = self.parse_type()?;
            fields.push(BlobField { name: field_name, value_type });
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                continue;
            }
            break;
        }
        Ok(Statement::Blob { should_export, name, fields, location })
    }

    fn parse_variable(&mut self, should_export: bool, name: Rc<str>, location: Location) -> Result<Statement, Error> {
        let value_type = self.parse_type()?;
        let initializer = if matches!(self.peek().kind, TokenKind::Assign) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Statement::Variable { should_export, name, value_type, initializer, location })
    }

    fn parse_optional_arg_list(&mut self) -> Result<Vec<FunctionArg>, Error> {
        let mut args = Vec::new();
        if matches!(self.peek().kind, TokenKind::Colon) {
            self.advance();
            loop {
                self.skip_newlines();
                let (name, _) = self.expect_identifier()?;
                let value_type = self.parse_type()?;
                args.push(FunctionArg { name, value_type });
                if matches!(self.peek().kind, TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        Ok(args)
    }

    fn parse_optional_return_type(&mut self) -> Result<ValueType, Error> {
        if matches!(self.peek().kind, TokenKind::RetArrow) {
            self.advance();
            self.skip_newlines();
            self.parse_type()
        } else {
            Ok(ValueType::None)
        }
    }

    fn parse_type(&mut self) -> Result<ValueType, Error> {
        match self.peek().kind.clone() {
            TokenKind::Type(prim) => {
                self.advance();
                Ok(ValueType::from(prim))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(ValueType::Blob(name))
            }
            TokenKind::Data => {
                self.advance();
                let sub = self.parse_type()?;
                self.expect(TokenKind::LBracket, Some(Parsee("data element count")))?;
                let count = self.parse_expression()?;
                self.expect(TokenKind::RBracket, Some(Parsee("closing bracket")))?;
                Ok(ValueType::data(sub, count))
            }
            TokenKind::Ptr => {
                self.advance();
                let sub = self.parse_type()?;
                Ok(ValueType::ptr(sub))
            }
            TokenKind::Function => {
                self.advance();
                let mut args = Vec::new();
                if matches!(self.peek().kind, TokenKind::Colon) {
                    self.advance();
                    loop {
                        args.push(self.parse_type()?);
                        if matches!(self.peek().kind, TokenKind::Comma) {
                            self.advance();
                            continue;
                        }
                        break;
                    }
                }
                let ret = self.parse_optional_return_type()?;
                Ok(ValueType::fun(args, ret))
            }
            _ => Err(self.error_here(None, Some(Parsee("type")))),
        }
    }

    // ---- statements inside a block ----

    fn parse_statement_sequence(&mut self, terminal: &TokenKind) -> Result<Vec<Statement>, Error> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if &self.peek().kind == terminal {
                break;
            }
            let statement = self.parse_in_block_statement()?;
            statements.push(statement);
            if &self.peek().kind == terminal {
                break;
            }
            self.expect(TokenKind::NewLine, Some(Parsee("statement separator")))?;
        }
        Ok(statements)
    }

    fn parse_in_block_statement(&mut self) -> Result<Statement, Error> {
        match &self.peek().kind {
            TokenKind::Return => self.parse_return(),
            TokenKind::Repeat => self.parse_repeat(),
            TokenKind::Identifier(_)
                if self.peek_next().is_some_and(|t| starts_type(&t.kind)) =>
            {
                let (name, location) = self.expect_identifier()?;
                self.parse_variable(false, name, location)
            }
            _ => self.parse_assignment_or_expression_statement(),
        }
    }

    fn parse_return(&mut self) -> Result<Statement, Error> {
        let loc = self.peek().location.clone();
        self.advance(); // ret
        let value = if self.starts_expression() { Some(self.parse_expression()?) } else { None };
        Ok(Statement::Return { value, location: loc })
    }

    fn starts_expression(&self) -> bool {
        !matches!(
            self.peek().kind,
            TokenKind::NewLine | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::End | TokenKind::Comma
        )
    }

    fn parse_repeat(&mut self) -> Result<Statement, Error> {
        let loc = self.peek().location.clone();
        self.advance(); // rep

        let mut init = None;
        let mut pre_condition = None;
        let mut post_statement = None;
        let mut post_condition = None;

        if !matches!(self.peek().kind, TokenKind::Colon) {
            init = Some(Box::new(self.parse_repeat_clause_statement()?));
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
            }
        }
        if !matches!(self.peek().kind, TokenKind::Colon) {
            pre_condition = Some(self.parse_expression()?);
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
            }
        }
        if !matches!(self.peek().kind, TokenKind::Colon) {
            post_statement = Some(Box::new(self.parse_repeat_clause_statement()?));
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
            }
        }
        if !matches!(self.peek().kind, TokenKind::Colon) {
            post_condition = Some(self.parse_expression()?);
        }
        self.expect(TokenKind::Colon, Some(Parsee("repeat body")))?;

        let is_multi_line = matches!(self.peek().kind, TokenKind::NewLine);
        if is_multi_line {
            self.advance();
        }
        let terminal = if is_multi_line { TokenKind::Semicolon } else { TokenKind::NewLine };
        let body_statements = self.parse_statement_sequence(&terminal)?;
        if is_multi_line {
            self.expect(TokenKind::Semicolon, Some(Parsee("repeat terminator")))?;
        }

        let body = Box::new(Statement::Block { statements: body_statements, location: loc.clone() });
        Ok(Statement::Repeat { init, pre_condition, post_statement, post_condition, body, location: loc })
    }

    fn parse_repeat_clause_statement(&mut self) -> Result<Statement, Error> {
        if matches!(self.peek().kind, TokenKind::Identifier(_))
            && self.peek_next().is_some_and(|t| starts_type(&t.kind))
        {
            let (name, location) = self.expect_identifier()?;
            self.parse_variable(false, name, location)
        } else {
            let loc = self.peek().location.clone();
            let target = self.parse_expression()?;
            self.expect(TokenKind::Assign, Some(Parsee("assignment")))?;
            let value = self.parse_expression()?;
            Ok(Statement::Assignment { target, value, location: loc })
        }
    }

    fn parse_assignment_or_expression_statement(&mut self) -> Result<Statement, Error> {
        let loc = self.peek().location.clone();
        let expr = self.parse_expression()?;
        if matches!(self.peek().kind, TokenKind::Assign) {
            self.advance();
            let value = self.parse_expression()?;
            Ok(Statement::Assignment { target: expr, value, location: loc })
        } else {
            Ok(Statement::Expression { expr, location: loc })
        }
    }

    // ---- expressions, precedence low to high ----

    fn parse_expression(&mut self) -> Result<Expression, Error> {
        stack::ensure_sufficient_stack(|| self.parse_or_xor())
    }

    fn parse_or_xor(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_and()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Or => BinaryOp::Or,
                TokenKind::Xor => BinaryOp::Xor,
                _ => break,
            };
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_and()?;
            expr = Expression::new(ExprKind::Binary(op, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_not()?;
        while matches!(self.peek().kind, TokenKind::And) {
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_not()?;
            expr = Expression::new(ExprKind::Binary(BinaryOp::And, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expression, Error> {
        if matches!(self.peek().kind, TokenKind::Not) {
            let loc = self.peek().location.clone();
            self.advance();
            let operand = self.parse_not()?;
            Ok(Expression::new(ExprKind::Unary(UnaryOp::Not, Box::new(operand)), loc))
        } else {
            self.parse_equality()
        }
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_comparison()?;
            expr = Expression::new(ExprKind::Binary(op, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_bitwise_or_xor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_bitwise_or_xor()?;
            expr = Expression::new(ExprKind::Binary(op, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_bitwise_or_xor(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_bitwise_and()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::BitOr => BinaryOp::BitOr,
                TokenKind::BitXor => BinaryOp::BitXor,
                _ => break,
            };
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_bitwise_and()?;
            expr = Expression::new(ExprKind::Binary(op, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_shift()?;
        while matches!(self.peek().kind, TokenKind::BitAnd) {
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_shift()?;
            expr = Expression::new(ExprKind::Binary(BinaryOp::BitAnd, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_shift(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                _ => break,
            };
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_term()?;
            expr = Expression::new(ExprKind::Binary(op, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_factor()?;
            expr = Expression::new(ExprKind::Binary(op, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let loc = expr.location.clone();
            self.advance();
            let rhs = self.parse_unary()?;
            expr = Expression::new(ExprKind::Binary(op, Box::new(expr), Box::new(rhs)), loc);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let loc = self.peek().location.clone();
        let op = match self.peek().kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::BitNot => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            Ok(Expression::new(ExprKind::Unary(op, Box::new(operand)), loc))
        } else {
            self.parse_chained()
        }
    }

    fn parse_chained(&mut self) -> Result<Expression, Error> {
        let first = self.parse_primary()?;
        let loc = first.location.clone();
        let mut links = vec![first];
        while matches!(self.peek().kind, TokenKind::Dot) {
            self.advance();
            links.push(self.parse_primary()?);
        }
        if links.len() == 1 {
            Ok(links.pop().unwrap_or_else(|| unreachable!("links.len() == 1 checked above")))
        } else {
            Ok(Expression::new(ExprKind::Chained(links), loc))
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let loc = self.peek().location.clone();
        match self.peek().kind.clone() {
            TokenKind::Bool(v) => {
                self.advance();
                Ok(Expression::new(ExprKind::Literal(LiteralValue::Bool(v)), loc))
            }
            TokenKind::IntegerDec(v) | TokenKind::IntegerHex(v) | TokenKind::IntegerBin(v) => {
                self.advance();
                Ok(Expression::new(ExprKind::Literal(LiteralValue::Int(v)), loc))
            }
            TokenKind::IntegerChar(v) => {
                self.advance();
                Ok(Expression::new(ExprKind::Literal(LiteralValue::Int(u64::from(v))), loc))
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(Expression::new(ExprKind::Literal(LiteralValue::Float(v)), loc))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expression::new(ExprKind::Literal(LiteralValue::Str(s)), loc))
            }
            TokenKind::LParen => self.parse_grouping(),
            TokenKind::LBrace => self.parse_brace_expression(loc),
            TokenKind::Question => self.parse_if_else(loc),
            TokenKind::Identifier(_) => self.parse_identifier_or_call(),
            TokenKind::Type(prim) => {
                self.advance();
                Ok(Expression::new(ExprKind::Cast(ValueType::from(prim)), loc))
            }
            _ => Err(self.error_here(None, Some(Parsee("expression")))),
        }
    }

    fn parse_grouping(&mut self) -> Result<Expression, Error> {
        let loc = self.peek().location.clone();
        self.advance(); // (
        self.skip_newlines();
        let inner = self.parse_expression()?;
        self.skip_newlines();
        self.expect(TokenKind::RParen, Some(Parsee("closing parenthesis")))?;
        Ok(Expression::new(ExprKind::Grouping(Box::new(inner)), loc))
    }

    fn parse_identifier_or_call(&mut self) -> Result<Expression, Error> {
        let (name, location) = self.expect_identifier()?;
        if matches!(self.peek().kind, TokenKind::LParen) {
            self.advance();
            let args = self.parse_call_args()?;
            self.expect(TokenKind::RParen, Some(Parsee("closing parenthesis")))?;
            Ok(Expression::new(ExprKind::Call { callee: name, args }, location))
        } else if matches!(self.peek().kind, TokenKind::LBracket) {
            self.advance();
            let index = self.parse_expression()?;
            self.expect(TokenKind::RBracket, Some(Parsee("closing bracket")))?;
            Ok(Expression::new(
                ExprKind::Value { name, index: Some(Box::new(index)), sub_kind: ValueSubKind::default() },
                location,
            ))
        } else {
            Ok(Expression::new(ExprKind::Value { name, index: None, sub_kind: ValueSubKind::default() }, location))
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expression>, Error> {
        let mut args = Vec::new();
        if matches!(self.peek().kind, TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            self.skip_newlines();
            args.push(self.parse_expression()?);
            self.skip_newlines();
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn parse_if_else(&mut self, loc: Location) -> Result<Expression, Error> {
        self.advance(); // ?
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Colon, Some(Parsee("if-else then-branch")))?;
        self.skip_newlines();
        let then_branch = self.parse_expression()?;
        let else_branch = if matches!(self.peek().kind, TokenKind::Colon) {
            self.advance();
            self.skip_newlines();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expression::new(
            ExprKind::IfElse { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch },
            loc,
        ))
    }

    /// `{ ... }`: a composite literal (comma-separated expressions) or a
    /// block expression (statements, last bare expression is the result).
    /// Disambiguated by attempting the composite-literal reading first and
    /// backtracking to a block on failure — the two only share an opening
    /// brace, never a parse prefix beyond it.
    fn parse_brace_expression(&mut self, loc: Location) -> Result<Expression, Error> {
        self.advance(); // {
        self.skip_newlines();
        if matches!(self.peek().kind, TokenKind::RBrace) {
            self.advance();
            return Ok(Expression::new(ExprKind::CompositeLiteral(Vec::new()), loc));
        }
        if matches!(self.peek().kind, TokenKind::Return | TokenKind::Repeat) {
            return self.parse_block_expression(loc);
        }
        let checkpoint = self.pos;
        match self.parse_composite_literal_body(loc.clone()) {
            Ok(expr) => Ok(expr),
            Err(_) => {
                self.pos = checkpoint;
                self.parse_block_expression(loc)
            }
        }
    }

    fn parse_composite_literal_body(&mut self, loc: Location) -> Result<Expression, Error> {
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            elements.push(self.parse_expression()?);
            self.skip_newlines();
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(TokenKind::RBrace, Some(Parsee("closing brace")))?;
        Ok(Expression::new(ExprKind::CompositeLiteral(elements), loc))
    }

    fn parse_block_expression(&mut self, loc: Location) -> Result<Expression, Error> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek().kind, TokenKind::RBrace) {
                break;
            }
            statements.push(self.parse_in_block_statement()?);
            self.skip_newlines();
            if matches!(self.peek().kind, TokenKind::RBrace) {
                break;
            }
            self.expect(TokenKind::NewLine, Some(Parsee("block statement separator")))?;
        }
        self.expect(TokenKind::RBrace, Some(Parsee("block closing brace")))?;
        let result = match statements.last() {
            Some(Statement::Expression { .. }) => {
                let popped = statements.pop().unwrap_or_else(|| unreachable!("statements.last() matched Some above"));
                let Statement::Expression { expr, .. } = popped else {
                    unreachable!()
                };
                expr
            }
            _ => Expression::none(loc.clone()),
        };
        Ok(Expression::new(ExprKind::Block { statements, result: Box::new(result) }, loc))
    }
}

fn ensure_implicit_return(statements: &mut Vec<Statement>, fallback_location: &Location) {
    if !matches!(statements.last(), Some(Statement::Return { .. })) {
        statements.push(Statement::Return { value: None, location: fallback_location.clone() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brc_lexer::tokenize;

    fn parse_src(src: &str) -> ParsedModule {
        let tokens = tokenize(src, "t.brc").expect("lex");
        parse(&tokens).expect("parse")
    }

    #[test]
    fn default_module_name_is_main() {
        let module = parse_src("x s32 <- 1\n");
        assert_eq!(&*module.name, DEFAULT_MODULE_NAME);
    }

    #[test]
    fn module_directive_overrides_default() {
        let module = parse_src("@module geometry\nx s32 <- 1\n");
        assert_eq!(&*module.name, "geometry");
    }

    #[test]
    fn variable_definition_is_in_body() {
        let module = parse_src("x s32 <- 1\n");
        assert_eq!(module.body.len(), 1);
        assert!(matches!(module.body[0], Statement::Variable { .. }));
    }

    #[test]
    fn blob_definition_is_in_header() {
        let module = parse_src("point blob : x s32, y s32\n");
        assert_eq!(module.header.len(), 1);
        assert!(matches!(module.header[0], Statement::Blob { .. }));
    }

    #[test]
    fn import_is_in_header() {
        let module = parse_src("@import geometry\n");
        assert!(matches!(module.header[0], Statement::MetaImport { .. }));
    }

    #[test]
    fn function_gets_implicit_return() {
        let module = parse_src("f fun :\nx s32 <- 1\n;\n");
        let Statement::Function { body, .. } = &module.body[0] else { panic!("expected function") };
        let ExprKind::Block { statements, .. } = &body.kind else { panic!("expected block") };
        assert!(matches!(statements.last(), Some(Statement::Return { value: None, .. })));
    }

    #[test]
    fn explicit_return_is_not_duplicated() {
        let module = parse_src("f fun :\nret 1\n;\n");
        let Statement::Function { body, .. } = &module.body[0] else { panic!("expected function") };
        let ExprKind::Block { statements, .. } = &body.kind else { panic!("expected block") };
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn binary_precedence_term_over_comparison() {
        let module = parse_src("x s32 <- 1 + 2 < 3\n");
        let Statement::Variable { initializer: Some(expr), .. } = &module.body[0] else {
            panic!("expected variable with initializer")
        };
        let ExprKind::Binary(BinaryOp::Less, lhs, _) = &expr.kind else { panic!("expected comparison") };
        assert!(matches!(lhs.kind, ExprKind::Binary(BinaryOp::Add, _, _)));
    }

    #[test]
    fn dot_chain_builds_chained_expression() {
        let module = parse_src("x s32 <- a.b.c\n");
        let Statement::Variable { initializer: Some(expr), .. } = &module.body[0] else {
            panic!("expected variable with initializer")
        };
        let ExprKind::Chained(links) = &expr.kind else { panic!("expected chained expression") };
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn ptr_to_fun_type_parses() {
        let module = parse_src("f ptr fun : s32 -> bool <- 0\n");
        assert!(matches!(module.body[0], Statement::Variable { .. }));
    }

    #[test]
    fn raw_function_parses() {
        let module = parse_src("halt raw \"\" :\n\"hlt\"\n;\n");
        assert!(matches!(module.body[0], Statement::RawFunction { .. }));
    }

    #[test]
    fn assignment_to_chained_target() {
        let module = parse_src("f fun :\na.b <- 1\n;\n");
        let Statement::Function { body, .. } = &module.body[0] else { panic!("expected function") };
        let ExprKind::Block { statements, .. } = &body.kind else { panic!("expected block") };
        assert!(matches!(statements[0], Statement::Assignment { .. }));
    }
}
