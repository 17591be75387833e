//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `statements`: simple and compound statements, blocks, assignment targets
//! - `expressions`: expressions with precedence climbing, f-strings
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{Kw, LexError, Lexer, Op, Token, TokenKind};
use std::fmt;

/// Parser error type
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the traced language
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// Nesting of `def` bodies; `return` is only legal when > 0
    pub(crate) function_depth: usize,
    /// Nesting of loop bodies within the current function; gates `break`/`continue`
    pub(crate) loop_depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            function_depth: 0,
            loop_depth: 0,
        })
    }

    /// Parse the whole source into a [`Module`]
    pub fn parse_module(&mut self) -> Result<Module, ParseError> {
        let mut module = Module::new();

        while !self.is_at_end() {
            if self.match_kind(&TokenKind::Newline) {
                continue;
            }
            self.parse_statement(&mut module.body)?;
        }

        Ok(module)
    }

    // ===== Helper methods =====

    pub(crate) fn check_kind(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check_kind(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check_op(&self, op: Op) -> bool {
        self.peek().kind == TokenKind::Op(op)
    }

    pub(crate) fn match_op(&mut self, op: Op) -> bool {
        if self.check_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check_keyword(&self, kw: Kw) -> bool {
        self.peek().kind == TokenKind::Keyword(kw)
    }

    pub(crate) fn match_keyword(&mut self, kw: Kw) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof, and `advance`
        // never moves past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    /// End byte offset of the last consumed token
    pub(crate) fn previous_end(&self) -> usize {
        if self.position == 0 {
            0
        } else {
            self.previous().end
        }
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.current_location(),
        }
    }

    pub(crate) fn expect_op(&mut self, op: Op, ctx: &str) -> Result<(), ParseError> {
        if self.match_op(op) {
            Ok(())
        } else {
            Err(self.error_here(format!(
                "Expected '{}' {}, found {}",
                op.as_str(),
                ctx,
                self.peek().kind
            )))
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: Kw, ctx: &str) -> Result<(), ParseError> {
        if self.match_keyword(kw) {
            Ok(())
        } else {
            Err(self.error_here(format!(
                "Expected '{}' {}, found {}",
                kw.as_str(),
                ctx,
                self.peek().kind
            )))
        }
    }

    pub(crate) fn expect_newline(&mut self) -> Result<(), ParseError> {
        if self.match_kind(&TokenKind::Newline) || self.is_at_end() {
            Ok(())
        } else {
            Err(self.error_here(format!(
                "invalid syntax: expected end of line, found {}",
                self.peek().kind
            )))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error_here(format!("Expected identifier, found {}", self.peek().kind)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Module {
        let mut parser = Parser::new(source).unwrap();
        parser.parse_module().unwrap()
    }

    #[test]
    fn test_parse_simple_function() {
        let module = parse("def add(a, b=2):\n    return a + b\n");

        assert_eq!(module.body.len(), 1);
        match &module.body[0] {
            Stmt::FunctionDef { def, .. } => {
                assert_eq!(def.name, "add");
                assert_eq!(def.params.len(), 2);
                assert!(def.params[1].default.is_some());
                assert_eq!(def.body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_tuple_swap() {
        let module = parse("arr[0], arr[1] = arr[1], arr[0]\n");
        match &module.body[0] {
            Stmt::Assign { targets, value, .. } => {
                assert_eq!(targets.len(), 1);
                assert!(matches!(targets[0], Expr::Tuple { .. }));
                assert!(matches!(value, Expr::Tuple { .. }));
            }
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_parse_if_elif_else() {
        let module = parse("if x > 0:\n    y = 1\nelif x < 0:\n    y = -1\nelse:\n    y = 0\n");
        match &module.body[0] {
            Stmt::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                assert!(matches!(orelse[0], Stmt::If { .. }));
            }
            _ => panic!("Expected if statement"),
        }
    }

    #[test]
    fn test_statement_spans() {
        let source = "x = 1\nwhile x < 10:\n    x += 1\n";
        let module = parse(source);
        match &module.body[0] {
            Stmt::Assign { span, .. } => assert_eq!(span.text(source), "x = 1"),
            _ => panic!("Expected assignment"),
        }
        match &module.body[1] {
            Stmt::While { test_span, .. } => assert_eq!(test_span.text(source), "x < 10"),
            _ => panic!("Expected while"),
        }
    }

    #[test]
    fn test_return_outside_function_is_error() {
        let mut parser = Parser::new("return 1\n").unwrap();
        let err = parser.parse_module().unwrap_err();
        assert!(err.message.contains("outside function"));
    }

    #[test]
    fn test_break_outside_loop_is_error() {
        let mut parser = Parser::new("def f():\n    break\n").unwrap();
        assert!(parser.parse_module().is_err());
    }

    #[test]
    fn test_unsupported_construct_reports_line() {
        let mut parser = Parser::new("x = 1\nclass A:\n    pass\n").unwrap();
        let err = parser.parse_module().unwrap_err();
        assert_eq!(err.location.line, 2);
        assert!(err.message.contains("class"));
    }
}
