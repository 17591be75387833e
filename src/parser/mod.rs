//! Source parser for the traced Python subset
//!
//! This module transforms source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, with `Indent`/`Dedent`)
//! - [`parse`]: Parser state and helpers; statements and expressions are
//!   parsed in `statements` and `expressions`
//! - [`ast`]: AST node definitions
//!
//! # Supported Subset
//!
//! - Statements: assignment (chained, tuple targets, augmented, annotated),
//!   `if`/`elif`/`else`, `while`, `for`, `def`, `return`, `break`, `continue`,
//!   `pass`, `del`, `import`, `from ... import`
//! - Expressions: literals, f-strings, list/tuple/dict/set displays, single-loop
//!   list comprehensions, slicing, calls with keyword arguments, conditional
//!   expressions, chained comparisons
//! - Not supported: classes, lambdas, exceptions, `with`, generators,
//!   decorators, `global`/`nonlocal`. These are reported as unsupported
//!   constructs at parse time.
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser, one method per precedence level.
//! No external parser generator dependencies.

pub mod ast;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{ParseError, Parser};

/// Parse a complete source text into a [`ast::Module`]
pub fn parse_source(source: &str) -> Result<ast::Module, ParseError> {
    let mut parser = Parser::new(source)?;
    parser.parse_module()
}
