//! Statement parsing implementation
//!
//! Simple statements (expression, assignment, `return`, `del`, imports, ...)
//! end at a newline or `;`. Compound statements (`if`, `while`, `for`, `def`)
//! own an indented block introduced by `:`.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Kw, Op, TokenKind};
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parse one statement line (or compound statement) and append the result.
    pub(crate) fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        match &self.peek().kind {
            TokenKind::Keyword(Kw::If) => {
                let location = self.current_location();
                self.advance();
                let stmt = self.parse_if_rest(location)?;
                out.push(stmt);
            }
            TokenKind::Keyword(Kw::While) => {
                let stmt = self.parse_while()?;
                out.push(stmt);
            }
            TokenKind::Keyword(Kw::For) => {
                let stmt = self.parse_for()?;
                out.push(stmt);
            }
            TokenKind::Keyword(Kw::Def) => {
                let stmt = self.parse_function_def()?;
                out.push(stmt);
            }
            TokenKind::Keyword(Kw::Elif) | TokenKind::Keyword(Kw::Else) => {
                return Err(self.error_here(format!(
                    "invalid syntax: {} without a matching 'if'",
                    self.peek().kind
                )));
            }
            TokenKind::Indent => return Err(self.error_here("unexpected indent")),
            _ => self.parse_simple_line(out)?,
        }
        Ok(())
    }

    /// `simple_stmt (';' simple_stmt)* NEWLINE`
    fn parse_simple_line(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        loop {
            let stmt = self.parse_simple_statement()?;
            out.push(stmt);
            if self.match_op(Op::Semicolon) {
                if self.check_kind(&TokenKind::Newline) || self.is_at_end() {
                    break;
                }
                continue;
            }
            break;
        }
        self.expect_newline()
    }

    /// `':' (NEWLINE INDENT stmt+ DEDENT | simple_line)`
    pub(crate) fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_op(Op::Colon, "to start a block")?;
        let mut body = Vec::new();

        if self.match_kind(&TokenKind::Newline) {
            if !self.match_kind(&TokenKind::Indent) {
                return Err(self.error_here("expected an indented block"));
            }
            while !self.check_kind(&TokenKind::Dedent) && !self.is_at_end() {
                if self.match_kind(&TokenKind::Newline) {
                    continue;
                }
                self.parse_statement(&mut body)?;
            }
            self.match_kind(&TokenKind::Dedent);
        } else {
            self.parse_simple_line(&mut body)?;
        }

        Ok(body)
    }

    /// Parse the rest of an `if`/`elif` after its keyword
    fn parse_if_rest(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        let test_start = self.current_location().offset;
        let test = self.parse_expression()?;
        let test_span = Span::new(test_start, self.previous_end());
        let body = self.parse_block()?;

        let orelse = if self.check_keyword(Kw::Elif) {
            let elif_location = self.current_location();
            self.advance();
            vec![self.parse_if_rest(elif_location)?]
        } else if self.match_keyword(Kw::Else) {
            self.parse_block()?
        } else {
            Vec::new()
        };

        Ok(Stmt::If {
            test,
            body,
            orelse,
            location,
            test_span,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.expect_keyword(Kw::While, "")?;
        let test_start = self.current_location().offset;
        let test = self.parse_expression()?;
        let test_span = Span::new(test_start, self.previous_end());

        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        let body = body?;

        if self.check_keyword(Kw::Else) {
            return Err(self.error_here("unsupported construct 'while ... else'"));
        }

        Ok(Stmt::While {
            test,
            body,
            location,
            test_span,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.expect_keyword(Kw::For, "")?;
        let target = self.parse_target_list()?;
        self.expect_keyword(Kw::In, "in for loop")?;
        let iter = self.parse_expression_list()?;
        let header_span = Span::new(location.offset, self.previous_end());

        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        let body = body?;

        if self.check_keyword(Kw::Else) {
            return Err(self.error_here("unsupported construct 'for ... else'"));
        }

        Ok(Stmt::For {
            target,
            iter,
            body,
            location,
            header_span,
        })
    }

    fn parse_function_def(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.expect_keyword(Kw::Def, "")?;
        let name = self.expect_identifier()?;
        self.expect_op(Op::LParen, "after function name")?;

        let mut params: Vec<Param> = Vec::new();
        while !self.check_op(Op::RParen) {
            if self.check_op(Op::Star) || self.check_op(Op::DoubleStar) {
                return Err(self.error_here("unsupported construct: variadic parameters"));
            }
            let param_name = self.expect_identifier()?;
            if params.iter().any(|p| p.name == param_name) {
                return Err(self.error_here(format!(
                    "duplicate argument '{}' in function definition",
                    param_name
                )));
            }
            if self.match_op(Op::Colon) {
                // Annotations are parsed and discarded
                self.parse_expression()?;
            }
            let default = if self.match_op(Op::Assign) {
                Some(self.parse_expression()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(self.error_here("non-default argument follows default argument"));
                }
                None
            };
            params.push(Param {
                name: param_name,
                default,
            });
            if !self.match_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::RParen, "after parameters")?;
        if self.match_op(Op::Arrow) {
            self.parse_expression()?;
        }

        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;
        self.loop_depth = saved_loop_depth;
        let body = body?;

        Ok(Stmt::FunctionDef {
            def: Rc::new(FunctionDef {
                name,
                params,
                body,
                location,
            }),
            location,
        })
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();

        match self.peek().kind.clone() {
            TokenKind::Keyword(Kw::Pass) => {
                self.advance();
                Ok(Stmt::Pass { location })
            }
            TokenKind::Keyword(Kw::Break) => {
                if self.loop_depth == 0 {
                    return Err(self.error_here("'break' outside loop"));
                }
                self.advance();
                Ok(Stmt::Break { location })
            }
            TokenKind::Keyword(Kw::Continue) => {
                if self.loop_depth == 0 {
                    return Err(self.error_here("'continue' not properly in loop"));
                }
                self.advance();
                Ok(Stmt::Continue { location })
            }
            TokenKind::Keyword(Kw::Return) => {
                if self.function_depth == 0 {
                    return Err(self.error_here("'return' outside function"));
                }
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression_list()?)
                };
                Ok(Stmt::Return { value, location })
            }
            TokenKind::Keyword(Kw::Del) => {
                self.advance();
                let mut targets = Vec::new();
                loop {
                    let target = self.parse_bitor()?;
                    if !matches!(target, Expr::Name { .. } | Expr::Subscript { .. }) {
                        return Err(ParseError {
                            message: "cannot delete this expression".to_string(),
                            location: target.location(),
                        });
                    }
                    targets.push(target);
                    if !self.match_op(Op::Comma) {
                        break;
                    }
                }
                Ok(Stmt::Delete {
                    targets,
                    location,
                    span: Span::new(location.offset, self.previous_end()),
                })
            }
            TokenKind::Keyword(Kw::Import) => {
                self.advance();
                let mut names = Vec::new();
                loop {
                    let name = self.parse_dotted_name()?;
                    let asname = if self.match_keyword(Kw::As) {
                        Some(self.expect_identifier()?)
                    } else {
                        None
                    };
                    names.push(Alias { name, asname });
                    if !self.match_op(Op::Comma) {
                        break;
                    }
                }
                Ok(Stmt::Import {
                    names,
                    location,
                    span: Span::new(location.offset, self.previous_end()),
                })
            }
            TokenKind::Keyword(Kw::From) => {
                self.advance();
                let module = self.parse_dotted_name()?;
                self.expect_keyword(Kw::Import, "in from-import")?;
                let parenthesized = self.match_op(Op::LParen);
                let mut names = Vec::new();
                if self.check_op(Op::Star) {
                    return Err(self.error_here("unsupported construct: wildcard import"));
                }
                loop {
                    let name = self.expect_identifier()?;
                    let asname = if self.match_keyword(Kw::As) {
                        Some(self.expect_identifier()?)
                    } else {
                        None
                    };
                    names.push(Alias { name, asname });
                    if !self.match_op(Op::Comma) {
                        break;
                    }
                    if parenthesized && self.check_op(Op::RParen) {
                        break;
                    }
                }
                if parenthesized {
                    self.expect_op(Op::RParen, "after imported names")?;
                }
                Ok(Stmt::ImportFrom {
                    module,
                    names,
                    location,
                    span: Span::new(location.offset, self.previous_end()),
                })
            }
            TokenKind::Reserved(word) => {
                Err(self.error_here(format!("unsupported construct '{}'", word)))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// Expression statement, assignment, augmented or annotated assignment
    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        let first = self.parse_expression_list()?;

        if self.check_op(Op::Assign) {
            let mut exprs = vec![first];
            while self.match_op(Op::Assign) {
                exprs.push(self.parse_expression_list()?);
            }
            let value = exprs.pop().ok_or_else(|| self.error_here("invalid assignment"))?;
            for target in &exprs {
                Self::validate_target(target)?;
            }
            return Ok(Stmt::Assign {
                targets: exprs,
                value,
                location,
                span: Span::new(location.offset, self.previous_end()),
            });
        }

        if let Some(op) = self.match_augmented_op() {
            if !matches!(first, Expr::Name { .. } | Expr::Subscript { .. }) {
                return Err(ParseError {
                    message: "illegal expression for augmented assignment".to_string(),
                    location: first.location(),
                });
            }
            let value = self.parse_expression_list()?;
            return Ok(Stmt::AugAssign {
                target: first,
                op,
                value,
                location,
                span: Span::new(location.offset, self.previous_end()),
            });
        }

        if self.match_op(Op::Colon) {
            if !matches!(first, Expr::Name { .. } | Expr::Subscript { .. }) {
                return Err(ParseError {
                    message: "illegal target for annotation".to_string(),
                    location: first.location(),
                });
            }
            let annotation = self.parse_expression()?;
            let value = if self.match_op(Op::Assign) {
                Some(self.parse_expression_list()?)
            } else {
                None
            };
            return Ok(Stmt::AnnAssign {
                target: first,
                annotation,
                value,
                location,
                span: Span::new(location.offset, self.previous_end()),
            });
        }

        Ok(Stmt::Expr {
            value: first,
            location,
            span: Span::new(location.offset, self.previous_end()),
        })
    }

    fn validate_target(target: &Expr) -> Result<(), ParseError> {
        if target.is_assignable() {
            Ok(())
        } else {
            let what = match target {
                Expr::Attribute { .. } => "attribute",
                Expr::Call { .. } => "function call",
                Expr::Constant { .. } => "literal",
                _ => "expression",
            };
            Err(ParseError {
                message: format!("cannot assign to {}", what),
                location: target.location(),
            })
        }
    }

    fn match_augmented_op(&mut self) -> Option<BinOp> {
        let op = match &self.peek().kind {
            TokenKind::Op(op) => match op {
                Op::PlusEq => BinOp::Add,
                Op::MinusEq => BinOp::Sub,
                Op::StarEq => BinOp::Mul,
                Op::SlashEq => BinOp::Div,
                Op::DoubleSlashEq => BinOp::FloorDiv,
                Op::PercentEq => BinOp::Mod,
                Op::DoubleStarEq => BinOp::Pow,
                Op::AmpEq => BinOp::BitAnd,
                Op::PipeEq => BinOp::BitOr,
                Op::CaretEq => BinOp::BitXor,
                Op::LShiftEq => BinOp::LShift,
                Op::RShiftEq => BinOp::RShift,
                _ => return None,
            },
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_identifier()?;
        while self.match_op(Op::Dot) {
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    /// Comma-separated assignment targets for `for` loops and comprehensions.
    ///
    /// Parsed at `|` precedence so the `in` keyword is not consumed as a
    /// membership test.
    pub(crate) fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let first = self.parse_bitor()?;
        if !self.check_op(Op::Comma) {
            Self::validate_target(&first)?;
            return Ok(first);
        }

        let mut elts = vec![first];
        while self.match_op(Op::Comma) {
            if self.check_keyword(Kw::In) {
                break;
            }
            elts.push(self.parse_bitor()?);
        }
        let target = Expr::Tuple { elts, location };
        Self::validate_target(&target)?;
        Ok(target)
    }

    pub(crate) fn at_statement_end(&self) -> bool {
        self.check_kind(&TokenKind::Newline) || self.check_op(Op::Semicolon) || self.is_at_end()
    }
}
