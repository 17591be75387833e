//! Expression parsing implementation
//!
//! Recursive descent with one method per precedence level, loosest first:
//!
//! 1. conditional `a if c else b`
//! 2. `or`, `and`, `not`
//! 3. comparisons (chained, including `not in` and `is not`)
//! 4. `|`, `^`, `&`, shifts
//! 5. `+ -`, then `* / // % @`
//! 6. unary `- + ~`, then `**` (right-associative, binds tighter than unary on its left)
//! 7. primaries: atoms followed by call, subscript and attribute trailers
//!
//! F-string bodies arrive from the lexer as raw text; [`Parser::parse_fstring`]
//! splits them and parses each replacement field with a sub-parser.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{Kw, Op, TokenKind};
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let body = self.parse_or()?;

        if self.check_keyword(Kw::If) {
            let location = body.location();
            self.advance();
            let test = self.parse_or()?;
            self.expect_keyword(Kw::Else, "in conditional expression")?;
            let orelse = self.parse_expression()?;
            return Ok(Expr::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
                location,
            });
        }

        Ok(body)
    }

    /// `expr (',' expr)* [',']`, yielding a tuple when a comma is present
    pub(crate) fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let first = self.parse_expression()?;
        if !self.check_op(Op::Comma) {
            return Ok(first);
        }

        let mut elts = vec![first];
        while self.match_op(Op::Comma) {
            if !self.starts_expression() {
                break;
            }
            elts.push(self.parse_expression()?);
        }
        Ok(Expr::Tuple { elts, location })
    }

    /// Whether the current token can begin an expression
    fn starts_expression(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::FString(_)
            | TokenKind::Ident(_) => true,
            TokenKind::Keyword(kw) => matches!(kw, Kw::True | Kw::False | Kw::None | Kw::Not),
            TokenKind::Op(op) => matches!(
                op,
                Op::LParen | Op::LBracket | Op::LBrace | Op::Minus | Op::Plus | Op::Tilde
            ),
            _ => false,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_and()?;
        if !self.check_keyword(Kw::Or) {
            return Ok(first);
        }
        let location = first.location();
        let mut values = vec![first];
        while self.match_keyword(Kw::Or) {
            values.push(self.parse_and()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::Or,
            values,
            location,
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_not()?;
        if !self.check_keyword(Kw::And) {
            return Ok(first);
        }
        let location = first.location();
        let mut values = vec![first];
        while self.match_keyword(Kw::And) {
            values.push(self.parse_not()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::And,
            values,
            location,
        })
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check_keyword(Kw::Not) {
            let location = self.current_location();
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                location,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();

        while let Some(op) = self.match_comparison_op() {
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }

        if ops.is_empty() {
            return Ok(left);
        }
        let location = left.location();
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
            location,
        })
    }

    fn match_comparison_op(&mut self) -> Option<CmpOp> {
        let op = match &self.peek().kind {
            TokenKind::Op(Op::EqEq) => CmpOp::Eq,
            TokenKind::Op(Op::NotEq) => CmpOp::NotEq,
            TokenKind::Op(Op::Lt) => CmpOp::Lt,
            TokenKind::Op(Op::Le) => CmpOp::LtE,
            TokenKind::Op(Op::Gt) => CmpOp::Gt,
            TokenKind::Op(Op::Ge) => CmpOp::GtE,
            TokenKind::Keyword(Kw::In) => CmpOp::In,
            TokenKind::Keyword(Kw::Is) => {
                self.advance();
                return Some(if self.match_keyword(Kw::Not) {
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                });
            }
            TokenKind::Keyword(Kw::Not) => {
                let followed_by_in = self
                    .peek_ahead(1)
                    .is_some_and(|t| t.kind == TokenKind::Keyword(Kw::In));
                if !followed_by_in {
                    return None;
                }
                self.advance();
                self.advance();
                return Some(CmpOp::NotIn);
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// Binary operator level: `next (op next)*`, left-associative
    fn parse_binary_level(
        &mut self,
        table: &[(Op, BinOp)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;

        'outer: loop {
            for &(token_op, bin_op) in table {
                if self.check_op(token_op) {
                    let location = self.current_location();
                    self.advance();
                    let right = next(self)?;
                    left = Expr::BinOp {
                        left: Box::new(left),
                        op: bin_op,
                        right: Box::new(right),
                        location,
                    };
                    continue 'outer;
                }
            }
            break;
        }

        Ok(left)
    }

    pub(crate) fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(Op::Pipe, BinOp::BitOr)], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(Op::Caret, BinOp::BitXor)], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(Op::Amp, BinOp::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[(Op::LShift, BinOp::LShift), (Op::RShift, BinOp::RShift)],
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[(Op::Plus, BinOp::Add), (Op::Minus, BinOp::Sub)],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[
                (Op::Star, BinOp::Mul),
                (Op::Slash, BinOp::Div),
                (Op::DoubleSlash, BinOp::FloorDiv),
                (Op::Percent, BinOp::Mod),
                (Op::At, BinOp::MatMul),
            ],
            Self::parse_factor,
        )
    }

    /// Unary `-`, `+`, `~`
    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let op = match &self.peek().kind {
            TokenKind::Op(Op::Minus) => Some(UnaryOp::Neg),
            TokenKind::Op(Op::Plus) => Some(UnaryOp::Pos),
            TokenKind::Op(Op::Tilde) => Some(UnaryOp::Invert),
            _ => None,
        };

        if let Some(op) = op {
            let location = self.current_location();
            self.advance();
            let operand = self.parse_factor()?;
            // Fold negative literals so `-1` stays a constant
            if op == UnaryOp::Neg {
                match operand {
                    Expr::Constant {
                        value: Constant::Int(n),
                        ..
                    } if n != i64::MIN => {
                        return Ok(Expr::Constant {
                            value: Constant::Int(-n),
                            location,
                        })
                    }
                    Expr::Constant {
                        value: Constant::Float(x),
                        ..
                    } => {
                        return Ok(Expr::Constant {
                            value: Constant::Float(-x),
                            location,
                        })
                    }
                    other => {
                        return Ok(Expr::UnaryOp {
                            op,
                            operand: Box::new(other),
                            location,
                        })
                    }
                }
            }
            return Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
                location,
            });
        }

        self.parse_power()
    }

    /// `primary ['**' factor]`
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if self.check_op(Op::DoubleStar) {
            let location = self.current_location();
            self.advance();
            let exponent = self.parse_factor()?;
            return Ok(Expr::BinOp {
                left: Box::new(base),
                op: BinOp::Pow,
                right: Box::new(exponent),
                location,
            });
        }
        Ok(base)
    }

    /// Atom followed by `(...)`, `[...]` and `.name` trailers
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            if self.match_op(Op::LParen) {
                let location = expr.location();
                let (args, keywords) = self.parse_call_arguments()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    keywords,
                    location,
                };
            } else if self.match_op(Op::LBracket) {
                let location = expr.location();
                let index = self.parse_subscript_index()?;
                self.expect_op(Op::RBracket, "after subscript")?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                    location,
                };
            } else if self.match_op(Op::Dot) {
                let location = expr.location();
                let attr = self.expect_identifier()?;
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                    location,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Arguments after `(`, consuming the closing `)`
    fn parse_call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), ParseError> {
        let mut args = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();

        while !self.check_op(Op::RParen) {
            if self.check_op(Op::Star) || self.check_op(Op::DoubleStar) {
                return Err(self.error_here("unsupported construct: argument unpacking"));
            }

            let is_keyword = matches!(self.peek().kind, TokenKind::Ident(_))
                && self
                    .peek_ahead(1)
                    .is_some_and(|t| t.kind == TokenKind::Op(Op::Assign));

            if is_keyword {
                let name = self.expect_identifier()?;
                self.advance();
                if keywords.iter().any(|k| k.name == name) {
                    return Err(self.error_here(format!("keyword argument repeated: {}", name)));
                }
                let value = self.parse_expression()?;
                keywords.push(Keyword { name, value });
            } else {
                if !keywords.is_empty() {
                    return Err(self.error_here("positional argument follows keyword argument"));
                }
                let arg = self.parse_expression()?;
                // Bare generator argument: `sum(x for x in xs)`
                if self.check_keyword(Kw::For) {
                    let location = arg.location();
                    args.push(self.parse_comprehension_tail(arg, location)?);
                } else {
                    args.push(arg);
                }
            }

            if !self.match_op(Op::Comma) {
                break;
            }
        }

        self.expect_op(Op::RParen, "after arguments")?;
        Ok((args, keywords))
    }

    /// Index inside `[...]`: an expression, a slice, or a tuple of them
    fn parse_subscript_index(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let first = self.parse_slice_item()?;
        if !self.check_op(Op::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.match_op(Op::Comma) {
            if self.check_op(Op::RBracket) {
                break;
            }
            elts.push(self.parse_slice_item()?);
        }
        Ok(Expr::Tuple { elts, location })
    }

    fn parse_slice_item(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let lower = if self.check_op(Op::Colon) {
            None
        } else {
            let expr = self.parse_expression()?;
            if !self.check_op(Op::Colon) {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };

        self.expect_op(Op::Colon, "in slice")?;
        let upper = if self.slice_part_ends() {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        let step = if self.match_op(Op::Colon) {
            if self.slice_part_ends() {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            }
        } else {
            None
        };

        Ok(Expr::Slice {
            lower,
            upper,
            step,
            location,
        })
    }

    fn slice_part_ends(&self) -> bool {
        self.check_op(Op::Colon) || self.check_op(Op::RBracket) || self.check_op(Op::Comma)
    }

    /// `for target in iter [if cond]*` after the element expression
    fn parse_comprehension_tail(
        &mut self,
        elt: Expr,
        location: SourceLocation,
    ) -> Result<Expr, ParseError> {
        self.expect_keyword(Kw::For, "in comprehension")?;
        let target = self.parse_target_list()?;
        self.expect_keyword(Kw::In, "in comprehension")?;
        let iter = self.parse_or()?;

        let mut ifs = Vec::new();
        while self.match_keyword(Kw::If) {
            ifs.push(self.parse_or()?);
        }
        if self.check_keyword(Kw::For) {
            return Err(self.error_here("unsupported construct: nested comprehension loops"));
        }

        Ok(Expr::ListComp {
            elt: Box::new(elt),
            target: Box::new(target),
            iter: Box::new(iter),
            ifs,
            location,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();

        match self.peek().kind.clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Constant {
                    value: Constant::Int(n),
                    location,
                })
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(Expr::Constant {
                    value: Constant::Float(x),
                    location,
                })
            }
            TokenKind::Str(_) | TokenKind::FString(_) => self.parse_string_atom(),
            TokenKind::Ident(id) => {
                self.advance();
                Ok(Expr::Name { id, location })
            }
            TokenKind::Keyword(Kw::True) => {
                self.advance();
                Ok(Expr::Constant {
                    value: Constant::Bool(true),
                    location,
                })
            }
            TokenKind::Keyword(Kw::False) => {
                self.advance();
                Ok(Expr::Constant {
                    value: Constant::Bool(false),
                    location,
                })
            }
            TokenKind::Keyword(Kw::None) => {
                self.advance();
                Ok(Expr::Constant {
                    value: Constant::None,
                    location,
                })
            }
            TokenKind::Op(Op::LParen) => {
                self.advance();
                self.parse_paren_tail(location)
            }
            TokenKind::Op(Op::LBracket) => {
                self.advance();
                self.parse_list_tail(location)
            }
            TokenKind::Op(Op::LBrace) => {
                self.advance();
                self.parse_brace_tail(location)
            }
            TokenKind::Reserved(word) => {
                Err(self.error_here(format!("unsupported construct '{}'", word)))
            }
            other => Err(self.error_here(format!("invalid syntax: unexpected {}", other))),
        }
    }

    /// After `(`: unit tuple, parenthesized expression, tuple or generator
    fn parse_paren_tail(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_op(Op::RParen) {
            return Ok(Expr::Tuple {
                elts: Vec::new(),
                location,
            });
        }

        let first = self.parse_expression()?;
        if self.check_keyword(Kw::For) {
            let comp = self.parse_comprehension_tail(first, location)?;
            self.expect_op(Op::RParen, "after generator expression")?;
            return Ok(comp);
        }
        if self.match_op(Op::RParen) {
            return Ok(first);
        }

        let mut elts = vec![first];
        while self.match_op(Op::Comma) {
            if self.check_op(Op::RParen) {
                break;
            }
            elts.push(self.parse_expression()?);
        }
        self.expect_op(Op::RParen, "to close tuple")?;
        Ok(Expr::Tuple { elts, location })
    }

    /// After `[`: list display or list comprehension
    fn parse_list_tail(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_op(Op::RBracket) {
            return Ok(Expr::List {
                elts: Vec::new(),
                location,
            });
        }

        let first = self.parse_expression()?;
        if self.check_keyword(Kw::For) {
            let comp = self.parse_comprehension_tail(first, location)?;
            self.expect_op(Op::RBracket, "after list comprehension")?;
            return Ok(comp);
        }

        let mut elts = vec![first];
        while self.match_op(Op::Comma) {
            if self.check_op(Op::RBracket) {
                break;
            }
            elts.push(self.parse_expression()?);
        }
        self.expect_op(Op::RBracket, "to close list")?;
        Ok(Expr::List { elts, location })
    }

    /// After `{`: dict or set display
    fn parse_brace_tail(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_op(Op::RBrace) {
            return Ok(Expr::Dict {
                keys: Vec::new(),
                values: Vec::new(),
                location,
            });
        }

        let first = self.parse_expression()?;

        if self.match_op(Op::Colon) {
            let mut keys = vec![first];
            let mut values = vec![self.parse_expression()?];
            if self.check_keyword(Kw::For) {
                return Err(self.error_here("unsupported construct: dict comprehension"));
            }
            while self.match_op(Op::Comma) {
                if self.check_op(Op::RBrace) {
                    break;
                }
                keys.push(self.parse_expression()?);
                self.expect_op(Op::Colon, "in dict display")?;
                values.push(self.parse_expression()?);
            }
            self.expect_op(Op::RBrace, "to close dict")?;
            return Ok(Expr::Dict {
                keys,
                values,
                location,
            });
        }

        if self.check_keyword(Kw::For) {
            return Err(self.error_here("unsupported construct: set comprehension"));
        }

        let mut elts = vec![first];
        while self.match_op(Op::Comma) {
            if self.check_op(Op::RBrace) {
                break;
            }
            elts.push(self.parse_expression()?);
        }
        self.expect_op(Op::RBrace, "to close set")?;
        Ok(Expr::Set { elts, location })
    }

    /// One or more adjacent string literals, concatenated
    fn parse_string_atom(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut has_fstring = false;

        loop {
            match self.peek().kind.clone() {
                TokenKind::Str(s) => {
                    self.advance();
                    push_literal(&mut parts, &s);
                }
                TokenKind::FString(body) => {
                    let fstring_location = self.current_location();
                    self.advance();
                    has_fstring = true;
                    for part in Self::parse_fstring(&body, fstring_location)? {
                        match part {
                            FStringPart::Literal(s) => push_literal(&mut parts, &s),
                            value => parts.push(value),
                        }
                    }
                }
                _ => break,
            }
        }

        if !has_fstring {
            let text = match parts.pop() {
                Some(FStringPart::Literal(s)) => s,
                _ => String::new(),
            };
            return Ok(Expr::Constant {
                value: Constant::Str(Rc::from(text)),
                location,
            });
        }

        Ok(Expr::FString { parts, location })
    }

    /// Split an f-string body into literal text and replacement fields.
    pub(crate) fn parse_fstring(
        body: &str,
        location: SourceLocation,
    ) -> Result<Vec<FStringPart>, ParseError> {
        let error = |message: &str| ParseError {
            message: format!("f-string: {}", message),
            location,
        };

        let chars: Vec<char> = body.chars().collect();
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            if ch == '{' {
                if chars.get(i + 1) == Some(&'{') {
                    literal.push('{');
                    i += 2;
                    continue;
                }
                if !literal.is_empty() {
                    parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                }

                // Scan to the end of the expression, tracking nesting and quotes
                let start = i + 1;
                let mut j = start;
                let mut depth = 0usize;
                let mut quote: Option<char> = None;
                while j < chars.len() {
                    let c = chars[j];
                    if let Some(q) = quote {
                        if c == q {
                            quote = None;
                        }
                    } else {
                        match c {
                            '\'' | '"' => quote = Some(c),
                            '(' | '[' | '{' => depth += 1,
                            ')' | ']' => depth = depth.saturating_sub(1),
                            '}' if depth > 0 => depth -= 1,
                            '}' => break,
                            '!' if depth == 0 && chars.get(j + 1) != Some(&'=') => break,
                            ':' if depth == 0 => break,
                            _ => {}
                        }
                    }
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(error("expecting '}'"));
                }

                let expr_text: String = chars[start..j].iter().collect();
                if expr_text.trim().is_empty() {
                    return Err(error("empty expression not allowed"));
                }

                let mut conversion = None;
                if chars[j] == '!' {
                    match chars.get(j + 1) {
                        Some(&c @ ('r' | 's' | 'a')) => conversion = Some(c),
                        _ => return Err(error("invalid conversion character")),
                    }
                    j += 2;
                }

                let mut format_spec = None;
                if chars.get(j) == Some(&':') {
                    let spec_start = j + 1;
                    let mut k = spec_start;
                    while k < chars.len() && chars[k] != '}' {
                        k += 1;
                    }
                    format_spec = Some(chars[spec_start..k].iter().collect());
                    j = k;
                }

                if chars.get(j) != Some(&'}') {
                    return Err(error("expecting '}'"));
                }

                let expr = Self::parse_fstring_field(expr_text.trim(), location)?;
                parts.push(FStringPart::Value {
                    expr: Box::new(expr),
                    conversion,
                    format_spec,
                });
                i = j + 1;
            } else if ch == '}' {
                if chars.get(i + 1) == Some(&'}') {
                    literal.push('}');
                    i += 2;
                } else {
                    return Err(error("single '}' is not allowed"));
                }
            } else {
                literal.push(ch);
                i += 1;
            }
        }

        if !literal.is_empty() {
            parts.push(FStringPart::Literal(literal));
        }
        Ok(parts)
    }

    fn parse_fstring_field(text: &str, location: SourceLocation) -> Result<Expr, ParseError> {
        let relocate = |err: ParseError| ParseError {
            message: format!("f-string: {}", err.message),
            location,
        };

        // Parenthesize so the field may span what would be several lines
        let wrapped = format!("({})", text);
        let mut sub = Parser::new(&wrapped).map_err(relocate)?;
        let expr = sub.parse_expression().map_err(relocate)?;
        if !matches!(sub.peek().kind, TokenKind::Newline | TokenKind::Eof) {
            return Err(ParseError {
                message: "f-string: invalid syntax".to_string(),
                location,
            });
        }
        Ok(relocate_expr(expr, location))
    }
}

fn push_literal(parts: &mut Vec<FStringPart>, text: &str) {
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(FStringPart::Literal(text.to_string()));
    }
}

/// Replace the top-level location of a sub-parsed expression with the
/// location of the enclosing f-string.
fn relocate_expr(mut expr: Expr, to: SourceLocation) -> Expr {
    match &mut expr {
        Expr::Constant { location, .. }
        | Expr::Name { location, .. }
        | Expr::List { location, .. }
        | Expr::Tuple { location, .. }
        | Expr::Set { location, .. }
        | Expr::Dict { location, .. }
        | Expr::BinOp { location, .. }
        | Expr::UnaryOp { location, .. }
        | Expr::BoolOp { location, .. }
        | Expr::Compare { location, .. }
        | Expr::Subscript { location, .. }
        | Expr::Slice { location, .. }
        | Expr::Attribute { location, .. }
        | Expr::Call { location, .. }
        | Expr::FString { location, .. }
        | Expr::IfExp { location, .. }
        | Expr::ListComp { location, .. } => *location = to,
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        let mut parser = Parser::new(source).unwrap();
        parser.parse_expression().unwrap()
    }

    #[test]
    fn test_precedence() {
        match expr("1 + 2 * 3") {
            Expr::BinOp { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(*right, Expr::BinOp { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_power_binds_tighter_than_unary() {
        match expr("-2 ** 2") {
            Expr::UnaryOp { op, operand, .. } => {
                assert_eq!(op, UnaryOp::Neg);
                assert!(matches!(*operand, Expr::BinOp { op: BinOp::Pow, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_chained_comparison_and_not_in() {
        match expr("0 <= i < n") {
            Expr::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::LtE, CmpOp::Lt]),
            other => panic!("unexpected {:?}", other),
        }
        match expr("x not in seen") {
            Expr::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::NotIn]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_slices() {
        match expr("arr[1:-1]") {
            Expr::Subscript { index, .. } => match *index {
                Expr::Slice {
                    lower, upper, step, ..
                } => {
                    assert!(lower.is_some());
                    assert!(upper.is_some());
                    assert!(step.is_none());
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(expr("arr[::-1]"), Expr::Subscript { .. }));
    }

    #[test]
    fn test_list_comprehension_and_generator_argument() {
        assert!(matches!(
            expr("[x * 2 for x in range(3) if x]"),
            Expr::ListComp { .. }
        ));
        match expr("sum(x for x in xs)") {
            Expr::Call { args, .. } => assert!(matches!(args[0], Expr::ListComp { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keyword_arguments() {
        match expr("print(a, b, sep='-', end='')") {
            Expr::Call { args, keywords, .. } => {
                assert_eq!(args.len(), 2);
                assert_eq!(keywords.len(), 2);
                assert_eq!(keywords[0].name, "sep");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fstring_parts() {
        let parts = Parser::parse_fstring("a={a!r:>5} {{b}}", SourceLocation::default()).unwrap();
        assert_eq!(parts.len(), 3);
        match &parts[1] {
            FStringPart::Value {
                conversion,
                format_spec,
                ..
            } => {
                assert_eq!(*conversion, Some('r'));
                assert_eq!(format_spec.as_deref(), Some(">5"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &parts[2] {
            FStringPart::Literal(s) => assert_eq!(s, " {b}"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fstring_with_comparison_inside() {
        let parts = Parser::parse_fstring("{a != b}", SourceLocation::default()).unwrap();
        assert!(matches!(
            &parts[0],
            FStringPart::Value { conversion: None, .. }
        ));
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        match expr("'ab' 'cd'") {
            Expr::Constant {
                value: Constant::Str(s),
                ..
            } => assert_eq!(&*s, "abcd"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dict_and_set_displays() {
        assert!(matches!(expr("{'a': 1, 'b': 2}"), Expr::Dict { .. }));
        assert!(matches!(expr("{1, 2}"), Expr::Set { .. }));
        assert!(matches!(expr("{}"), Expr::Dict { .. }));
    }

    #[test]
    fn test_conditional_expression() {
        assert!(matches!(expr("a if a > b else b"), Expr::IfExp { .. }));
    }

    #[test]
    fn test_lambda_is_unsupported() {
        let mut parser = Parser::new("lambda x: x").unwrap();
        let err = parser.parse_expression().unwrap_err();
        assert!(err.message.contains("lambda"));
    }
}
