//! Lexer (tokenizer) for the traced language
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Block structure is indentation based: the lexer tracks an indentation stack
//! and emits synthetic `Indent`/`Dedent` tokens, plus a `Newline` at the end of
//! every logical line. Newlines inside brackets and after a trailing backslash
//! do not end a logical line.

use super::ast::SourceLocation;
use std::fmt;

/// Reserved words the grammar understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kw {
    False,
    None,
    True,
    And,
    As,
    Break,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    For,
    From,
    If,
    Import,
    In,
    Is,
    Not,
    Or,
    Pass,
    Return,
    While,
}

impl Kw {
    fn from_word(word: &str) -> Option<Kw> {
        Some(match word {
            "False" => Kw::False,
            "None" => Kw::None,
            "True" => Kw::True,
            "and" => Kw::And,
            "as" => Kw::As,
            "break" => Kw::Break,
            "continue" => Kw::Continue,
            "def" => Kw::Def,
            "del" => Kw::Del,
            "elif" => Kw::Elif,
            "else" => Kw::Else,
            "for" => Kw::For,
            "from" => Kw::From,
            "if" => Kw::If,
            "import" => Kw::Import,
            "in" => Kw::In,
            "is" => Kw::Is,
            "not" => Kw::Not,
            "or" => Kw::Or,
            "pass" => Kw::Pass,
            "return" => Kw::Return,
            "while" => Kw::While,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kw::False => "False",
            Kw::None => "None",
            Kw::True => "True",
            Kw::And => "and",
            Kw::As => "as",
            Kw::Break => "break",
            Kw::Continue => "continue",
            Kw::Def => "def",
            Kw::Del => "del",
            Kw::Elif => "elif",
            Kw::Else => "else",
            Kw::For => "for",
            Kw::From => "from",
            Kw::If => "if",
            Kw::Import => "import",
            Kw::In => "in",
            Kw::Is => "is",
            Kw::Not => "not",
            Kw::Or => "or",
            Kw::Pass => "pass",
            Kw::Return => "return",
            Kw::While => "while",
        }
    }
}

/// Words that are keywords in the full language but have no place in the
/// supported subset. They lex as [`TokenKind::Reserved`] so the parser can
/// report "unsupported construct" instead of a confusing syntax error.
const RESERVED_WORDS: &[&str] = &[
    "class", "lambda", "try", "except", "finally", "raise", "with", "yield", "global",
    "nonlocal", "assert", "async", "await",
];

/// Operators and punctuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    At,
    Amp,
    Pipe,
    Caret,
    Tilde,
    LShift,
    RShift,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    NotEq,
    Assign,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    DoubleSlashEq,
    PercentEq,
    DoubleStarEq,
    AmpEq,
    PipeEq,
    CaretEq,
    LShiftEq,
    RShiftEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,
    Arrow,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Star => "*",
            Op::Slash => "/",
            Op::DoubleSlash => "//",
            Op::Percent => "%",
            Op::DoubleStar => "**",
            Op::At => "@",
            Op::Amp => "&",
            Op::Pipe => "|",
            Op::Caret => "^",
            Op::Tilde => "~",
            Op::LShift => "<<",
            Op::RShift => ">>",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::EqEq => "==",
            Op::NotEq => "!=",
            Op::Assign => "=",
            Op::PlusEq => "+=",
            Op::MinusEq => "-=",
            Op::StarEq => "*=",
            Op::SlashEq => "/=",
            Op::DoubleSlashEq => "//=",
            Op::PercentEq => "%=",
            Op::DoubleStarEq => "**=",
            Op::AmpEq => "&=",
            Op::PipeEq => "|=",
            Op::CaretEq => "^=",
            Op::LShiftEq => "<<=",
            Op::RShiftEq => ">>=",
            Op::LParen => "(",
            Op::RParen => ")",
            Op::LBracket => "[",
            Op::RBracket => "]",
            Op::LBrace => "{",
            Op::RBrace => "}",
            Op::Comma => ",",
            Op::Colon => ":",
            Op::Dot => ".",
            Op::Semicolon => ";",
            Op::Arrow => "->",
        }
    }
}

/// Token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    /// Raw f-string body; the parser splits it into literal and value parts
    FString(String),
    Ident(String),
    Keyword(Kw),
    Reserved(String),
    Op(Op),
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "int literal {}", n),
            TokenKind::Float(x) => write!(f, "float literal {}", x),
            TokenKind::Str(s) => write!(f, "string literal {:?}", s),
            TokenKind::FString(_) => write!(f, "f-string"),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Keyword(kw) => write!(f, "'{}'", kw.as_str()),
            TokenKind::Reserved(word) => write!(f, "'{}'", word),
            TokenKind::Op(op) => write!(f, "'{}'", op.as_str()),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

/// A token with its start location and end byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    pub end: usize,
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

const TAB_WIDTH: usize = 8;

/// Lexer for the traced language
pub struct Lexer {
    input: Vec<(usize, char)>,
    source_len: usize,
    position: usize,
    line: usize,
    column: usize,
    /// Open bracket count; newlines are insignificant while > 0
    depth: usize,
    indent_stack: Vec<usize>,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.char_indices().collect(),
            source_len: input.len(),
            position: 0,
            line: 1,
            column: 1,
            depth: 0,
            indent_stack: vec![0],
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut at_line_start = true;

        loop {
            if at_line_start && self.depth == 0 {
                at_line_start = false;
                if !self.handle_indentation(&mut tokens)? {
                    // Blank or comment-only line
                    at_line_start = true;
                    if self.is_at_end() {
                        break;
                    }
                    continue;
                }
            }

            self.skip_inline_whitespace()?;

            let Some(ch) = self.peek() else {
                break;
            };

            match ch {
                '#' => self.skip_comment(),
                '\n' => {
                    self.advance();
                    if self.depth == 0 {
                        self.push_newline(&mut tokens);
                        at_line_start = true;
                    }
                }
                '\r' => {
                    self.advance();
                }
                _ => {
                    let token = self.next_token()?;
                    tokens.push(token);
                }
            }
        }

        let loc = self.current_location();
        self.push_newline(&mut tokens);
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token {
                kind: TokenKind::Dedent,
                location: loc,
                end: loc.offset,
            });
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            location: loc,
            end: loc.offset,
        });

        Ok(tokens)
    }

    /// Measure the indentation of a new logical line and emit `Indent`/`Dedent`.
    ///
    /// Returns `false` if the line is blank or holds only a comment.
    fn handle_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<bool, LexError> {
        let mut width = 0;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                '\x0c' => width = 0,
                _ => break,
            }
            self.advance();
        }

        match self.peek() {
            None => return Ok(false),
            Some('#') => {
                self.skip_comment();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                return Ok(false);
            }
            Some('\n') => {
                self.advance();
                return Ok(false);
            }
            Some('\r') => {
                self.advance();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                return Ok(false);
            }
            Some(_) => {}
        }

        let loc = self.current_location();
        let current = self.indent_stack.last().copied().unwrap_or(0);

        if width > current {
            if tokens.is_empty() {
                return Err(LexError {
                    message: "unexpected indent".to_string(),
                    location: loc,
                });
            }
            self.indent_stack.push(width);
            tokens.push(Token {
                kind: TokenKind::Indent,
                location: loc,
                end: loc.offset,
            });
        } else if width < current {
            while self.indent_stack.last().is_some_and(|&top| top > width) {
                self.indent_stack.pop();
                tokens.push(Token {
                    kind: TokenKind::Dedent,
                    location: loc,
                    end: loc.offset,
                });
            }
            if self.indent_stack.last().copied() != Some(width) {
                return Err(LexError {
                    message: "unindent does not match any outer indentation level".to_string(),
                    location: loc,
                });
            }
        }

        Ok(true)
    }

    fn push_newline(&self, tokens: &mut Vec<Token>) {
        let needs_newline = tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent | TokenKind::Indent));
        if needs_newline {
            let loc = self.current_location();
            tokens.push(Token {
                kind: TokenKind::Newline,
                location: loc,
                end: loc.offset,
            });
        }
    }

    fn skip_inline_whitespace(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\x0c' => {
                    self.advance();
                }
                '\\' => {
                    // Explicit line joining
                    let loc = self.current_location();
                    self.advance();
                    if self.peek() == Some('\r') {
                        self.advance();
                    }
                    if self.peek() == Some('\n') {
                        self.advance();
                    } else {
                        return Err(LexError {
                            message: "unexpected character after line continuation character"
                                .to_string(),
                            location: loc,
                        });
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        let kind = match ch {
            '"' | '\'' => TokenKind::Str(self.string_body(ch, false, loc)?),
            '0'..='9' => self.number_literal(ch, loc)?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(ch, loc)?
            }
            c if c.is_alphabetic() || c == '_' => self.identifier_or_keyword(c, loc)?,
            _ => TokenKind::Op(self.operator(ch, loc)?),
        };

        if let TokenKind::Op(op) = &kind {
            match op {
                Op::LParen | Op::LBracket | Op::LBrace => self.depth += 1,
                Op::RParen | Op::RBracket | Op::RBrace => {
                    self.depth = self.depth.saturating_sub(1)
                }
                _ => {}
            }
        }

        Ok(Token {
            kind,
            location: loc,
            end: self.current_offset(),
        })
    }

    fn operator(&mut self, ch: char, loc: SourceLocation) -> Result<Op, LexError> {
        let op = match ch {
            '+' => self.with_eq(Op::Plus, Op::PlusEq),
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    Op::Arrow
                } else {
                    self.with_eq(Op::Minus, Op::MinusEq)
                }
            }
            '*' => {
                if self.peek() == Some('*') {
                    self.advance();
                    self.with_eq(Op::DoubleStar, Op::DoubleStarEq)
                } else {
                    self.with_eq(Op::Star, Op::StarEq)
                }
            }
            '/' => {
                if self.peek() == Some('/') {
                    self.advance();
                    self.with_eq(Op::DoubleSlash, Op::DoubleSlashEq)
                } else {
                    self.with_eq(Op::Slash, Op::SlashEq)
                }
            }
            '%' => self.with_eq(Op::Percent, Op::PercentEq),
            '@' => Op::At,
            '&' => self.with_eq(Op::Amp, Op::AmpEq),
            '|' => self.with_eq(Op::Pipe, Op::PipeEq),
            '^' => self.with_eq(Op::Caret, Op::CaretEq),
            '~' => Op::Tilde,
            '<' => {
                if self.peek() == Some('<') {
                    self.advance();
                    self.with_eq(Op::LShift, Op::LShiftEq)
                } else {
                    self.with_eq(Op::Lt, Op::Le)
                }
            }
            '>' => {
                if self.peek() == Some('>') {
                    self.advance();
                    self.with_eq(Op::RShift, Op::RShiftEq)
                } else {
                    self.with_eq(Op::Gt, Op::Ge)
                }
            }
            '=' => self.with_eq(Op::Assign, Op::EqEq),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Op::NotEq
                } else {
                    return Err(LexError {
                        message: "invalid syntax: '!'".to_string(),
                        location: loc,
                    });
                }
            }
            '(' => Op::LParen,
            ')' => Op::RParen,
            '[' => Op::LBracket,
            ']' => Op::RBracket,
            '{' => Op::LBrace,
            '}' => Op::RBrace,
            ',' => Op::Comma,
            ':' => Op::Colon,
            '.' => Op::Dot,
            ';' => Op::Semicolon,
            other => {
                return Err(LexError {
                    message: format!("invalid character '{}'", other),
                    location: loc,
                })
            }
        };
        Ok(op)
    }

    /// Return `with` if the next char is `=` (consuming it), else `plain`.
    fn with_eq(&mut self, plain: Op, with: Op) -> Op {
        if self.peek() == Some('=') {
            self.advance();
            with
        } else {
            plain
        }
    }

    fn identifier_or_keyword(
        &mut self,
        first: char,
        loc: SourceLocation,
    ) -> Result<TokenKind, LexError> {
        let mut word = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // String prefixes: r"", f"", rf"", b"" ...
        if let Some(quote @ ('"' | '\'')) = self.peek() {
            let lower = word.to_ascii_lowercase();
            if matches!(
                lower.as_str(),
                "r" | "u" | "b" | "f" | "rf" | "fr" | "br" | "rb"
            ) {
                self.advance();
                let raw = lower.contains('r');
                let body = self.string_body(quote, raw, loc)?;
                return Ok(if lower.contains('f') {
                    TokenKind::FString(body)
                } else {
                    TokenKind::Str(body)
                });
            }
        }

        if let Some(kw) = Kw::from_word(&word) {
            return Ok(TokenKind::Keyword(kw));
        }
        if RESERVED_WORDS.contains(&word.as_str()) {
            return Ok(TokenKind::Reserved(word));
        }
        Ok(TokenKind::Ident(word))
    }

    /// Read a string body after its opening quote.
    fn string_body(
        &mut self,
        quote: char,
        raw: bool,
        loc: SourceLocation,
    ) -> Result<String, LexError> {
        let triple = self.peek() == Some(quote) && self.peek_ahead(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        } else if self.peek() == Some(quote) {
            // Empty string
            self.advance();
            return Ok(String::new());
        }

        let mut value = String::new();
        loop {
            let Some(c) = self.advance() else {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    location: loc,
                });
            };

            if c == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_ahead(1) == Some(quote) {
                    self.advance();
                    self.advance();
                    break;
                }
                value.push(c);
                continue;
            }

            if c == '\n' && !triple {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    location: loc,
                });
            }

            if c == '\\' {
                if raw {
                    value.push(c);
                    if let Some(next) = self.advance() {
                        value.push(next);
                    }
                    continue;
                }
                self.escape_sequence(&mut value, loc)?;
                continue;
            }

            value.push(c);
        }

        Ok(value)
    }

    fn escape_sequence(&mut self, value: &mut String, loc: SourceLocation) -> Result<(), LexError> {
        let Some(esc) = self.advance() else {
            return Err(LexError {
                message: "unterminated string literal".to_string(),
                location: loc,
            });
        };
        match esc {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '0' => value.push('\0'),
            '\\' => value.push('\\'),
            '\'' => value.push('\''),
            '"' => value.push('"'),
            '\n' => {} // line continuation inside a string
            'x' => {
                let code = self.hex_digits(2, loc)?;
                value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = self.hex_digits(4, loc)?;
                value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            other => {
                value.push('\\');
                value.push(other);
            }
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize, loc: SourceLocation) -> Result<u32, LexError> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .advance()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| LexError {
                    message: "truncated \\x or \\u escape".to_string(),
                    location: loc,
                })?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<TokenKind, LexError> {
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                let mut digits = String::new();
                while let Some(c) = self.peek() {
                    if c == '_' {
                        self.advance();
                    } else if c.is_digit(radix) {
                        digits.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                return i64::from_str_radix(&digits, radix)
                    .map(TokenKind::Int)
                    .map_err(|_| LexError {
                        message: "invalid integer literal".to_string(),
                        location: loc,
                    });
            }
        }

        let mut text = String::from(first);
        let mut is_float = first == '.';
        self.collect_digits(&mut text);

        if !is_float
            && self.peek() == Some('.')
            && !self.peek_ahead(1).is_some_and(|c| c.is_alphabetic() || c == '_')
        {
            is_float = true;
            text.push('.');
            self.advance();
            self.collect_digits(&mut text);
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let sign_offset = usize::from(matches!(self.peek_ahead(1), Some('+' | '-')));
            if self.peek_ahead(1 + sign_offset).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if sign_offset == 1 {
                    if let Some(sign) = self.advance() {
                        text.push(sign);
                    }
                }
                self.collect_digits(&mut text);
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| LexError {
                    message: format!("invalid float literal '{}'", text),
                    location: loc,
                })
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| LexError {
                    message: format!("integer literal '{}' is too large", text),
                    location: loc,
                })
        }
    }

    fn collect_digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else if c == '_' && self.peek_ahead(1).is_some_and(|n| n.is_ascii_digit()) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.current_offset())
    }

    fn current_offset(&self) -> usize {
        self.input
            .get(self.position)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source_len)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).map(|(_, c)| *c)
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_indent_and_dedent() {
        let toks = kinds("if x:\n    y = 1\nz = 2\n");
        assert!(toks.contains(&TokenKind::Indent));
        assert!(toks.contains(&TokenKind::Dedent));
        assert_eq!(toks.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let toks = kinds("x = 1\n\n   # note\ny = 2\n");
        let newlines = toks.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 2);
        assert!(!toks.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_brackets_join_lines() {
        let toks = kinds("arr = [1,\n       2]\n");
        let newlines = toks.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_numbers() {
        let toks = kinds("a = 0x1F + 1_000 + 2.5 + 1e3");
        assert!(toks.contains(&TokenKind::Int(31)));
        assert!(toks.contains(&TokenKind::Int(1000)));
        assert!(toks.contains(&TokenKind::Float(2.5)));
        assert!(toks.contains(&TokenKind::Float(1000.0)));
    }

    #[test]
    fn test_strings_and_fstrings() {
        let toks = kinds("s = 'a\\tb' + f\"{x}!\" + r'\\n'");
        assert!(toks.contains(&TokenKind::Str("a\tb".to_string())));
        assert!(toks.contains(&TokenKind::FString("{x}!".to_string())));
        assert!(toks.contains(&TokenKind::Str("\\n".to_string())));
    }

    #[test]
    fn test_reserved_words() {
        let toks = kinds("class Foo: pass");
        assert_eq!(toks[0], TokenKind::Reserved("class".to_string()));
    }

    #[test]
    fn test_bad_dedent_is_error() {
        let err = Lexer::new("if x:\n    y = 1\n  z = 2\n").tokenize().unwrap_err();
        assert!(err.message.contains("unindent"));
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("s = 'abc\n").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated"));
    }
}
