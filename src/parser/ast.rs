//! AST definitions for the traced language.
//!
//! The node vocabulary is closed: statements are a [`Stmt`] and expressions
//! an [`Expr`]. The interpreter dispatches on both with exhaustive matches, so
//! adding a node kind is a compile error until every walker handles it.

use std::rc::Rc;

/// Source location information for error reporting and step positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// Byte offset into the source text
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// Byte range of a construct in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Slice the spanned text out of `source`, or `""` if out of range.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("").trim()
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    MatMul,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::MatMul => "@",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,    // -x
    Pos,    // +x
    Not,    // not x
    Invert, // ~x
}

/// Short-circuit boolean operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Comparison operators (chainable)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

/// Literal constants
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
}

/// Keyword argument at a call site (`key=value`)
#[derive(Debug, Clone)]
pub struct Keyword {
    pub name: String,
    pub value: Expr,
}

/// One piece of an f-string
#[derive(Debug, Clone)]
pub enum FStringPart {
    Literal(String),
    Value {
        expr: Box<Expr>,
        /// `!r` / `!s` conversion
        conversion: Option<char>,
        format_spec: Option<String>,
    },
}

/// Expressions
#[derive(Debug, Clone)]
pub enum Expr {
    Constant {
        value: Constant,
        location: SourceLocation,
    },
    Name {
        id: String,
        location: SourceLocation,
    },
    List {
        elts: Vec<Expr>,
        location: SourceLocation,
    },
    Tuple {
        elts: Vec<Expr>,
        location: SourceLocation,
    },
    Set {
        elts: Vec<Expr>,
        location: SourceLocation,
    },
    Dict {
        keys: Vec<Expr>,
        values: Vec<Expr>,
        location: SourceLocation,
    },
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        location: SourceLocation,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
        location: SourceLocation,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
        location: SourceLocation,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
    /// Only valid as the index of a [`Expr::Subscript`]
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
        location: SourceLocation,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
        location: SourceLocation,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
        location: SourceLocation,
    },
    FString {
        parts: Vec<FStringPart>,
        location: SourceLocation,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
        location: SourceLocation,
    },
    /// Single-generator list comprehension
    ListComp {
        elt: Box<Expr>,
        target: Box<Expr>,
        iter: Box<Expr>,
        ifs: Vec<Expr>,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
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
            | Expr::ListComp { location, .. } => *location,
        }
    }

    /// Whether this expression may appear on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        match self {
            Expr::Name { .. } | Expr::Subscript { .. } => true,
            Expr::Tuple { elts, .. } | Expr::List { elts, .. } => {
                elts.iter().all(Expr::is_assignable)
            }
            _ => false,
        }
    }

    /// `print(...)` with a plain name callee.
    pub fn is_print_call(&self) -> bool {
        matches!(self, Expr::Call { func, .. } if matches!(func.as_ref(), Expr::Name { id, .. } if id == "print"))
    }
}

/// Function parameter with an optional default expression
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// User function definition, shared between the AST and runtime function values
#[derive(Debug)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// `name [as alias]` in an import statement
#[derive(Debug, Clone)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

impl Alias {
    /// The name bound in the importing namespace
    pub fn bound_name(&self) -> &str {
        self.asname.as_deref().unwrap_or(&self.name)
    }
}

/// Statements
#[derive(Debug, Clone)]
pub enum Stmt {
    Expr {
        value: Expr,
        location: SourceLocation,
        span: Span,
    },
    Assign {
        targets: Vec<Expr>,
        value: Expr,
        location: SourceLocation,
        span: Span,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
        location: SourceLocation,
        span: Span,
    },
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
        location: SourceLocation,
        span: Span,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        location: SourceLocation,
        test_span: Span,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        location: SourceLocation,
        test_span: Span,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        location: SourceLocation,
        header_span: Span,
    },
    FunctionDef {
        def: Rc<FunctionDef>,
        location: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    Delete {
        targets: Vec<Expr>,
        location: SourceLocation,
        span: Span,
    },
    Import {
        names: Vec<Alias>,
        location: SourceLocation,
        span: Span,
    },
    ImportFrom {
        module: String,
        names: Vec<Alias>,
        location: SourceLocation,
        span: Span,
    },
    Pass {
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
}

impl Stmt {
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::Expr { location, .. }
            | Stmt::Assign { location, .. }
            | Stmt::AugAssign { location, .. }
            | Stmt::AnnAssign { location, .. }
            | Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::For { location, .. }
            | Stmt::FunctionDef { location, .. }
            | Stmt::Return { location, .. }
            | Stmt::Delete { location, .. }
            | Stmt::Import { location, .. }
            | Stmt::ImportFrom { location, .. }
            | Stmt::Pass { location }
            | Stmt::Break { location }
            | Stmt::Continue { location } => *location,
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }
}
