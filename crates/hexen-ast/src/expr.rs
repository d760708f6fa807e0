//! Expression nodes.

use hexen_util::{Span, Symbol};

use crate::stmt::Block;
use crate::ty::TypeAnnotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// `/`, true division.
    Div,
    /// `\`, integer division.
    IntDiv,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier {
        name: Symbol,
        span: Span,
    },
    IntLiteral {
        value: i64,
        span: Span,
    },
    FloatLiteral {
        value: f64,
        span: Span,
    },
    StringLiteral {
        value: Symbol,
        span: Span,
    },
    BoolLiteral {
        value: bool,
        span: Span,
    },
    ArrayLiteral {
        elements: Vec<Expr>,
        span: Span,
    },
    /// `a[i]`.
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// `a[..]` (full copy) or `a[lo..hi]` (bounded copy). Both bounds absent
    /// means the full-length copy form.
    SliceCopy {
        base: Box<Expr>,
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
        span: Span,
    },
    /// A bare range used as a loop iterator, e.g. `0..10` or `5..`.
    Range {
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
        span: Span,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },
    /// `expr:T`.
    Conversion {
        expr: Box<Expr>,
        ty: TypeAnnotation,
        span: Span,
    },
    Call {
        callee: Symbol,
        args: Vec<Expr>,
        span: Span,
    },
    /// A block used in value position, e.g. the right-hand side of a
    /// binding. Whether it is compile-time-evaluable or runtime is decided
    /// by the analyzer, not by this node.
    Block {
        block: Box<Block>,
        span: Span,
    },
    /// `for x in iter { ... -> elem ... }` used in value position, building
    /// an array from the yields in its body. The statement form of `for-in`
    /// is a separate node (`Stmt::ForIn`).
    ForIn {
        label: Option<Symbol>,
        var: Symbol,
        iter: Box<Expr>,
        body: Box<Block>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier { span, .. }
            | Expr::IntLiteral { span, .. }
            | Expr::FloatLiteral { span, .. }
            | Expr::StringLiteral { span, .. }
            | Expr::BoolLiteral { span, .. }
            | Expr::ArrayLiteral { span, .. }
            | Expr::Index { span, .. }
            | Expr::SliceCopy { span, .. }
            | Expr::Range { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Conversion { span, .. }
            | Expr::Call { span, .. }
            | Expr::Block { span, .. }
            | Expr::ForIn { span, .. } => *span,
        }
    }
}
