//! Top-level items: the program node and function declarations.

use hexen_util::{Span, Symbol};

use crate::stmt::{Block, Stmt};
use crate::ty::TypeAnnotation;

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub ty: TypeAnnotation,
    pub mutable: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TopLevelFn {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub return_type: TypeAnnotation,
    pub body: Block,
    pub span: Span,
}

/// The root of a Hexen source file: its function declarations plus any
/// top-level statements.
#[derive(Debug, Clone)]
pub struct Program {
    pub functions: Vec<TopLevelFn>,
    pub statements: Vec<Stmt>,
    pub span: Span,
}
