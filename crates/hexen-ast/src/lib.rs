//! The AST Hexen's semantic analyzer consumes.
//!
//! This crate carries no analysis logic — it only defines the node shapes
//! listed in the analyzer's external interface. A parser (out of scope here)
//! is expected to produce trees of these types; `hexen-sem` is the only
//! consumer.

pub mod expr;
pub mod item;
pub mod stmt;
pub mod ty;

pub use expr::{BinOp, Expr, UnOp};
pub use item::{Param, Program, TopLevelFn};
pub use stmt::{Block, ElseClause, Stmt};
pub use ty::{ArraySize, TypeAnnotation};
