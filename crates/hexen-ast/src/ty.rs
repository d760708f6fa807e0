//! The type-annotation sub-grammar (spec §6): named scalars, array forms,
//! and `range[T]`. These are surface annotations, not the analyzer's own
//! `Type` lattice — `hexen-sem` translates a `TypeAnnotation` into a `Type`.

use hexen_util::Symbol;

/// The size portion of an array annotation: either a fixed, known length or
/// the `_` inference marker (`[_]T`), which is resolved from the
/// initializer rather than denoting a type value on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
    Fixed(u64),
    Inferred,
}

/// A type as written in source: `i32`, `[3]i32`, `[_]f64`, `range[i64]`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeAnnotation {
    /// A named scalar: `i32`, `i64`, `f32`, `f64`, `bool`, `string`, `void`,
    /// `usize`, or any other bare identifier the grammar admits.
    Named(Symbol),
    Array {
        size: ArraySize,
        elem: Box<TypeAnnotation>,
    },
    Range(Box<TypeAnnotation>),
}
