//! Translating the surface `TypeAnnotation` grammar (hexen-ast) into the
//! analyzer's own `Type` lattice.

use hexen_ast::{ArraySize, TypeAnnotation};

use crate::types::{ArrayLen, Type};

/// The size portion of a flattened array annotation, in outer-to-inner
/// order. Mirrors `hexen_ast::ArraySize` but lives in `hexen-sem` so
/// `types.rs` doesn't need to depend on `hexen-ast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedArraySize {
    Fixed(u64),
    Inferred,
}

/// Resolve a named scalar annotation. Returns `Type::Error` for a name the
/// grammar doesn't recognize — the caller is responsible for reporting it.
fn resolve_named(name: &str) -> Type {
    match name {
        "i32" => Type::I32,
        "i64" => Type::I64,
        "f32" => Type::F32,
        "f64" => Type::F64,
        "bool" => Type::Bool,
        "string" => Type::String,
        "void" => Type::Void,
        "usize" => Type::Usize,
        _ => Type::Error,
    }
}

/// Resolve any `TypeAnnotation` into a `Type`.
pub fn resolve_type(ann: &TypeAnnotation) -> Type {
    match ann {
        TypeAnnotation::Named(name) => resolve_named(name.as_str()),
        TypeAnnotation::Array { size, elem } => {
            let elem_ty = resolve_type(elem);
            let len = match size {
                ArraySize::Fixed(n) => ArrayLen::Known(*n),
                ArraySize::Inferred => ArrayLen::Unknown,
            };
            Type::Array(Box::new(elem_ty), len)
        }
        TypeAnnotation::Range(inner) => Type::Range(Box::new(resolve_type(inner))),
    }
}

/// Flatten an array annotation into its per-dimension sizes (outer to
/// inner) and base element type, for use with `types::materialize_array`.
/// Returns `None` if `ann` is not an array annotation at all.
pub fn flatten_array_annotation(ann: &TypeAnnotation) -> Option<(Vec<ResolvedArraySize>, Type)> {
    let mut sizes = Vec::new();
    let mut cur = ann;
    loop {
        match cur {
            TypeAnnotation::Array { size, elem } => {
                sizes.push(match size {
                    ArraySize::Fixed(n) => ResolvedArraySize::Fixed(*n),
                    ArraySize::Inferred => ResolvedArraySize::Inferred,
                });
                cur = elem;
            }
            other => return Some((sizes, resolve_type(other))),
        }
    }
}
