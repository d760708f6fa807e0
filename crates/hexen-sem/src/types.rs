//! The comptime/concrete type lattice (spec §3, §4.2).
//!
//! Types are a flat tagged sum: concrete scalars, the two comptime scalars,
//! arrays over either, and ranges. There is no unification variable here —
//! Hexen never infers across function boundaries, so every expression's
//! type is either read off the AST directly or derived from a lookup.

use std::fmt;

/// The resolved length of an array type. `Unknown` only ever appears for
/// the result of a loop expression, whose element count depends on how
/// many iterations the loop performs at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
    Known(u64),
    Unknown,
}

impl fmt::Display for ArrayLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayLen::Known(n) => write!(f, "{n}"),
            ArrayLen::Unknown => write!(f, "_"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Produced when analysis of an expression has already failed; lets
    /// downstream analysis continue without cascading the same error.
    Error,
    Void,
    Bool,
    String,
    Usize,
    I32,
    I64,
    F32,
    F64,
    ComptimeInt,
    ComptimeFloat,
    Array(Box<Type>, ArrayLen),
    /// A comptime array, carrying its element count per dimension. `elem`
    /// is always `ComptimeInt` or `ComptimeFloat`.
    ComptimeArray(Box<Type>, Vec<u64>),
    Range(Box<Type>),
}

impl Type {
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_comptime(&self) -> bool {
        matches!(
            self,
            Type::ComptimeInt | Type::ComptimeFloat | Type::ComptimeArray(..)
        )
    }

    pub fn is_comptime_float(&self) -> bool {
        matches!(self, Type::ComptimeFloat)
            || matches!(self, Type::ComptimeArray(elem, _) if elem.is_comptime_float())
    }

    /// A concrete (non-comptime) numeric scalar.
    pub fn is_concrete_numeric(&self) -> bool {
        matches!(self, Type::I32 | Type::I64 | Type::F32 | Type::F64 | Type::Usize)
    }

    pub fn is_concrete_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_concrete_numeric() || matches!(self, Type::ComptimeInt | Type::ComptimeFloat)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Error => write!(f, "<error>"),
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Usize => write!(f, "usize"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::ComptimeInt => write!(f, "comptime_int"),
            Type::ComptimeFloat => write!(f, "comptime_float"),
            Type::Array(elem, len) => write!(f, "[{len}]{elem}"),
            Type::ComptimeArray(elem, dims) => {
                let kind = if elem.is_comptime_float() { "float" } else { "int" };
                write!(f, "comptime_array_{kind}")?;
                for d in dims {
                    write!(f, "[{d}]")?;
                }
                Ok(())
            }
            Type::Range(t) => write!(f, "range[{t}]"),
        }
    }
}

/// `unify_comptime(a, b) -> T` (spec §4.2): the result of a pure-comptime
/// arithmetic operation. Floating poisons the result; two ints stay ints.
pub fn unify_comptime(a: &Type, b: &Type) -> Type {
    if a.is_comptime_float() || b.is_comptime_float() {
        Type::ComptimeFloat
    } else {
        Type::ComptimeInt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoerceError {
    /// Both sides are concrete and distinct — the "transparent costs" case.
    MixedConcrete,
    /// Source cannot be represented in target at all (e.g. `bool` into `i32`).
    NotRepresentable,
}

/// `coerce(source, target) -> Result` (spec §4.2). Never permits
/// concrete-to-concrete widening, even when source could losslessly
/// represent target's domain.
pub fn coerce(source: &Type, target: &Type) -> Result<(), CoerceError> {
    if source == target {
        return Ok(());
    }
    match source {
        Type::ComptimeInt => match target {
            Type::I32 | Type::I64 | Type::F32 | Type::F64 | Type::Usize => Ok(()),
            _ => Err(CoerceError::NotRepresentable),
        },
        Type::ComptimeFloat => match target {
            Type::F32 | Type::F64 => Ok(()),
            _ => Err(CoerceError::NotRepresentable),
        },
        _ if source.is_concrete_numeric() && target.is_concrete_numeric() => {
            Err(CoerceError::MixedConcrete)
        }
        _ => Err(CoerceError::NotRepresentable),
    }
}

/// Structural legality of the explicit conversion operator `expr:T` (spec
/// §4.9). Precision loss is always allowed; crossing category (numeric vs.
/// `bool` vs. `string`) is not.
pub fn conversion_allowed(source: &Type, target: &Type) -> bool {
    if source == target {
        return true;
    }
    let category = |t: &Type| -> Option<u8> {
        if t.is_numeric() {
            Some(0)
        } else if t.is_bool() {
            Some(1)
        } else if matches!(t, Type::String) {
            Some(2)
        } else {
            None
        }
    };
    matches!((category(source), category(target)), (Some(a), Some(b)) if a == b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeError {
    SizeMismatch { expected: u64, found: u64 },
    DimMismatch { expected: usize, found: usize },
    ElementMismatch,
}

/// `materialize(comptime_array, target) -> Ok | SizeMismatch | DimMismatch |
/// ElementMismatch` (spec §4.2). `target_sizes` is the flattened list of
/// dimension annotations (`Fixed(n)` or the `[_]` inference marker, in
/// outer-to-inner order) and `target_elem` the annotated element type.
pub fn materialize_array(
    dims: &[u64],
    comptime_elem: &Type,
    target_sizes: &[crate::ast_support::ResolvedArraySize],
    target_elem: &Type,
) -> Result<Type, MaterializeError> {
    if dims.len() != target_sizes.len() {
        return Err(MaterializeError::DimMismatch {
            expected: target_sizes.len(),
            found: dims.len(),
        });
    }
    if coerce(comptime_elem, target_elem).is_err() {
        return Err(MaterializeError::ElementMismatch);
    }
    let mut resolved = Vec::with_capacity(dims.len());
    for (i, size) in target_sizes.iter().enumerate() {
        match size {
            crate::ast_support::ResolvedArraySize::Fixed(n) => {
                if *n != dims[i] {
                    return Err(MaterializeError::SizeMismatch {
                        expected: *n,
                        found: dims[i],
                    });
                }
                resolved.push(*n);
            }
            crate::ast_support::ResolvedArraySize::Inferred => resolved.push(dims[i]),
        }
    }
    let mut ty = target_elem.clone();
    for &n in resolved.iter().rev() {
        ty = Type::Array(Box::new(ty), ArrayLen::Known(n));
    }
    Ok(ty)
}
