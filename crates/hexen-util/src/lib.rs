//! hexen-util - foundation types shared by the Hexen toolchain crates.
//!
//! Nothing here knows about Hexen's grammar or type system. It provides the
//! plumbing every compiler stage needs: interned identifiers, source spans,
//! typed index vectors, definition IDs, and a structured diagnostic sink.

pub mod def_id;
pub mod diagnostic;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticKind, Handler};
pub use index_vec::{Idx, IndexVec};
pub use span::Span;
pub use symbol::Symbol;
