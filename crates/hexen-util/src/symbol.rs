//! String interning for identifiers.
//!
//! [`Symbol`] is a compact (4-byte) handle to a string stored in a
//! process-global table. Interning identifiers once means symbol comparison
//! is an integer comparison rather than a string comparison, which matters
//! because the analyzer compares identifiers constantly during scope
//! resolution.

use std::fmt;
use std::sync::OnceLock;

use dashmap::DashMap;

static_assertions::assert_eq_size!(Symbol, u32);

/// An interned string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    /// Intern `s`, returning a handle. Repeated calls with equal strings
    /// return equal symbols.
    pub fn intern(s: &str) -> Self {
        interner().intern(s)
    }

    /// The string this symbol was interned from.
    pub fn as_str(&self) -> &'static str {
        interner().get(*self)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Interner {
    by_str: DashMap<&'static str, u32>,
    by_id: DashMap<u32, &'static str>,
}

impl Interner {
    fn new() -> Self {
        Self {
            by_str: DashMap::new(),
            by_id: DashMap::new(),
        }
    }

    fn intern(&self, s: &str) -> Symbol {
        if let Some(existing) = self.by_str.get(s) {
            return Symbol(*existing);
        }
        // Leaked on purpose: symbols live for the process lifetime, and a
        // compiler interns a bounded number of distinct identifiers.
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let id = self.by_str.len() as u32;
        self.by_str.insert(leaked, id);
        self.by_id.insert(id, leaked);
        Symbol(id)
    }

    fn get(&self, sym: Symbol) -> &'static str {
        *self
            .by_id
            .get(&sym.0)
            .expect("Symbol must have been produced by Symbol::intern")
    }
}

fn interner() -> &'static Interner {
    static INTERNER: OnceLock<Interner> = OnceLock::new();
    INTERNER.get_or_init(Interner::new)
}
