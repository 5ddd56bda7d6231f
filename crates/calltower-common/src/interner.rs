//! Name interning.
//!
//! Callee names, parameter names and type parameter names are interned once
//! and passed around as `u32` atoms, so tower lookups and candidate
//! comparisons are integer comparisons. The table is shared by concurrent
//! resolution sessions, which intern names for synthesized declarations.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// An interned name. Atom 0 is the empty name.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord,
)]
pub struct Atom(pub u32);

impl Atom {
    pub const NONE: Atom = Atom(0);
}

/// Names every session asks for: convention operators, the implicit lambda
/// parameter and the builtin type names.
const COMMON_NAMES: &[&str] = &[
    "invoke",
    "plus",
    "minus",
    "times",
    "div",
    "unaryPlus",
    "unaryMinus",
    "get",
    "set",
    "it",
    "this",
    "Any",
    "Nothing",
    "Unit",
    "Int",
    "Long",
    "Double",
    "Boolean",
    "String",
    "Char",
    "dynamic",
];

/// Concurrent name table: a sharded map for lookups and an append-only list
/// indexed by atom for resolving names back.
pub struct NameInterner {
    atoms: DashMap<Arc<str>, Atom, FxBuildHasher>,
    names: RwLock<Vec<Arc<str>>>,
}

impl NameInterner {
    pub fn new() -> Self {
        let empty: Arc<str> = Arc::from("");
        let atoms = DashMap::with_hasher(FxBuildHasher);
        atoms.insert(Arc::clone(&empty), Atom::NONE);
        NameInterner {
            atoms,
            names: RwLock::new(vec![empty]),
        }
    }

    /// A table with the common names already interned.
    pub fn with_common_names() -> Self {
        let interner = Self::new();
        for name in COMMON_NAMES {
            interner.intern(name);
        }
        interner
    }

    pub fn intern(&self, name: &str) -> Atom {
        if let Some(atom) = self.atoms.get(name) {
            return *atom;
        }
        // The shard stays locked while the name is appended, so two sessions
        // racing on one name agree on its atom.
        match self.atoms.entry(Arc::from(name)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
                let atom = Atom(names.len() as u32);
                names.push(Arc::clone(entry.key()));
                entry.insert(atom);
                atom
            }
        }
    }

    /// The name behind `atom`; empty for an atom from another table.
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(atom.0 as usize)
            .cloned()
            .unwrap_or_else(|| Arc::from(""))
    }
}

impl Default for NameInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod interner_tests;
