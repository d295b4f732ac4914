use std::fmt;

use indexmap::IndexSet;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Index newtypes over a `u32`, convertible to `usize` without loss of precision.
macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $n(pub u32);

        impl From<$n> for usize {
            fn from(st: $n) -> Self {
                st.0 as usize
            }
        }
    };
}

IdxNewtype!(
    /// The index of a terminal in a [`Terminals`] table.
    TermIdx
);
IdxNewtype!(
    /// A non-terminal introduced by induction. `NtIdx(k)` is written `NT<k>`; `k` starts at 1 and
    /// is never reused within a single induction run.
    NtIdx
);

impl NtIdx {
    /// Parse a name of the form `NT<k>` (with `k >= 1`).
    pub fn from_name(n: &str) -> Option<NtIdx> {
        let digits = n.strip_prefix("NT")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match digits.parse::<u32>() {
            Ok(k) if k >= 1 => Some(NtIdx(k)),
            _ => None,
        }
    }
}

impl fmt::Display for NtIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NT{}", self.0)
    }
}

/// A symbol in an induced sequence or on the right-hand side of a rule. The start symbol `S` never
/// appears on a right-hand side and so has no `Symbol` representation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Symbol {
    Term(TermIdx),
    Nonterm(NtIdx),
}

/// An interning table mapping terminal labels (e.g. POS tags) to [`TermIdx`]s. Labels are opaque:
/// the only operations performed on them are equality and hashing. Indices are assigned in order of
/// first appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Terminals {
    names: IndexSet<String>,
}

impl Terminals {
    pub fn new() -> Self {
        Terminals {
            names: IndexSet::new(),
        }
    }

    /// Return the index of `name`, adding it to the table if it isn't already present.
    pub fn intern(&mut self, name: &str) -> TermIdx {
        match self.names.get_index_of(name) {
            Some(i) => TermIdx(i as u32),
            None => {
                let (i, _) = self.names.insert_full(name.to_owned());
                TermIdx(i as u32)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<TermIdx> {
        self.names.get_index_of(name).map(|i| TermIdx(i as u32))
    }

    /// Return the label of `tidx`. Panics if `tidx` is not from this table.
    pub fn name(&self, tidx: TermIdx) -> &str {
        &self.names[usize::from(tidx)]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermIdx, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (TermIdx(i as u32), n.as_str()))
    }

    /// Intern every label of `sentence`, returning the corresponding terminal sequence.
    pub fn intern_sequence<S: AsRef<str>>(&mut self, sentence: &[S]) -> Vec<Symbol> {
        sentence
            .iter()
            .map(|w| Symbol::Term(self.intern(w.as_ref())))
            .collect()
    }
}
