//! Immutable code -> label snapshot.

use std::collections::BTreeMap;

use crate::codes::NativeCode;

/// One published view of the error vocabulary.
///
/// A `Catalog` is never mutated after it is handed to readers; the registry
/// builds a new one and swaps it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, String>,
}

impl Catalog {
    /// Catalog containing every [`NativeCode`] labelled with its constant name.
    pub(crate) fn builtin() -> Self {
        let entries = NativeCode::ALL
            .into_iter()
            .map(|c| (c.code().to_owned(), c.label().to_owned()))
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert or replace a label, returning the previous one.
    pub(crate) fn upsert(&mut self, code: String, label: String) -> Option<String> {
        self.entries.insert(code, label)
    }
}
