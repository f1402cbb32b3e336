//! Deterministic, collision-free identifiers for columns and groups.
//!
//! The allocator is seeded with the ids already in use (the leaves that
//! survive a rebuild). Given the same seed set and the same sequence of
//! requests it always hands out the same ids, which is what lets two
//! independently built grids agree on column ids.
//!
//! # Candidate order
//!
//! | Request               | Candidates tried                 |
//! |-----------------------|----------------------------------|
//! | preferred id `name`   | `name`, `name_1`, `name_2`, ...  |
//! | field only `price`    | `price`, `price_1`, ...          |
//! | neither               | `0`, `1`, `2`, ...               |
//!
//! # Example
//!
//! ```
//! use fgrid_columns::key::ColumnKeyCreator;
//!
//! let mut keys = ColumnKeyCreator::new();
//! assert_eq!(keys.allocate(Some("name"), None), "name");
//! assert_eq!(keys.allocate(Some("name"), None), "name_1");
//! assert_eq!(keys.allocate(None, None), "0");
//! ```

use rustc_hash::FxHashSet;

/// Issues unique string keys, remembering every key it has seen.
#[derive(Debug, Clone, Default)]
pub struct ColumnKeyCreator {
    used: FxHashSet<String>,
}

impl ColumnKeyCreator {
    /// Create an allocator with no keys in use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator seeded with keys that are already taken.
    #[must_use]
    pub fn seeded<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys = Self::new();
        keys.seed(existing);
        keys
    }

    /// Mark keys as already in use.
    pub fn seed<I, S>(&mut self, existing: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.used.extend(existing.into_iter().map(Into::into));
    }

    /// Whether `key` has been seeded or allocated.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.used.contains(key)
    }

    /// Number of keys in use.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Whether no key is in use.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Allocate a key, preferring `preferred_id`, then `preferred_field`,
    /// then a bare integer.
    ///
    /// Empty preferences count as absent. The chosen key is recorded.
    pub fn allocate(&mut self, preferred_id: Option<&str>, preferred_field: Option<&str>) -> String {
        let base = preferred_id
            .filter(|id| !id.is_empty())
            .or_else(|| preferred_field.filter(|field| !field.is_empty()));

        let mut count: u64 = 0;
        loop {
            let candidate = match base {
                Some(base) if count == 0 => base.to_owned(),
                Some(base) => format!("{base}_{count}"),
                None => count.to_string(),
            };
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
            count += 1;
        }
    }
}
