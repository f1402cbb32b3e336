//! Instance numbering for displayed groups.
//!
//! One original group can be split into several displayed groups when its
//! leaves are not contiguous (or span pinned sections). Each split gets the
//! next instance number for that group id. The counter lives for one whole
//! reconcile pass over every pinned section, so the same `(group id,
//! instance)` pair is never handed out twice within that pass.

use rustc_hash::FxHashMap;

/// Per-pass counter of displayed instances, keyed by original group id.
#[derive(Debug, Clone, Default)]
pub struct GroupInstanceAllocator {
    next: FxHashMap<String, u32>,
}

impl GroupInstanceAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next instance number for `group_id`, starting at 0.
    pub fn instance_for(&mut self, group_id: &str) -> u32 {
        match self.next.get_mut(group_id) {
            Some(next) => {
                let instance = *next;
                *next += 1;
                instance
            }
            None => {
                self.next.insert(group_id.to_owned(), 1);
                0
            }
        }
    }
}
