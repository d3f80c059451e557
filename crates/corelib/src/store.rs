//! Key/value store bound to an ownership interval.
//!
//! Every key stored here hashes into the table's arc (storage convention:
//! `[start, end)`, equal bounds meaning the whole ring). Operations on keys
//! hashing elsewhere fail with a range error regardless of table contents;
//! the caller is expected to route them to the responsible node instead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifier::Identifier;
use crate::interval::RingRange;

/// Interval-bound map from key strings to value strings.
///
/// Crosses the wire during a join: the partition handed off to a joining
/// node is sent inside the register-join reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipTable {
    start: Identifier,
    end: Identifier,
    entries: HashMap<String, String>,
}

impl OwnershipTable {
    /// Creates an empty table serving `[start, end)`. Equal bounds mean the
    /// table serves the entire ring.
    pub fn new(start: Identifier, end: Identifier) -> Self {
        OwnershipTable {
            start,
            end,
            entries: HashMap::new(),
        }
    }

    /// Inclusive lower bound of the served arc.
    pub fn start(&self) -> Identifier {
        self.start
    }

    /// Exclusive upper bound of the served arc.
    pub fn end(&self) -> Identifier {
        self.end
    }

    /// The served arc under the storage convention.
    pub fn interval(&self) -> RingRange {
        RingRange::storage(self.start, self.end)
    }

    /// True if `id` hashes into the served arc.
    pub fn covers(&self, id: Identifier) -> bool {
        self.interval().contains(id)
    }

    /// Inserts or overwrites. Fails with [`Error::Range`] when the key
    /// hashes outside the served arc.
    pub fn put(&mut self, key: &str, value: &str) -> Result<()> {
        if !self.covers(Identifier::hash_key(key)) {
            return Err(Error::Range);
        }
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    /// Looks up a key. [`Error::Range`] when it hashes outside the arc,
    /// [`Error::Key`] when in range but absent.
    pub fn get(&self, key: &str) -> Result<&str> {
        if !self.covers(Identifier::hash_key(key)) {
            return Err(Error::Range);
        }
        self.entries.get(key).map(String::as_str).ok_or(Error::Key)
    }

    /// Removes a key and returns its prior value. Same error policy as
    /// [`OwnershipTable::get`].
    pub fn delete(&mut self, key: &str) -> Result<String> {
        if !self.covers(Identifier::hash_key(key)) {
            return Err(Error::Range);
        }
        self.entries.remove(key).ok_or(Error::Key)
    }

    /// Snapshot of the stored keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Splits the table at `split`, which must lie within the served arc.
    ///
    /// Returns a new table serving `[old_start, split)` holding exactly the
    /// entries whose keys hash into that arc; the receiver shrinks to
    /// `[split, old_end)` and the migrated entries are removed from it. This
    /// is the only mechanism for transferring ownership of a key range
    /// between nodes. The split is not observable half-done: the receiver is
    /// borrowed exclusively for the whole operation.
    pub fn partition(&mut self, split: Identifier) -> Result<OwnershipTable> {
        if !self.covers(split) {
            return Err(Error::Range);
        }
        let mut lower = OwnershipTable::new(self.start, split);
        let moved: Vec<String> = self
            .entries
            .keys()
            .filter(|key| lower.covers(Identifier::hash_key(key)))
            .cloned()
            .collect();
        for key in moved {
            if let Some(value) = self.entries.remove(&key) {
                lower.entries.insert(key, value);
            }
        }
        self.start = split;
        Ok(lower)
    }
}
