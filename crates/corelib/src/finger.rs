//! Finger table: the per-node routing structure.
//!
//! Entry `i` holds the address of the node responsible for identifier
//! `n + 2^i` (mod 2^160), where `n` is the owning node's arc end. A lookup
//! walks the entries in order and returns the finger whose successor arc
//! brackets the key: the closest known predecessor of the key among the
//! fingers, the standard Chord routing step.

use crate::error::{Error, Result};
use crate::identifier::{Identifier, ID_BITS};
use crate::interval::RingRange;
use crate::node::NodeAddr;

/// 160-entry routing table for one node.
#[derive(Debug, Clone)]
pub struct FingerTable {
    owner: Identifier,
    entries: Vec<NodeAddr>,
}

impl FingerTable {
    /// Builds a fresh table for `owner`, resolving every target through the
    /// supplied callback.
    pub fn build(
        owner: Identifier,
        mut resolve: impl FnMut(Identifier) -> Result<NodeAddr>,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(ID_BITS as usize);
        for i in 0..ID_BITS {
            entries.push(resolve(owner.wrapping_add(Identifier::pow2(i)))?);
        }
        Ok(FingerTable { owner, entries })
    }

    /// Table with every entry pointing at one address: the sole member of a
    /// fresh ring is its own successor at every offset.
    pub fn uniform(owner: Identifier, addr: NodeAddr) -> Self {
        FingerTable {
            owner,
            entries: vec![addr; ID_BITS as usize],
        }
    }

    /// Reassembles a table from already-resolved entries, e.g. ones that
    /// arrived over the wire inside a join handoff.
    pub fn from_entries(owner: Identifier, entries: Vec<NodeAddr>) -> Result<Self> {
        if entries.len() != ID_BITS as usize {
            return Err(Error::Transport(format!(
                "finger table must have {} entries, got {}",
                ID_BITS,
                entries.len()
            )));
        }
        Ok(FingerTable { owner, entries })
    }

    /// Re-resolves every entry. The new table is assembled in full before it
    /// is installed, so a resolver that reads the table it is rebuilding
    /// observes the previous complete table, never a partially rebuilt one.
    pub fn rebuild(
        &mut self,
        mut resolve: impl FnMut(&FingerTable, Identifier) -> Result<NodeAddr>,
    ) -> Result<()> {
        let mut entries = Vec::with_capacity(ID_BITS as usize);
        for i in 0..ID_BITS {
            entries.push(resolve(self, self.owner.wrapping_add(Identifier::pow2(i)))?);
        }
        self.entries = entries;
        Ok(())
    }

    /// Arc end of the owning node.
    pub fn owner(&self) -> Identifier {
        self.owner
    }

    /// Direct access to entry `i`.
    pub fn entry(&self, i: usize) -> &NodeAddr {
        &self.entries[i]
    }

    /// Index of the finger whose successor arc `[n+2^i, n+2^(i+1))` contains
    /// `key` (at `i = 159` the upper bound wraps to `n + 2^0`).
    ///
    /// Fails with [`Error::Find`] only if no arc matches, which cannot happen
    /// for a table spanning the whole ring.
    pub fn lookup_index(&self, key: Identifier) -> Result<usize> {
        let mut lo = self.owner.wrapping_add(Identifier::pow2(0));
        for i in 0..ID_BITS {
            let hi = if i == ID_BITS - 1 {
                self.owner.wrapping_add(Identifier::pow2(0))
            } else {
                self.owner.wrapping_add(Identifier::pow2(i + 1))
            };
            if RingRange::routing(lo, hi).contains(key) {
                return Ok(i as usize);
            }
            lo = hi;
        }
        Err(Error::Find)
    }

    /// Address of the node to route `key` toward; see
    /// [`FingerTable::lookup_index`].
    pub fn lookup(&self, key: Identifier) -> Result<&NodeAddr> {
        self.lookup_index(key).map(|i| &self.entries[i])
    }

    /// Points every entry whose target `n + 2^i` falls in `[lo, hi)`
    /// (routing convention) at `new_addr`, leaving the rest untouched.
    /// Incremental repair after a ring-membership change, in place of a full
    /// rebuild.
    pub fn patch_range(&mut self, lo: Identifier, hi: Identifier, new_addr: &NodeAddr) {
        let range = RingRange::routing(lo, hi);
        for i in 0..ID_BITS {
            let target = self.owner.wrapping_add(Identifier::pow2(i));
            if range.contains(target) {
                self.entries[i as usize] = new_addr.clone();
            }
        }
    }
}
