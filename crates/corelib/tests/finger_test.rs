//! Tests for the finger-table routing structure.

use corelib::identifier::{Identifier, ID_BITS};
use corelib::node::NodeAddr;
use corelib::{Error, FingerTable};

fn addr(n: u16) -> NodeAddr {
    NodeAddr::new("node", n)
}

/// A table whose entry i is a distinct address tagged with i.
fn indexed_table(owner: Identifier) -> FingerTable {
    let mut i = 0u16;
    FingerTable::build(owner, |_| {
        let entry = addr(i);
        i += 1;
        Ok(entry)
    })
    .unwrap()
}

#[test]
fn test_build_resolves_every_power_of_two_target() {
    let owner = Identifier::from_u32(9);
    let mut targets = Vec::new();
    FingerTable::build(owner, |target| {
        targets.push(target);
        Ok(addr(0))
    })
    .unwrap();
    assert_eq!(targets.len(), ID_BITS as usize);
    for (i, target) in targets.iter().enumerate() {
        assert_eq!(*target, owner.wrapping_add(Identifier::pow2(i as u32)));
    }
}

#[test]
fn test_lookup_first_offset_hits_entry_zero() {
    let owner = Identifier::from_u32(0);
    let table = indexed_table(owner);
    let key = owner.wrapping_add(Identifier::pow2(0));
    assert_eq!(table.lookup_index(key).unwrap(), 0);
    assert_eq!(table.lookup(key).unwrap(), &addr(0));
}

#[test]
fn test_lookup_walks_successor_arcs() {
    let owner = Identifier::from_u32(0);
    let table = indexed_table(owner);
    // n + 2^i sits at the start of arc i; one above it is still arc i (for
    // arcs wider than one identifier).
    for i in [1u32, 5, 17, 100, 158] {
        let key = owner.wrapping_add(Identifier::pow2(i));
        assert_eq!(table.lookup_index(key).unwrap(), i as usize);
        assert_eq!(
            table.lookup_index(key.next()).unwrap(),
            i as usize,
            "arc {i} covers more than its first identifier"
        );
    }
}

#[test]
fn test_last_arc_wraps_to_cover_the_owner() {
    // The arc at index 159 runs from n + 2^159 around to n + 1, so the
    // owner's own identifier lands there.
    let owner = Identifier::from_u32(0);
    let table = indexed_table(owner);
    assert_eq!(table.lookup_index(owner).unwrap(), (ID_BITS - 1) as usize);
}

#[test]
fn test_patch_range_touches_exactly_the_targets_inside() {
    let owner = Identifier::from_u32(0);
    let mut table = indexed_table(owner);
    let lo = owner.wrapping_add(Identifier::pow2(3));
    let hi = owner.wrapping_add(Identifier::pow2(5));
    let patched = addr(9999);
    table.patch_range(lo, hi, &patched);
    for i in 0..ID_BITS as usize {
        if i == 3 || i == 4 {
            assert_eq!(table.entry(i), &patched, "entry {i} lies in [2^3, 2^5)");
        } else {
            assert_eq!(table.entry(i), &addr(i as u16), "entry {i} must not change");
        }
    }
}

#[test]
fn test_patch_range_empty_interval_is_a_noop() {
    let owner = Identifier::from_u32(0);
    let mut table = indexed_table(owner);
    let bound = owner.wrapping_add(Identifier::pow2(4));
    table.patch_range(bound, bound, &addr(9999));
    for i in 0..ID_BITS as usize {
        assert_eq!(table.entry(i), &addr(i as u16));
    }
}

#[test]
fn test_from_entries_rejects_wrong_length() {
    let err = FingerTable::from_entries(Identifier::zero(), vec![addr(0); 3]).unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[test]
fn test_rebuild_exposes_previous_complete_table() {
    let owner = Identifier::from_u32(0);
    let old = addr(1);
    let new = addr(2);
    let mut table = FingerTable::uniform(owner, old.clone());
    table
        .rebuild(|previous, _| {
            // every entry of the table being replaced is still the old,
            // complete one while the new one is assembled
            assert_eq!(previous.entry(0), &old);
            assert_eq!(previous.entry((ID_BITS - 1) as usize), &old);
            Ok(new.clone())
        })
        .unwrap();
    for i in 0..ID_BITS as usize {
        assert_eq!(table.entry(i), &new);
    }
}
