//! Tests for the interval-bound ownership table.

use corelib::{Error, Identifier, OwnershipTable};

/// A table accepting the entire ring (equal bounds, storage convention).
fn whole_ring() -> OwnershipTable {
    OwnershipTable::new(Identifier::zero(), Identifier::zero())
}

#[test]
fn test_put_get_roundtrip() {
    let mut table = whole_ring();
    table.put("apple", "red").unwrap();
    assert_eq!(table.get("apple").unwrap(), "red");
}

#[test]
fn test_put_overwrites() {
    let mut table = whole_ring();
    table.put("apple", "red").unwrap();
    table.put("apple", "green").unwrap();
    assert_eq!(table.get("apple").unwrap(), "green");
    assert_eq!(table.len(), 1);
}

#[test]
fn test_delete_returns_prior_value() {
    let mut table = whole_ring();
    table.put("apple", "red").unwrap();
    assert_eq!(table.delete("apple").unwrap(), "red");
    assert_eq!(table.get("apple"), Err(Error::Key));
    assert_eq!(table.delete("apple"), Err(Error::Key));
}

#[test]
fn test_missing_key_in_range() {
    let table = whole_ring();
    assert_eq!(table.get("apple"), Err(Error::Key));
}

#[test]
fn test_out_of_range_beats_table_contents() {
    // A one-identifier arc that cannot contain the key's hash.
    let id = Identifier::hash_key("apple");
    let mut table = OwnershipTable::new(id.next(), id.next().next());
    assert_eq!(table.put("apple", "red"), Err(Error::Range));
    assert_eq!(table.get("apple"), Err(Error::Range));
    assert_eq!(table.delete("apple"), Err(Error::Range));
}

#[test]
fn test_keys_snapshot() {
    let mut table = whole_ring();
    table.put("apple", "red").unwrap();
    table.put("banana", "yellow").unwrap();
    let mut keys = table.keys();
    keys.sort();
    assert_eq!(keys, vec!["apple".to_string(), "banana".to_string()]);
}

// ============================================================================
// Partition
// ============================================================================

#[test]
fn test_partition_splits_key_sets_exactly() {
    let names = ["apple", "banana", "cherry", "damson", "elder", "fig", "grape"];
    let mut table = whole_ring();
    for name in names {
        table.put(name, "fruit").unwrap();
    }

    // Split at one key's hash: everything strictly below it migrates.
    let split = Identifier::hash_key("damson");
    let lower = table.partition(split).unwrap();

    assert_eq!(lower.start(), Identifier::zero());
    assert_eq!(lower.end(), split);
    assert_eq!(table.start(), split);
    assert_eq!(table.end(), Identifier::zero());

    let mut seen = 0;
    for name in names {
        let id = Identifier::hash_key(name);
        let in_lower = lower.get(name).is_ok();
        let in_upper = table.get(name).is_ok();
        assert!(in_lower ^ in_upper, "{name} must live in exactly one half");
        assert_eq!(in_lower, id < split, "{name} landed on the wrong side");
        seen += 1;
    }
    assert_eq!(lower.len() + table.len(), seen, "no key duplicated or lost");
    // "damson" itself hashes at the split, which the receiver keeps
    assert!(table.get("damson").is_ok());
}

#[test]
fn test_partition_rejects_split_outside_interval() {
    let id = Identifier::hash_key("apple");
    let mut table = OwnershipTable::new(id, id.next());
    let err = table.partition(id.next().next()).unwrap_err();
    assert_eq!(err, Error::Range);
    // the failed split left the interval untouched
    assert_eq!(table.start(), id);
    assert_eq!(table.end(), id.next());
}

#[test]
fn test_partition_of_empty_table() {
    let mut table = whole_ring();
    let split = Identifier::from_u32(1000);
    let lower = table.partition(split).unwrap();
    assert!(lower.is_empty());
    assert!(table.is_empty());
    assert_eq!(lower.end(), table.start());
}
