// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct ProbeId;
}

#[test]
fn serializes_as_bare_string() {
    let id = ProbeId::new("abc");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");

    let back: ProbeId = serde_json::from_str("\"xyz\"").unwrap();
    assert_eq!(back, "xyz");
}

#[test]
fn hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(ProbeId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));
}

#[test]
fn sequential_ids_are_prefixed_and_increasing() {
    let gen = SequentialIdGen::new("sess");
    assert_eq!(gen.next(), "sess-1");
    assert_eq!(gen.next(), "sess-2");

    // Clones share the counter
    let clone = gen.clone();
    assert_eq!(clone.next(), "sess-3");
}

#[test]
fn uuid_ids_are_unique() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}
