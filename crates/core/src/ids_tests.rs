// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn clone_id_appends_monotonic_suffix() {
    let path = ContentPath::new("/std/room");
    let counter = CloneCounter::new();
    let a = ObjectId::for_clone(&path, counter.next());
    let b = ObjectId::for_clone(&path, counter.next());

    assert_eq!(a.as_str(), "/std/room#0");
    assert_eq!(b.as_str(), "/std/room#1");
    assert_ne!(a, b);
}

#[test]
fn blueprint_id_has_no_suffix() {
    let path = ContentPath::new("/std/room");
    let id = ObjectId::for_blueprint(&path);
    assert_eq!(id.as_str(), "/std/room");
    assert!(!id.is_clone());
}

#[test]
fn is_clone_detects_hash_suffix() {
    assert!(ObjectId::new("/std/room#7").is_clone());
    assert!(!ObjectId::new("/std/room").is_clone());
}

#[test]
fn string_id_compares_against_str() {
    let id = SessionId::new("sess-1");
    assert_eq!(id, "sess-1");
    assert_eq!(id, *"sess-1");
}
