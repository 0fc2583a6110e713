//! Edge case tests for tether-core
//!
//! These tests cover boundary conditions and unusual inputs.

use proptest::prelude::*;
use tether_core::{ChatEntry, OptimisticStore, Origin, ReconcileOutcome, SyncMessage};

fn push(sender: &str, content: &str, timestamp: u64) -> SyncMessage {
    let raw = serde_json::json!({
        "type": "chatUpdated",
        "message": {"sender": sender, "content": content, "timestamp": timestamp},
    });
    SyncMessage::parse(&raw.to_string()).unwrap()
}

// ============================================================================
// String Edge Cases
// ============================================================================

#[test]
fn empty_content() {
    let mut store = OptimisticStore::new();
    let outcome = store.reconcile(&push("support", "", 1000));
    assert!(matches!(outcome, ReconcileOutcome::Appended(_)));
    assert_eq!(store.snapshot()[0].data.content, "");
}

#[test]
fn unicode_content() {
    let mut store = OptimisticStore::new();

    let contents = vec![
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Hello\nWorld\tTab",
        "quote \" and backslash \\",
    ];

    for (i, content) in contents.iter().enumerate() {
        let outcome = store.reconcile(&push("support", content, 1000 + i as u64));
        assert!(
            matches!(outcome, ReconcileOutcome::Appended(_)),
            "failed for: {content}"
        );
    }
    assert_eq!(store.len(), contents.len());
}

// ============================================================================
// Malformed Input
// ============================================================================

#[test]
fn garbage_frames_never_panic() {
    let frames = [
        "",
        "null",
        "42",
        "\"just a string\"",
        "{}",
        r#"{"type": 7, "message": {}}"#,
        r#"{"type":"chatUpdated","message":"not an object"}"#,
        r#"{"type":"chatUpdated","message":{"sender":"a","content":"b"}}"#, // no timestamp
        "{\"type\":\"chatUpdated\"",
    ];

    for frame in frames {
        assert!(SyncMessage::parse(frame).is_err(), "accepted: {frame}");
    }
}

#[test]
fn timestamp_extremes() {
    let mut store = OptimisticStore::new();
    store.reconcile(&push("support", "epoch", 0));
    store.reconcile(&push("support", "far future", u64::MAX));
    assert_eq!(store.len(), 2);

    // stale_pending must not underflow around extreme timestamps.
    store.apply_optimistic(ChatEntry::new("admin", "late", u64::MAX));
    assert!(store.stale_pending(0, 1000).is_empty());
}

// ============================================================================
// Reconciliation Properties
// ============================================================================

proptest! {
    /// Applying any sequence of pushes twice (with arbitrary
    /// interleaving of the duplicates) yields the same snapshot as
    /// applying it once.
    #[test]
    fn prop_reconcile_idempotent(
        contents in proptest::collection::vec("[a-z]{1,8}", 1..8),
    ) {
        let pushes: Vec<_> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| push("support", c, 1000 + i as u64))
            .collect();

        let mut once = OptimisticStore::new();
        for p in &pushes {
            once.reconcile(p);
        }

        let mut twice = OptimisticStore::new();
        for p in &pushes {
            twice.reconcile(p);
            twice.reconcile(p);
        }

        let view_once: Vec<_> = once.snapshot().iter().map(|r| &r.data).collect();
        let view_twice: Vec<_> = twice.snapshot().iter().map(|r| &r.data).collect();
        prop_assert_eq!(view_once, view_twice);
    }

    /// Every optimistic apply is immediately visible, and confirmation
    /// never changes the record count.
    #[test]
    fn prop_optimistic_then_confirm_preserves_count(
        contents in proptest::collection::vec("[a-z]{1,8}", 1..8),
    ) {
        let mut store = OptimisticStore::new();
        let mut ids = Vec::new();

        for (i, content) in contents.iter().enumerate() {
            let id = store.apply_optimistic(ChatEntry::new("admin", content, i as u64));
            prop_assert!(store.snapshot().iter().any(|r| r.local_id == id));
            ids.push(id);
        }
        let count = store.len();

        for (i, content) in contents.iter().enumerate() {
            store.reconcile(&push("admin", content, 5000 + i as u64));
        }

        prop_assert_eq!(store.len(), count);
        for id in &ids {
            prop_assert_eq!(store.get(id).unwrap().origin, Origin::Confirmed);
        }
    }

    /// Seeding then pushing keeps strict insertion order.
    #[test]
    fn prop_snapshot_insertion_ordered(
        seed_len in 0usize..6,
        push_len in 0usize..6,
    ) {
        let mut store = OptimisticStore::new();
        let seed: Vec<_> = (0..seed_len)
            .map(|i| ChatEntry::new("support", format!("seed {i}"), i as u64))
            .collect();
        store.seed(seed);

        for i in 0..push_len {
            store.reconcile(&push("admin", &format!("push {i}"), 1000 + i as u64));
        }

        let snapshot = store.snapshot();
        prop_assert_eq!(snapshot.len(), seed_len + push_len);
        for (i, record) in snapshot.iter().take(seed_len).enumerate() {
            prop_assert_eq!(&record.data.content, &format!("seed {i}"));
        }
        for (i, record) in snapshot.iter().skip(seed_len).enumerate() {
            prop_assert_eq!(&record.data.content, &format!("push {i}"));
        }
    }
}
