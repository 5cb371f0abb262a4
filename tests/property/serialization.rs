//! Property-based tests for the task collection wire format.
//!
//! Uses proptest to verify:
//! 1. Any valid task collection survives encode → decode with order and
//!    every field preserved.
//! 2. Encoding is stable: re-encoding a decoded collection yields the same bytes.
//! 3. Random bytes never cause a panic in `decode_collection`.
//! 4. Any priority text normalizes to one of the three wire values.

use chrono::NaiveDate;
use endel_proto::task::{Priority, Task, TaskList};
use endel_proto::wire::{decode_collection, encode_collection};
use proptest::prelude::*;

// --- Strategies ---

/// Strategy for generating valid calendar dates.
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1970i32..2200, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

/// Strategy for generating priorities.
fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

/// Strategy for generating names that are not blank.
fn arb_name() -> impl Strategy<Value = String> {
    "[^\x00]{0,32}[a-zA-Z0-9áéíóúñ]{1}[^\x00]{0,32}"
}

/// Strategy for generating tasks, with and without subject metadata.
fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_name(),
        arb_date(),
        arb_priority(),
        any::<bool>(),
        proptest::option::of("[A-Z.]{1,10}"),
        proptest::option::of("[a-z ]{1,30}"),
    )
        .prop_map(|(name, due_date, priority, completed, subject, teacher)| Task {
            name,
            due_date,
            priority,
            completed,
            subject,
            teacher,
        })
}

// --- Property tests ---

proptest! {
    /// Any valid collection survives an encode → decode round-trip.
    #[test]
    fn collection_round_trip(tasks in prop::collection::vec(arb_task(), 0..16)) {
        let bytes = encode_collection(&tasks).expect("encode should succeed");
        let decoded = decode_collection(&bytes).expect("decode should succeed");
        prop_assert_eq!(tasks, decoded);
    }

    /// Re-encoding a decoded collection reproduces the same bytes.
    #[test]
    fn encoding_is_byte_stable(tasks in prop::collection::vec(arb_task(), 0..16)) {
        let first = encode_collection(&tasks).expect("encode should succeed");
        let decoded = decode_collection(&first).expect("decode should succeed");
        let second = encode_collection(&decoded).expect("encode should succeed");
        prop_assert_eq!(first, second);
    }

    /// Adding a task grows the list by one and the new task is open.
    #[test]
    fn add_appends_open_task(
        tasks in prop::collection::vec(arb_task(), 0..8),
        name in arb_name(),
        date in arb_date(),
        priority in arb_priority(),
    ) {
        let mut list = TaskList::from(tasks);
        let before = list.len();
        list.add(Task::new(&name, date, priority));
        prop_assert_eq!(list.len(), before + 1);
        prop_assert!(!list.as_slice()[before].completed);
    }

    /// Random bytes never cause a panic when decoded — they return Err gracefully.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_collection(&bytes);
    }

    /// Any priority text normalizes to one of the three wire values.
    #[test]
    fn priority_always_normalizes(text in ".*") {
        let priority = Priority::parse_lenient(&text);
        prop_assert!(Priority::ALL.contains(&priority));
        prop_assert!(["alta", "media", "baja"].contains(&priority.as_wire()));
    }
}
