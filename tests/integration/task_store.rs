//! Integration tests for the file-backed task store.
//!
//! Covers persistence round-trips, the append and completion invariants,
//! index bounds, corrupt-state reporting, and serialization of concurrent
//! mutations within one process.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use chrono::NaiveDate;
use endel_bridge::store::{StoreError, TaskStore};
use endel_proto::task::{Priority, Task};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn temp_store() -> (tempfile::TempDir, TaskStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TaskStore::open(dir.path().join("tareas.json"));
    (dir, store)
}

/// Three tasks with mixed fields, including a duplicate name.
fn sample_tasks() -> Vec<Task> {
    vec![
        Task::new("Essay", date(2025, 12, 25), Priority::High)
            .with_subject("ESP", Some("literature".to_string())),
        Task::new("Essay", date(2025, 12, 25), Priority::Low),
        Task {
            completed: true,
            ..Task::new("Problem set", date(2026, 1, 9), Priority::Medium)
        },
    ]
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_then_load_round_trips() {
    let (_dir, store) = temp_store();
    let tasks = sample_tasks();
    store.save(&tasks).await.unwrap();
    assert_eq!(store.load().await.unwrap().into_vec(), tasks);
}

#[tokio::test]
async fn save_overwrites_previous_state() {
    let (_dir, store) = temp_store();
    store.save(&sample_tasks()).await.unwrap();
    store.save(&[]).await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn file_is_human_readable_utf8() {
    let (_dir, store) = temp_store();
    store
        .add("Álgebra — repaso", date(2025, 3, 1), "baja")
        .await
        .unwrap();
    let text = String::from_utf8(store.raw_bytes().await.unwrap().unwrap()).unwrap();
    assert!(text.contains("\"name\": \"Álgebra — repaso\""));
    assert!(text.contains("\"priority\": \"baja\""));
}

#[tokio::test]
async fn legacy_file_loads_and_rewrites_in_current_format() {
    let (_dir, store) = temp_store();
    let legacy = r#"[
  {
    "nombre": "ESP - resumen",
    "fecha": "2025-10-06",
    "fecha_txt": "06/10/25",
    "prioridad": "alta",
    "completada": false,
    "materia": "ESP",
    "maestro": "someone"
  }
]"#;
    tokio::fs::write(store.path(), legacy).await.unwrap();

    let tasks = store.complete(0).await.unwrap();
    assert!(tasks.as_slice()[0].completed);
    assert_eq!(tasks.as_slice()[0].subject.as_deref(), Some("ESP"));

    let text = String::from_utf8(store.raw_bytes().await.unwrap().unwrap()).unwrap();
    assert!(text.contains("\"name\""));
    assert!(!text.contains("nombre"));
    assert!(!text.contains("fecha_txt"));
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_appends_exactly_one_open_task() {
    let (_dir, store) = temp_store();
    store.save(&sample_tasks()).await.unwrap();

    let tasks = store.add("New", date(2025, 1, 1), "media").await.unwrap();
    assert_eq!(tasks.len(), 4);
    let last = &tasks.as_slice()[3];
    assert_eq!(last.name, "New");
    assert!(!last.completed);
    assert_eq!(store.load().await.unwrap(), tasks);
}

#[tokio::test]
async fn add_blank_name_uses_placeholder() {
    let (_dir, store) = temp_store();
    let tasks = store.add("", date(2025, 1, 1), "").await.unwrap();
    assert_eq!(tasks.as_slice()[0].name, "(untitled)");
    assert_eq!(tasks.as_slice()[0].priority, Priority::Medium);
}

#[tokio::test]
async fn complete_persists_and_never_reverts() {
    let (_dir, store) = temp_store();
    store.save(&sample_tasks()).await.unwrap();

    store.complete(0).await.unwrap();
    let tasks = store.complete(2).await.unwrap();
    assert!(tasks.as_slice()[0].completed);
    assert!(tasks.as_slice()[2].completed);

    // Other operations keep completed tasks completed.
    let tasks = store.add("another", date(2025, 1, 1), "alta").await.unwrap();
    assert!(tasks.as_slice()[0].completed);
    let (_, tasks) = store.delete(1).await.unwrap();
    assert!(tasks.as_slice()[0].completed);
    assert!(tasks.as_slice()[1].completed);
}

#[tokio::test]
async fn delete_returns_removed_task_and_persists() {
    let (_dir, store) = temp_store();
    store.save(&sample_tasks()).await.unwrap();

    let (removed, tasks) = store.delete(2).await.unwrap();
    assert_eq!(removed.name, "Problem set");
    assert_eq!(tasks.len(), 2);
    assert_eq!(store.load().await.unwrap(), tasks);
}

#[tokio::test]
async fn complete_out_of_range_leaves_file_untouched() {
    let (_dir, store) = temp_store();
    store.save(&sample_tasks()).await.unwrap();
    let before = store.raw_bytes().await.unwrap();

    let err = store.complete(5).await.unwrap_err();
    assert!(matches!(err, StoreError::IndexOutOfRange { index: 5, len: 3 }));
    assert_eq!(store.load().await.unwrap().len(), 3);
    assert_eq!(store.raw_bytes().await.unwrap(), before);
}

#[tokio::test]
async fn delete_out_of_range_leaves_file_untouched() {
    let (_dir, store) = temp_store();
    store.save(&sample_tasks()).await.unwrap();
    let before = store.raw_bytes().await.unwrap();

    let err = store.delete(3).await.unwrap_err();
    assert!(matches!(err, StoreError::IndexOutOfRange { index: 3, len: 3 }));
    assert_eq!(store.raw_bytes().await.unwrap(), before);
}

#[tokio::test]
async fn operations_on_empty_store_are_out_of_range() {
    let (_dir, store) = temp_store();
    assert!(matches!(
        store.complete(0).await,
        Err(StoreError::IndexOutOfRange { index: 0, len: 0 })
    ));
    assert!(matches!(
        store.delete(0).await,
        Err(StoreError::IndexOutOfRange { index: 0, len: 0 })
    ));
    assert!(store.raw_bytes().await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn truncated_file_is_corrupt_state() {
    let (_dir, store) = temp_store();
    store.save(&sample_tasks()).await.unwrap();
    let bytes = store.raw_bytes().await.unwrap().unwrap();
    tokio::fs::write(store.path(), &bytes[..bytes.len() / 2])
        .await
        .unwrap();

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, StoreError::CorruptState { .. }));
    assert!(err.to_string().contains("tareas.json"));
}

#[tokio::test]
async fn unwritable_location_is_fatal_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    tokio::fs::write(&blocker, b"file").await.unwrap();
    let store = TaskStore::open(blocker.join("tareas.json"));

    let err = store.save(&sample_tasks()).await.unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(err.is_fatal());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_are_all_kept() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .add(&format!("task {i}"), date(2025, 1, 1), "media")
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let tasks = store.load().await.unwrap();
    assert_eq!(tasks.len(), 20);
    for i in 0..20 {
        let name = format!("task {i}");
        assert!(tasks.iter().any(|t| t.name == name), "missing {name}");
    }
}
