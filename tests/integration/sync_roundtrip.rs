//! Integration tests for pull/push between two endpoints over loopback.
//!
//! Each side is a real [`TaskStore`] served by the sync endpoint on an
//! ephemeral port, and the client talks to it over HTTP.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use endel::sync::{PeerAddr, SyncClient, SyncError};
use endel_bridge::server::{BridgeState, DEFAULT_MAX_PAYLOAD_SIZE, start_server_with_state};
use endel_bridge::store::TaskStore;
use endel_proto::task::{Priority, Task};
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// One side of a sync: a store in its own temp dir, served on loopback.
struct Side {
    _dir: tempfile::TempDir,
    store: Arc<TaskStore>,
    peer: PeerAddr,
    server: JoinHandle<()>,
}

impl Drop for Side {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn side() -> Side {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(TaskStore::open(dir.path().join("tareas.json")));
    let state = Arc::new(BridgeState::new(Arc::clone(&store)));
    let (addr, server) = start_server_with_state("127.0.0.1:0", state, DEFAULT_MAX_PAYLOAD_SIZE)
        .await
        .expect("bind");
    let peer = PeerAddr::parse(&addr.to_string()).expect("peer addr");
    Side {
        _dir: dir,
        store,
        peer,
        server,
    }
}

fn client_for(side: &Side) -> SyncClient {
    SyncClient::new(side.peer.clone(), Duration::from_secs(2)).expect("client")
}

fn phone_tasks() -> Vec<Task> {
    vec![
        Task::new("Read chapter 3", date(2025, 9, 1), Priority::High),
        Task {
            completed: true,
            ..Task::new("Lab report", date(2025, 9, 2), Priority::Low)
        },
    ]
}

// ---------------------------------------------------------------------------
// Pull
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pull_replaces_local_with_peer_collection() {
    let phone = side().await;
    let pc = side().await;
    phone.store.save(&phone_tasks()).await.unwrap();
    pc.store
        .add("stale", date(2020, 1, 1), "alta")
        .await
        .unwrap();

    let count = client_for(&phone).pull(&pc.store).await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(pc.store.load().await.unwrap().into_vec(), phone_tasks());
}

#[tokio::test]
async fn pull_twice_is_idempotent() {
    let phone = side().await;
    let pc = side().await;
    phone.store.save(&phone_tasks()).await.unwrap();
    let client = client_for(&phone);

    client.pull(&pc.store).await.unwrap();
    let first = pc.store.raw_bytes().await.unwrap();
    client.pull(&pc.store).await.unwrap();
    let second = pc.store.raw_bytes().await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn pull_from_empty_peer_empties_local() {
    let phone = side().await;
    let pc = side().await;
    pc.store.save(&phone_tasks()).await.unwrap();

    let count = client_for(&phone).pull(&pc.store).await.unwrap();

    assert_eq!(count, 0);
    assert!(pc.store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn pull_from_unreachable_peer_leaves_local_untouched() {
    let pc = side().await;
    pc.store.save(&phone_tasks()).await.unwrap();
    let before = pc.store.raw_bytes().await.unwrap();

    // Reserve a port, then free it so nothing is listening there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let client = SyncClient::new(
        PeerAddr::parse(&dead.to_string()).unwrap(),
        Duration::from_secs(1),
    )
    .unwrap();
    let err = client.pull(&pc.store).await.unwrap_err();

    assert!(matches!(err, SyncError::Network(_)), "got {err:?}");
    assert_eq!(pc.store.raw_bytes().await.unwrap(), before);
}

/// Accepts connections and holds them open without ever answering.
async fn silent_peer() -> (PeerAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (PeerAddr::parse(&addr.to_string()).unwrap(), task)
}

#[tokio::test]
async fn silent_peer_times_out_and_leaves_local_untouched() {
    let pc = side().await;
    pc.store.save(&phone_tasks()).await.unwrap();
    let before = pc.store.raw_bytes().await.unwrap();

    let (peer, silent) = silent_peer().await;
    let timeout = Duration::from_secs(1);
    let client = SyncClient::new(peer, timeout).unwrap();

    let started = std::time::Instant::now();
    let err = client.pull(&pc.store).await.unwrap_err();
    let waited = started.elapsed();
    assert!(matches!(err, SyncError::Network(_)), "got {err:?}");
    assert!(waited >= timeout - Duration::from_millis(50), "gave up early: {waited:?}");
    assert!(waited < timeout * 5, "not bounded: {waited:?}");
    assert_eq!(pc.store.raw_bytes().await.unwrap(), before);

    let started = std::time::Instant::now();
    let err = client.push(&pc.store).await.unwrap_err();
    let waited = started.elapsed();
    assert!(matches!(err, SyncError::Network(_)), "got {err:?}");
    assert!(waited < timeout * 5, "not bounded: {waited:?}");
    assert_eq!(pc.store.raw_bytes().await.unwrap(), before);

    silent.abort();
}

#[tokio::test]
async fn pull_of_corrupt_peer_file_leaves_local_untouched() {
    let phone = side().await;
    let pc = side().await;
    tokio::fs::write(phone.store.path(), b"[{\"name\": ")
        .await
        .unwrap();
    pc.store.save(&phone_tasks()).await.unwrap();
    let before = pc.store.raw_bytes().await.unwrap();

    let err = client_for(&phone).pull(&pc.store).await.unwrap_err();

    assert!(
        matches!(err, SyncError::PeerRejected { status: 500, .. }),
        "got {err:?}"
    );
    assert_eq!(pc.store.raw_bytes().await.unwrap(), before);
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

#[tokio::test]
async fn push_replaces_peer_collection() {
    let phone = side().await;
    let pc = side().await;
    pc.store.save(&phone_tasks()).await.unwrap();
    phone
        .store
        .add("only on phone", date(2025, 1, 1), "media")
        .await
        .unwrap();

    let count = client_for(&phone).push(&pc.store).await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(phone.store.load().await.unwrap().into_vec(), phone_tasks());
}

#[tokio::test]
async fn push_empty_then_fetch_returns_empty() {
    let phone = side().await;
    let pc = side().await;
    phone.store.save(&phone_tasks()).await.unwrap();
    let client = client_for(&phone);

    client.push(&pc.store).await.unwrap();

    assert!(client.fetch().await.unwrap().is_empty());
}

#[tokio::test]
async fn push_then_pull_round_trips_between_peers() {
    let phone = side().await;
    let pc = side().await;
    let laptop = side().await;
    pc.store.save(&phone_tasks()).await.unwrap();

    client_for(&phone).push(&pc.store).await.unwrap();
    client_for(&phone).pull(&laptop.store).await.unwrap();

    assert_eq!(
        laptop.store.load().await.unwrap(),
        pc.store.load().await.unwrap()
    );
}
