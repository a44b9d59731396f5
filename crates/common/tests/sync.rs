//! Integration tests for live sync sessions between two in-process peers.

use std::time::Duration;

use anyhow::Result;
use common::store::{DocOrder, DocPath};
use common::testkit;

const WAIT: Duration = Duration::from_secs(5);

fn path(s: &str) -> DocPath {
    s.parse().expect("valid doc path")
}

#[tokio::test]
async fn test_documents_flow_between_peers() -> Result<()> {
    let room = testkit::test_room("shared");
    let alice = testkit::memory_peer_with_room(&room).await?;
    let bob = testkit::memory_peer_with_room(&room).await?;

    let (alice_sync, _bob_sync) = testkit::connect_peers(&alice, &bob).await;

    let alice_store = alice.get_store(&room.tag()).await?;
    alice_store.set(path("greetings/hello"), "world").await?;
    alice_sync.force_reconcile();

    let bob = bob.clone();
    let tag = room.tag();
    testkit::eventually(WAIT, || {
        let bob = bob.clone();
        let tag = tag.clone();
        async move {
            let store = bob.get_store(&tag).await?;
            Ok(store
                .document(&path("greetings/hello"))
                .await?
                .is_some_and(|d| d.payload.as_ref() == b"world"))
        }
    })
    .await
}

#[tokio::test]
async fn test_sync_runs_both_directions() -> Result<()> {
    let room = testkit::test_room("shared");
    let alice = testkit::memory_peer_with_room(&room).await?;
    let bob = testkit::memory_peer_with_room(&room).await?;

    let (alice_sync, bob_sync) = testkit::connect_peers(&alice, &bob).await;

    alice
        .get_store(&room.tag())
        .await?
        .set(path("from/alice"), "a")
        .await?;
    bob.get_store(&room.tag())
        .await?
        .set(path("from/bob"), "b")
        .await?;
    alice_sync.force_reconcile();
    bob_sync.force_reconcile();

    let tag = room.tag();
    let (alice2, bob2) = (alice.clone(), bob.clone());
    testkit::eventually(WAIT, || {
        let (alice, bob, tag) = (alice2.clone(), bob2.clone(), tag.clone());
        async move {
            let alice_has = alice
                .get_store(&tag)
                .await?
                .document(&path("from/bob"))
                .await?
                .is_some();
            let bob_has = bob
                .get_store(&tag)
                .await?
                .document(&path("from/alice"))
                .await?
                .is_some();
            Ok(alice_has && bob_has)
        }
    })
    .await
}

#[tokio::test]
async fn test_large_payload_crosses_chunk_boundary() -> Result<()> {
    let room = testkit::test_room("bulk");
    let alice = testkit::memory_peer_with_room(&room).await?;
    let bob = testkit::memory_peer_with_room(&room).await?;

    let (alice_sync, _bob_sync) = testkit::connect_peers(&alice, &bob).await;

    // several times the 256-byte chunk cap, not chunk-aligned
    let payload: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
    alice
        .get_store(&room.tag())
        .await?
        .set(path("blob"), payload.clone())
        .await?;
    alice_sync.force_reconcile();

    let tag = room.tag();
    let bob2 = bob.clone();
    testkit::eventually(WAIT, || {
        let (bob, tag, payload) = (bob2.clone(), tag.clone(), payload.clone());
        async move {
            let store = bob.get_store(&tag).await?;
            Ok(store
                .document(&path("blob"))
                .await?
                .is_some_and(|d| d.payload.as_ref() == payload.as_slice()))
        }
    })
    .await
}

#[tokio::test]
async fn test_newer_write_wins_on_both_ends() -> Result<()> {
    let room = testkit::test_room("lww");
    let alice = testkit::memory_peer_with_room(&room).await?;
    let bob = testkit::memory_peer_with_room(&room).await?;

    // bob writes first, alice later; after sync both hold alice's version
    bob.get_store(&room.tag())
        .await?
        .set(path("note"), "old")
        .await?;
    tokio::time::sleep(Duration::from_millis(2)).await;
    alice
        .get_store(&room.tag())
        .await?
        .set(path("note"), "new")
        .await?;

    let (alice_sync, bob_sync) = testkit::connect_peers(&alice, &bob).await;
    alice_sync.force_reconcile();
    bob_sync.force_reconcile();

    let tag = room.tag();
    let (alice2, bob2) = (alice.clone(), bob.clone());
    testkit::eventually(WAIT, || {
        let (alice, bob, tag) = (alice2.clone(), bob2.clone(), tag.clone());
        async move {
            let on_alice = alice.get_store(&tag).await?.document(&path("note")).await?;
            let on_bob = bob.get_store(&tag).await?.document(&path("note")).await?;
            Ok(match (on_alice, on_bob) {
                (Some(a), Some(b)) => {
                    a.payload.as_ref() == b"new" && b.payload.as_ref() == b"new"
                }
                _ => false,
            })
        }
    })
    .await
}

#[tokio::test]
async fn test_interest_set_is_snapshotted_at_session_start() -> Result<()> {
    let early = testkit::test_room("early");
    let late = testkit::test_room("late");

    let alice = testkit::memory_peer_with_room(&early).await?;
    let bob = testkit::memory_peer_with_room(&early).await?;

    let (alice_sync, _bob_sync) = testkit::connect_peers(&alice, &bob).await;

    // both peers gain the late room only after the session exists
    for peer in [&alice, &bob] {
        let (read, write) = testkit::room_tokens(&late);
        peer.import_cap(&read).await?;
        peer.import_cap(&write).await?;
    }

    alice
        .get_store(&early.tag())
        .await?
        .set(path("seen"), "yes")
        .await?;
    alice
        .get_store(&late.tag())
        .await?
        .set(path("unseen"), "no")
        .await?;
    alice_sync.force_reconcile();

    // the early room syncs...
    let (tag_early, bob2) = (early.tag(), bob.clone());
    testkit::eventually(WAIT, || {
        let (bob, tag) = (bob2.clone(), tag_early.clone());
        async move {
            let store = bob.get_store(&tag).await?;
            Ok(store.document(&path("seen")).await?.is_some())
        }
    })
    .await?;

    // ...while the late room stays untouched on bob's side
    let bob_late = bob.get_store(&late.tag()).await?;
    assert!(bob_late.documents(DocOrder::Path).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_session_with_no_interests_stays_quiet() -> Result<()> {
    let alice = testkit::memory_peer();
    let bob = testkit::memory_peer();

    let (alice_sync, bob_sync) = testkit::connect_peers(&alice, &bob).await;
    alice_sync.force_reconcile();
    bob_sync.force_reconcile();

    // nothing to exchange, and nothing crashes
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!alice_sync.closed());
    assert!(!bob_sync.closed());
    Ok(())
}

#[tokio::test]
async fn test_remote_hangup_marks_session_closed() -> Result<()> {
    let room = testkit::test_room("gone");
    let alice = testkit::memory_peer_with_room(&room).await?;
    let bob = testkit::memory_peer_with_room(&room).await?;

    let (alice_sync, bob_sync) = testkit::connect_peers(&alice, &bob).await;
    assert!(!alice_sync.closed());

    // dropping bob's handle abandons his session; his task closes the
    // transport, which alice sees as a hangup
    drop(bob_sync);

    testkit::eventually(WAIT, || {
        let alice_sync = &alice_sync;
        async move { Ok(alice_sync.closed()) }
    })
    .await
}
