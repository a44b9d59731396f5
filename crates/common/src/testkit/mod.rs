//! Lightweight test harness for multi-peer sync tests.
//!
//! In-process peers and transports for exercising sync sessions end to end,
//! without sockets or external infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use common::testkit;
//!
//! #[tokio::test]
//! async fn test_two_peers_reconcile() -> anyhow::Result<()> {
//!     let room = testkit::test_room("shared");
//!     let alice = testkit::memory_peer_with_room(&room).await?;
//!     let bob = testkit::memory_peer_with_room(&room).await?;
//!
//!     // Wire them together and let them exchange announces
//!     let (alice_sync, _bob_sync) = testkit::connect_peers(&alice, &bob).await;
//!
//!     let store = alice.get_store(&room.tag()).await?;
//!     store.set("hello".parse()?, "world").await?;
//!     alice_sync.force_reconcile();
//!
//!     testkit::eventually(Duration::from_secs(2), || async {
//!         let store = bob.get_store(&room.tag()).await?;
//!         Ok(store.document(&"hello".parse()?).await?.is_some())
//!     })
//!     .await
//! }
//! ```

mod network;
mod peer;

pub use network::{duplex_pair, eventually, DuplexTransport};
pub use peer::{connect_peers, memory_peer, memory_peer_with_room, room_tokens, test_room};
