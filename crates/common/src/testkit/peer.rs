use std::sync::Arc;

use anyhow::Result;

use crate::cap::{CapKind, Capability};
use crate::peer::Peer;
use crate::share::ShareKeypair;
use crate::store::MemoryDriver;
use crate::sync::{Syncer, SyncerConfig, DEFAULT_MAX_PAYLOAD_POWER};

use super::network::duplex_pair;

/// A throwaway peer over the in-memory driver.
pub fn memory_peer() -> Peer {
    Peer::new(Arc::new(MemoryDriver::new()))
}

/// Mint a share keypair for tests.
pub fn test_room(name: &str) -> ShareKeypair {
    ShareKeypair::generate(name).expect("valid test room name")
}

/// Binary read and write capability tokens for a room.
pub fn room_tokens(room: &ShareKeypair) -> (Vec<u8>, Vec<u8>) {
    let read = Capability::grant(room, CapKind::Read)
        .encode()
        .expect("encode read cap");
    let write = Capability::grant(room, CapKind::Write)
        .encode()
        .expect("encode write cap");
    (read, write)
}

/// A throwaway peer that already holds both capabilities for `room`.
pub async fn memory_peer_with_room(room: &ShareKeypair) -> Result<Peer> {
    let peer = memory_peer();
    let (read, write) = room_tokens(room);
    peer.import_cap(&read).await?;
    peer.import_cap(&write).await?;
    Ok(peer)
}

/// Connect two peers over an in-memory duplex link and spawn a session on
/// each end. Interests are snapshotted from each peer's capabilities at call
/// time, mirroring what a server does when it accepts a connection.
pub async fn connect_peers(a: &Peer, b: &Peer) -> (Syncer, Syncer) {
    let (transport_a, transport_b) = duplex_pair();
    let syncer_a = Syncer::spawn(SyncerConfig {
        auth: a.auth().clone(),
        transport: Box::new(transport_a),
        interests: a
            .auth()
            .interests_from_caps()
            .await
            .expect("snapshot interests"),
        max_payload_power: DEFAULT_MAX_PAYLOAD_POWER,
        stores: Arc::new(a.clone()),
    });
    let syncer_b = Syncer::spawn(SyncerConfig {
        auth: b.auth().clone(),
        transport: Box::new(transport_b),
        interests: b
            .auth()
            .interests_from_caps()
            .await
            .expect("snapshot interests"),
        max_payload_power: DEFAULT_MAX_PAYLOAD_POWER,
        stores: Arc::new(b.clone()),
    });
    (syncer_a, syncer_b)
}
