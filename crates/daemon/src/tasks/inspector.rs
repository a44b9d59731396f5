use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;

use common::peer::Peer;
use common::store::DocOrder;

pub const INSPECT_INTERVAL: Duration = Duration::from_secs(8);

/// Log the full contents of every room on a fixed interval, starting with
/// one dump right away.
///
/// A failed pass is logged and the loop keeps going; a room that cannot be
/// opened should not silence the diagnostics for every other room forever.
pub async fn run(peer: Peer, mut shutdown_rx: watch::Receiver<()>) {
    let mut ticker = tokio::time::interval(INSPECT_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => match inspect_once(&peer).await {
                Ok(snapshot) => tracing::info!(%snapshot, "room contents"),
                Err(e) => tracing::warn!("state inspection failed: {}", e),
            },
            _ = shutdown_rx.changed() => {
                tracing::debug!("inspector shutting down");
                return;
            }
        }
    }
}

/// One snapshot of every room: documents in timestamp order, keyed by their
/// slash-joined path. Payloads that parse as JSON are embedded as JSON;
/// anything else is included as (lossy) text.
pub async fn inspect_once(peer: &Peer) -> anyhow::Result<Value> {
    let mut rooms = serde_json::Map::new();

    for share in peer.shares().await? {
        let store = peer.get_store(&share).await?;
        let mut docs = serde_json::Map::new();
        for doc in store.documents(DocOrder::Timestamp).await? {
            let payload = match serde_json::from_slice::<Value>(&doc.payload) {
                Ok(value) => value,
                Err(_) => Value::String(String::from_utf8_lossy(&doc.payload).into_owned()),
            };
            docs.insert(doc.path.to_string(), payload);
        }
        rooms.insert(share.to_string(), Value::Object(docs));
    }

    Ok(Value::Object(rooms))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use common::prelude::*;
    use common::testkit::{memory_peer, memory_peer_with_room, test_room};

    use super::*;

    #[tokio::test]
    async fn test_snapshot_is_empty_without_rooms() {
        let peer = memory_peer();
        let snapshot = inspect_once(&peer).await.unwrap();
        assert_eq!(snapshot, json!({}));
    }

    #[tokio::test]
    async fn test_snapshot_keys_documents_by_path() {
        let room = test_room("dump");
        let peer = memory_peer_with_room(&room).await.unwrap();
        let store = peer.get_store(&room.tag()).await.unwrap();

        store
            .set(
                DocPath::new(["note", "today"]).unwrap(),
                r#"{"mood":"good"}"#,
            )
            .await
            .unwrap();
        store
            .set(DocPath::new(["raw"]).unwrap(), "plain text")
            .await
            .unwrap();

        let snapshot = inspect_once(&peer).await.unwrap();
        let docs = &snapshot[room.tag().to_string()];
        assert_eq!(docs["note/today"], json!({"mood": "good"}));
        assert_eq!(docs["raw"], json!("plain text"));
    }
}
