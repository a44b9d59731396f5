use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use http::{Method, Request};
use parking_lot::RwLock;

use common::peer::Peer;

use crate::http_server::extension::{ExtensionError, ServerExtension};
use crate::sessions::SessionManager;

mod add_room;
mod id;
mod sync;
mod transport;

pub use add_room::{AddRoomRequest, AddRoomResponse};
pub use id::{IdRequest, IdResponse};

/// Serves the room endpoints: `/id`, `/sync`, and `/addRoom/:read/:write`.
///
/// Holds no peer until `register` runs; every endpoint answers 500 before
/// that, since a server without a peer cannot prove who it is or hold
/// capabilities.
#[derive(Debug)]
pub struct RoomsExtension {
    peer: RwLock<Option<Peer>>,
    sessions: Arc<SessionManager>,
}

impl RoomsExtension {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            peer: RwLock::new(None),
            sessions,
        }
    }

    fn peer(&self) -> Result<Peer, ExtensionError> {
        self.peer
            .read()
            .clone()
            .ok_or(ExtensionError::NotRegistered)
    }
}

#[async_trait]
impl ServerExtension for RoomsExtension {
    async fn register(&self, peer: Peer) -> Result<(), ExtensionError> {
        *self.peer.write() = Some(peer);
        Ok(())
    }

    async fn handle(
        &self,
        request: &mut Request<Body>,
    ) -> Result<Option<Response>, ExtensionError> {
        if request.method() != Method::GET {
            return Ok(None);
        }

        let path = request.uri().path().to_owned();
        let response = match path.as_str() {
            "/id" => id::handler(&self.peer()?).await,
            "/sync" => {
                let peer = self.peer()?;
                // the upgrade handshake needs ownership of the request
                let request = std::mem::take(request);
                sync::handler(&peer, self.sessions.clone(), request).await
            }
            _ => match room_tokens_from_path(&path) {
                Some((read, write)) => add_room::handler(&self.peer()?, read, write).await,
                None => return Ok(None),
            },
        };

        Ok(Some(response))
    }
}

/// Matches `/addRoom/:read/:write`, returning the two raw path segments.
/// Tokens are percent-encoded by the client, so a literal `/` inside one
/// never splits a segment here.
fn room_tokens_from_path(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("/addRoom/")?;
    let (read, write) = rest.split_once('/')?;
    if read.is_empty() || write.is_empty() || write.contains('/') {
        return None;
    }
    Some((read, write))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_add_room_path_splits_two_segments() {
        let (read, write) = room_tokens_from_path("/addRoom/abc%2B/def%3D").unwrap();
        assert_eq!(read, "abc%2B");
        assert_eq!(write, "def%3D");
    }

    #[test]
    fn test_add_room_path_rejects_wrong_shapes() {
        assert!(room_tokens_from_path("/addRoom").is_none());
        assert!(room_tokens_from_path("/addRoom/").is_none());
        assert!(room_tokens_from_path("/addRoom/only-one").is_none());
        assert!(room_tokens_from_path("/addRoom/a/").is_none());
        assert!(room_tokens_from_path("/addRoom//b").is_none());
        assert!(room_tokens_from_path("/addRoom/a/b/c").is_none());
        assert!(room_tokens_from_path("/otherRoute/a/b").is_none());
    }
}
