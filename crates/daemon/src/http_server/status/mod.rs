use async_trait::async_trait;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{Method, Request};
use parking_lot::RwLock;

use common::peer::Peer;

use crate::http_server::extension::{ExtensionError, ServerExtension};

/// Liveness and readiness probes under `/_status`.
///
/// `livez` answers as soon as the process serves requests; `readyz` stays
/// unavailable until a peer is registered and holds a server identity.
#[derive(Debug, Default)]
pub struct StatusExtension {
    peer: RwLock<Option<Peer>>,
}

impl StatusExtension {
    pub fn new() -> Self {
        Self::default()
    }

    async fn readiness(&self) -> Result<(), String> {
        let peer = match self.peer.read().clone() {
            Some(peer) => peer,
            None => return Err("no peer registered".to_string()),
        };
        match peer.identities().await {
            Ok(identities) if identities.is_empty() => Err("no server identity yet".to_string()),
            Ok(_) => Ok(()),
            Err(e) => Err(format!("identity storage unavailable: {}", e)),
        }
    }
}

#[async_trait]
impl ServerExtension for StatusExtension {
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

        let response = match request.uri().path() {
            "/_status/livez" => {
                let msg = serde_json::json!({"status": "ok"});
                (StatusCode::OK, Json(msg)).into_response()
            }
            "/_status/readyz" => match self.readiness().await {
                Ok(()) => {
                    let msg = serde_json::json!({"status": "ok"});
                    (StatusCode::OK, Json(msg)).into_response()
                }
                Err(reason) => {
                    let msg = serde_json::json!({"status": "failure", "message": reason});
                    (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
                }
            },
            _ => return Ok(None),
        };

        Ok(Some(response))
    }
}
