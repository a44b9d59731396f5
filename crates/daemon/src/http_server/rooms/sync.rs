use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use http::Request;

use common::peer::Peer;
use common::sync::{StoreResolver, Syncer, SyncerConfig, DEFAULT_MAX_PAYLOAD_POWER};

use super::transport::WsTransport;
use crate::sessions::SessionManager;

/// Upgrades the connection and hands the socket to a new sync session.
///
/// The session's interest set is read here, before the upgrade completes;
/// rooms imported after this point are invisible to the session.
pub(super) async fn handler(
    peer: &Peer,
    sessions: Arc<SessionManager>,
    request: Request<Body>,
) -> Response {
    let (mut parts, _body) = request.into_parts();
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let interests = match peer.auth().interests_from_caps().await {
        Ok(interests) => interests,
        Err(e) => {
            tracing::error!("failed to read interests for new sync session: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
        }
    };
    tracing::debug!(interests = interests.len(), "accepting sync session");

    let auth = peer.auth().clone();
    let stores: Arc<dyn StoreResolver> = Arc::new(peer.clone());
    upgrade.on_upgrade(move |socket| async move {
        let syncer = Syncer::spawn(SyncerConfig {
            auth,
            transport: Box::new(WsTransport::new(socket)),
            interests,
            max_payload_power: DEFAULT_MAX_PAYLOAD_POWER,
            stores,
        });
        sessions.register(syncer);
    })
}
