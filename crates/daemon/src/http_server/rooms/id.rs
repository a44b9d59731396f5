use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::identity::IdentityTag;
use common::peer::{Peer, PeerError};

use crate::http_server::api::client::ApiRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdResponse {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

pub(super) async fn handler(peer: &Peer) -> Response {
    match identity_tag(peer).await {
        Ok(tag) => (
            StatusCode::OK,
            Json(IdResponse {
                public_key: tag.to_string(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn identity_tag(peer: &Peer) -> Result<IdentityTag, IdError> {
    let identities = peer.identities().await?;
    identities
        .first()
        .map(|identity| identity.tag())
        .ok_or(IdError::NoIdentity)
}

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("no server identity has been created yet")]
    NoIdentity,
    #[error("failed to list identities: {0}")]
    Peer(#[from] PeerError),
}

impl IntoResponse for IdError {
    fn into_response(self) -> Response {
        tracing::error!("id request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct IdRequest;

// Client implementation - builds request for this operation
impl ApiRequest for IdRequest {
    type Response = IdResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/id").unwrap();
        client.get(full_url)
    }
}
