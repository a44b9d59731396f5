use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::auth::CapImportError;
use common::peer::Peer;

use crate::http_server::api::client::ApiRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRoomResponse {
    pub success: bool,
}

pub(super) async fn handler(peer: &Peer, read: &str, write: &str) -> Response {
    match import_room(peer, read, write).await {
        Ok(()) => (StatusCode::OK, Json(AddRoomResponse { success: true })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Decodes both tokens before importing either, so a malformed second token
/// never leaves a half-imported room behind. Imports read first, then write.
async fn import_room(peer: &Peer, read: &str, write: &str) -> Result<(), AddRoomError> {
    let read = decode_token(read)?;
    let write = decode_token(write)?;

    let cap = peer.import_cap(&read).await?;
    tracing::info!(share = %cap.share(), kind = %cap.kind(), "imported room capability");
    let cap = peer.import_cap(&write).await?;
    tracing::info!(share = %cap.share(), kind = %cap.kind(), "imported room capability");

    Ok(())
}

/// Tokens arrive URL-encoded on top of base64.
fn decode_token(segment: &str) -> Result<Vec<u8>, AddRoomError> {
    let unescaped: Vec<u8> = percent_decode_str(segment).collect();
    Ok(BASE64.decode(unescaped)?)
}

#[derive(Debug, thiserror::Error)]
pub enum AddRoomError {
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("capability rejected: {0}")]
    Import(#[from] CapImportError),
}

impl IntoResponse for AddRoomError {
    fn into_response(self) -> Response {
        let status = match &self {
            // the caller sent something unusable
            AddRoomError::Base64(_) | AddRoomError::Import(CapImportError::Cap(_)) => {
                StatusCode::BAD_REQUEST
            }
            AddRoomError::Import(CapImportError::Driver(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("room import failed: {}", self);
        (status, self.to_string()).into_response()
    }
}

/// Client-side request. Token fields hold base64 text as handed out by the
/// room's granting peer; `build_request` takes care of URL-escaping them.
#[derive(Debug, Clone)]
pub struct AddRoomRequest {
    pub read: String,
    pub write: String,
}

impl ApiRequest for AddRoomRequest {
    type Response = AddRoomResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let read = utf8_percent_encode(&self.read, NON_ALPHANUMERIC);
        let write = utf8_percent_encode(&self.write, NON_ALPHANUMERIC);
        let full_url = base_url
            .join(&format!("/addRoom/{}/{}", read, write))
            .unwrap();
        client.get(full_url)
    }
}
