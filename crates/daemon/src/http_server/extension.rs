use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use http::Request;

use common::peer::Peer;

/// A unit of server behavior, composed into an ordered list at startup.
///
/// The router owns no routes of its own; every request is offered to each
/// extension in turn until one answers. An extension that needs ownership of
/// the request (to consume the body or drive a connection upgrade) takes it
/// out of the slot with `std::mem::take` and returns `Some(response)`.
/// Returning `None` leaves the request untouched for the next extension.
#[async_trait]
pub trait ServerExtension: Send + Sync + std::fmt::Debug {
    /// Called once at startup with the peer this extension serves.
    async fn register(&self, peer: Peer) -> Result<(), ExtensionError>;

    /// Answer the request, or decline it with `Ok(None)`.
    async fn handle(
        &self,
        request: &mut Request<Body>,
    ) -> Result<Option<Response>, ExtensionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("no peer has been registered with this extension")]
    NotRegistered,
}
