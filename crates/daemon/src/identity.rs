//! Server identity bootstrap.
//!
//! A server acts as one identity across restarts. On startup it adopts the
//! oldest persisted identity, creating one under the fixed server label when
//! the database is fresh. Running this twice is a no-op by construction.

use common::identity::IdentityTag;
use common::peer::{Peer, PeerError};

/// Label every server identity is created under.
pub const SERVER_IDENTITY_LABEL: &str = "srvr";

#[derive(Debug, thiserror::Error)]
pub enum IdentityBootstrapError {
    #[error("failed listing identities: {0}")]
    List(#[source] PeerError),
    #[error("failed creating server identity: {0}")]
    Creation(#[source] PeerError),
}

/// Adopt-or-create the server identity, returning its tag.
pub async fn ensure_identity(peer: &Peer) -> Result<IdentityTag, IdentityBootstrapError> {
    let identities = peer
        .identities()
        .await
        .map_err(IdentityBootstrapError::List)?;
    if let Some(existing) = identities.first() {
        return Ok(existing.tag());
    }
    let created = peer
        .create_identity(SERVER_IDENTITY_LABEL)
        .await
        .map_err(IdentityBootstrapError::Creation)?;
    tracing::info!(identity = %created.tag(), "created server identity");
    Ok(created.tag())
}
