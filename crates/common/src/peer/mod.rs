//! The peer: one node's identities, capabilities, and stores.
//!
//! [`Peer`] is the facade everything above this crate talks to. It owns a
//! [`StorageDriver`] and hands out [`Store`] handles for the shares the peer
//! holds capabilities for. A server embeds exactly one peer and wires it
//! into HTTP extensions and sync sessions; tests build throwaway peers over
//! the in-memory driver.

use std::sync::Arc;

use crate::auth::{Auth, AuthError, CapImportError};
use crate::cap::Capability;
use crate::identity::{Identity, IdentityError};
use crate::share::ShareTag;
use crate::store::{DriverError, StorageDriver, Store, StoreError};
use crate::sync::{ResolveError, StoreResolver};

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// A node in the sync swarm.
///
/// Cheap to clone; all clones see the same driver state.
#[derive(Debug, Clone)]
pub struct Peer {
    driver: Arc<dyn StorageDriver>,
    auth: Auth,
}

impl Peer {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        let auth = Auth::new(driver.clone());
        Self { driver, auth }
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Mint and persist a new identity under `label`.
    ///
    /// Does not check for existing identities; callers that want exactly one
    /// identity (like a server bootstrapping itself) look before they leap.
    pub async fn create_identity(&self, label: &str) -> Result<Identity, PeerError> {
        let identity = Identity::generate(label)?;
        self.driver.put_identity(&identity).await?;
        Ok(identity)
    }

    /// All persisted identities, oldest first.
    pub async fn identities(&self) -> Result<Vec<Identity>, PeerError> {
        Ok(self.driver.identities().await?)
    }

    /// Import a binary capability token; see [`Auth::import_cap`].
    pub async fn import_cap(&self, token: &[u8]) -> Result<Capability, CapImportError> {
        self.auth.import_cap(token).await
    }

    /// Distinct shares this peer holds capabilities for, in tag order.
    pub async fn shares(&self) -> Result<Vec<ShareTag>, PeerError> {
        Ok(self
            .auth
            .interests_from_caps()
            .await?
            .into_iter()
            .collect())
    }

    /// Resolve a share to its document store.
    ///
    /// Fails with [`StoreError::UnknownShare`] when no capability for the
    /// share has been imported; a store only exists once the peer has been
    /// granted access to it.
    pub async fn get_store(&self, share: &ShareTag) -> Result<Store, StoreError> {
        if !self.auth.holds(share).await? {
            return Err(StoreError::UnknownShare(share.clone()));
        }
        Ok(Store::new(share.clone(), self.driver.clone()))
    }
}

#[async_trait::async_trait]
impl StoreResolver for Peer {
    async fn resolve(&self, share: &ShareTag) -> Result<Store, ResolveError> {
        self.get_store(share).await.map_err(|e| ResolveError {
            share: share.clone(),
            reason: e.to_string(),
        })
    }
}
