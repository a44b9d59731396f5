//! Authorization state: the set of capabilities a peer has imported.
//!
//! Importing a token is the only way a share becomes known to a peer. The
//! happy path is `decode -> verify -> persist`; anything that fails before
//! the persist step leaves the authorization state untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cap::{CapError, Capability};
use crate::share::ShareTag;
use crate::store::{DriverError, StorageDriver};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Driver(#[from] DriverError),
}

#[derive(Debug, thiserror::Error)]
pub enum CapImportError {
    #[error(transparent)]
    Cap(#[from] CapError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// View over the imported capabilities in a storage driver.
#[derive(Debug, Clone)]
pub struct Auth {
    driver: Arc<dyn StorageDriver>,
}

impl Auth {
    pub fn new(driver: Arc<dyn StorageDriver>) -> Self {
        Self { driver }
    }

    /// Decode, verify, and persist a binary capability token.
    ///
    /// Idempotent: the driver upserts on (share, kind), so re-importing a
    /// grant the peer already holds changes nothing.
    pub async fn import_cap(&self, token: &[u8]) -> Result<Capability, CapImportError> {
        let cap = Capability::decode(token)?;
        cap.verify()?;
        self.driver.put_capability(&cap).await?;
        Ok(cap)
    }

    pub async fn capabilities(&self) -> Result<Vec<Capability>, AuthError> {
        Ok(self.driver.capabilities().await?)
    }

    /// Distinct shares the peer holds any capability for, in tag order.
    ///
    /// This is the interest set a new sync session snapshots at creation.
    pub async fn interests_from_caps(&self) -> Result<BTreeSet<ShareTag>, AuthError> {
        let caps = self.driver.capabilities().await?;
        Ok(caps.into_iter().map(|c| c.share().clone()).collect())
    }

    /// Whether any capability for `share` has been imported.
    pub async fn holds(&self, share: &ShareTag) -> Result<bool, AuthError> {
        let caps = self.driver.capabilities().await?;
        Ok(caps.iter().any(|c| c.share() == share))
    }
}
