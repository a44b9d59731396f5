//! Document storage: the replicated state sync sessions reconcile.
//!
//! Each share maps to a set of documents keyed by path. A document is a
//! payload plus a microsecond wall-clock timestamp, and replication is
//! last-write-wins on that timestamp: a write only lands if it is strictly
//! newer than what the store already holds for the path. That makes ingest
//! idempotent and order-independent, which is all a gossiping swarm needs.
//!
//! The actual persistence lives behind [`StorageDriver`]; this crate ships
//! an in-memory driver and the daemon adds a SQLite one.

mod memory;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use memory::MemoryDriver;

use crate::auth::AuthError;
use crate::cap::Capability;
use crate::identity::Identity;
use crate::share::ShareTag;

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("document path must have at least one segment")]
    Empty,
    #[error("document path segment must be non-empty and slash-free, got {0:?}")]
    BadSegment(String),
}

/// Errors a [`StorageDriver`] implementation can surface.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("corrupt record in storage: {0}")]
    Corrupt(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown share {0}")]
    UnknownShare(ShareTag),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Slash-joined path identifying a document within a share.
///
/// Stored and compared as segments; `Display` joins them with `/`, which is
/// also the form the state inspector logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocPath(Vec<String>);

impl DocPath {
    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        for segment in &segments {
            if segment.is_empty() || segment.contains('/') {
                return Err(PathError::BadSegment(segment.clone()));
            }
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl FromStr for DocPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split('/'))
    }
}

/// A single replicated record: path, payload, and write timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: DocPath,
    pub payload: Bytes,
    /// Microseconds since the Unix epoch, assigned by the writer.
    pub timestamp: u64,
}

impl Document {
    /// Current wall clock in the timestamp unit documents use.
    pub fn now_micros() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default()
    }
}

/// Orderings a store can list documents in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocOrder {
    /// Oldest write first; ties broken by path.
    Timestamp,
    /// Lexicographic by path.
    Path,
}

/// Persistence backend for identities, capabilities, and documents.
///
/// Implementations must make [`StorageDriver::put_document`] last-write-wins:
/// apply the document only when its timestamp is strictly greater than the
/// stored one (absent counts as older), and report whether it was applied.
/// [`StorageDriver::put_capability`] upserts on (share, kind) so importing
/// the same grant twice is a no-op.
#[async_trait::async_trait]
pub trait StorageDriver: Send + Sync + fmt::Debug {
    async fn identities(&self) -> Result<Vec<Identity>, DriverError>;
    async fn put_identity(&self, identity: &Identity) -> Result<(), DriverError>;

    async fn capabilities(&self) -> Result<Vec<Capability>, DriverError>;
    async fn put_capability(&self, cap: &Capability) -> Result<(), DriverError>;

    async fn document(
        &self,
        share: &ShareTag,
        path: &DocPath,
    ) -> Result<Option<Document>, DriverError>;
    async fn documents(
        &self,
        share: &ShareTag,
        order: DocOrder,
    ) -> Result<Vec<Document>, DriverError>;
    async fn put_document(&self, share: &ShareTag, doc: &Document) -> Result<bool, DriverError>;
}

/// Handle to one share's documents.
///
/// Obtained from [`crate::peer::Peer::get_store`]; cheap to clone, all state
/// lives in the driver.
#[derive(Debug, Clone)]
pub struct Store {
    share: ShareTag,
    driver: Arc<dyn StorageDriver>,
}

impl Store {
    pub(crate) fn new(share: ShareTag, driver: Arc<dyn StorageDriver>) -> Self {
        Self { share, driver }
    }

    pub fn share(&self) -> &ShareTag {
        &self.share
    }

    pub async fn document(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        Ok(self.driver.document(&self.share, path).await?)
    }

    pub async fn documents(&self, order: DocOrder) -> Result<Vec<Document>, StoreError> {
        Ok(self.driver.documents(&self.share, order).await?)
    }

    /// Write a payload at `path`, stamped with the current time.
    pub async fn set(
        &self,
        path: DocPath,
        payload: impl Into<Bytes>,
    ) -> Result<Document, StoreError> {
        let doc = Document {
            path,
            payload: payload.into(),
            timestamp: Document::now_micros(),
        };
        self.driver.put_document(&self.share, &doc).await?;
        Ok(doc)
    }

    /// Apply a document received from a remote, keeping its original
    /// timestamp. Returns whether the write won last-write-wins.
    pub async fn ingest(&self, doc: Document) -> Result<bool, StoreError> {
        Ok(self.driver.put_document(&self.share, &doc).await?)
    }
}
