//! In-memory storage driver, used by tests and ephemeral daemons.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::cap::{CapKind, Capability};
use crate::identity::Identity;
use crate::share::ShareTag;

use super::{DocOrder, DocPath, Document, DriverError, StorageDriver};

/// Keeps everything in process memory behind a [`RwLock`].
#[derive(Debug, Default)]
pub struct MemoryDriver {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    // insertion order preserved: the first identity is the oldest
    identities: Vec<Identity>,
    capabilities: BTreeMap<(ShareTag, CapKind), Capability>,
    documents: BTreeMap<(ShareTag, DocPath), Document>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StorageDriver for MemoryDriver {
    async fn identities(&self) -> Result<Vec<Identity>, DriverError> {
        Ok(self.inner.read().identities.clone())
    }

    async fn put_identity(&self, identity: &Identity) -> Result<(), DriverError> {
        let mut inner = self.inner.write();
        let tag = identity.tag();
        if let Some(existing) = inner.identities.iter_mut().find(|i| i.tag() == tag) {
            *existing = identity.clone();
        } else {
            inner.identities.push(identity.clone());
        }
        Ok(())
    }

    async fn capabilities(&self) -> Result<Vec<Capability>, DriverError> {
        Ok(self.inner.read().capabilities.values().cloned().collect())
    }

    async fn put_capability(&self, cap: &Capability) -> Result<(), DriverError> {
        self.inner
            .write()
            .capabilities
            .insert((cap.share().clone(), cap.kind()), cap.clone());
        Ok(())
    }

    async fn document(
        &self,
        share: &ShareTag,
        path: &DocPath,
    ) -> Result<Option<Document>, DriverError> {
        let key = (share.clone(), path.clone());
        Ok(self.inner.read().documents.get(&key).cloned())
    }

    async fn documents(
        &self,
        share: &ShareTag,
        order: DocOrder,
    ) -> Result<Vec<Document>, DriverError> {
        let inner = self.inner.read();
        let mut docs: Vec<Document> = inner
            .documents
            .iter()
            .filter(|((s, _), _)| s == share)
            .map(|(_, doc)| doc.clone())
            .collect();
        match order {
            DocOrder::Path => {} // BTreeMap range already path-ordered
            DocOrder::Timestamp => {
                docs.sort_by(|a, b| (a.timestamp, &a.path).cmp(&(b.timestamp, &b.path)));
            }
        }
        Ok(docs)
    }

    async fn put_document(&self, share: &ShareTag, doc: &Document) -> Result<bool, DriverError> {
        let mut inner = self.inner.write();
        let key = (share.clone(), doc.path.clone());
        match inner.documents.get(&key) {
            Some(existing) if existing.timestamp >= doc.timestamp => Ok(false),
            _ => {
                inner.documents.insert(key, doc.clone());
                Ok(true)
            }
        }
    }
}
