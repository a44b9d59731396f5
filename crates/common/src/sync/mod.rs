//! Live sync sessions.
//!
//! A [`Syncer`] drives one connection to a remote peer: it announces the
//! local state of every share in its interest set, answers the remote's
//! announces and wants, and ingests incoming documents. The interest set is
//! snapshotted when the session is created; capabilities imported later are
//! only visible to sessions created after the import.
//!
//! Sessions are deliberately independent of each other. Any transport or
//! store failure closes the one session it happened on and nothing else;
//! the handle's [`Syncer::closed`] flag is how the owner finds out.

pub mod messages;

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::auth::{Auth, AuthError};
use crate::share::ShareTag;
use crate::store::{DocOrder, DocPath, Document, Store, StoreError};

use messages::{DocSummary, FrameError, SyncMessage};

/// Default cap on chunk payload size, as a power of two (2^8 = 256 bytes).
pub const DEFAULT_MAX_PAYLOAD_POWER: u8 = 8;

// Preallocation guard for incoming documents; growth past this is gradual.
const MAX_PREALLOC: u64 = 1 << 20;

/// Framed, bidirectional byte pipe a session runs over.
///
/// `recv` returning `Ok(None)` means the remote hung up cleanly; errors on
/// either direction end the session.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("transport failure: {0}")]
    Failed(String),
}

/// Resolves a share tag to its document store on demand.
///
/// Sessions hold a resolver instead of stores so that a share's store can
/// come and go independently of the session's lifetime.
#[async_trait::async_trait]
pub trait StoreResolver: Send + Sync {
    async fn resolve(&self, share: &ShareTag) -> Result<Store, ResolveError>;
}

#[derive(Debug, thiserror::Error)]
#[error("store resolution failed for {share}: {reason}")]
pub struct ResolveError {
    pub share: ShareTag,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("sync protocol violation: {0}")]
    Protocol(String),
}

/// Everything needed to start a session.
pub struct SyncerConfig {
    pub auth: Auth,
    pub transport: Box<dyn Transport>,
    /// Shares this session will exchange; snapshotted, never refreshed.
    pub interests: BTreeSet<ShareTag>,
    /// Chunk payloads are at most 2^this bytes.
    pub max_payload_power: u8,
    pub stores: Arc<dyn StoreResolver>,
}

/// Handle to a running sync session.
///
/// Dropping the handle abandons the session: the drive task winds down on
/// its own the next time it would have reconciled.
#[derive(Debug)]
pub struct Syncer {
    closed: Arc<AtomicBool>,
    reconcile_tx: mpsc::Sender<()>,
}

impl Syncer {
    /// Spawn the drive task for a new session and return its handle.
    pub fn spawn(config: SyncerConfig) -> Syncer {
        let SyncerConfig {
            auth,
            transport,
            interests,
            max_payload_power,
            stores,
        } = config;

        let closed = Arc::new(AtomicBool::new(false));
        // capacity 1: a pending nudge already covers any number of callers
        let (reconcile_tx, reconcile_rx) = mpsc::channel(1);

        let task = SyncerTask {
            auth,
            transport,
            interests,
            chunk_size: 1usize << u32::from(max_payload_power).min(30),
            stores,
            closed: closed.clone(),
            partials: HashMap::new(),
        };
        tokio::spawn(task.run(reconcile_rx));

        Syncer {
            closed,
            reconcile_tx,
        }
    }

    /// Nudge the session into a reconciliation pass.
    ///
    /// Fire-and-forget: a closed session or one with a pass already pending
    /// ignores the nudge.
    pub fn force_reconcile(&self) {
        let _ = self.reconcile_tx.try_send(());
    }

    /// Whether the drive task has ended (remote hangup or failure).
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct Partial {
    timestamp: u64,
    total_len: u64,
    buf: Vec<u8>,
}

struct SyncerTask {
    auth: Auth,
    transport: Box<dyn Transport>,
    interests: BTreeSet<ShareTag>,
    chunk_size: usize,
    stores: Arc<dyn StoreResolver>,
    closed: Arc<AtomicBool>,
    partials: HashMap<(ShareTag, DocPath), Partial>,
}

impl SyncerTask {
    async fn run(mut self, reconcile_rx: mpsc::Receiver<()>) {
        tracing::debug!(interests = self.interests.len(), "sync session started");
        match self.drive(reconcile_rx).await {
            Ok(()) => tracing::debug!("sync session ended"),
            Err(e) => tracing::warn!("sync session failed: {e}"),
        }
        self.closed.store(true, Ordering::SeqCst);
        if let Err(e) = self.transport.close().await {
            tracing::trace!("transport close after session end: {e}");
        }
    }

    async fn drive(&mut self, mut reconcile_rx: mpsc::Receiver<()>) -> Result<(), SyncError> {
        // opening announce doubles as the hello
        self.announce_all().await?;
        loop {
            tokio::select! {
                frame = self.transport.recv() => match frame? {
                    Some(bytes) => self.handle_frame(&bytes).await?,
                    None => return Ok(()),
                },
                nudge = reconcile_rx.recv() => match nudge {
                    Some(()) => self.announce_all().await?,
                    // handle dropped: nobody is watching this session anymore
                    None => return Ok(()),
                },
            }
        }
    }

    async fn announce_all(&mut self) -> Result<(), SyncError> {
        for share in self.interests.clone() {
            let store = self.stores.resolve(&share).await?;
            let docs = store
                .documents(DocOrder::Timestamp)
                .await?
                .into_iter()
                .map(|d| DocSummary {
                    path: d.path,
                    timestamp: d.timestamp,
                })
                .collect();
            self.send(SyncMessage::Announce { share, docs }).await?;
        }
        Ok(())
    }

    async fn handle_frame(&mut self, bytes: &[u8]) -> Result<(), SyncError> {
        match SyncMessage::decode(bytes)? {
            SyncMessage::Announce { share, docs } => self.handle_announce(share, docs).await,
            SyncMessage::Want { share, paths } => self.handle_want(share, paths).await,
            SyncMessage::Chunk {
                share,
                path,
                timestamp,
                offset,
                total_len,
                data,
            } => {
                self.handle_chunk(share, path, timestamp, offset, total_len, data)
                    .await
            }
        }
    }

    async fn handle_announce(
        &mut self,
        share: ShareTag,
        docs: Vec<DocSummary>,
    ) -> Result<(), SyncError> {
        if !self.interests.contains(&share) {
            tracing::trace!(share = %share, "ignoring announce outside interest set");
            return Ok(());
        }
        let store = self.stores.resolve(&share).await?;
        let mut wants = Vec::new();
        for summary in docs {
            let fresher = match store.document(&summary.path).await? {
                Some(local) => local.timestamp < summary.timestamp,
                None => true,
            };
            if fresher {
                wants.push(summary.path);
            }
        }
        if !wants.is_empty() {
            self.send(SyncMessage::Want {
                share,
                paths: wants,
            })
            .await?;
        }
        Ok(())
    }

    async fn handle_want(
        &mut self,
        share: ShareTag,
        paths: Vec<DocPath>,
    ) -> Result<(), SyncError> {
        if !self.interests.contains(&share) {
            tracing::trace!(share = %share, "ignoring want outside interest set");
            return Ok(());
        }
        let store = self.stores.resolve(&share).await?;
        for path in paths {
            if let Some(doc) = store.document(&path).await? {
                self.send_document(&share, doc).await?;
            }
        }
        Ok(())
    }

    async fn handle_chunk(
        &mut self,
        share: ShareTag,
        path: DocPath,
        timestamp: u64,
        offset: u64,
        total_len: u64,
        data: Vec<u8>,
    ) -> Result<(), SyncError> {
        if !self.interests.contains(&share) {
            tracing::trace!(share = %share, "ignoring chunk outside interest set");
            return Ok(());
        }
        let key = (share.clone(), path.clone());

        if offset == 0 {
            if !self.auth.holds(&share).await? {
                tracing::warn!(share = %share, "dropping document for share without capability");
                return Ok(());
            }
            self.partials.insert(
                key.clone(),
                Partial {
                    timestamp,
                    total_len,
                    buf: Vec::with_capacity(total_len.min(MAX_PREALLOC) as usize),
                },
            );
        }

        let Some(partial) = self.partials.get_mut(&key) else {
            return Err(SyncError::Protocol(format!(
                "chunk at offset {offset} for document {path} never started"
            )));
        };
        if partial.buf.len() as u64 != offset {
            self.partials.remove(&key);
            return Err(SyncError::Protocol(format!(
                "out of order chunk for document {path}"
            )));
        }
        if (partial.buf.len() + data.len()) as u64 > partial.total_len {
            self.partials.remove(&key);
            return Err(SyncError::Protocol(format!(
                "chunks overflow declared length for document {path}"
            )));
        }

        partial.buf.extend_from_slice(&data);
        if partial.buf.len() as u64 == partial.total_len {
            if let Some(done) = self.partials.remove(&key) {
                let store = self.stores.resolve(&share).await?;
                let applied = store
                    .ingest(Document {
                        path,
                        payload: done.buf.into(),
                        timestamp: done.timestamp,
                    })
                    .await?;
                tracing::debug!(share = %share, applied, "document ingested");
            }
        }
        Ok(())
    }

    async fn send_document(&mut self, share: &ShareTag, doc: Document) -> Result<(), SyncError> {
        let total_len = doc.payload.len() as u64;
        let mut offset = 0usize;
        loop {
            let end = (offset + self.chunk_size).min(doc.payload.len());
            self.send(SyncMessage::Chunk {
                share: share.clone(),
                path: doc.path.clone(),
                timestamp: doc.timestamp,
                offset: offset as u64,
                total_len,
                data: doc.payload[offset..end].to_vec(),
            })
            .await?;
            offset = end;
            if offset >= doc.payload.len() {
                return Ok(());
            }
        }
    }

    async fn send(&mut self, msg: SyncMessage) -> Result<(), SyncError> {
        let frame = msg.encode()?;
        self.transport.send(frame).await?;
        Ok(())
    }
}
