//! Wire frames exchanged by two sync sessions.
//!
//! Frames are bincode-encoded [`SyncMessage`] values; the transport decides
//! how frames travel (WebSocket binary messages, in-memory channels, ...).
//!
//! The protocol is deliberately small. A reconciliation pass is:
//!
//! 1. one side sends [`SyncMessage::Announce`] listing (path, timestamp)
//!    summaries for a share,
//! 2. the other side answers [`SyncMessage::Want`] for paths it is missing
//!    or holds older versions of,
//! 3. the first side streams [`SyncMessage::Chunk`] frames carrying the
//!    wanted payloads, split to the session's payload size cap.
//!
//! Every frame names its share; frames for shares outside a session's
//! interest set are dropped on the floor.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::share::ShareTag;
use crate::store::DocPath;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("sync frame codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// (path, timestamp) pair — enough for the receiver to decide freshness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSummary {
    pub path: DocPath,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// "Here is what I hold for this share."
    Announce {
        share: ShareTag,
        docs: Vec<DocSummary>,
    },
    /// "Send me these paths."
    Want {
        share: ShareTag,
        paths: Vec<DocPath>,
    },
    /// One slice of a document payload. `offset` counts bytes from the
    /// start; a document is complete when the received bytes reach
    /// `total_len`. Zero-length documents still travel as a single empty
    /// chunk so the receiver creates the record.
    Chunk {
        share: ShareTag,
        path: DocPath,
        timestamp: u64,
        offset: u64,
        total_len: u64,
        data: Vec<u8>,
    },
}

impl SyncMessage {
    pub fn encode(&self) -> Result<Bytes, FrameError> {
        Ok(bincode::serialize(self)?.into())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
