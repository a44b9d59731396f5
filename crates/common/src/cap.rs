//! Capabilities: transferable, signed grants of access to a share.
//!
//! A capability is the share keypair's signature over (share tag, kind).
//! Possession of a valid token *is* the authorization — there are no user
//! accounts and no ACLs. Tokens travel as base64 text out of band (chat
//! messages, QR codes, request paths) and are verified against the public
//! key already embedded in the share tag, so a server can check a token
//! without any prior knowledge of the share.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::Signature;
use crate::share::{ShareKeypair, ShareTag};

#[derive(Debug, thiserror::Error)]
pub enum CapError {
    #[error("capability token codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("capability signature rejected")]
    BadSignature(#[source] ed25519_dalek::SignatureError),
    #[error("unknown capability kind {0:?}")]
    UnknownKind(String),
}

/// What a capability lets its holder do with a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapKind {
    Read,
    Write,
}

impl CapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapKind::Read => "read",
            CapKind::Write => "write",
        }
    }
}

impl fmt::Display for CapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapKind {
    type Err = CapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(CapKind::Read),
            "write" => Ok(CapKind::Write),
            other => Err(CapError::UnknownKind(other.to_string())),
        }
    }
}

/// A signed grant of [`CapKind`] access to a share.
///
/// The wire form is the bincode encoding of this struct; see
/// [`Capability::encode`] / [`Capability::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    share: ShareTag,
    kind: CapKind,
    signature: Signature,
}

impl Capability {
    /// Mint a capability for `kind` access to the share behind `keypair`.
    pub fn grant(keypair: &ShareKeypair, kind: CapKind) -> Self {
        let share = keypair.tag();
        let signature = keypair.secret().sign(&signing_bytes(&share, kind));
        Self {
            share,
            kind,
            signature,
        }
    }

    pub fn share(&self) -> &ShareTag {
        &self.share
    }

    pub fn kind(&self) -> CapKind {
        self.kind
    }

    /// Check the grant signature against the share's public key.
    pub fn verify(&self) -> Result<(), CapError> {
        self.share
            .public()
            .verify(&signing_bytes(&self.share, self.kind), &self.signature)
            .map_err(CapError::BadSignature)
    }

    /// Serialize to the binary token form.
    pub fn encode(&self) -> Result<Vec<u8>, CapError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from the binary token form.
    ///
    /// Decoding does not verify the grant; callers that accept tokens from
    /// outside must follow up with [`Capability::verify`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CapError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

// Domain-separated message the share key signs.
fn signing_bytes(share: &ShareTag, kind: CapKind) -> Vec<u8> {
    format!("burrow cap v0\n{share}\n{kind}").into_bytes()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_grant_verifies() {
        let room = ShareKeypair::generate("kitchen").unwrap();
        let cap = Capability::grant(&room, CapKind::Read);
        assert!(cap.verify().is_ok());
        assert_eq!(cap.share(), &room.tag());
        assert_eq!(cap.kind(), CapKind::Read);
    }

    #[test]
    fn test_token_round_trip() {
        let room = ShareKeypair::generate("kitchen").unwrap();
        let cap = Capability::grant(&room, CapKind::Write);
        let token = cap.encode().unwrap();
        let decoded = Capability::decode(&token).unwrap();
        assert_eq!(decoded, cap);
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn test_forged_grant_rejected() {
        let room = ShareKeypair::generate("kitchen").unwrap();
        let impostor = ShareKeypair::generate("kitchen").unwrap();

        // signature from a different keypair over the same message shape
        let forged = Capability {
            share: room.tag(),
            kind: CapKind::Write,
            signature: impostor
                .secret()
                .sign(&signing_bytes(&room.tag(), CapKind::Write)),
        };
        assert!(forged.verify().is_err());
    }

    #[test]
    fn test_kind_swap_rejected() {
        let room = ShareKeypair::generate("kitchen").unwrap();
        let mut cap = Capability::grant(&room, CapKind::Read);
        cap.kind = CapKind::Write;
        assert!(cap.verify().is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(Capability::decode(&[0u8; 3]).is_err());
    }
}
