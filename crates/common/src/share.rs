//! Shares: the named, synchronizable datasets peers exchange.
//!
//! A share tag looks like `+notes.8c21…` — a `+`, a short name, a dot, and
//! the hex encoding of the share's public key. The keypair behind a share is
//! its root of trust: whoever holds the secret key can mint capabilities for
//! it (see [`crate::cap`]). Servers only ever see the public half.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::{KeyError, PublicKey, SecretKey};

/// Longest permitted share name.
pub const SHARE_NAME_MAX_LEN: usize = 15;

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error(
        "invalid share name {0:?}: 1 to {SHARE_NAME_MAX_LEN} lowercase ascii \
         letters or digits, starting with a letter"
    )]
    InvalidName(String),
    #[error("malformed share tag {0:?}")]
    MalformedTag(String),
    #[error(transparent)]
    Key(#[from] KeyError),
}

fn validate_name(name: &str) -> Result<(), ShareError> {
    let mut chars = name.chars();
    let valid = !name.is_empty()
        && name.len() <= SHARE_NAME_MAX_LEN
        && chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ShareError::InvalidName(name.to_string()))
    }
}

/// Public reference to a share: name plus the share's public key.
///
/// Tags are the unit of interest in sync sessions and the key under which
/// documents are stored. Ordering is lexicographic on (name, key) so that
/// interest sets and store listings come out deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShareTag {
    name: String,
    public: PublicKey,
}

impl ShareTag {
    pub fn new(name: &str, public: PublicKey) -> Result<Self, ShareError> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            public,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }
}

impl fmt::Display for ShareTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}.{}", self.name, self.public.to_hex())
    }
}

impl FromStr for ShareTag {
    type Err = ShareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ShareError::MalformedTag(s.to_string());
        let rest = s.strip_prefix('+').ok_or_else(malformed)?;
        let (name, hex) = rest.split_once('.').ok_or_else(malformed)?;
        let public = PublicKey::from_hex(hex)?;
        Self::new(name, public)
    }
}

/// The full keypair behind a share.
///
/// Held by the share's creator, never by a sync server. Its only job is
/// signing capability grants.
#[derive(Debug, Clone)]
pub struct ShareKeypair {
    name: String,
    secret: SecretKey,
}

impl ShareKeypair {
    /// Mint a fresh share under the given name.
    pub fn generate(name: &str) -> Result<Self, ShareError> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            secret: SecretKey::generate(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn tag(&self) -> ShareTag {
        ShareTag {
            name: self.name.clone(),
            public: self.secret.public(),
        }
    }
}
