//! Identities: named Ed25519 keypairs a peer acts as.
//!
//! An identity tag looks like `@srvr.3f9a…` — an `@`, a four character
//! label, a dot, and the hex encoding of the identity's public key. The
//! label is a human hint; the key is what actually identifies the holder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::{KeyError, PublicKey, SecretKey};

/// Identity labels are exactly this many characters.
pub const IDENTITY_LABEL_LEN: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error(
        "invalid identity label {0:?}: must be {IDENTITY_LABEL_LEN} lowercase \
         ascii letters or digits, starting with a letter"
    )]
    InvalidLabel(String),
    #[error("malformed identity tag {0:?}")]
    MalformedTag(String),
    #[error(transparent)]
    Key(#[from] KeyError),
}

fn validate_label(label: &str) -> Result<(), IdentityError> {
    let mut chars = label.chars();
    let valid = label.len() == IDENTITY_LABEL_LEN
        && chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(IdentityError::InvalidLabel(label.to_string()))
    }
}

/// Public reference to an identity: label plus public key.
///
/// This is what gets displayed, logged, and returned from the node's `/id`
/// endpoint. Two tags are equal only when both the label and the key match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityTag {
    label: String,
    public: PublicKey,
}

impl IdentityTag {
    pub fn new(label: &str, public: PublicKey) -> Result<Self, IdentityError> {
        validate_label(label)?;
        Ok(Self {
            label: label.to_string(),
            public,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }
}

impl fmt::Display for IdentityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}.{}", self.label, self.public.to_hex())
    }
}

impl FromStr for IdentityTag {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IdentityError::MalformedTag(s.to_string());
        let rest = s.strip_prefix('@').ok_or_else(malformed)?;
        let (label, hex) = rest.split_once('.').ok_or_else(malformed)?;
        let public = PublicKey::from_hex(hex)?;
        Self::new(label, public)
    }
}

/// A full identity: label plus the secret key that backs it.
///
/// Persisted by the peer's storage driver so the same identity survives
/// restarts. The secret key never appears in tags or wire messages.
#[derive(Debug, Clone)]
pub struct Identity {
    label: String,
    secret: SecretKey,
}

impl Identity {
    /// Mint a fresh identity under the given label.
    pub fn generate(label: &str) -> Result<Self, IdentityError> {
        validate_label(label)?;
        Ok(Self {
            label: label.to_string(),
            secret: SecretKey::generate(),
        })
    }

    /// Rehydrate an identity from persisted parts.
    pub fn from_parts(label: String, secret: SecretKey) -> Result<Self, IdentityError> {
        validate_label(&label)?;
        Ok(Self { label, secret })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn tag(&self) -> IdentityTag {
        IdentityTag {
            label: self.label.clone(),
            public: self.secret.public(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        let identity = Identity::generate("srvr").unwrap();
        let tag = identity.tag();
        let parsed: IdentityTag = tag.to_string().parse().unwrap();
        assert_eq!(parsed, tag);
        assert_eq!(parsed.label(), "srvr");
    }

    #[test]
    fn test_label_rules() {
        assert!(Identity::generate("srvr").is_ok());
        assert!(Identity::generate("ab3z").is_ok());
        // too short, too long, bad charset, digit first
        assert!(Identity::generate("abc").is_err());
        assert!(Identity::generate("abcde").is_err());
        assert!(Identity::generate("AbCd").is_err());
        assert!(Identity::generate("1abc").is_err());
    }

    #[test]
    fn test_malformed_tags_rejected() {
        assert!("srvr.ffff".parse::<IdentityTag>().is_err());
        assert!("@srvrffff".parse::<IdentityTag>().is_err());
        assert!("@srvr.nothex".parse::<IdentityTag>().is_err());
    }
}
