use std::fmt;
use std::ops::Deref;

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

pub const PRIVATE_KEY_SIZE: usize = 32;
pub const PUBLIC_KEY_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("expected {expected} key bytes, got {got}")]
    WrongLength { expected: usize, got: usize },
    #[error("key hex could not be decoded")]
    BadHex,
    #[error("bytes do not describe a valid curve point")]
    BadCurvePoint,
}

/// Public half of an Ed25519 keypair.
///
/// A thin wrapper around `ed25519_dalek::VerifyingKey`. The same key type
/// backs every tagged principal in the system:
/// - **Identities**: the key embedded in an identity tag (`@label.<hex>`)
/// - **Shares**: the key embedded in a share tag (`+name.<hex>`), which
///   signs the capabilities granted for that share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff).map_err(|_| KeyError::BadHex)?;
        Self::try_from(&buff[..])
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        *self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Check a detached Ed25519 signature over `msg`.
    pub fn verify(
        &self,
        msg: &[u8],
        signature: &ed25519_dalek::Signature,
    ) -> Result<(), ed25519_dalek::SignatureError> {
        self.0.verify_strict(msg, signature)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let buff: [u8; PUBLIC_KEY_SIZE] =
            bytes.try_into().map_err(|_| KeyError::WrongLength {
                expected: PUBLIC_KEY_SIZE,
                got: bytes.len(),
            })?;
        let key = VerifyingKey::from_bytes(&buff).map_err(|_| KeyError::BadCurvePoint)?;
        Ok(PublicKey(key))
    }
}

impl Deref for PublicKey {
    type Target = VerifyingKey;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        PublicKey(key)
    }
}

impl From<PublicKey> for VerifyingKey {
    fn from(key: PublicKey) -> Self {
        key.0
    }
}

// Keys sort and hash by their raw bytes, so they can sit in ordered sets.
impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_bytes().hash(state);
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

/// Secret half of an Ed25519 keypair.
///
/// Identity keys are persisted by the storage driver; share keys are held by
/// whoever mints capabilities for that share and never need to reach a
/// server at all.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Generate a fresh key from the system's entropy source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
        Self::from(bytes)
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PRIVATE_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff).map_err(|_| KeyError::BadHex)?;
        Ok(Self::from(buff))
    }

    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Produce a detached signature over `msg`.
    pub fn sign(&self, msg: &[u8]) -> ed25519_dalek::Signature {
        use ed25519_dalek::Signer;
        self.0.sign(msg)
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&secret))
    }
}

impl Deref for SecretKey {
    type Target = SigningKey;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print key material
        write!(f, "SecretKey({})", self.public().to_hex())
    }
}
