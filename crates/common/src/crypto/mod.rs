//! Cryptographic primitives for Burrow
//!
//! Everything in the system that needs to be authenticated hangs off a
//! single primitive: Ed25519 keypairs.
//!
//! - **Identities** carry a keypair; the public half is embedded in the
//!   identity tag a server announces on `/id`.
//! - **Shares** (synchronizable rooms) are *named by* a keypair; the share's
//!   secret key signs the capabilities that grant read or write access, and
//!   the public half embedded in the share tag verifies them.
//!
//! There is deliberately no content encryption here: a capability proves the
//! holder was granted access by whoever controls the share key, and that is
//! the whole trust model.

mod keys;

pub use ed25519_dalek::Signature;
pub use keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
