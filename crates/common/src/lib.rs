/**
 * Authorization state: the capabilities a
 *  peer has imported, and the interest sets
 *  derived from them.
 */
pub mod auth;
/**
 * Capability grants: signed, transferable
 *  read/write access tokens for a share.
 */
pub mod cap;
/**
 * Cryptographic types and operations.
 *  - Public and Private key implementations
 *  - Signing and verification for tags and grants
 */
pub mod crypto;
/**
 * Identities: labelled keypairs a peer acts
 *  as, displayed as `@label.<hex>` tags.
 */
pub mod identity;
/**
 * The peer facade: one node's identities,
 *  capabilities, and document stores.
 */
pub mod peer;
/**
 * Shares: the named, synchronizable datasets
 *  peers exchange, displayed as `+name.<hex>`
 *  tags.
 */
pub mod share;
/**
 * Document storage. Last-write-wins records
 *  behind a pluggable driver; ships with an
 *  in-memory driver.
 */
pub mod store;
/**
 * Live sync sessions: the announce/want/chunk
 *  protocol and the task that drives one
 *  connection.
 */
pub mod sync;
/**
 * In-process peers and transports for
 *  integration tests.
 */
pub mod testkit;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::auth::Auth;
    pub use crate::cap::{CapKind, Capability};
    pub use crate::crypto::{PublicKey, SecretKey};
    pub use crate::identity::{Identity, IdentityTag};
    pub use crate::peer::Peer;
    pub use crate::share::{ShareKeypair, ShareTag};
    pub use crate::store::{DocOrder, DocPath, Document, Store};
    pub use crate::sync::{Syncer, SyncerConfig};
    pub use crate::version::build_info;
}
