//! Password hashing, session tokens and legacy credential migration.
//!
//! Everything in this module except [`migration`] is synchronous and pure: the
//! outcome depends only on the inputs, the clock and the OS random generator.

pub(crate) mod encoding;
pub mod migration;
pub mod password;
pub mod token;

pub use migration::{MigrationHandle, MigrationOutcome, Migrator, DEFAULT_MIGRATION_TIMEOUT};
pub use password::{
    encode_secret, verify_secret, Digest, HashOptions, HashedCredential, MalformedHash,
    StoredCredential, Verification,
};
pub use token::{
    issue_token, verify_token, ClaimSet, TokenKeyError, TokenRejection, TokenSigner,
    VerifiedClaims, DEFAULT_TOKEN_TTL_SECONDS,
};
