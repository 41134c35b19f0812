//! # Keyward (credential security core)
//!
//! `keyward` owns the correctness-sensitive half of authentication: deriving and
//! verifying password hashes, issuing and verifying compact HMAC-signed session
//! tokens, and upgrading legacy plaintext credentials into the hashed scheme.
//!
//! ## Stored credentials
//!
//! Hashes are self-describing strings of the form
//! `pbkdf2_<digest>$<iterations>$<salt>$<hash>` with base64url (unpadded) salt and
//! hash. Values without the `pbkdf2_` marker are legacy plaintext; they still verify,
//! but a successful legacy login re-hashes the secret and writes it back without
//! blocking the response.
//!
//! ## Session tokens
//!
//! Tokens are `header.payload.signature` with HS256 over `header.payload`. There is no
//! server-side session state: a token is valid until its `exp` passes. Verification
//! never panics; failures are returned as a [`credentials::TokenRejection`] so callers
//! branch on the reason without matching error text.
//!
//! ## Outward errors
//!
//! Every authentication failure is reported to clients as a bare `401 unauthorized`.
//! The precise reason (bad signature, expired, unknown subject) is only logged.

pub mod api;
pub mod auth;
pub mod cli;
pub mod credentials;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
