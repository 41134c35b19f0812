//! Credential storage boundary.
//!
//! The credential core only needs four operations from a store. Both adapters keep the
//! stored secret as an opaque string; scheme detection happens in
//! [`crate::credentials::password`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Non-secret profile fields captured at signup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub full_name: String,
    pub school_name: String,
    pub grade: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub subject_id: Uuid,
    pub identifier: String,
    pub secret_hash: String,
    pub profile: Profile,
    pub created_at_unix: i64,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("subject_id", &self.subject_id)
            .field("identifier", &self.identifier)
            .field("secret_hash", &"***")
            .field("profile", &self.profile)
            .field("created_at_unix", &self.created_at_unix)
            .finish()
    }
}

/// Input for [`CredentialStore::insert_credential`].
#[derive(Clone)]
pub struct NewCredential {
    pub identifier: String,
    pub secret_hash: String,
    pub profile: Profile,
}

#[derive(Debug)]
pub enum InsertOutcome {
    Created(CredentialRecord),
    /// The identifier is already taken.
    Conflict,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Short backend name, reported by `/health`.
    fn kind(&self) -> &'static str;

    /// Look up a user by email, ignoring case.
    async fn fetch_credential_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>>;

    async fn fetch_credential_by_subject_id(
        &self,
        subject_id: Uuid,
    ) -> Result<Option<CredentialRecord>>;

    /// Emails that differ only in case conflict.
    async fn insert_credential(&self, credential: NewCredential) -> Result<InsertOutcome>;

    /// Replace the stored secret for a subject. Full replacement, never a delta.
    ///
    /// # Errors
    /// Fails if the subject does not exist or the write fails.
    async fn update_credential_hash(&self, subject_id: Uuid, secret_hash: &str) -> Result<()>;

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
