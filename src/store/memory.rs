//! Process-local credential store for development and tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialRecord, CredentialStore, InsertOutcome, NewCredential};
use crate::credentials::encoding::unix_now;

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<Uuid, CredentialRecord>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn fetch_credential_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>> {
        let identifier = identifier.to_lowercase();
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|record| record.identifier.to_lowercase() == identifier)
            .cloned())
    }

    async fn fetch_credential_by_subject_id(
        &self,
        subject_id: Uuid,
    ) -> Result<Option<CredentialRecord>> {
        Ok(self.records.read().await.get(&subject_id).cloned())
    }

    async fn insert_credential(&self, credential: NewCredential) -> Result<InsertOutcome> {
        let mut records = self.records.write().await;
        let wanted = credential.identifier.to_lowercase();
        if records
            .values()
            .any(|record| record.identifier.to_lowercase() == wanted)
        {
            return Ok(InsertOutcome::Conflict);
        }

        let record = CredentialRecord {
            subject_id: Uuid::new_v4(),
            identifier: credential.identifier,
            secret_hash: credential.secret_hash,
            profile: credential.profile,
            created_at_unix: unix_now(),
        };
        records.insert(record.subject_id, record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn update_credential_hash(&self, subject_id: Uuid, secret_hash: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&subject_id)
            .ok_or_else(|| anyhow!("no credential for subject {subject_id}"))?;
        record.secret_hash = secret_hash.to_string();
        Ok(())
    }
}
