//! Background upgrade of legacy plaintext credentials.
//!
//! A legacy login has already succeeded by the time [`Migrator::upgrade`] runs. The new
//! hash is computed inline, then written from a spawned task so the response never
//! waits on the store. A failed or slow write leaves the record legacy; the next
//! successful login tries again.

use std::{fmt, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::password::{encode_secret, HashOptions};
use crate::store::CredentialStore;

pub const DEFAULT_MIGRATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    Upgraded,
    Failed(String),
    TimedOut,
    /// The write task panicked or was cancelled.
    Abandoned,
}

/// Handle to a detached upgrade write. Dropping it does not cancel the write.
#[derive(Debug)]
pub struct MigrationHandle(JoinHandle<MigrationOutcome>);

impl MigrationHandle {
    pub async fn outcome(self) -> MigrationOutcome {
        self.0.await.unwrap_or(MigrationOutcome::Abandoned)
    }
}

#[derive(Clone)]
pub struct Migrator {
    store: Arc<dyn CredentialStore>,
    options: HashOptions,
    timeout: Duration,
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("store", &self.store.kind())
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Migrator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, options: HashOptions) -> Self {
        Self {
            store,
            options,
            timeout: DEFAULT_MIGRATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Re-hash `secret` and schedule the write for `subject_id`.
    ///
    /// Must be called from within a tokio runtime. Each call produces a freshly salted
    /// hash, so repeating it is harmless.
    #[must_use = "drop the handle explicitly to detach the write"]
    pub fn upgrade(&self, subject_id: Uuid, secret: &str) -> MigrationHandle {
        let hash = encode_secret(secret, &self.options);
        let store = Arc::clone(&self.store);
        let limit = self.timeout;

        let span = tracing::info_span!("credential.migrate", subject_id = %subject_id);
        let task = async move {
            match tokio::time::timeout(limit, store.update_credential_hash(subject_id, &hash)).await
            {
                Ok(Ok(())) => {
                    info!("Upgraded legacy credential");
                    MigrationOutcome::Upgraded
                }
                Ok(Err(err)) => {
                    warn!("Failed to upgrade legacy credential: {err:#}");
                    MigrationOutcome::Failed(format!("{err:#}"))
                }
                Err(_) => {
                    warn!("Legacy credential upgrade timed out after {limit:?}");
                    MigrationOutcome::TimedOut
                }
            }
        };

        MigrationHandle(tokio::spawn(task.instrument(span)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::credentials::password::verify_secret;
    use crate::store::{
        CredentialRecord, InsertOutcome, MemoryCredentialStore, NewCredential, Profile,
    };
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    fn fast() -> HashOptions {
        HashOptions::default().with_iterations(1_000)
    }

    async fn seeded(secret_hash: &str) -> (Arc<MemoryCredentialStore>, Uuid) {
        let store = Arc::new(MemoryCredentialStore::new());
        let outcome = store
            .insert_credential(NewCredential {
                identifier: "legacy@example.com".to_string(),
                secret_hash: secret_hash.to_string(),
                profile: Profile::default(),
            })
            .await
            .unwrap();
        let InsertOutcome::Created(record) = outcome else {
            panic!("expected insert to succeed");
        };
        (store, record.subject_id)
    }

    struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        fn kind(&self) -> &'static str {
            "failing"
        }

        async fn fetch_credential_by_identifier(
            &self,
            _identifier: &str,
        ) -> Result<Option<CredentialRecord>> {
            Ok(None)
        }

        async fn fetch_credential_by_subject_id(
            &self,
            _subject_id: Uuid,
        ) -> Result<Option<CredentialRecord>> {
            Ok(None)
        }

        async fn insert_credential(&self, _credential: NewCredential) -> Result<InsertOutcome> {
            Err(anyhow!("read-only"))
        }

        async fn update_credential_hash(&self, _subject_id: Uuid, _hash: &str) -> Result<()> {
            Err(anyhow!("connection reset"))
        }
    }

    struct StalledStore;

    #[async_trait]
    impl CredentialStore for StalledStore {
        fn kind(&self) -> &'static str {
            "stalled"
        }

        async fn fetch_credential_by_identifier(
            &self,
            _identifier: &str,
        ) -> Result<Option<CredentialRecord>> {
            Ok(None)
        }

        async fn fetch_credential_by_subject_id(
            &self,
            _subject_id: Uuid,
        ) -> Result<Option<CredentialRecord>> {
            Ok(None)
        }

        async fn insert_credential(&self, _credential: NewCredential) -> Result<InsertOutcome> {
            Ok(InsertOutcome::Conflict)
        }

        async fn update_credential_hash(&self, _subject_id: Uuid, _hash: &str) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn legacy_credential_is_upgraded() {
        let (store, subject_id) = seeded("abc123").await;
        let before = verify_secret("abc123", "abc123");
        assert!(before.matched && before.needs_upgrade);

        let migrator = Migrator::new(store.clone(), fast());
        assert_eq!(
            migrator.upgrade(subject_id, "abc123").outcome().await,
            MigrationOutcome::Upgraded
        );

        let record = store
            .fetch_credential_by_subject_id(subject_id)
            .await
            .unwrap()
            .unwrap();
        assert!(record.secret_hash.starts_with("pbkdf2_sha256$1000$"));
        let after = verify_secret("abc123", &record.secret_hash);
        assert!(after.matched);
        assert!(!after.needs_upgrade);
    }

    #[tokio::test]
    async fn repeated_upgrade_overwrites_with_fresh_salt() {
        let (store, subject_id) = seeded("abc123").await;
        let migrator = Migrator::new(store.clone(), fast());

        migrator.upgrade(subject_id, "abc123").outcome().await;
        let first = store
            .fetch_credential_by_subject_id(subject_id)
            .await
            .unwrap()
            .unwrap()
            .secret_hash;
        migrator.upgrade(subject_id, "abc123").outcome().await;
        let second = store
            .fetch_credential_by_subject_id(subject_id)
            .await
            .unwrap()
            .unwrap()
            .secret_hash;

        assert_ne!(first, second);
        assert!(verify_secret("abc123", &second).matched);
    }

    #[tokio::test]
    async fn write_failure_is_reported_not_raised() {
        let migrator = Migrator::new(Arc::new(FailingStore), fast());
        let outcome = migrator.upgrade(Uuid::new_v4(), "abc123").outcome().await;
        assert!(matches!(outcome, MigrationOutcome::Failed(ref msg) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn unknown_subject_fails() {
        let store = Arc::new(MemoryCredentialStore::new());
        let migrator = Migrator::new(store, fast());
        let outcome = migrator.upgrade(Uuid::new_v4(), "abc123").outcome().await;
        assert!(matches!(outcome, MigrationOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn slow_write_times_out() {
        let migrator =
            Migrator::new(Arc::new(StalledStore), fast()).with_timeout(Duration::from_millis(50));
        assert_eq!(
            migrator.upgrade(Uuid::new_v4(), "abc123").outcome().await,
            MigrationOutcome::TimedOut
        );
    }

    #[test]
    fn default_timeout_is_five_seconds() {
        let migrator = Migrator::new(Arc::new(MemoryCredentialStore::new()), fast());
        assert_eq!(migrator.timeout(), Duration::from_secs(5));
    }
}
