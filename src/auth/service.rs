//! Signup, login and bearer authentication over a [`CredentialStore`].

use serde::Serialize;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{AuthError, SignupError};
use crate::credentials::{
    encode_secret, verify_secret, ClaimSet, HashOptions, MigrationHandle, Migrator, TokenSigner,
    VerifiedClaims,
};
use crate::store::{CredentialRecord, CredentialStore, InsertOutcome, NewCredential, Profile};

/// Trim and lowercase an email so lookups are case-insensitive.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User fields safe to return to clients. Never carries the stored secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub school_name: String,
    pub grade: String,
    pub created_at: i64,
}

impl From<&CredentialRecord> for PublicUser {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            id: record.subject_id,
            email: record.identifier.clone(),
            full_name: record.profile.full_name.clone(),
            school_name: record.profile.school_name.clone(),
            grade: record.profile.grade.clone(),
            created_at: record.created_at_unix,
        }
    }
}

/// A verified bearer token together with the user it names.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub subject_id: Uuid,
    pub claims: VerifiedClaims,
    pub user: CredentialRecord,
}

#[derive(Debug)]
pub struct LoginSuccess {
    pub token: String,
    pub user: CredentialRecord,
    /// Present when a legacy credential matched and an upgrade write was scheduled.
    pub migration: Option<MigrationHandle>,
}

pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    signer: TokenSigner,
    hash_options: HashOptions,
    migration_timeout: Duration,
    /// Derived up front so the first unknown-identifier login costs one derivation.
    dummy_hash: String,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("store", &self.store.kind())
            .field("signer", &self.signer)
            .field("hash_options", &self.hash_options)
            .field("migration_timeout", &self.migration_timeout)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        signer: TokenSigner,
        hash_options: HashOptions,
    ) -> Self {
        Self {
            store,
            signer,
            hash_options,
            migration_timeout: crate::credentials::DEFAULT_MIGRATION_TIMEOUT,
            dummy_hash: encode_secret("keyward-dummy-secret", &hash_options),
        }
    }

    #[must_use]
    pub fn with_migration_timeout(mut self, timeout: Duration) -> Self {
        self.migration_timeout = timeout;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    #[must_use]
    pub fn hash_options(&self) -> &HashOptions {
        &self.hash_options
    }

    fn migrator(&self) -> Migrator {
        Migrator::new(Arc::clone(&self.store), self.hash_options)
            .with_timeout(self.migration_timeout)
    }

    /// Create a user with a freshly hashed secret.
    ///
    /// # Errors
    /// [`SignupError::Conflict`] when the normalized email is taken.
    pub async fn signup(
        &self,
        email: &str,
        secret: &str,
        profile: Profile,
    ) -> Result<CredentialRecord, SignupError> {
        let identifier = normalize_email(email);
        let secret_hash = encode_secret(secret, &self.hash_options);

        match self
            .store
            .insert_credential(NewCredential {
                identifier,
                secret_hash,
                profile,
            })
            .await?
        {
            InsertOutcome::Created(record) => {
                info!(subject_id = %record.subject_id, "Created user");
                Ok(record)
            }
            InsertOutcome::Conflict => Err(SignupError::Conflict),
        }
    }

    /// Verify a secret and issue a session token.
    ///
    /// A legacy plaintext match schedules an upgrade write without waiting for it.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] for an unknown email or wrong secret.
    pub async fn login(&self, email: &str, secret: &str) -> Result<LoginSuccess, AuthError> {
        let identifier = normalize_email(email);
        let record = self
            .store
            .fetch_credential_by_identifier(&identifier)
            .await
            .map_err(AuthError::Store)?;

        let Some(record) = record else {
            // Same derivation cost as a real check.
            let _ = verify_secret(secret, &self.dummy_hash);
            debug!("Login for unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        let verification = verify_secret(secret, &record.secret_hash);
        if !verification.matched {
            debug!(subject_id = %record.subject_id, "Login with wrong secret");
            return Err(AuthError::InvalidCredentials);
        }

        let migration = verification
            .needs_upgrade
            .then(|| self.migrator().upgrade(record.subject_id, secret));

        let claims = ClaimSet::new(record.subject_id.to_string())
            .with_claim("email", record.identifier.clone());
        let token = self.signer.issue(&claims);

        info!(subject_id = %record.subject_id, upgraded = migration.is_some(), "Login succeeded");
        Ok(LoginSuccess {
            token,
            user: record,
            migration,
        })
    }

    /// Resolve a bearer token to its user.
    ///
    /// # Errors
    /// Any token rejection, a missing subject, or a subject with no stored user.
    pub async fn authenticate(&self, token: &str) -> Result<SessionContext, AuthError> {
        let claims = self.signer.verify(token)?;
        let subject = claims.subject().ok_or(AuthError::Format("missing_subject"))?;
        let subject_id = Uuid::parse_str(subject).map_err(|_| AuthError::UnknownSubject)?;

        let user = self
            .store
            .fetch_credential_by_subject_id(subject_id)
            .await
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownSubject)?;

        Ok(SessionContext {
            subject_id,
            claims,
            user,
        })
    }
}
