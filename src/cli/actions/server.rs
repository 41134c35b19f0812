use crate::{
    api::{self, AppState},
    auth::Authenticator,
    credentials::{Digest, HashOptions, TokenSigner},
    store::{CredentialStore, MemoryCredentialStore, PgCredentialStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub token_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub hash_iterations: u32,
    pub hash_digest: Digest,
    pub migration_timeout: Duration,
}

impl Args {
    #[must_use]
    pub fn hash_options(&self) -> HashOptions {
        HashOptions::default()
            .with_iterations(self.hash_iterations)
            .with_digest(self.hash_digest)
    }

    /// # Errors
    /// Returns an error if the token secret is unusable.
    pub fn authenticator(&self, store: Arc<dyn CredentialStore>) -> Result<Authenticator> {
        let signer = TokenSigner::from_secret(&self.token_secret)
            .context("Invalid token signing secret")?
            .with_ttl_seconds(self.token_ttl_seconds);

        Ok(Authenticator::new(store, signer, self.hash_options())
            .with_migration_timeout(self.migration_timeout))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be reached or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store: Arc<dyn CredentialStore> = match &args.dsn {
        Some(dsn) => {
            let store = PgCredentialStore::connect(dsn).await?;
            info!("Using postgres credential store");
            Arc::new(store)
        }
        None => {
            warn!("No DSN configured, users are kept in memory");
            Arc::new(MemoryCredentialStore::new())
        }
    };

    let authenticator = args.authenticator(store)?;

    api::serve(args.port, AppState::new(authenticator)).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(secret: &str) -> Args {
        Args {
            port: 8080,
            dsn: None,
            token_secret: SecretString::from(secret.to_string()),
            token_ttl_seconds: 60,
            hash_iterations: 1_000,
            hash_digest: Digest::Sha512,
            migration_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn hash_options_follow_args() {
        let options = args("s3cret").hash_options();
        assert_eq!(options.iterations(), 1_000);
        assert_eq!(options.digest(), Digest::Sha512);
    }

    #[test]
    fn authenticator_uses_configured_ttl() {
        let authenticator = args("s3cret")
            .authenticator(Arc::new(MemoryCredentialStore::new()))
            .unwrap();
        assert_eq!(authenticator.signer().ttl_seconds(), 60);
        assert_eq!(authenticator.hash_options().digest(), Digest::Sha512);
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(args("")
            .authenticator(Arc::new(MemoryCredentialStore::new()))
            .is_err());
    }
}
