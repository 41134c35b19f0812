//! PBKDF2 password hashing and verification.
//!
//! Encoded form: `pbkdf2_<digest>$<iterations>$<salt>$<hash>`, salt and hash as
//! unpadded base64url. Anything stored without the `pbkdf2_` marker is a legacy
//! plaintext credential.

use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::{Sha256, Sha384, Sha512};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::encoding::{b64d, b64e, constant_time_eq};

pub const SCHEME_PREFIX: &str = "pbkdf2_";
pub const DEFAULT_ITERATIONS: u32 = 200_000;
pub const DEFAULT_SALT_BYTES: usize = 16;
pub const DEFAULT_KEY_LEN: usize = 32;

/// Digest used as the PBKDF2 pseudorandom function (through HMAC).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Digest {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl Digest {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    fn derive(self, secret: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) {
        match self {
            Self::Sha256 => pbkdf2_hmac::<Sha256>(secret, salt, iterations, out),
            Self::Sha384 => pbkdf2_hmac::<Sha384>(secret, salt, iterations, out),
            Self::Sha512 => pbkdf2_hmac::<Sha512>(secret, salt, iterations, out),
        }
    }
}

impl FromStr for Digest {
    type Err = MalformedHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(MalformedHash::UnknownDigest(other.to_string())),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for [`encode_secret`]. Zero values are clamped to 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashOptions {
    iterations: u32,
    salt_bytes: usize,
    key_len: usize,
    digest: Digest,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            salt_bytes: DEFAULT_SALT_BYTES,
            key_len: DEFAULT_KEY_LEN,
            digest: Digest::Sha256,
        }
    }
}

impl HashOptions {
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_salt_bytes(mut self, salt_bytes: usize) -> Self {
        self.salt_bytes = salt_bytes;
        self
    }

    #[must_use]
    pub fn with_key_len(mut self, key_len: usize) -> Self {
        self.key_len = key_len;
        self
    }

    #[must_use]
    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = digest;
        self
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations.max(1)
    }

    #[must_use]
    pub fn salt_bytes(&self) -> usize {
        self.salt_bytes.max(1)
    }

    #[must_use]
    pub fn key_len(&self) -> usize {
        self.key_len.max(1)
    }

    #[must_use]
    pub fn digest(&self) -> Digest {
        self.digest
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedHash {
    #[error("expected 4 `$`-separated fields, found {0}")]
    FieldCount(usize),
    #[error("unknown digest: {0}")]
    UnknownDigest(String),
    #[error("invalid iteration count")]
    Iterations,
    #[error("invalid salt encoding")]
    Salt,
    #[error("invalid hash encoding")]
    Hash,
}

/// A parsed `pbkdf2_*` credential.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedCredential {
    pub digest: Digest,
    pub iterations: u32,
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

impl HashedCredential {
    fn matches(&self, secret: &str) -> bool {
        let mut derived = vec![0u8; self.hash.len()];
        self.digest
            .derive(secret.as_bytes(), &self.salt, self.iterations, &mut derived);
        constant_time_eq(&derived, &self.hash)
    }
}

impl fmt::Display for HashedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SCHEME_PREFIX}{}${}${}${}",
            self.digest,
            self.iterations,
            b64e(&self.salt),
            b64e(&self.hash)
        )
    }
}

impl fmt::Debug for HashedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedCredential")
            .field("digest", &self.digest)
            .field("iterations", &self.iterations)
            .field("salt_len", &self.salt.len())
            .field("hash_len", &self.hash.len())
            .finish()
    }
}

/// Stored secret, decoded once from its string form.
#[derive(Clone, PartialEq, Eq)]
pub enum StoredCredential {
    Hashed(HashedCredential),
    Legacy(String),
}

impl StoredCredential {
    /// Decode a stored secret.
    ///
    /// Values carrying the `pbkdf2_` marker must parse fully; they are never
    /// reinterpreted as plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedHash`] when a `pbkdf2_` value has the wrong field count, an
    /// unknown digest, a non-numeric or zero iteration count, or an empty/undecodable
    /// salt or hash.
    pub fn parse(stored: &str) -> Result<Self, MalformedHash> {
        let Some(rest) = stored.strip_prefix(SCHEME_PREFIX) else {
            return Ok(Self::Legacy(stored.to_string()));
        };

        let fields: Vec<&str> = rest.split('$').collect();
        let [digest, iterations, salt, hash] = fields.as_slice() else {
            return Err(MalformedHash::FieldCount(fields.len()));
        };

        let digest = digest.parse::<Digest>()?;
        let iterations = iterations
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(MalformedHash::Iterations)?;
        let salt = b64d(salt)
            .filter(|s| !s.is_empty())
            .ok_or(MalformedHash::Salt)?;
        let hash = b64d(hash)
            .filter(|h| !h.is_empty())
            .ok_or(MalformedHash::Hash)?;

        Ok(Self::Hashed(HashedCredential {
            digest,
            iterations,
            salt,
            hash,
        }))
    }

    #[must_use]
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashed(hashed) => f.debug_tuple("Hashed").field(hashed).finish(),
            Self::Legacy(_) => f.debug_tuple("Legacy").field(&"***").finish(),
        }
    }
}

/// Outcome of [`verify_secret`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verification {
    pub matched: bool,
    /// Set only when a legacy plaintext credential matched.
    pub needs_upgrade: bool,
}

impl Verification {
    pub const NO_MATCH: Self = Self {
        matched: false,
        needs_upgrade: false,
    };
}

/// Hash a secret with a fresh random salt.
#[must_use]
pub fn encode_secret(secret: &str, options: &HashOptions) -> String {
    let mut salt = vec![0u8; options.salt_bytes()];
    OsRng.fill_bytes(&mut salt);

    let mut hash = vec![0u8; options.key_len()];
    options
        .digest()
        .derive(secret.as_bytes(), &salt, options.iterations(), &mut hash);

    HashedCredential {
        digest: options.digest(),
        iterations: options.iterations(),
        salt,
        hash,
    }
    .to_string()
}

/// Check a secret against a stored value of either scheme.
#[must_use]
pub fn verify_secret(secret: &str, stored: &str) -> Verification {
    match StoredCredential::parse(stored) {
        Ok(StoredCredential::Hashed(hashed)) => Verification {
            matched: hashed.matches(secret),
            needs_upgrade: false,
        },
        // Plain equality: the legacy path is deprecated and upgraded on first use.
        Ok(StoredCredential::Legacy(raw)) if !raw.is_empty() && raw == secret => Verification {
            matched: true,
            needs_upgrade: true,
        },
        Ok(StoredCredential::Legacy(_)) => Verification::NO_MATCH,
        Err(err) => {
            tracing::debug!("Stored credential is malformed: {err}");
            Verification::NO_MATCH
        }
    }
}
