//! Compact HS256 session tokens.
//!
//! `base64url(header).base64url(payload).base64url(hmac)` where the HMAC-SHA256 covers
//! the first two segments joined by `.`. The payload is the caller's claims plus `iat`
//! and `exp` (Unix seconds).

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

use super::encoding::{b64d, b64e, unix_now};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Why a token was rejected. Returned as a value; verification never panics.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("invalid token format")]
    BadFormat,
    #[error("invalid signature")]
    BadSignature,
    #[error("invalid payload")]
    BadPayload,
    #[error("token expired")]
    Expired,
}

impl TokenRejection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadFormat => "bad_format",
            Self::BadSignature => "bad_signature",
            Self::BadPayload => "bad_payload",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenKeyError {
    #[error("token signing secret must not be empty")]
    Empty,
    #[error("invalid token signing secret")]
    InvalidLength,
}

/// Claims to embed in a new token. The subject is mandatory.
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimSet {
    subject: String,
    extra: Map<String, Value>,
}

impl ClaimSet {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            extra: Map::new(),
        }
    }

    /// Add a claim. `sub`, `iat` and `exp` are always set by the issuer and take
    /// precedence over values added here.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    fn to_payload(&self, iat: i64, exp: i64) -> Value {
        let mut payload = self.extra.clone();
        payload.insert("sub".to_string(), Value::from(self.subject.as_str()));
        payload.insert("iat".to_string(), Value::from(iat));
        payload.insert("exp".to_string(), Value::from(exp));
        Value::Object(payload)
    }
}

/// Claims decoded from a token whose signature and expiry checked out.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedClaims(Map<String, Value>);

impl VerifiedClaims {
    /// The `sub` claim, when it is a non-empty string.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.0
            .get("sub")
            .and_then(Value::as_str)
            .filter(|sub| !sub.is_empty())
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.0.get("iat").and_then(Value::as_i64)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Issues and verifies tokens with one HMAC key.
///
/// The key is fixed at construction; cloning shares nothing mutable.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
    ttl_seconds: i64,
}

impl TokenSigner {
    /// # Errors
    ///
    /// Returns [`TokenKeyError::Empty`] for an empty secret.
    pub fn new(secret: &[u8]) -> Result<Self, TokenKeyError> {
        if secret.is_empty() {
            return Err(TokenKeyError::Empty);
        }
        let mac =
            <HmacSha256 as Mac>::new_from_slice(secret).map_err(|_| TokenKeyError::InvalidLength)?;
        Ok(Self {
            mac,
            ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        })
    }

    /// # Errors
    ///
    /// Returns [`TokenKeyError::Empty`] for an empty secret.
    pub fn from_secret(secret: &SecretString) -> Result<Self, TokenKeyError> {
        Self::new(secret.expose_secret().as_bytes())
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token valid for the configured TTL.
    #[must_use]
    pub fn issue(&self, claims: &ClaimSet) -> String {
        self.issue_at(claims, self.ttl_seconds, unix_now())
    }

    #[must_use]
    pub fn issue_with_ttl(&self, claims: &ClaimSet, ttl_seconds: i64) -> String {
        self.issue_at(claims, ttl_seconds, unix_now())
    }

    /// Issue a token as of `now_unix_seconds`. Deterministic for identical inputs.
    #[must_use]
    pub fn issue_at(&self, claims: &ClaimSet, ttl_seconds: i64, now_unix_seconds: i64) -> String {
        let exp = now_unix_seconds.saturating_add(ttl_seconds);
        let header_b64 = b64e(HEADER_JSON.as_bytes());
        let payload_b64 = b64e(claims.to_payload(now_unix_seconds, exp).to_string().as_bytes());
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature_b64 = b64e(&self.sign(&signing_input));

        format!("{signing_input}.{signature_b64}")
    }

    /// Verify a token against the current time.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, in order: format, signature, payload, expiry.
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, TokenRejection> {
        self.verify_at(token, unix_now())
    }

    /// Verify a token as of `now_unix_seconds`.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, in order: format, signature, payload, expiry.
    pub fn verify_at(
        &self,
        token: &str,
        now_unix_seconds: i64,
    ) -> Result<VerifiedClaims, TokenRejection> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = segments.as_slice() else {
            return Err(TokenRejection::BadFormat);
        };
        if header_b64.is_empty() || payload_b64.is_empty() || signature_b64.is_empty() {
            return Err(TokenRejection::BadFormat);
        }

        let provided = b64d(signature_b64).ok_or(TokenRejection::BadSignature)?;
        let mut mac = self.mac.clone();
        mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
        mac.verify_slice(&provided).map_err(|_| TokenRejection::BadSignature)?;

        let claims: Map<String, Value> = b64d(payload_b64)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(TokenRejection::BadPayload)?;

        // Only a numeric `exp` is enforced; `exp == now` is still valid.
        #[allow(clippy::cast_precision_loss)]
        let now = now_unix_seconds as f64;
        if let Some(exp) = claims.get("exp").and_then(Value::as_f64) {
            if exp < now {
                return Err(TokenRejection::Expired);
            }
        }

        Ok(VerifiedClaims(claims))
    }

    fn sign(&self, signing_input: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Issue a token signed with `secret`. `ttl_seconds` defaults to seven days.
///
/// # Errors
///
/// Returns [`TokenKeyError`] if the secret is empty.
pub fn issue_token(
    claims: &ClaimSet,
    secret: &[u8],
    ttl_seconds: Option<i64>,
) -> Result<String, TokenKeyError> {
    let signer = TokenSigner::new(secret)?;
    Ok(signer.issue_with_ttl(claims, ttl_seconds.unwrap_or(DEFAULT_TOKEN_TTL_SECONDS)))
}

/// Verify a token signed with `secret`.
///
/// # Errors
///
/// Returns a [`TokenRejection`]; an unusable (empty) secret verifies nothing and is
/// reported as [`TokenRejection::BadSignature`].
pub fn verify_token(token: &str, secret: &[u8]) -> Result<VerifiedClaims, TokenRejection> {
    let signer = TokenSigner::new(secret).map_err(|_| TokenRejection::BadSignature)?;
    signer.verify(token)
}
