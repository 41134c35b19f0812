use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::credentials::TokenRejection;

/// Why a request could not be authenticated.
///
/// The variant is for logs only. Every variant except [`AuthError::Store`] renders as
/// the same `401 {"error":"unauthorized"}` body.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token: {0}")]
    Format(&'static str),
    #[error("token signature mismatch")]
    Signature,
    #[error("token expired")]
    Expired,
    #[error("token subject does not exist")]
    UnknownSubject,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("credential store failure: {0:#}")]
    Store(#[source] anyhow::Error),
}

impl AuthError {
    /// Stable tag used in log fields.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::Format(reason) => *reason,
            Self::Signature => "bad_signature",
            Self::Expired => "expired",
            Self::UnknownSubject => "unknown_subject",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Store(_) => "store",
        }
    }
}

impl From<TokenRejection> for AuthError {
    fn from(rejection: TokenRejection) -> Self {
        match rejection {
            TokenRejection::BadFormat | TokenRejection::BadPayload => {
                Self::Format(rejection.as_str())
            }
            TokenRejection::BadSignature => Self::Signature,
            TokenRejection::Expired => Self::Expired,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Store(err) => {
                error!("Credential store failure: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal_error"})),
                )
                    .into_response()
            }
            other => {
                info!(reason = other.reason(), "Rejected authentication");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "unauthorized"})),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("user already exists")]
    Conflict,
    #[error("credential store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for SignupError {
    fn into_response(self) -> Response {
        match self {
            Self::Conflict => (
                StatusCode::CONFLICT,
                Json(json!({"error": "User already exists"})),
            )
                .into_response(),
            Self::Store(err) => {
                error!("Failed to create user: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal_error"})),
                )
                    .into_response()
            }
        }
    }
}
