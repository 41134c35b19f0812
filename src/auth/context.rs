//! Request extractors that attach a [`SessionContext`] to handlers.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tracing::debug;

use super::{error::AuthError, service::Authenticator, service::SessionContext};

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Rejects the request with 401 unless a valid bearer token names an existing user.
#[derive(Clone, Debug)]
pub struct RequireAuth(pub SessionContext);

/// Like [`RequireAuth`], but a missing or invalid token yields `None`.
#[derive(Clone, Debug)]
pub struct OptionalAuth(pub Option<SessionContext>);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let authenticator = Arc::<Authenticator>::from_ref(state);
        let session = authenticator.authenticate(&token).await?;
        Ok(Self(session))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuth
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer_token(&parts.headers) else {
            return Ok(Self(None));
        };
        let authenticator = Arc::<Authenticator>::from_ref(state);
        match authenticator.authenticate(&token).await {
            Ok(session) => Ok(Self(Some(session))),
            Err(AuthError::Store(err)) => Err(AuthError::Store(err)),
            Err(err) => {
                debug!(reason = err.reason(), "Ignoring invalid optional token");
                Ok(Self(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(
            extract_bearer_token(&headers("Bearer abc.def.ghi")),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(
            extract_bearer_token(&headers("bEaReR   abc.def.ghi ")),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(extract_bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer    ")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
