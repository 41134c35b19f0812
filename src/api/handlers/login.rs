use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use super::{bad_request, present};
use crate::auth::{Authenticator, PublicUser};

#[derive(Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

// axum handler for login
#[instrument(skip_all)]
pub async fn login(
    State(authenticator): State<Arc<Authenticator>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return bad_request("Email and password are required");
    };
    let (Some(email), Some(password)) = (
        present(request.email.as_deref()),
        present(request.password.as_deref()),
    ) else {
        return bad_request("Email and password are required");
    };

    match authenticator.login(email, password).await {
        // The upgrade handle is dropped; the write finishes on its own task.
        Ok(success) => (
            StatusCode::OK,
            Json(json!({
                "message": "Login successful",
                "token": success.token,
                "user": PublicUser::from(&success.user),
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
