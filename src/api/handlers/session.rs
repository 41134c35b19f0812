use axum::{response::IntoResponse, Json};
use serde_json::json;

use crate::auth::{OptionalAuth, PublicUser, RequireAuth};

// axum handler for /api/auth/me
pub async fn me(RequireAuth(session): RequireAuth) -> impl IntoResponse {
    Json(json!({ "user": PublicUser::from(&session.user) }))
}

// axum handler for /api/auth/session
pub async fn session(OptionalAuth(session): OptionalAuth) -> impl IntoResponse {
    match session {
        Some(session) => Json(json!({
            "authenticated": true,
            "user": PublicUser::from(&session.user),
        })),
        None => Json(json!({ "authenticated": false })),
    }
}
