use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use super::{bad_request, present, valid_email};
use crate::{
    auth::{normalize_email, Authenticator, PublicUser},
    store::Profile,
};

const MISSING_FIELDS: &str = "All fields (email, password, schoolName, grade, name) are required";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
    school_name: Option<String>,
    /// Accepted as a string or a number.
    grade: Option<Value>,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("name", &self.name)
            .field("school_name", &self.school_name)
            .field("grade", &self.grade)
            .finish()
    }
}

fn grade_text(grade: Option<&Value>) -> Option<String> {
    match grade? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

// axum handler for signup
#[instrument(skip_all)]
pub async fn signup(
    State(authenticator): State<Arc<Authenticator>>,
    payload: Option<Json<SignupRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return bad_request(MISSING_FIELDS);
    };

    let (Some(email), Some(password), Some(name), Some(school_name), Some(grade)) = (
        present(request.email.as_deref()),
        present(request.password.as_deref()),
        present(request.name.as_deref()),
        present(request.school_name.as_deref()),
        grade_text(request.grade.as_ref()),
    ) else {
        return bad_request(MISSING_FIELDS);
    };

    if !valid_email(&normalize_email(email)) {
        return bad_request("Invalid email");
    }

    let profile = Profile {
        full_name: name.trim().to_string(),
        school_name: school_name.trim().to_string(),
        grade,
    };

    match authenticator.signup(email, password, profile).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "User created successfully",
                "user": PublicUser::from(&record),
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_accepts_strings_and_numbers() {
        assert_eq!(grade_text(Some(&json!("5"))), Some("5".to_string()));
        assert_eq!(grade_text(Some(&json!(7))), Some("7".to_string()));
        assert_eq!(grade_text(Some(&json!(" "))), None);
        assert_eq!(grade_text(Some(&json!(null))), None);
        assert_eq!(grade_text(None), None);
    }

    #[test]
    fn debug_hides_password() {
        let request = SignupRequest {
            email: Some("a@example.com".to_string()),
            password: Some("hunter2".to_string()),
            name: None,
            school_name: None,
            grade: None,
        };
        assert!(!format!("{request:?}").contains("hunter2"));
    }
}
