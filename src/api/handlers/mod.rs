pub mod health;
pub use self::health::health;

pub mod root;
pub use self::root::root;

pub mod signup;
pub use self::signup::signup;

pub mod login;
pub use self::login::login;

pub mod session;
pub use self::session::{me, session};

// common functions for the handlers
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use regex::Regex;
use serde_json::json;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// `400 {"error": message}`.
pub(crate) fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Treat absent and whitespace-only fields alike.
pub(crate) fn present(field: Option<&str>) -> Option<&str> {
    field.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_simple() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("spaces in@example.com"));
    }

    #[test]
    fn present_rejects_blank() {
        assert_eq!(present(Some("x")), Some("x"));
        assert_eq!(present(Some("   ")), None);
        assert_eq!(present(None), None);
    }
}
