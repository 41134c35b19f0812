//! Glue between the credential core and HTTP requests.

pub mod context;
pub mod error;
pub mod service;

pub use context::{extract_bearer_token, OptionalAuth, RequireAuth};
pub use error::{AuthError, SignupError};
pub use service::{normalize_email, Authenticator, LoginSuccess, PublicUser, SessionContext};
