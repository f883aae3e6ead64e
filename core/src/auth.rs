//! Basic-Authentication headers for FMR's secured endpoints.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Username/password pair used for Basic authentication.
///
/// Supplied by the caller; nothing in this crate looks credentials up on its
/// own.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `Basic <base64(user:password)>`.
pub fn basic_token(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.user, credentials.password);
    format!("Basic {}", STANDARD.encode(raw.as_bytes()))
}

/// Headers sent with every authenticated JSON request.
pub fn auth_headers(credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        ("Authorization".to_string(), basic_token(credentials)),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
}
