//! Error types for the FMR client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the codelist does not exist" from "the server returned an unexpected
//! status." A body that is not JSON at all means the registry is down or
//! sitting behind an HTML error page, which is reported as
//! `RegistryUnreachable` rather than a parse failure. Dataset validation
//! failures are not errors; they are reported through `ValidationOutcome`.

use thiserror::Error;

/// Errors returned by `FmrClient` parse methods and `Registry` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404 or 403.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The registry answered with something that is not JSON.
    #[error("registry not accessible (HTTP {status})")]
    RegistryUnreachable { status: u16, body: String },

    /// The registry refused the request with 403; the instance needs a restart.
    #[error("registry blocked the request, restart the FMR instance")]
    Blocked,

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A codelist name was not present in the `[codelists]` table.
    #[error("no codelist named `{0}` in configuration")]
    UnknownCodelist(String),
}

impl ApiError {
    /// Whether the failure happened before a usable response was received.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnreachable { .. } | Self::Blocked | Self::Transport(_)
        )
    }
}

/// Error for parsing the string form of an enumerated option.
#[derive(Debug, Error)]
#[error("invalid {kind} `{value}`, expected one of: {expected}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}
