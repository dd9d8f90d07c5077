//! Error types for API calls
//!
//! Maps the three possible call outcomes onto `Result`:
//! - success is `Ok(value)`
//! - failure is `Err(e)`; `e.error_value()` carries the server's error
//!   object when one was received and is `None` for transport/parse failures
//! - a dropped call (connection closing, flood control) is `Err(e)` with
//!   `e.is_silent() == true`; hosts should not react to it at all

use serde_json::Value;

use crate::envelope::ApiError;

/// Errors from the HTTP facade.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

/// Errors from the external authentication collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("authentication failed: {0}")]
    Failed(String),

    #[error("authentication unavailable: {0}")]
    Unavailable(String),
}

/// Errors from API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection is closing")]
    Closing,

    #[error("scheduled retry was cancelled")]
    Cancelled,

    #[error("call dropped by flood control")]
    FloodControl,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("malformed error object: {0}")]
    MalformedError(String),

    #[error("re-authentication failed: {0}")]
    Reauth(#[from] AuthError),

    #[error("{0}")]
    Api(ApiError),
}

impl Error {
    /// The server's error object, if the call failed with one.
    pub fn error_value(&self) -> Option<&Value> {
        match self {
            Error::Api(e) => Some(e.raw()),
            _ => None,
        }
    }

    /// The structured API error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// True when the call was absorbed without an outcome.
    pub fn is_silent(&self) -> bool {
        matches!(self, Error::Closing | Error::Cancelled | Error::FloodControl)
    }

    /// Label for the `outcome` metric dimension.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Error::Closing | Error::Cancelled | Error::FloodControl => "dropped",
            Error::Transport(_) => "transport_error",
            Error::Parse(_) | Error::Malformed(_) | Error::MalformedError(_) => "parse_error",
            Error::Reauth(_) => "auth_error",
            Error::Api(_) => "api_error",
        }
    }
}

/// Result alias for API calls.
pub type Result<T> = std::result::Result<T, Error>;
