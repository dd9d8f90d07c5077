//! Response envelope decoding
//!
//! Every VK reply is a JSON object with either a `"response"` or an `"error"`
//! key. The shape is checked once here and turned into typed values, so the
//! rest of the engine never probes JSON fields again.

use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

use crate::error::{Error, Result};

/// Known VK error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// User authorization failed, usually an expired access token
    AuthorizationFailed,
    /// Too many requests per second
    TooManyRequests,
    /// Flood control: a message with the same guid was already sent
    FloodControl,
    /// Internal server error
    InternalServerError,
    /// Captcha needed, handled by a higher layer
    CaptchaNeeded,
    /// Validation required: the user must confirm their identity out of band
    ValidationRequired,
    Other(i64),
}

impl ErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            5 => ErrorCode::AuthorizationFailed,
            6 => ErrorCode::TooManyRequests,
            9 => ErrorCode::FloodControl,
            10 => ErrorCode::InternalServerError,
            14 => ErrorCode::CaptchaNeeded,
            17 => ErrorCode::ValidationRequired,
            other => ErrorCode::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::AuthorizationFailed => 5,
            ErrorCode::TooManyRequests => 6,
            ErrorCode::FloodControl => 9,
            ErrorCode::InternalServerError => 10,
            ErrorCode::CaptchaNeeded => 14,
            ErrorCode::ValidationRequired => 17,
            ErrorCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A well-formed `"error"` object.
///
/// The raw JSON is kept verbatim so callers receive exactly what the server sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: Option<String>,
    pub redirect_uri: Option<String>,
    raw: Value,
}

impl ApiError {
    /// Validate an `"error"` value: it must be an object with a numeric `error_code`.
    pub fn from_value(raw: Value) -> Result<Self> {
        let Some(object) = raw.as_object() else {
            return Err(Error::MalformedError(format!("not an object: {raw}")));
        };
        let code = object
            .get("error_code")
            .and_then(|c| c.as_i64().or_else(|| c.as_f64().map(|f| f as i64)))
            .ok_or_else(|| Error::MalformedError(format!("missing error_code: {raw}")))?;
        let message = object
            .get("error_msg")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let redirect_uri = object
            .get("redirect_uri")
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
            .map(str::to_owned);

        Ok(Self {
            code: ErrorCode::from_code(code),
            message,
            redirect_uri,
            raw,
        })
    }

    /// The error object as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API error {}: {}",
            self.code,
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

/// Top-level reply after the shape check.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Response(Value),
    /// Unvalidated `"error"` value; see `ApiError::from_value`
    Error(Value),
}

/// Parse a reply body. `"error"` wins when both keys are present.
pub fn decode(body: &str) -> Result<Envelope> {
    let root: Value = serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;
    let Value::Object(mut root) = root else {
        return Err(Error::Malformed("root element is not an object".into()));
    };
    if let Some(error) = root.remove("error") {
        return Ok(Envelope::Error(error));
    }
    match root.remove("response") {
        Some(response) => Ok(Envelope::Response(response)),
        None => Err(Error::Malformed(
            "root element is neither \"response\" nor \"error\"".into(),
        )),
    }
}

/// One page of a paginated method (`{"count": N, "items": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    #[serde(deserialize_with = "whole_number")]
    pub count: u64,
    pub items: Vec<Value>,
}

impl Page {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Malformed(format!("invalid page: {e}")))
    }
}

/// Non-negative integer, also when sent as a float (`10.0`).
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;
    number
        .as_u64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        })
        .ok_or_else(|| serde::de::Error::custom(format!("expected a whole count, got {number}")))
}
