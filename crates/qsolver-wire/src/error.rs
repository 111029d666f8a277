//! Error types for qsolver-wire

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using qsolver-wire Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the backend or a model endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing a local file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A base64 payload could not be decoded
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The endpoint answered with an error status
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Invalid or missing API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// No model was selected
    #[error("No model selected")]
    MissingModel,

    /// A settings field is out of range
    #[error("Invalid setting {field}: {message}")]
    InvalidSettings { field: String, message: String },

    /// The request did not complete in time
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// The backend reported a failure as a plain message
    #[error("{0}")]
    Backend(String),
}

impl Error {
    /// Create an API error from a status and message
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a settings validation error
    pub fn invalid_settings(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Structured failure the backend embeds in its error strings.
///
/// Backend errors look like `"POST https://...: 401 {\"message\": ...}"` or a
/// bare JSON object; the object is everything from the first `{` onwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiFailure {
    pub status_code: i32,
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl ApiFailure {
    /// Extract the embedded JSON object from a raw error string
    pub fn parse(raw: &str) -> Option<Self> {
        let start = raw.find('{')?;
        let mut failure: ApiFailure = serde_json::from_str(&raw[start..]).ok()?;

        // "...: 429 {" carries the status in the header when the body lacks it
        if failure.status_code == 0 {
            let header = raw[..start].trim_end();
            if let Some(status) = header
                .rsplit(|c: char| c == ':' || c.is_whitespace())
                .next()
                .and_then(|s| s.parse::<i32>().ok())
            {
                failure.status_code = status;
            }
        }

        Some(failure)
    }

    /// Convert into the typed wire error
    pub fn into_error(self) -> Error {
        let status = u16::try_from(self.status_code).unwrap_or(500);
        Error::Api {
            status,
            code: self.code,
            message: self.message,
        }
    }
}
