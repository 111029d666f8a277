//! Error overlay record and backend error classification

use std::sync::LazyLock;

use qsolver_wire::ApiFailure;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Broad category of a failed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Quota,
    ModelNotFound,
    Network,
    Server,
    Cancelled,
    Unknown,
}

impl ErrorKind {
    pub fn icon(self) -> &'static str {
        match self {
            ErrorKind::Auth => "🔑",
            ErrorKind::Quota => "💳",
            ErrorKind::ModelNotFound => "🔍",
            ErrorKind::Network => "🌐",
            ErrorKind::Server => "🛠️",
            ErrorKind::Cancelled => "⏹️",
            ErrorKind::Unknown => "⚠️",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::Auth => "Authentication failed",
            ErrorKind::Quota => "Quota exceeded",
            ErrorKind::ModelNotFound => "Model not found",
            ErrorKind::Network => "Network error",
            ErrorKind::Server => "Server error",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Unknown => "Something went wrong",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::Auth => "The API key was rejected. Check it in the settings.",
            ErrorKind::Quota => "The account is out of quota or being rate limited. Try again later.",
            ErrorKind::ModelNotFound => "The selected model is not available on this endpoint.",
            ErrorKind::Network => "The API endpoint could not be reached. Check the base URL and your connection.",
            ErrorKind::Server => "The API provider returned a server error. Try again later.",
            ErrorKind::Cancelled => "The request was cancelled.",
            ErrorKind::Unknown => "An unknown error occurred.",
        }
    }
}

static CANCELLED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)context\s+cancel+ed").unwrap());

/// Message patterns per kind, checked when the status code is not decisive
static KIND_PATTERNS: LazyLock<Vec<(ErrorKind, Regex)>> = LazyLock::new(|| {
    [
        (
            ErrorKind::Auth,
            r"(?i)invalid.?api.?key|incorrect api key|unauthori[sz]ed|authentication|api key not valid",
        ),
        (
            ErrorKind::Quota,
            r"(?i)quota|rate.?limit|too many requests|insufficient.?(balance|funds|quota)|余额不足",
        ),
        (
            ErrorKind::ModelNotFound,
            r"(?i)model.{0,40}(not.?found|does not exist)|no such model|model_not_found",
        ),
        (
            ErrorKind::Network,
            r"(?i)timed? ?out|deadline exceeded|connection (refused|reset)|no such host|dial tcp|network is unreachable|\bdns\b",
        ),
    ]
    .into_iter()
    .filter_map(|(kind, p)| Regex::new(p).ok().map(|re| (kind, re)))
    .collect()
});

/// Classify a raw backend error string
pub fn classify(raw: &str) -> ErrorKind {
    if CANCELLED_PATTERN.is_match(raw) {
        return ErrorKind::Cancelled;
    }

    let failure = ApiFailure::parse(raw);
    if let Some(failure) = &failure {
        match failure.status_code {
            401 | 403 => return ErrorKind::Auth,
            429 => return ErrorKind::Quota,
            404 => return ErrorKind::ModelNotFound,
            _ => {}
        }
    }

    let text = match &failure {
        Some(f) if !f.message.is_empty() => format!("{} {} {}", f.code, f.message, raw),
        _ => raw.to_string(),
    };
    if let Some((kind, _)) = KIND_PATTERNS.iter().find(|(_, re)| re.is_match(&text)) {
        return *kind;
    }

    match failure.map(|f| f.status_code) {
        Some(500..=599) => ErrorKind::Server,
        _ => ErrorKind::Unknown,
    }
}

/// The single error overlay record; a new error overwrites the previous one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorState {
    pub show: bool,
    pub icon: String,
    pub title: String,
    pub desc: String,
    pub raw_error: String,
    pub show_details: bool,
}

impl Default for ErrorState {
    fn default() -> Self {
        let kind = ErrorKind::Unknown;
        Self {
            show: false,
            icon: kind.icon().to_string(),
            title: kind.title().to_string(),
            desc: kind.description().to_string(),
            raw_error: String::new(),
            show_details: false,
        }
    }
}

impl ErrorState {
    /// Build the overlay for a raw backend error.
    ///
    /// Cancellations produce a hidden record.
    pub fn from_raw(raw: &str) -> Self {
        let kind = classify(raw);
        Self {
            show: kind != ErrorKind::Cancelled,
            icon: kind.icon().to_string(),
            title: kind.title().to_string(),
            desc: kind.description().to_string(),
            raw_error: raw.to_string(),
            show_details: false,
        }
    }

    pub fn dismiss(&mut self) {
        self.show = false;
        self.show_details = false;
    }

    pub fn toggle_details(&mut self) {
        self.show_details = !self.show_details;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_status() {
        assert_eq!(
            classify(r#"{"statusCode":401,"code":"","message":"bad","type":""}"#),
            ErrorKind::Auth
        );
        assert_eq!(
            classify(r#"POST "https://x/v1/chat/completions": 429 {"message":"slow down"}"#),
            ErrorKind::Quota
        );
        assert_eq!(
            classify(r#"{"statusCode":404,"message":"nope"}"#),
            ErrorKind::ModelNotFound
        );
        assert_eq!(
            classify(r#"{"statusCode":502,"message":"bad gateway"}"#),
            ErrorKind::Server
        );
    }

    #[test]
    fn test_classify_by_message() {
        assert_eq!(classify("Incorrect API key provided"), ErrorKind::Auth);
        assert_eq!(classify("insufficient balance on account"), ErrorKind::Quota);
        assert_eq!(
            classify("models/gemini-9 is not found for API version v1beta"),
            ErrorKind::ModelNotFound
        );
        assert_eq!(
            classify("The model `gpt-9` does not exist"),
            ErrorKind::ModelNotFound
        );
        assert_eq!(
            classify("dial tcp 10.0.0.1:443: connection refused"),
            ErrorKind::Network
        );
        assert_eq!(classify("something odd"), ErrorKind::Unknown);
    }

    #[test]
    fn test_message_beats_server_status() {
        assert_eq!(
            classify(r#"{"statusCode":500,"message":"request timed out"}"#),
            ErrorKind::Network
        );
    }

    #[test]
    fn test_cancellation_hides_overlay() {
        let state = ErrorState::from_raw("context canceled");
        assert!(!state.show);
        assert_eq!(state.title, "Cancelled");
        assert_eq!(state.raw_error, "context canceled");
    }

    #[test]
    fn test_dismiss_and_details() {
        let mut state = ErrorState::from_raw(r#"{"statusCode":401}"#);
        assert!(state.show);
        assert_eq!(state.icon, "🔑");

        state.toggle_details();
        assert!(state.show_details);
        state.dismiss();
        assert!(!state.show);
        assert!(!state.show_details);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ErrorState::default()).unwrap();
        assert_eq!(json["rawError"], "");
        assert_eq!(json["showDetails"], false);
    }
}
