//! Events pushed by the backend while a solution is generated

use serde::{Deserialize, Serialize};

/// Events emitted on the backend's solution channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A solve request was accepted; the stream has not opened yet
    SolveStarted,
    /// Screenshot the upcoming round was produced from
    UserScreenshot { screenshot: String },
    /// A new stream opened
    StreamStart,
    /// Chain-of-thought delta
    Thinking { delta: String },
    /// Answer text delta
    Content { delta: String },
    /// Final answer for the stream
    Solution { text: String },
    /// The stream failed
    Error { message: String },
}

impl StreamEvent {
    /// Map a backend channel name and its payload onto an event.
    ///
    /// Returns `None` for channels that are not part of the solution stream.
    pub fn from_wire(name: &str, payload: Option<&str>) -> Option<Self> {
        let payload = || payload.unwrap_or_default().to_string();
        let event = match name {
            "start-solving" => StreamEvent::SolveStarted,
            "user-message" => StreamEvent::UserScreenshot {
                screenshot: payload(),
            },
            "solution-stream-start" => StreamEvent::StreamStart,
            "solution-stream-thinking" => StreamEvent::Thinking { delta: payload() },
            "solution-stream-chunk" => StreamEvent::Content { delta: payload() },
            "solution" => StreamEvent::Solution { text: payload() },
            "solution-error" => StreamEvent::Error { message: payload() },
            _ => return None,
        };
        Some(event)
    }

    /// Backend channel name for this event
    pub fn wire_name(&self) -> &'static str {
        match self {
            StreamEvent::SolveStarted => "start-solving",
            StreamEvent::UserScreenshot { .. } => "user-message",
            StreamEvent::StreamStart => "solution-stream-start",
            StreamEvent::Thinking { .. } => "solution-stream-thinking",
            StreamEvent::Content { .. } => "solution-stream-chunk",
            StreamEvent::Solution { .. } => "solution",
            StreamEvent::Error { .. } => "solution-error",
        }
    }

    /// Check if this event ends a stream (Solution or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Solution { .. } | StreamEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire_maps_channels() {
        assert_eq!(
            StreamEvent::from_wire("solution-stream-chunk", Some("Hi")),
            Some(StreamEvent::Content { delta: "Hi".into() })
        );
        assert_eq!(
            StreamEvent::from_wire("solution-stream-start", None),
            Some(StreamEvent::StreamStart)
        );
        assert_eq!(
            StreamEvent::from_wire("solution", None),
            Some(StreamEvent::Solution {
                text: String::new()
            })
        );
        assert_eq!(StreamEvent::from_wire("toggle-visibility", None), None);
    }

    #[test]
    fn test_wire_name_inverts_from_wire() {
        let event = StreamEvent::Thinking {
            delta: "hmm".into(),
        };
        let back = StreamEvent::from_wire(event.wire_name(), Some("hmm")).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_json_shape() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"content","delta":" world"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Content {
                delta: " world".into()
            }
        );

        let json = serde_json::to_string(&StreamEvent::StreamStart).unwrap();
        assert_eq!(json, r#"{"type":"stream_start"}"#);
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::Solution { text: "x".into() }.is_terminal());
        assert!(StreamEvent::Error { message: "x".into() }.is_terminal());
        assert!(!StreamEvent::StreamStart.is_terminal());
        assert!(!StreamEvent::Content { delta: "x".into() }.is_terminal());
    }
}
