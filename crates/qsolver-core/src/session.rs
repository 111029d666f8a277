//! Transient per-stream state

use std::time::Instant;

/// Buffers, timer and one-shot directives for the stream in flight.
///
/// `reset` runs on every stream start. The pending screenshot and the
/// overwrite flag survive it; the placement policy consumes them.
#[derive(Debug, Clone, Default)]
pub struct StreamSession {
    pub content_buffer: String,
    pub thinking_buffer: String,
    pub thinking_started_at: Option<Instant>,
    pub is_thinking: bool,
    pub content_started: bool,
    pending_screenshot: Option<String>,
    overwrite_next: bool,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear buffers and timer for a fresh stream
    pub fn reset(&mut self) {
        self.content_buffer.clear();
        self.thinking_buffer.clear();
        self.thinking_started_at = None;
        self.is_thinking = false;
        self.content_started = false;
    }

    pub fn set_pending_screenshot(&mut self, screenshot: impl Into<String>) {
        self.pending_screenshot = Some(screenshot.into());
    }

    pub fn pending_screenshot(&self) -> Option<&str> {
        self.pending_screenshot.as_deref()
    }

    /// Consume the pending screenshot, empty when none was set
    pub fn take_pending_screenshot(&mut self) -> String {
        self.pending_screenshot.take().unwrap_or_default()
    }

    pub fn arm_overwrite(&mut self) {
        self.overwrite_next = true;
    }

    pub fn overwrite_armed(&self) -> bool {
        self.overwrite_next
    }

    pub(crate) fn take_overwrite(&mut self) -> bool {
        std::mem::take(&mut self.overwrite_next)
    }

    /// Seconds since the thinking burst started, if one is running
    pub fn thinking_elapsed(&self, now: Instant) -> Option<f64> {
        self.thinking_started_at
            .map(|started| now.saturating_duration_since(started).as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_one_shot_directives() {
        let mut session = StreamSession::new();
        session.content_buffer.push_str("old");
        session.thinking_buffer.push_str("hmm");
        session.is_thinking = true;
        session.content_started = true;
        session.thinking_started_at = Some(Instant::now());
        session.set_pending_screenshot("data:image/png;base64,AA==");
        session.arm_overwrite();

        session.reset();

        assert!(session.content_buffer.is_empty());
        assert!(session.thinking_buffer.is_empty());
        assert!(!session.is_thinking);
        assert!(!session.content_started);
        assert!(session.thinking_started_at.is_none());
        assert_eq!(session.pending_screenshot(), Some("data:image/png;base64,AA=="));
        assert!(session.overwrite_armed());
    }

    #[test]
    fn test_take_consumes() {
        let mut session = StreamSession::new();
        assert_eq!(session.take_pending_screenshot(), "");

        session.set_pending_screenshot("shot");
        session.arm_overwrite();
        assert_eq!(session.take_pending_screenshot(), "shot");
        assert!(session.take_overwrite());
        assert!(session.pending_screenshot().is_none());
        assert!(!session.take_overwrite());
    }
}
