//! Stream router: applies backend stream events to the history

use std::sync::Arc;

use qsolver_wire::{Settings, StreamEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error_state::ErrorState;
use crate::events::{EventBus, SolutionEvent};
use crate::history::History;
use crate::item::{HistoryItem, Round};
use crate::session::StreamSession;

/// Where the current stream is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Thinking,
    Responding,
}

/// Which channel a token arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Thinking,
    Content,
}

/// Owns the history and the in-flight stream session.
///
/// Events are applied in arrival order through `&mut self`; observers
/// follow along through [`StreamRouter::subscribe`].
pub struct StreamRouter {
    history: History,
    session: StreamSession,
    keep_context: bool,
    is_loading: bool,
    is_appending: bool,
    streaming: bool,
    error_state: ErrorState,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl StreamRouter {
    pub fn new() -> Self {
        Self {
            history: History::new(),
            session: StreamSession::new(),
            keep_context: false,
            is_loading: false,
            is_appending: false,
            streaming: false,
            error_state: ErrorState::default(),
            clock: Arc::new(SystemClock),
            events: EventBus::new(),
        }
    }

    /// Use a custom time source for thinking durations
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Publish on an existing bus instead of a private one
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SolutionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // --- state ---

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_rounds(&self) -> &[Round] {
        self.history.current_rounds()
    }

    pub fn active_history_index(&self) -> usize {
        self.history.active_index()
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_appending(&self) -> bool {
        self.is_appending
    }

    pub fn is_thinking(&self) -> bool {
        self.session.is_thinking
    }

    pub fn keep_context(&self) -> bool {
        self.keep_context
    }

    pub fn phase(&self) -> Phase {
        if !self.streaming {
            Phase::Idle
        } else if self.session.is_thinking {
            Phase::Thinking
        } else if self.session.content_started {
            Phase::Responding
        } else {
            Phase::Idle
        }
    }

    pub fn error_state(&self) -> &ErrorState {
        &self.error_state
    }

    // --- UI operations ---

    pub fn select_history(&mut self, index: usize) {
        if self.history.select(index) {
            self.emit_history_changed();
        }
    }

    pub fn delete_history(&mut self, index: usize) {
        if let Some(removed) = self.history.delete(index) {
            debug!(index, id = %removed.id, "Deleted history item");
            self.emit_history_changed();
        }
    }

    /// Screenshot to attach to the round the next stream start creates
    pub fn set_user_screenshot(&mut self, screenshot: impl Into<String>) {
        self.session.set_pending_screenshot(screenshot);
    }

    /// Replace the head item on the next stream start instead of prepending
    pub fn request_overwrite(&mut self) {
        self.session.arm_overwrite();
    }

    /// Mark that a follow-up request for the current item is in flight
    pub fn begin_append(&mut self) {
        self.is_appending = true;
    }

    /// Seed the content buffer, e.g. when continuing a partial answer
    pub fn set_stream_buffer(&mut self, text: impl Into<String>) {
        self.session.content_buffer = text.into();
    }

    pub fn set_keep_context(&mut self, keep_context: bool) {
        self.keep_context = keep_context;
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.set_keep_context(settings.keep_context);
    }

    pub fn dismiss_error(&mut self) {
        self.error_state.dismiss();
        self.emit_error_changed();
    }

    pub fn toggle_error_details(&mut self) {
        self.error_state.toggle_details();
        self.emit_error_changed();
    }

    // --- stream events ---

    /// Apply one backend stream event
    pub fn handle(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::SolveStarted => self.solve_started(),
            StreamEvent::UserScreenshot { screenshot } => self.set_user_screenshot(screenshot),
            StreamEvent::StreamStart => self.stream_start(),
            StreamEvent::Thinking { delta } => self.thinking_token(&delta),
            StreamEvent::Content { delta } => self.content_token(&delta),
            StreamEvent::Solution { text } => self.terminal(&text),
            StreamEvent::Error { message } => self.stream_error(&message),
        }
    }

    pub fn solve_started(&mut self) {
        self.set_loading(true);
    }

    /// Open a new stream and place its round
    pub fn stream_start(&mut self) {
        self.session.reset();
        self.streaming = true;

        let screenshot = self.session.take_pending_screenshot();
        let overwrite = self.session.overwrite_armed();

        if self.keep_context && !self.history.is_empty() && !overwrite {
            if let Some(head) = self.history.head_mut() {
                head.add_round(screenshot);
            }
            self.history.select_head();
            debug!("Stream start: appended round to head item");
        } else if overwrite && !self.history.is_empty() {
            self.history.replace_head(HistoryItem::new(screenshot));
            self.session.take_overwrite();
            debug!("Stream start: replaced head item");
        } else {
            self.history.push_front(HistoryItem::new(screenshot));
            debug!("Stream start: new history item");
        }

        self.emit_history_changed();
    }

    pub fn thinking_token(&mut self, delta: &str) {
        self.apply_token(Channel::Thinking, delta);
    }

    pub fn content_token(&mut self, delta: &str) {
        self.apply_token(Channel::Content, delta);
    }

    fn apply_token(&mut self, channel: Channel, delta: &str) {
        if !self.streaming {
            warn!(?channel, "Dropping stream token: no open stream");
            return;
        }
        if self.history.head().and_then(HistoryItem::current_round).is_none() {
            warn!(?channel, "Dropping stream token: no history item to write into");
            return;
        }

        self.set_loading(false);
        self.is_appending = false;

        let now = self.clock.now();
        let was_thinking = self.session.is_thinking;
        let session = &mut self.session;

        match channel {
            Channel::Thinking if !session.content_started => {
                if !session.is_thinking {
                    session.thinking_started_at = Some(now);
                }
                session.is_thinking = true;
            }
            Channel::Thinking => {}
            Channel::Content => {
                session.is_thinking = false;
                session.thinking_started_at = None;
                session.content_started = true;
            }
        }

        // empty deltas still drive the phase flags above
        if !delta.is_empty() {
            match channel {
                Channel::Thinking => session.thinking_buffer.push_str(delta),
                Channel::Content => session.content_buffer.push_str(delta),
            }
        }

        let elapsed = session.thinking_elapsed(now);
        let Some(head) = self.history.head_mut() else {
            return;
        };
        let item_id = head.id;
        let round_index = head.rounds().len().saturating_sub(1);
        let Some(round) = head.current_round_mut() else {
            return;
        };

        match channel {
            Channel::Thinking => {
                round.thinking.clone_from(&self.session.thinking_buffer);
                if let (true, Some(elapsed)) = (self.session.is_thinking, elapsed) {
                    round.thinking_duration = round.thinking_duration.max(elapsed);
                }
            }
            Channel::Content => round.ai_response.clone_from(&self.session.content_buffer),
        }
        let duration = round.thinking_duration;

        if was_thinking != self.session.is_thinking {
            self.events.emit(SolutionEvent::ThinkingChanged {
                thinking: self.session.is_thinking,
                duration_secs: duration,
            });
        }
        self.events.emit(SolutionEvent::RoundUpdated {
            item_id,
            round: round_index,
        });
        self.events.emit(SolutionEvent::ScrollToEnd);
    }

    /// Finish the stream; `final_text` fills the answer only if no tokens did
    pub fn terminal(&mut self, final_text: &str) {
        self.set_loading(false);
        self.streaming = false;
        let froze = self.freeze_thinking();

        let Some(head) = self.history.head_mut() else {
            warn!("Dropping final solution: no history item to write into");
            return;
        };
        let item_id = head.id;
        let round_index = head.rounds().len().saturating_sub(1);
        let Some(round) = head.current_round_mut() else {
            return;
        };

        if round.ai_response.is_empty() && !final_text.is_empty() {
            round.ai_response = final_text.to_string();
            self.emit_round_updated(item_id, round_index);
        } else if froze {
            self.emit_round_updated(item_id, round_index);
        }
    }

    /// Fail the stream and raise the error overlay
    pub fn stream_error(&mut self, raw: &str) {
        self.set_loading(false);
        self.is_appending = false;
        self.streaming = false;
        self.freeze_thinking();

        let state = ErrorState::from_raw(raw);
        if state.show {
            warn!(error = %raw, title = %state.title, "Solution stream failed");
        } else {
            debug!("Solution stream cancelled");
        }
        self.error_state = state;
        self.emit_error_changed();
    }

    /// Stop the thinking timer and store the final duration.
    ///
    /// Returns whether a thinking burst was running.
    fn freeze_thinking(&mut self) -> bool {
        if !self.session.is_thinking {
            self.session.thinking_started_at = None;
            return false;
        }

        let elapsed = self.session.thinking_elapsed(self.clock.now());
        self.session.is_thinking = false;
        self.session.thinking_started_at = None;

        let mut duration = 0.0;
        if let Some(round) = self
            .history
            .head_mut()
            .and_then(HistoryItem::current_round_mut)
        {
            if let Some(elapsed) = elapsed {
                round.thinking_duration = round.thinking_duration.max(elapsed);
            }
            duration = round.thinking_duration;
        }

        self.events.emit(SolutionEvent::ThinkingChanged {
            thinking: false,
            duration_secs: duration,
        });
        true
    }

    fn set_loading(&mut self, loading: bool) {
        if self.is_loading != loading {
            self.is_loading = loading;
            self.events.emit(SolutionEvent::LoadingChanged { loading });
        }
    }

    fn emit_history_changed(&self) {
        self.events.emit(SolutionEvent::HistoryChanged {
            len: self.history.len(),
            active: self.history.active_index(),
        });
    }

    fn emit_round_updated(&self, item_id: uuid::Uuid, round: usize) {
        self.events
            .emit(SolutionEvent::RoundUpdated { item_id, round });
    }

    fn emit_error_changed(&self) {
        self.events.emit(SolutionEvent::ErrorChanged {
            state: self.error_state.clone(),
        });
    }
}

impl Default for StreamRouter {
    fn default() -> Self {
        Self::new()
    }
}
