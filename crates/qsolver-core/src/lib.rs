//! qsolver-core: streaming session and history state machine
//!
//! This crate turns the backend's incremental solution stream into a
//! navigable, multi-round history. It owns the per-stream buffers, the
//! placement policy for new exchanges, the shared error overlay record, and
//! a settings controller that wraps the backend's settings RPCs.

pub mod clock;
pub mod error;
pub mod error_state;
pub mod events;
pub mod history;
pub mod item;
pub mod router;
pub mod session;
pub mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use error_state::{ErrorKind, ErrorState};
pub use events::{EventBus, NotificationLevel, SolutionEvent};
pub use history::History;
pub use item::{HistoryItem, Round};
pub use router::{Phase, StreamRouter};
pub use session::StreamSession;
pub use settings::{ConnectionStatus, SettingsController};
