//! qsolver-wire: the backend-facing surface of qsolver
//!
//! This crate holds everything that crosses the boundary to the backend
//! process: the persisted settings record, the stream events pushed while a
//! solution is generated, the request/response RPC trait, and an
//! OpenAI-compatible client used to enumerate models and test connectivity.

pub mod backend;
pub mod catalog;
pub mod error;
pub mod settings;
pub mod stream;

pub use backend::{Backend, decode_data_url, encode_png_data_url, error_string_to_result};
pub use catalog::OpenAiCatalog;
pub use error::{ApiFailure, Error, Result};
pub use settings::{KeyBinding, ScreenshotMode, Settings};
pub use stream::StreamEvent;
