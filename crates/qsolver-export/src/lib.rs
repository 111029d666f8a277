//! qsolver-export: turn a history item into a shareable image
//!
//! Export is split in two: [`layout::build_layout`] is a pure function from a
//! history item to a typed document tree, and a [`Rasterizer`] turns that tree
//! into pixels. [`ExportEngine`] drives both and hands the result to the
//! backend's save dialog.

pub mod engine;
pub mod error;
pub mod html;
pub mod layout;
pub mod markdown;
pub mod raster;

pub use engine::{ExportEngine, ExportOutcome};
pub use error::{Error, Result};
pub use html::to_html;
pub use layout::{ExportOptions, Layout, build_layout};
pub use markdown::render_markdown;
pub use raster::{Bitmap, CaptureOptions, CommandRasterizer, MountedSurface, Rasterizer, SurfaceId};
