//! Error types for qsolver-export

use thiserror::Error;

use crate::raster::SurfaceId;

/// Result type alias using qsolver-export Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exporting an image
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The captured bytes were not a usable PNG
    #[error("Invalid image: {0}")]
    Image(#[from] image::ImageError),

    /// The external capture program failed
    #[error("Capture command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Rasterizer misconfiguration
    #[error("Rasterizer error: {0}")]
    Raster(String),

    /// A surface id that was never mounted, or already unmounted
    #[error("Unknown surface {0}")]
    UnknownSurface(SurfaceId),

    /// An error from the backend surface
    #[error(transparent)]
    Wire(#[from] qsolver_wire::Error),
}
