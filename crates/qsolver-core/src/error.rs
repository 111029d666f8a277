//! Error types for qsolver-core

use thiserror::Error;

/// Result type alias using qsolver-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the solution engine
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the backend surface
    #[error(transparent)]
    Wire(#[from] qsolver_wire::Error),
}
