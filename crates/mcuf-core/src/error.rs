//! Error types for mcuf

use crate::engine::Operation;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConverterError>;

/// Main error type for mcuf
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Boundary memory is exhausted; the operation is abandoned, never retried
    #[error("Boundary allocation of {requested} bytes failed")]
    AllocationFailure { requested: usize },

    /// A decoded length disagrees with the buffer it describes
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Font engine is not ready yet")]
    EngineNotReady,

    #[error("Engine call failed: {operation}")]
    EngineCallFailed { operation: Operation },

    /// The pipeline is mid-import; the request would read a buffer being replaced
    #[error("Pipeline busy, {operation} rejected while an import is in flight")]
    Busy { operation: Operation },

    #[error("No font has been imported")]
    NoFontLoaded,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid text for the engine: {0}")]
    InvalidText(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Shorthand for an engine call that returned a null or malformed result
    pub fn engine(operation: Operation) -> Self {
        Self::EngineCallFailed { operation }
    }
}
