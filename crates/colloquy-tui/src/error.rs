//! Error types for the colloquy-tui crate

use thiserror::Error;

/// Result type alias for colloquy-tui operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for colloquy-tui
#[derive(Error, Debug)]
pub enum Error {
    /// A render strategy could not produce output; callers fall back to the
    /// minimal strategy
    #[error("Render strategy error: {0}")]
    RenderStrategy(String),

    /// The scroll target is gone before a scheduled scroll executed
    #[error("Scroll target missing: {0}")]
    ScrollTargetMissing(String),

    /// Core errors from colloquy-core
    #[error("Core error: {0}")]
    Core(#[from] colloquy_core::Error),
}
