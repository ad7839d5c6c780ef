//! Error types for the colloquy-core crate

use crate::model::{BlockId, MessageId};
use thiserror::Error;

/// Result type alias for colloquy-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for colloquy-core
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream failure mid-stream; scoped to one message
    #[error("stream delivery failed for message {message_id}: {reason}")]
    StreamDelivery {
        message_id: MessageId,
        reason: String,
    },

    /// A block fetch from persistence failed
    #[error("block load failed for {block_id}: {reason}")]
    BlockLoad { block_id: BlockId, reason: String },

    /// Illegal stream lifecycle transition
    #[error("invalid stream transition: {from} cannot accept {input}")]
    InvalidTransition { from: String, input: String },

    /// A bus subscriber reported a failure
    #[error("subscriber error: {0}")]
    Subscriber(String),
}
