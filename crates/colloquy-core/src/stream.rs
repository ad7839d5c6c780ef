//! Per-message stream lifecycle state machine.
//!
//! `Idle -> Streaming -> Finalizing -> Complete`, with `Error` reachable from
//! `Streaming` and `Finalizing`. Finalizing is the transient phase in which
//! the mandatory throttle flush and the one forced full-fidelity render run;
//! `Complete` and `Error` are terminal. Once in `Error`, further deltas for
//! the message are refused.

use crate::error::{Error, Result};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StreamPhase {
    Idle,
    Streaming,
    Finalizing,
    Complete,
    Error,
}

impl StreamPhase {
    /// Whether delta application is currently legal.
    pub fn accepts_deltas(self) -> bool {
        matches!(self, StreamPhase::Idle | StreamPhase::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StreamPhase::Complete | StreamPhase::Error)
    }

    /// A delta arrived for the message.
    pub fn on_delta(self) -> Result<Self> {
        match self {
            StreamPhase::Idle | StreamPhase::Streaming => Ok(StreamPhase::Streaming),
            other => Err(invalid(other, "delta")),
        }
    }

    /// The upstream producer signalled completion; the flush begins.
    pub fn on_complete_signal(self) -> Result<Self> {
        match self {
            // A stream may complete without ever producing a delta.
            StreamPhase::Idle | StreamPhase::Streaming => Ok(StreamPhase::Finalizing),
            other => Err(invalid(other, "complete")),
        }
    }

    /// Flush and forced full-fidelity render are done.
    pub fn on_finalized(self) -> Result<Self> {
        match self {
            StreamPhase::Finalizing => Ok(StreamPhase::Complete),
            other => Err(invalid(other, "finalized")),
        }
    }

    /// Upstream failure. Legal mid-stream and mid-flush.
    pub fn on_error(self) -> Result<Self> {
        match self {
            StreamPhase::Idle | StreamPhase::Streaming | StreamPhase::Finalizing => {
                Ok(StreamPhase::Error)
            }
            other => Err(invalid(other, "error")),
        }
    }
}

fn invalid(from: StreamPhase, input: &str) -> Error {
    Error::InvalidTransition {
        from: from.to_string(),
        input: input.to_string(),
    }
}
