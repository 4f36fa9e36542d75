//! Error types for demand-bridge-stream operations.

use demand_bridge::EmitError;
use thiserror::Error;

/// Errors returned by [`EmitterSink`](crate::EmitterSink).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The emission was rejected by the attachment.
    #[error("emit failed: {0}")]
    Emit(#[from] EmitError),

    /// The sink was already closed.
    #[error("sink is closed")]
    Closed,
}

impl StreamError {
    /// Returns `true` if the downstream is gone and nothing more will be
    /// accepted.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Emit(e) => e.is_terminal(),
            Self::Closed => true,
        }
    }
}
