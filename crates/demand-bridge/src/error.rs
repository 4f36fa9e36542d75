//! Error types for bridge operations.

use thiserror::Error;

/// Why an emission was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmitError {
    /// The subscription owning the buffer has been dropped.
    #[error("subscription has been dropped")]
    Detached,

    /// A completion was already recorded for this attachment.
    #[error("attachment already completed")]
    Completed,

    /// The consumer cancelled the attachment.
    #[error("attachment was cancelled")]
    Cancelled,
}

impl EmitError {
    /// Returns `true` if this error means no further emission can ever succeed.
    ///
    /// Every variant is terminal today; kept as a predicate so callers do not
    /// match on variants.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Detached | Self::Completed | Self::Cancelled)
    }
}

/// A producer broke the protocol. Carried by the fail-fast panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// A value was sent after the completion.
    #[error("value sent after completion was already recorded")]
    ValueAfterCompletion,

    /// A second completion was sent.
    #[error("completion sent twice")]
    DoubleCompletion,
}
