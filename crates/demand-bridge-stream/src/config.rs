//! Configuration for stream behavior.

use demand_bridge::Demand;

/// Configuration for [`BridgeStream`](crate::BridgeStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Credit requested from the source each time the stream runs dry.
    ///
    /// A zero prefetch is treated as one so the stream always makes progress.
    ///
    /// Default: 64
    pub prefetch: Demand,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            prefetch: Demand::max(64),
        }
    }
}

impl StreamConfig {
    /// Requests one item at a time.
    pub fn one_by_one() -> Self {
        Self {
            prefetch: Demand::max(1),
        }
    }

    /// Requests unlimited demand up front; the source never buffers.
    pub fn unbounded() -> Self {
        Self {
            prefetch: Demand::Unlimited,
        }
    }

    /// Sets the prefetch.
    pub fn with_prefetch(mut self, prefetch: impl Into<Demand>) -> Self {
        self.prefetch = prefetch.into();
        self
    }

    pub(crate) fn refill(&self) -> Demand {
        std::cmp::max(self.prefetch, Demand::max(1))
    }
}
