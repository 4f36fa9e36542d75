//! Configuration for bridge attachments.

use std::borrow::Cow;

/// Per-source configuration applied to every attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BridgeConfig {
    /// Initial capacity of the pending queue.
    ///
    /// The queue grows on demand; this only avoids early reallocations
    /// when a producer bursts ahead of the consumer.
    ///
    /// Default: 16
    pub queue_capacity: usize,

    /// Name attached to every log event emitted for this source.
    ///
    /// Default: none
    pub label: Option<Cow<'static, str>>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            label: None,
        }
    }
}

impl BridgeConfig {
    /// Small queue for sources that rarely run ahead of demand.
    pub fn low_latency() -> Self {
        Self {
            queue_capacity: 1,
            label: None,
        }
    }

    /// Large queue for bursty producers.
    pub fn high_throughput() -> Self {
        Self {
            queue_capacity: 1024,
            label: None,
        }
    }

    /// Sets the initial queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the log label.
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub(crate) fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("bridge")
    }
}
