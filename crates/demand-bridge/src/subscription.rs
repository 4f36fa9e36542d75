//! Per-attachment subscription wiring a producer callback to a subscriber.

use crate::buffer::DemandBuffer;
use crate::config::BridgeConfig;
use crate::demand::Demand;
use crate::emitter::{EmitTarget, Emitter};
use crate::subscriber::{Cancellable, Subscriber, Subscription};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// The subscription a [`BridgeSource`](crate::BridgeSource) hands to each
/// subscriber.
///
/// Owns the attachment's [`DemandBuffer`] and the producer's cancellation
/// token. The producer only ever sees an [`Emitter`] holding a weak reference
/// to the buffer.
pub struct BridgeSubscription<S: Subscriber> {
    buffer: Arc<DemandBuffer<S>>,
    cancellable: Mutex<Option<Box<dyn Cancellable>>>,
}

impl<S: Subscriber> BridgeSubscription<S> {
    /// Builds the buffer, runs `producer` once with an emitter bound to it,
    /// and keeps the returned token.
    pub(crate) fn attach<F>(producer: &F, subscriber: Arc<S>, config: &BridgeConfig) -> Self
    where
        F: Fn(Emitter<S::Input, S::Failure>) -> Box<dyn Cancellable> + ?Sized,
    {
        let buffer = Arc::new(DemandBuffer::with_config(subscriber, config));
        let weak: Weak<DemandBuffer<S>> = Arc::downgrade(&buffer);
        let target: Weak<dyn EmitTarget<S::Input, S::Failure>> = weak;
        let token = producer(Emitter::new(target));

        Self {
            buffer,
            cancellable: Mutex::new(Some(token)),
        }
    }
}

impl<S: Subscriber> Subscription for BridgeSubscription<S> {
    fn request(&self, demand: Demand) {
        // Push-only producers have no use for the returned credit.
        let _ = self.buffer.request_demand(demand);
    }

    fn request_credit(&self, demand: Demand) -> Demand {
        self.buffer.request_demand(demand)
    }

    fn cancel(&self) {
        // Flag first so anything the producer emits while cleaning up is dropped.
        self.buffer.cancel();
        let token = self.cancellable.lock().take();
        if let Some(mut token) = token {
            token.cancel();
        }
    }
}
