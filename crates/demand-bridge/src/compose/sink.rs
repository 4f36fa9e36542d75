//! Closure-based subscriber with unlimited demand.

use crate::demand::Demand;
use crate::source::BridgeSource;
use crate::subscriber::{AnyCancellable, Completion, Subscriber, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;

/// Where the subscription lives between attach and cancel.
enum Slot {
    Pending,
    Attached(Arc<dyn Subscription>),
    /// Completion delivered; kept so the producer's token is not dropped
    /// under the buffer lock.
    Finished(Arc<dyn Subscription>),
    Cancelled,
}

struct SinkSubscriber<T, E, V, C> {
    on_value: V,
    on_completion: Mutex<Option<C>>,
    slot: Arc<Mutex<Slot>>,
    _marker: std::marker::PhantomData<fn(T, E)>,
}

impl<T, E, V, C> Subscriber for SinkSubscriber<T, E, V, C>
where
    T: Send + 'static,
    E: Send + 'static,
    V: Fn(T) + Send + Sync + 'static,
    C: FnOnce(Completion<E>) + Send + 'static,
{
    type Input = T;
    type Failure = E;

    fn receive_subscription(&self, subscription: Box<dyn Subscription>) {
        let subscription: Arc<dyn Subscription> = Arc::from(subscription);
        {
            let mut slot = self.slot.lock();
            if matches!(*slot, Slot::Cancelled) {
                drop(slot);
                subscription.cancel();
                return;
            }
            *slot = Slot::Attached(Arc::clone(&subscription));
        }
        // Slot lock released: `on_value` may cancel while this drains.
        subscription.request(Demand::Unlimited);
    }

    fn receive(&self, input: T) -> Demand {
        (self.on_value)(input);
        Demand::NONE
    }

    fn receive_completion(&self, completion: Completion<E>) {
        {
            let mut slot = self.slot.lock();
            if let Slot::Attached(subscription) = &*slot {
                let subscription = Arc::clone(subscription);
                *slot = Slot::Finished(subscription);
            }
        }
        if let Some(on_completion) = self.on_completion.lock().take() {
            on_completion(completion);
        }
    }
}

fn cancel_slot(slot: &Mutex<Slot>) {
    let previous = std::mem::replace(&mut *slot.lock(), Slot::Cancelled);
    if let Slot::Attached(subscription) = previous {
        subscription.cancel();
    }
}

impl<T: Send + 'static, E: Send + 'static> BridgeSource<T, E> {
    /// Attaches closures with unlimited demand.
    ///
    /// The returned handle cancels the attachment when cancelled or dropped.
    pub fn sink<V, C>(&self, on_value: V, on_completion: C) -> AnyCancellable
    where
        V: Fn(T) + Send + Sync + 'static,
        C: FnOnce(Completion<E>) + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Slot::Pending));
        self.subscribe(SinkSubscriber {
            on_value,
            on_completion: Mutex::new(Some(on_completion)),
            slot: Arc::clone(&slot),
            _marker: std::marker::PhantomData,
        });
        AnyCancellable::new(move || cancel_slot(&slot))
    }
}
