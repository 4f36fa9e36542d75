//! Async stream over a [`BridgeSource`] implementing `futures::Stream`.

use crate::config::StreamConfig;
use demand_bridge::{BridgeSource, Completion, Demand, Subscriber, Subscription};
use futures_core::Stream;
use futures_util::task::AtomicWaker;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

struct Inbox<T, E> {
    /// Handed over once at attach time, then owned by the stream.
    subscription: Option<Box<dyn Subscription>>,
    items: VecDeque<T>,
    completion: Option<Completion<E>>,
}

struct Shared<T, E> {
    inbox: Mutex<Inbox<T, E>>,
    waker: AtomicWaker,
}

enum Next<T, E> {
    Item(T),
    Done(Completion<E>),
}

impl<T, E> Shared<T, E> {
    fn take_next(&self) -> Option<Next<T, E>> {
        let mut inbox = self.inbox.lock();
        if let Some(item) = inbox.items.pop_front() {
            return Some(Next::Item(item));
        }
        inbox.completion.take().map(Next::Done)
    }
}

struct StreamSubscriber<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T: Send + 'static, E: Send + 'static> Subscriber for StreamSubscriber<T, E> {
    type Input = T;
    type Failure = E;

    fn receive_subscription(&self, subscription: Box<dyn Subscription>) {
        self.shared.inbox.lock().subscription = Some(subscription);
    }

    fn receive(&self, input: T) -> Demand {
        self.shared.inbox.lock().items.push_back(input);
        self.shared.waker.wake();
        Demand::NONE
    }

    fn receive_completion(&self, completion: Completion<E>) {
        self.shared.inbox.lock().completion = Some(completion);
        self.shared.waker.wake();
    }
}

/// A [`BridgeSource`] attachment consumed as an async stream.
///
/// Credit is requested lazily: nothing is asked for until the first poll, and
/// another [`prefetch`](StreamConfig::prefetch) worth is requested each time
/// every previously granted item has been yielded. Values the producer pushes
/// beyond that wait in the source's buffer.
///
/// A failure is yielded once as `Err`, after which the stream ends. Dropping
/// the stream cancels the attachment.
pub struct BridgeStream<T, E> {
    shared: Arc<Shared<T, E>>,
    subscription: Option<Box<dyn Subscription>>,
    config: StreamConfig,
    /// Granted but not yet yielded.
    outstanding: Demand,
}

impl<T: Send + 'static, E: Send + 'static> BridgeStream<T, E> {
    fn attach(source: &BridgeSource<T, E>, config: StreamConfig) -> Self {
        let shared = Arc::new(Shared {
            inbox: Mutex::new(Inbox {
                subscription: None,
                items: VecDeque::new(),
                completion: None,
            }),
            waker: AtomicWaker::new(),
        });
        source.subscribe(StreamSubscriber {
            shared: Arc::clone(&shared),
        });
        let subscription = shared.inbox.lock().subscription.take();

        Self {
            shared,
            subscription,
            config,
            outstanding: Demand::NONE,
        }
    }
}

impl<T, E> BridgeStream<T, E> {
    /// Returns `true` once the stream has yielded its terminal item.
    pub fn is_terminated(&self) -> bool {
        self.subscription.is_none()
    }

    /// Credit granted to the source that has not been yielded yet.
    pub fn outstanding(&self) -> Demand {
        self.outstanding
    }

    /// The stream's configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn refill(&mut self) -> bool {
        let Some(subscription) = &self.subscription else {
            return false;
        };
        let credit = self.config.refill();
        self.outstanding += credit;
        tracing::trace!(%credit, "stream requesting credit");
        subscription.request(credit);
        true
    }

    fn terminate(&mut self) {
        // The attachment is already terminal; dropping only releases it.
        self.subscription = None;
    }
}

impl<T, E> Stream for BridgeStream<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.is_terminated() {
            return Poll::Ready(None);
        }
        this.shared.waker.register(cx.waker());

        loop {
            match this.shared.take_next() {
                Some(Next::Item(item)) => {
                    this.outstanding -= Demand::max(1);
                    return Poll::Ready(Some(Ok(item)));
                }
                Some(Next::Done(completion)) => {
                    this.terminate();
                    return Poll::Ready(completion.into_result().err().map(Err));
                }
                None => {}
            }

            // Only ask again once everything granted has been yielded.
            if !this.outstanding.is_none() || !this.refill() {
                return Poll::Pending;
            }
        }
    }
}

impl<T, E> Drop for BridgeStream<T, E> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            tracing::debug!("stream dropped before completion, cancelling");
            subscription.cancel();
        }
    }
}

/// Extension trait turning a [`BridgeSource`] into a [`BridgeStream`].
pub trait IntoStream<T, E> {
    /// Attaches with the default [`StreamConfig`].
    fn into_stream(self) -> BridgeStream<T, E>
    where
        Self: Sized,
    {
        self.into_stream_with_config(StreamConfig::default())
    }

    /// Attaches with a custom [`StreamConfig`].
    fn into_stream_with_config(self, config: StreamConfig) -> BridgeStream<T, E>;
}

impl<T: Send + 'static, E: Send + 'static> IntoStream<T, E> for BridgeSource<T, E> {
    fn into_stream_with_config(self, config: StreamConfig) -> BridgeStream<T, E> {
        BridgeStream::attach(&self, config)
    }
}

impl<T: Send + 'static, E: Send + 'static> IntoStream<T, E> for &BridgeSource<T, E> {
    fn into_stream_with_config(self, config: StreamConfig) -> BridgeStream<T, E> {
        BridgeStream::attach(self, config)
    }
}
