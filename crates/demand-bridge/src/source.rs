//! The attachment factory.

use crate::config::BridgeConfig;
use crate::emitter::Emitter;
use crate::subscriber::{Cancellable, Subscriber};
use crate::subscription::BridgeSubscription;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type Producer<T, E> = dyn Fn(Emitter<T, E>) -> Box<dyn Cancellable> + Send + Sync;

/// A source built from a producer callback.
///
/// Every [`subscribe`](Self::subscribe) creates an independent attachment:
/// its own [`BridgeSubscription`], its own buffer, and exactly one invocation
/// of the producer callback, made synchronously on the subscribing thread.
///
/// The callback receives an [`Emitter`] and returns a [`Cancellable`] that
/// releases whatever it set up when the subscriber cancels.
///
/// ```
/// use demand_bridge::{AnyCancellable, BridgeSource, Completion};
///
/// let source = BridgeSource::<u32, std::convert::Infallible>::new(|emitter| {
///     emitter.send(1);
///     emitter.send(2);
///     emitter.send_completion(Completion::Finished);
///     AnyCancellable::empty()
/// });
///
/// let (tx, rx) = std::sync::mpsc::channel();
/// let _handle = source.sink(move |v| tx.send(v).unwrap(), |_| {});
/// assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2]);
/// ```
pub struct BridgeSource<T, E> {
    producer: Arc<Producer<T, E>>,
    config: BridgeConfig,
}

impl<T: Send + 'static, E: Send + 'static> BridgeSource<T, E> {
    /// Creates a source from a producer callback.
    pub fn new<F, C>(producer: F) -> Self
    where
        F: Fn(Emitter<T, E>) -> C + Send + Sync + 'static,
        C: Cancellable + 'static,
    {
        Self::with_config(producer, BridgeConfig::default())
    }

    /// Creates a source with a custom configuration.
    pub fn with_config<F, C>(producer: F, config: BridgeConfig) -> Self
    where
        F: Fn(Emitter<T, E>) -> C + Send + Sync + 'static,
        C: Cancellable + 'static,
    {
        Self {
            producer: Arc::new(move |emitter: Emitter<T, E>| {
                Box::new(producer(emitter)) as Box<dyn Cancellable>
            }),
            config,
        }
    }

    /// Alias for [`new`](Self::new), for wrapping callback and delegate APIs.
    pub fn run<F, C>(producer: F) -> Self
    where
        F: Fn(Emitter<T, E>) -> C + Send + Sync + 'static,
        C: Cancellable + 'static,
    {
        Self::new(producer)
    }

    /// Names this source in log events.
    pub fn labeled(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.config.label = Some(label.into());
        self
    }

    /// The configuration applied to each attachment.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Attaches a subscriber.
    pub fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = T, Failure = E>,
    {
        self.subscribe_shared(Arc::new(subscriber));
    }

    /// Attaches a subscriber the caller keeps a handle to.
    pub fn subscribe_shared<S>(&self, subscriber: Arc<S>)
    where
        S: Subscriber<Input = T, Failure = E>,
    {
        tracing::debug!(source = %self.config.label_or_default(), "attaching subscriber");
        let subscription =
            BridgeSubscription::attach(&*self.producer, Arc::clone(&subscriber), &self.config);
        subscriber.receive_subscription(Box::new(subscription));
    }
}

impl<T, E> Clone for BridgeSource<T, E> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            config: self.config.clone(),
        }
    }
}

impl<T, E> fmt::Debug for BridgeSource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
