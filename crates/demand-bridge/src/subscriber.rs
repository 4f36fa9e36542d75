//! The consumer-side contract: subscribers, subscriptions, cancellation.

use crate::demand::Demand;
use std::fmt;

/// Terminal signal of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion<E> {
    /// The producer finished normally.
    Finished,
    /// The producer failed with an error.
    Failed(E),
}

impl<E> Completion<E> {
    /// Returns `true` for [`Completion::Failed`].
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Completion::Failed(_))
    }

    /// Converts into `Ok(())` / `Err(e)`.
    pub fn into_result(self) -> Result<(), E> {
        match self {
            Completion::Finished => Ok(()),
            Completion::Failed(e) => Err(e),
        }
    }

    /// Maps the failure value.
    pub fn map_err<F, O: FnOnce(E) -> F>(self, op: O) -> Completion<F> {
        match self {
            Completion::Finished => Completion::Finished,
            Completion::Failed(e) => Completion::Failed(op(e)),
        }
    }
}

impl<E> From<Result<(), E>> for Completion<E> {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Completion::Finished,
            Err(e) => Completion::Failed(e),
        }
    }
}

/// The handle a subscriber uses to signal demand and cancellation.
///
/// Handed to [`Subscriber::receive_subscription`] exactly once per attachment.
/// The subscriber owns it: dropping the subscription detaches the producer,
/// after which anything the producer emits is discarded.
pub trait Subscription: Send + Sync {
    /// Grants `demand` more items.
    ///
    /// Must not be called synchronously from inside [`Subscriber::receive`]
    /// on the same attachment: delivery runs under the attachment's lock and
    /// the lock is not reentrant.
    fn request(&self, demand: Demand);

    /// Like [`request`](Self::request), but returns the net new credit the
    /// attachment now has outstanding toward its producer.
    ///
    /// Credit is reported once: a later call only returns what was added
    /// since. Subscriptions with no upstream to report to return
    /// [`Demand::NONE`].
    fn request_credit(&self, demand: Demand) -> Demand {
        self.request(demand);
        Demand::NONE
    }

    /// Cancels the attachment. No completion is delivered afterwards.
    ///
    /// Safe to call from inside [`Subscriber::receive`].
    fn cancel(&self);
}

/// A downstream consumer of values and a completion.
///
/// Methods take `&self`: the bridge serializes `receive` and
/// `receive_completion` under the attachment lock, while
/// `receive_subscription` runs before any lock is taken so the subscriber may
/// request demand from inside it.
pub trait Subscriber: Send + Sync + 'static {
    /// Item type.
    type Input: Send + 'static;
    /// Failure type carried by [`Completion::Failed`].
    type Failure: Send + 'static;

    /// Called once at attach time.
    fn receive_subscription(&self, subscription: Box<dyn Subscription>);

    /// Called for every delivered item. Returns additional credit.
    fn receive(&self, input: Self::Input) -> Demand;

    /// Called at most once, after every buffered item was delivered.
    fn receive_completion(&self, completion: Completion<Self::Failure>);
}

/// Producer-side cleanup returned by a producer callback.
pub trait Cancellable: Send {
    /// Releases producer resources. Called at most once by the bridge.
    fn cancel(&mut self);
}

/// A closure-backed [`Cancellable`] that runs its cleanup once, either on
/// [`cancel`](Cancellable::cancel) or when dropped.
pub struct AnyCancellable {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl AnyCancellable {
    /// Wraps a cleanup closure.
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// A token with nothing to clean up.
    pub fn empty() -> Self {
        Self { cleanup: None }
    }
}

impl Cancellable for AnyCancellable {
    fn cancel(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl Drop for AnyCancellable {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for AnyCancellable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyCancellable")
            .field("armed", &self.cleanup.is_some())
            .finish()
    }
}
