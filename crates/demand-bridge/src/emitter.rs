//! The producer-facing handle.

use crate::buffer::DemandBuffer;
use crate::demand::Demand;
use crate::error::EmitError;
use crate::subscriber::{Completion, Subscriber};
use std::fmt;
use std::sync::Weak;

/// Object-safe view of a [`DemandBuffer`] with the subscriber type erased.
pub(crate) trait EmitTarget<T, E>: Send + Sync {
    fn send_value(&self, value: T);
    fn try_send_value(&self, value: T) -> Result<Demand, EmitError>;
    fn send_completion(&self, completion: Completion<E>);
    fn try_send_completion(&self, completion: Completion<E>) -> Result<(), EmitError>;
}

impl<S: Subscriber> EmitTarget<S::Input, S::Failure> for DemandBuffer<S> {
    fn send_value(&self, value: S::Input) {
        self.buffer_value(value);
    }

    fn try_send_value(&self, value: S::Input) -> Result<Demand, EmitError> {
        self.try_buffer_value(value)
    }

    fn send_completion(&self, completion: Completion<S::Failure>) {
        self.complete(completion);
    }

    fn try_send_completion(&self, completion: Completion<S::Failure>) -> Result<(), EmitError> {
        self.try_complete(completion)
    }
}

/// Handle passed to a producer callback for pushing values and a completion.
///
/// Cheap to clone and safe to move across threads. It holds only a weak
/// reference to the attachment's buffer: once the subscription is dropped,
/// every call is a no-op.
pub struct Emitter<T, E> {
    target: Weak<dyn EmitTarget<T, E>>,
}

impl<T, E> Emitter<T, E> {
    pub(crate) fn new(target: Weak<dyn EmitTarget<T, E>>) -> Self {
        Self { target }
    }

    /// Sends a value.
    ///
    /// # Panics
    ///
    /// Panics if a completion was already sent on this attachment.
    pub fn send(&self, value: T) {
        if let Some(target) = self.target.upgrade() {
            target.send_value(value);
        }
    }

    /// Sends the terminal signal.
    ///
    /// # Panics
    ///
    /// Panics if a completion was already sent on this attachment.
    pub fn send_completion(&self, completion: Completion<E>) {
        if let Some(target) = self.target.upgrade() {
            target.send_completion(completion);
        }
    }

    /// Shorthand for `send_completion(Completion::Finished)`.
    pub fn finish(&self) {
        self.send_completion(Completion::Finished);
    }

    /// Shorthand for `send_completion(Completion::Failed(error))`.
    pub fn fail(&self, error: E) {
        self.send_completion(Completion::Failed(error));
    }

    /// Sends a value, reporting instead of panicking when it cannot be
    /// accepted. On success returns the net new upstream credit.
    pub fn try_send(&self, value: T) -> Result<Demand, EmitError> {
        self.target
            .upgrade()
            .ok_or(EmitError::Detached)?
            .try_send_value(value)
    }

    /// Sends the terminal signal, reporting instead of panicking when it
    /// cannot be accepted.
    pub fn try_send_completion(&self, completion: Completion<E>) -> Result<(), EmitError> {
        self.target
            .upgrade()
            .ok_or(EmitError::Detached)?
            .try_send_completion(completion)
    }

    /// Returns `true` if the owning subscription has been dropped.
    pub fn is_detached(&self) -> bool {
        self.target.strong_count() == 0
    }
}

impl<T, E> Clone for Emitter<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
        }
    }
}

impl<T, E> fmt::Debug for Emitter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("detached", &self.is_detached())
            .finish()
    }
}
