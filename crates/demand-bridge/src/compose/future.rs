//! Single-shot sources: promises, deferred work, side effects.

use crate::emitter::Emitter;
use crate::source::BridgeSource;
use crate::subscriber::{AnyCancellable, Completion};
use parking_lot::Mutex;
use std::sync::Arc;

/// Callback that settles a single-shot source.
pub type Promise<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

enum FutureState<T, E> {
    Pending(Vec<Emitter<T, E>>),
    Ready(Result<T, E>),
}

fn settle<T, E>(emitter: &Emitter<T, E>, result: Result<T, E>) {
    // Late or cancelled attachments are not errors here.
    let _ = match result {
        Ok(value) => emitter
            .try_send(value)
            .and_then(|_| emitter.try_send_completion(Completion::Finished)),
        Err(error) => emitter.try_send_completion(Completion::Failed(error)),
    };
}

impl<T: Send + 'static, E: Send + 'static> BridgeSource<T, E> {
    /// A source that finishes at once on every attachment.
    pub fn empty() -> Self {
        Self::new(|emitter: Emitter<T, E>| {
            emitter.finish();
            AnyCancellable::empty()
        })
    }

    /// A source that fails with `error` on every attachment.
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::new(move |emitter: Emitter<T, E>| {
            emitter.fail(error.clone());
            AnyCancellable::empty()
        })
    }

    /// Runs `fulfill` now, once, and replays its result to every attachment:
    /// the value followed by a finish, or the failure.
    ///
    /// Attachments made before the promise settles wait for it.
    pub fn future<F>(fulfill: F) -> Self
    where
        F: FnOnce(Promise<T, E>),
        T: Clone,
        E: Clone,
    {
        let state = Arc::new(Mutex::new(FutureState::Pending(Vec::new())));

        let promise_state = Arc::clone(&state);
        fulfill(Box::new(move |result: Result<T, E>| {
            let waiting = {
                let mut state = promise_state.lock();
                match std::mem::replace(&mut *state, FutureState::Ready(result.clone())) {
                    FutureState::Pending(waiting) => waiting,
                    // A promise runs once; keep the first result.
                    previous @ FutureState::Ready(_) => {
                        *state = previous;
                        Vec::new()
                    }
                }
            };
            for emitter in &waiting {
                settle(emitter, result.clone());
            }
        }));

        Self::new(move |emitter: Emitter<T, E>| {
            let ready = {
                let mut state = state.lock();
                match &mut *state {
                    FutureState::Pending(waiting) => {
                        waiting.push(emitter.clone());
                        None
                    }
                    FutureState::Ready(result) => Some(result.clone()),
                }
            };
            if let Some(result) = ready {
                settle(&emitter, result);
            }
            AnyCancellable::empty()
        })
    }

    /// Runs `fulfill` once per attachment; the attachment receives its
    /// result.
    pub fn deferred<F>(fulfill: F) -> Self
    where
        F: Fn(Promise<T, E>) + Send + Sync + 'static,
    {
        Self::new(move |emitter: Emitter<T, E>| {
            fulfill(Box::new(move |result: Result<T, E>| settle(&emitter, result)));
            AnyCancellable::empty()
        })
    }

    /// Runs `work` once per attachment, emits nothing, and finishes.
    pub fn immediate<W>(work: W) -> Self
    where
        W: Fn() + Send + Sync + 'static,
    {
        Self::new(move |emitter: Emitter<T, E>| {
            work();
            emitter.finish();
            AnyCancellable::empty()
        })
    }

    /// Runs a fallible `work` now. The source finishes on every attachment,
    /// or fails with the error `work` returned.
    pub fn try_immediate<W>(work: W) -> Self
    where
        W: FnOnce() -> Result<(), E>,
        E: Clone + Sync,
    {
        match work() {
            Ok(()) => Self::empty(),
            Err(error) => Self::fail(error),
        }
    }
}
