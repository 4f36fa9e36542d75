//! Merging many sources into one.

use crate::emitter::Emitter;
use crate::source::BridgeSource;
use crate::subscriber::{AnyCancellable, Completion};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct MergeState {
    remaining: AtomicUsize,
    done: AtomicBool,
    upstreams: Mutex<Vec<(usize, AnyCancellable)>>,
}

impl MergeState {
    fn register(&self, index: usize, upstream: AnyCancellable) {
        let mut upstreams = self.upstreams.lock();
        if self.done.load(Ordering::SeqCst) {
            drop(upstreams);
            drop(upstream);
        } else {
            upstreams.push((index, upstream));
        }
    }

    /// Runs inside upstream `index`'s completion delivery, under its lock.
    fn upstream_completed<T, E>(&self, index: usize, emitter: &Emitter<T, E>, completion: Completion<E>) {
        match completion {
            Completion::Finished => {
                if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1
                    && !self.done.swap(true, Ordering::SeqCst)
                {
                    let _ = emitter.try_send_completion(Completion::Finished);
                }
            }
            Completion::Failed(error) => {
                if !self.done.swap(true, Ordering::SeqCst) {
                    let _ = emitter.try_send_completion(Completion::Failed(error));
                    // The failing upstream is released at teardown, never
                    // under its own lock.
                    self.cancel_except(index);
                }
            }
        }
    }

    fn cancel_except(&self, index: usize) {
        let others: Vec<(usize, AnyCancellable)> = {
            let mut upstreams = self.upstreams.lock();
            let (keep, others) = std::mem::take(&mut *upstreams)
                .into_iter()
                .partition(|(i, _)| *i == index);
            *upstreams = keep;
            others
        };
        drop(others);
    }

    fn cancel_all(&self) {
        self.done.store(true, Ordering::SeqCst);
        let upstreams = std::mem::take(&mut *self.upstreams.lock());
        drop(upstreams);
    }
}

impl<T: Send + 'static, E: Send + 'static> BridgeSource<T, E> {
    /// Attaches to every source with unlimited demand and forwards all of
    /// their values.
    ///
    /// Finishes once every source finished. The first failure is forwarded
    /// and the remaining sources are cancelled. Merging nothing finishes at
    /// once.
    pub fn merge<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = BridgeSource<T, E>>,
    {
        let sources: Arc<[BridgeSource<T, E>]> = sources.into_iter().collect();

        Self::new(move |emitter: Emitter<T, E>| {
            if sources.is_empty() {
                emitter.finish();
                return AnyCancellable::empty();
            }

            let state = Arc::new(MergeState {
                remaining: AtomicUsize::new(sources.len()),
                done: AtomicBool::new(false),
                upstreams: Mutex::new(Vec::with_capacity(sources.len())),
            });

            for (index, source) in sources.iter().enumerate() {
                let values = emitter.clone();
                let completions = emitter.clone();
                let completion_state = Arc::clone(&state);
                let upstream = source.sink(
                    move |value| {
                        // Racing a sibling's failure is expected.
                        let _ = values.try_send(value);
                    },
                    move |completion| {
                        completion_state.upstream_completed(index, &completions, completion);
                    },
                );
                state.register(index, upstream);
            }

            AnyCancellable::new(move || state.cancel_all())
        })
    }

    /// Merges this source with `other`.
    pub fn merge_with(&self, other: &BridgeSource<T, E>) -> Self {
        Self::merge([self.clone(), other.clone()])
    }
}
