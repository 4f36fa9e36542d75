//! Demand-accounting buffer.
//!
//! One [`DemandBuffer`] exists per attachment. It queues values pushed by the
//! producer and releases them to the subscriber only while the subscriber has
//! outstanding credit. Every mutating operation runs under a single
//! per-attachment `parking_lot::Mutex`, including the synchronous calls into
//! the subscriber made while draining.
//!
//! # Reentrancy
//!
//! The lock is not reentrant. A subscriber must not call
//! [`Subscription::request`](crate::Subscription::request) for the same
//! attachment from inside [`Subscriber::receive`] or
//! [`Subscriber::receive_completion`]; doing so deadlocks. Return the extra
//! credit from `receive` instead. Cancelling from inside `receive` is fine:
//! cancellation never waits for the lock.

#[cfg(debug_assertions)]
use crate::invariants::{
    debug_assert_bypass_empty, debug_assert_drained_before_completion,
    debug_assert_sent_bounded, debug_assert_within_demand,
};
use crate::config::BridgeConfig;
use crate::demand::Demand;
use crate::error::{EmitError, ProtocolViolation};
use crate::subscriber::{Completion, Subscriber};
use parking_lot::{Mutex, MutexGuard};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Demand counters of one attachment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemandCounters {
    /// Total credit granted by the subscriber so far.
    pub requested: Demand,
    /// Items handed to the subscriber.
    pub processed: usize,
    /// Credit already reported back to the caller as upstream credit.
    pub sent: Demand,
}

/// Lifecycle of the buffered side of an attachment.
enum Phase<T, E> {
    /// Accepting values and demand.
    Active(Ledger<T>),
    /// Completion recorded; values still queued ahead of it.
    Draining(Ledger<T>, Completion<E>),
    /// Completion delivered, or the attachment was cancelled.
    Terminal,
}

struct Ledger<T> {
    queue: VecDeque<T>,
    counters: DemandCounters,
}

struct BufferState<S: Subscriber> {
    subscriber: Option<Arc<S>>,
    phase: Phase<S::Input, S::Failure>,
}

/// What a retired buffer lets go of. Dropped after the lock is released so
/// user `Drop` impls never run under it.
struct Retired<S: Subscriber> {
    _subscriber: Option<Arc<S>>,
    _phase: Phase<S::Input, S::Failure>,
}

impl<S: Subscriber> BufferState<S> {
    fn retire(&mut self) -> Retired<S> {
        Retired {
            _subscriber: self.subscriber.take(),
            _phase: mem::replace(&mut self.phase, Phase::Terminal),
        }
    }
}

/// Lock-guarded queue reconciling producer pushes against subscriber demand.
pub struct DemandBuffer<S: Subscriber> {
    state: Mutex<BufferState<S>>,
    cancelled: AtomicBool,
    label: Cow<'static, str>,
}

impl<S: Subscriber> DemandBuffer<S> {
    /// Creates a buffer delivering into `subscriber`.
    pub fn new(subscriber: Arc<S>) -> Self {
        Self::with_config(subscriber, &BridgeConfig::default())
    }

    /// Creates a buffer with the given configuration.
    pub fn with_config(subscriber: Arc<S>, config: &BridgeConfig) -> Self {
        Self {
            state: Mutex::new(BufferState {
                subscriber: Some(subscriber),
                phase: Phase::Active(Ledger {
                    queue: VecDeque::with_capacity(config.queue_capacity),
                    counters: DemandCounters::default(),
                }),
            }),
            cancelled: AtomicBool::new(false),
            label: config.label.clone().unwrap_or(Cow::Borrowed("bridge")),
        }
    }

    /// Buffers a value, delivering it at once if demand allows.
    ///
    /// Returns the net new upstream credit.
    ///
    /// # Panics
    ///
    /// Panics if a completion was already recorded.
    pub fn buffer_value(&self, value: S::Input) -> Demand {
        match self.try_buffer_value(value) {
            Ok(credit) => credit,
            Err(EmitError::Completed) => self.violation(ProtocolViolation::ValueAfterCompletion),
            Err(_) => Demand::NONE,
        }
    }

    /// Non-panicking [`buffer_value`](Self::buffer_value).
    pub fn try_buffer_value(&self, value: S::Input) -> Result<Demand, EmitError> {
        if self.is_cancelled() {
            return Err(EmitError::Cancelled);
        }
        let mut state = self.state.lock();
        let result = self.buffer_locked(&mut state, value);
        self.settle(state);
        result
    }

    /// Records the completion; it is delivered once the queue drains.
    ///
    /// # Panics
    ///
    /// Panics if a completion was already recorded.
    pub fn complete(&self, completion: Completion<S::Failure>) {
        if let Err(EmitError::Completed) = self.try_complete(completion) {
            self.violation(ProtocolViolation::DoubleCompletion);
        }
    }

    /// Non-panicking [`complete`](Self::complete).
    pub fn try_complete(&self, completion: Completion<S::Failure>) -> Result<(), EmitError> {
        if self.is_cancelled() {
            return Err(EmitError::Cancelled);
        }
        let mut state = self.state.lock();
        let result = self.complete_locked(&mut state, completion);
        self.settle(state);
        result
    }

    /// Adds `demand` to the granted credit and drains what it allows.
    ///
    /// Returns the net new upstream credit.
    pub fn request_demand(&self, demand: Demand) -> Demand {
        if self.is_cancelled() {
            return Demand::NONE;
        }
        tracing::trace!(source = %self.label, %demand, "demand requested");
        let mut state = self.state.lock();
        let BufferState { subscriber, phase } = &mut *state;
        let credit = match subscriber.as_deref() {
            Some(subscriber) => self.flush(subscriber, phase, demand),
            None => Demand::NONE,
        };
        self.settle(state);
        credit
    }

    /// Abandons the attachment. Nothing is delivered afterwards.
    ///
    /// Does not wait for the lock; an in-flight drain stops after the value
    /// it is currently delivering.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(source = %self.label, "attachment cancelled");
        self.try_retire();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `true` once the completion was delivered or the buffer was
    /// cancelled.
    pub fn is_terminal(&self) -> bool {
        self.inspect(|phase| matches!(phase, Phase::Terminal)) || self.is_cancelled()
    }

    /// Number of values waiting for demand.
    pub fn pending_len(&self) -> usize {
        self.inspect(|phase| match phase {
            Phase::Active(ledger) | Phase::Draining(ledger, _) => ledger.queue.len(),
            Phase::Terminal => 0,
        })
    }

    /// Current counters, or `None` once terminal.
    pub fn counters(&self) -> Option<DemandCounters> {
        self.inspect(|phase| match phase {
            Phase::Active(ledger) | Phase::Draining(ledger, _) => Some(ledger.counters),
            Phase::Terminal => None,
        })
    }

    /// Reads the phase under the lock. Released through
    /// [`settle`](Self::settle) so a cancel landing meanwhile still retires.
    fn inspect<R>(&self, read: impl FnOnce(&Phase<S::Input, S::Failure>) -> R) -> R {
        let state = self.state.lock();
        let result = read(&state.phase);
        self.settle(state);
        result
    }

    fn buffer_locked(
        &self,
        state: &mut BufferState<S>,
        value: S::Input,
    ) -> Result<Demand, EmitError> {
        let BufferState { subscriber, phase } = state;
        // A cancel may have retired the buffer while this call waited for the lock.
        let Some(subscriber) = subscriber.as_deref().filter(|_| !self.is_cancelled()) else {
            return Err(EmitError::Cancelled);
        };
        let ledger = match phase {
            Phase::Active(ledger) => ledger,
            Phase::Draining(..) | Phase::Terminal => return Err(EmitError::Completed),
        };

        if ledger.counters.requested.is_unlimited() {
            #[cfg(debug_assertions)]
            debug_assert_bypass_empty!(ledger.queue.len());

            let credit = subscriber.receive(value);
            ledger.counters.requested += credit;
            ledger.counters.processed = ledger.counters.processed.saturating_add(1);
            return Ok(credit);
        }

        ledger.queue.push_back(value);
        tracing::trace!(source = %self.label, pending = ledger.queue.len(), "value buffered");
        Ok(self.flush(subscriber, phase, Demand::NONE))
    }

    fn complete_locked(
        &self,
        state: &mut BufferState<S>,
        completion: Completion<S::Failure>,
    ) -> Result<(), EmitError> {
        let BufferState { subscriber, phase } = state;
        let Some(subscriber) = subscriber.as_deref().filter(|_| !self.is_cancelled()) else {
            return Err(EmitError::Cancelled);
        };
        if !matches!(phase, Phase::Active(_)) {
            return Err(EmitError::Completed);
        }
        let Phase::Active(ledger) = mem::replace(phase, Phase::Terminal) else {
            return Err(EmitError::Completed);
        };
        *phase = Phase::Draining(ledger, completion);
        self.flush(subscriber, phase, Demand::NONE);
        Ok(())
    }

    /// Drains the queue as far as demand allows, then delivers a recorded
    /// completion once nothing is left ahead of it.
    fn flush(&self, subscriber: &S, phase: &mut Phase<S::Input, S::Failure>, added: Demand) -> Demand {
        let ledger = match phase {
            Phase::Active(ledger) | Phase::Draining(ledger, _) => ledger,
            Phase::Terminal => return Demand::NONE,
        };

        ledger.counters.requested += added;
        if added.is_none() && ledger.counters.requested.is_none() {
            return Demand::NONE;
        }

        while ledger.counters.requested > ledger.counters.processed && !self.is_cancelled() {
            let Some(value) = ledger.queue.pop_front() else {
                break;
            };
            ledger.counters.requested += subscriber.receive(value);
            ledger.counters.processed += 1;

            #[cfg(debug_assertions)]
            debug_assert_within_demand!(ledger.counters.processed, ledger.counters.requested);
        }

        if self.is_cancelled() {
            return Demand::NONE;
        }

        if matches!(phase, Phase::Draining(ledger, _) if ledger.queue.is_empty()) {
            if let Phase::Draining(ledger, completion) = mem::replace(phase, Phase::Terminal) {
                #[cfg(debug_assertions)]
                debug_assert_drained_before_completion!(ledger.queue.len());

                tracing::debug!(
                    source = %self.label,
                    processed = ledger.counters.processed,
                    failed = completion.is_failure(),
                    "delivering completion"
                );
                subscriber.receive_completion(completion);
            }
            return Demand::NONE;
        }

        let ledger = match phase {
            Phase::Active(ledger) | Phase::Draining(ledger, _) => ledger,
            Phase::Terminal => return Demand::NONE,
        };

        #[cfg(debug_assertions)]
        debug_assert_sent_bounded!(ledger.counters.sent, ledger.counters.requested);

        let credit = ledger.counters.requested - ledger.counters.sent;
        ledger.counters.sent = ledger.counters.requested;
        credit
    }

    /// Releases the lock, retiring the buffer first if it is finished.
    fn settle(&self, mut state: MutexGuard<'_, BufferState<S>>) {
        let retired = if self.is_cancelled() || matches!(state.phase, Phase::Terminal) {
            Some(state.retire())
        } else {
            None
        };
        drop(state);
        drop(retired);

        // A cancel that raced with this section could not take the lock.
        if self.is_cancelled() {
            self.try_retire();
        }
    }

    fn try_retire(&self) {
        if let Some(mut state) = self.state.try_lock() {
            let retired = state.retire();
            drop(state);
            drop(retired);
        }
    }

    fn violation(&self, violation: ProtocolViolation) -> ! {
        tracing::error!(source = %self.label, %violation, "producer protocol violation");
        panic!("{violation}");
    }
}
