//! End-to-end tests driving sources through hand-written subscribers.

use demand_bridge::{
    AnyCancellable, BridgeConfig, BridgeSource, Completion, Demand, DemandBuffer, EmitError,
    Emitter, Subscriber, Subscription,
};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Records everything it receives and keeps its subscription for later
/// requests.
struct Probe<T> {
    initial: Demand,
    cancel_on_attach: bool,
    subscription: Mutex<Option<Box<dyn Subscription>>>,
    values: Mutex<Vec<T>>,
    completions: Mutex<Vec<Completion<String>>>,
}

impl<T> Probe<T> {
    fn new(initial: Demand) -> Arc<Self> {
        Arc::new(Self {
            initial,
            cancel_on_attach: false,
            subscription: Mutex::new(None),
            values: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        })
    }

    fn cancelling() -> Arc<Self> {
        Arc::new(Self {
            initial: Demand::NONE,
            cancel_on_attach: true,
            subscription: Mutex::new(None),
            values: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        })
    }

    fn request(&self, demand: Demand) {
        if let Some(subscription) = &*self.subscription.lock() {
            subscription.request(demand);
        }
    }

    fn drop_subscription(&self) {
        let subscription = self.subscription.lock().take();
        drop(subscription);
    }

    fn completions(&self) -> Vec<Completion<String>> {
        self.completions.lock().clone()
    }
}

impl<T: Clone> Probe<T> {
    fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }
}

impl<T: Send + 'static> Subscriber for Probe<T> {
    type Input = T;
    type Failure = String;

    fn receive_subscription(&self, subscription: Box<dyn Subscription>) {
        if self.cancel_on_attach {
            subscription.cancel();
        }
        *self.subscription.lock() = Some(subscription);
        if !self.initial.is_none() {
            self.request(self.initial);
        }
    }

    fn receive(&self, input: T) -> Demand {
        self.values.lock().push(input);
        Demand::NONE
    }

    fn receive_completion(&self, completion: Completion<String>) {
        self.completions.lock().push(completion);
    }
}

/// A source whose producer hands its emitter to the test and counts cancels.
fn captured<T: Send + 'static>() -> (
    BridgeSource<T, String>,
    Arc<Mutex<Vec<Emitter<T, String>>>>,
    Arc<AtomicUsize>,
) {
    let emitters = Arc::new(Mutex::new(Vec::new()));
    let cancels = Arc::new(AtomicUsize::new(0));
    let (slot, counter) = (Arc::clone(&emitters), Arc::clone(&cancels));
    let source = BridgeSource::new(move |emitter: Emitter<T, String>| {
        slot.lock().push(emitter);
        let counter = Arc::clone(&counter);
        AnyCancellable::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    });
    (source, emitters, cancels)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_partial_demand_then_drain() {
    let probe = Probe::<u32>::new(Demand::NONE);
    let buffer = DemandBuffer::new(Arc::clone(&probe));

    buffer.request_demand(Demand::max(1));
    for v in 1..=3 {
        buffer.buffer_value(v);
    }
    buffer.complete(Completion::Finished);

    assert_eq!(probe.values(), vec![1]);
    assert_eq!(buffer.pending_len(), 2);
    assert!(probe.completions().is_empty());

    buffer.request_demand(Demand::max(2));
    assert_eq!(probe.values(), vec![1, 2, 3]);
    assert_eq!(probe.completions(), vec![Completion::Finished]);
    assert!(buffer.is_terminal());
}

#[test]
fn test_scenario_partial_demand_through_source() {
    let source = BridgeSource::<u32, String>::new(|emitter: Emitter<u32, String>| {
        for v in 1..=3 {
            emitter.send(v);
        }
        emitter.finish();
        AnyCancellable::empty()
    });
    let probe = Probe::new(Demand::max(1));
    source.subscribe_shared(Arc::clone(&probe));

    assert_eq!(probe.values(), vec![1]);
    assert!(probe.completions().is_empty());

    probe.request(Demand::max(2));
    assert_eq!(probe.values(), vec![1, 2, 3]);
    assert_eq!(probe.completions(), vec![Completion::Finished]);
}

#[test]
fn test_scenario_zero_demand_holds_value() {
    let (source, emitters, _) = captured::<&'static str>();
    let probe = Probe::new(Demand::NONE);
    source.subscribe_shared(Arc::clone(&probe));

    let emitter = emitters.lock()[0].clone();
    emitter.send("a");
    assert!(probe.values().is_empty());

    probe.request(Demand::max(1));
    assert_eq!(probe.values(), vec!["a"]);
}

#[test]
fn test_scenario_cancel_before_any_value() {
    let (source, emitters, cancels) = captured::<u32>();
    let probe = Probe::cancelling();
    source.subscribe_shared(Arc::clone(&probe));

    let emitter = emitters.lock()[0].clone();
    emitter.send(1);
    emitter.finish();
    assert_eq!(emitter.try_send(2), Err(EmitError::Cancelled));

    // Later cancels are no-ops on the producer side.
    if let Some(subscription) = &*probe.subscription.lock() {
        subscription.cancel();
    }

    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert!(probe.values().is_empty());
    assert!(probe.completions().is_empty());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_failure_is_delivered_after_queue() {
    let source = BridgeSource::<u32, String>::new(|emitter: Emitter<u32, String>| {
        emitter.send(10);
        emitter.fail("upstream closed".to_string());
        AnyCancellable::empty()
    });
    let probe = Probe::new(Demand::NONE);
    source.subscribe_shared(Arc::clone(&probe));
    assert!(probe.completions().is_empty());

    probe.request(Demand::max(5));
    assert_eq!(probe.values(), vec![10]);
    assert_eq!(
        probe.completions(),
        vec![Completion::Failed("upstream closed".to_string())]
    );
}

#[test]
#[should_panic(expected = "completion sent twice")]
fn test_double_completion_is_fatal() {
    let source = BridgeSource::<u32, String>::new(|emitter: Emitter<u32, String>| {
        emitter.finish();
        emitter.finish();
        AnyCancellable::empty()
    });
    source.subscribe_shared(Probe::<u32>::new(Demand::NONE));
}

#[test]
#[should_panic(expected = "value sent after completion")]
fn test_value_after_completion_is_fatal() {
    let source = BridgeSource::<u32, String>::new(|emitter: Emitter<u32, String>| {
        emitter.finish();
        emitter.send(1);
        AnyCancellable::empty()
    });
    source.subscribe_shared(Probe::<u32>::new(Demand::Unlimited));
}

#[test]
fn test_emitter_is_inert_after_subscription_dropped() {
    let (source, emitters, cancels) = captured::<u32>();
    let probe = Probe::new(Demand::Unlimited);
    source.subscribe_shared(Arc::clone(&probe));

    let emitter = emitters.lock()[0].clone();
    emitter.send(1);
    probe.drop_subscription();

    assert!(emitter.is_detached());
    emitter.send(2);
    emitter.finish();
    assert_eq!(emitter.try_send(3), Err(EmitError::Detached));

    assert_eq!(probe.values(), vec![1]);
    assert!(probe.completions().is_empty());
    // The producer's token still runs its cleanup when dropped.
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
}

#[test]
fn test_attachments_are_independent() {
    let (source, emitters, _) = captured::<u32>();
    let first = Probe::new(Demand::Unlimited);
    let second = Probe::new(Demand::max(1));
    source.subscribe_shared(Arc::clone(&first));
    source.subscribe_shared(Arc::clone(&second));
    assert_eq!(emitters.lock().len(), 2);

    let (a, b) = {
        let emitters = emitters.lock();
        (emitters[0].clone(), emitters[1].clone())
    };
    a.send(1);
    a.send(2);
    a.finish();
    b.send(9);
    b.send(8);

    assert_eq!(first.values(), vec![1, 2]);
    assert_eq!(first.completions(), vec![Completion::Finished]);
    assert_eq!(second.values(), vec![9]);
    assert!(second.completions().is_empty());
}

#[test]
fn test_unlimited_demand_bypasses_queue() {
    let probe = Probe::<usize>::new(Demand::NONE);
    let buffer = DemandBuffer::with_config(Arc::clone(&probe), &BridgeConfig::low_latency());
    assert_eq!(buffer.request_demand(Demand::Unlimited), Demand::Unlimited);

    for i in 0..100 {
        buffer.buffer_value(i);
        assert_eq!(buffer.pending_len(), 0);
        assert_eq!(probe.values.lock().len(), i + 1);
    }
    assert!(probe.completions().is_empty());
}

#[test]
fn test_credit_is_reported_once() {
    let probe = Probe::<u32>::new(Demand::NONE);
    let buffer = DemandBuffer::new(Arc::clone(&probe));

    assert_eq!(buffer.request_demand(Demand::max(3)), Demand::max(3));
    assert_eq!(buffer.request_demand(Demand::NONE), Demand::NONE);
    assert_eq!(buffer.request_demand(Demand::max(2)), Demand::max(2));

    let counters = buffer.counters().unwrap();
    assert_eq!(counters.requested, Demand::max(5));
    assert_eq!(counters.sent, Demand::max(5));
    assert_eq!(counters.processed, 0);
}

#[test]
fn test_subscription_reports_upstream_credit() {
    let (source, _emitters, _) = captured::<u32>();
    let probe = Probe::new(Demand::NONE);
    source.subscribe_shared(Arc::clone(&probe));

    let guard = probe.subscription.lock();
    let subscription = guard.as_ref().unwrap();
    assert_eq!(subscription.request_credit(Demand::max(3)), Demand::max(3));
    assert_eq!(subscription.request_credit(Demand::NONE), Demand::NONE);
    assert_eq!(subscription.request_credit(Demand::max(2)), Demand::max(2));
    assert_eq!(subscription.request_credit(Demand::Unlimited), Demand::Unlimited);
}

// ============================================================================
// Concurrency
// ============================================================================

/// Blocks inside `receive` until released, holding the attachment lock.
struct Gate {
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
    values: Mutex<Vec<u32>>,
}

impl Subscriber for Gate {
    type Input = u32;
    type Failure = String;

    fn receive_subscription(&self, subscription: Box<dyn Subscription>) {
        *self.subscription.lock() = Some(Arc::from(subscription));
    }

    fn receive(&self, input: u32) -> Demand {
        self.values.lock().push(input);
        let _ = self.entered.lock().send(());
        let _ = self.release.lock().recv();
        Demand::NONE
    }

    fn receive_completion(&self, _completion: Completion<String>) {}
}

/// Runs `emit` on a producer thread that queues on the lock behind a blocked
/// delivery, cancels meanwhile, then lets the delivery finish.
fn emit_racing_cancel<F>(emit: F) -> (Arc<Gate>, thread::Result<()>, usize)
where
    F: FnOnce(&Emitter<u32, String>) + Send + 'static,
{
    let (source, emitters, cancels) = captured::<u32>();
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let gate = Arc::new(Gate {
        subscription: Mutex::new(None),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
        values: Mutex::new(Vec::new()),
    });
    source.subscribe_shared(Arc::clone(&gate));

    let emitter = emitters.lock()[0].clone();
    emitter.send(1);
    let subscription = gate.subscription.lock().clone().unwrap();

    let requester = {
        let subscription = Arc::clone(&subscription);
        thread::spawn(move || subscription.request(Demand::max(1)))
    };
    entered_rx.recv().unwrap();

    let producer = {
        let emitter = emitter.clone();
        thread::spawn(move || emit(&emitter))
    };
    thread::sleep(Duration::from_millis(50));

    subscription.cancel();
    release_tx.send(()).unwrap();
    requester.join().unwrap();
    let outcome = producer.join();

    assert_eq!(emitter.try_send(3), Err(EmitError::Cancelled));
    (gate, outcome, cancels.load(Ordering::SeqCst))
}

#[test]
fn test_send_racing_cancel_is_dropped() {
    let (gate, outcome, cancels) = emit_racing_cancel(|emitter| emitter.send(2));

    assert!(outcome.is_ok());
    assert_eq!(*gate.values.lock(), vec![1]);
    assert_eq!(cancels, 1);
}

#[test]
fn test_completion_racing_cancel_is_dropped() {
    let (gate, outcome, cancels) = emit_racing_cancel(|emitter| {
        assert_eq!(
            emitter.try_send_completion(Completion::Finished),
            Err(EmitError::Cancelled)
        );
        emitter.finish();
    });

    assert!(outcome.is_ok());
    assert_eq!(*gate.values.lock(), vec![1]);
    assert_eq!(cancels, 1);
}

#[test]
fn test_concurrent_producers_keep_per_thread_order() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 500;

    let (source, emitters, _) = captured::<(usize, usize)>();
    let probe = Probe::new(Demand::NONE);
    source.subscribe_shared(Arc::clone(&probe));
    let emitter = emitters.lock()[0].clone();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let emitter = emitter.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    emitter.send((id, seq));
                }
            })
        })
        .collect();

    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        probe.request(Demand::max(rng.gen_range(0..40)));
        thread::yield_now();
    }
    for handle in handles {
        handle.join().unwrap();
    }
    probe.request(Demand::Unlimited);
    emitter.finish();

    let values = probe.values();
    assert_eq!(values.len(), PRODUCERS * PER_PRODUCER);
    for id in 0..PRODUCERS {
        let seqs: Vec<usize> = values
            .iter()
            .filter(|(producer, _)| *producer == id)
            .map(|(_, seq)| *seq)
            .collect();
        assert_eq!(seqs, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
    assert_eq!(probe.completions(), vec![Completion::Finished]);
}

#[test]
fn test_cancel_from_another_thread_stops_delivery() {
    let (source, emitters, cancels) = captured::<u32>();
    let probe = Probe::new(Demand::max(10));
    source.subscribe_shared(Arc::clone(&probe));
    let emitter = emitters.lock()[0].clone();

    for v in 0..5 {
        emitter.send(v);
    }

    let canceller = Arc::clone(&probe);
    thread::spawn(move || {
        if let Some(subscription) = &*canceller.subscription.lock() {
            subscription.cancel();
        }
    })
    .join()
    .unwrap();

    for v in 5..20 {
        emitter.send(v);
    }
    emitter.finish();

    assert_eq!(probe.values(), (0..5).collect::<Vec<_>>());
    assert!(probe.completions().is_empty());
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
}
