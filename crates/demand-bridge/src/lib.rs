//! Demand-driven bridge for callback-based producers
//!
//! Wraps a producer that pushes values through callbacks, with no notion of
//! backpressure, as a source that honours a subscriber's demand. Values the
//! subscriber has not asked for yet are queued per attachment and delivered
//! in FIFO order as credit arrives; the completion is held back until the
//! queue has drained.
//!
//! # Architecture
//!
//! ```text
//! producer callback --(Emitter)--> DemandBuffer --(receive)--> Subscriber
//!                                      ^                          |
//!                                      +---- BridgeSubscription <-+
//!                                            request / cancel
//! ```
//!
//! - [`Demand`]: bounded or unlimited credit with saturating arithmetic
//! - [`DemandBuffer`]: per-attachment queue, counters and completion hold-back
//! - [`Emitter`]: the producer's weak handle; inert once the subscription is gone
//! - [`BridgeSubscription`]: demand and cancellation entry point for the subscriber
//! - [`BridgeSource`]: attachment factory, one producer invocation per subscriber
//!
//! # Example
//!
//! ```
//! use demand_bridge::{AnyCancellable, BridgeSource, Completion};
//! use std::sync::{Arc, Mutex};
//!
//! let source = BridgeSource::<&str, std::convert::Infallible>::new(|emitter| {
//!     emitter.send("hello");
//!     emitter.send("world");
//!     emitter.finish();
//!     AnyCancellable::empty()
//! });
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let _handle = source.sink(move |v| sink.lock().unwrap().push(v), |_| {});
//! assert_eq!(*seen.lock().unwrap(), vec!["hello", "world"]);
//! ```
//!
//! # Reentrancy
//!
//! Delivery happens synchronously under the attachment's lock. A subscriber
//! may cancel from inside [`Subscriber::receive`], and should return extra
//! credit from it rather than calling [`Subscription::request`].

mod buffer;
mod compose;
mod config;
mod demand;
mod emitter;
mod error;
mod invariants;
mod source;
mod subscriber;
mod subscription;

pub use buffer::{DemandBuffer, DemandCounters};
pub use compose::Promise;
pub use config::BridgeConfig;
pub use demand::Demand;
pub use emitter::Emitter;
pub use error::{EmitError, ProtocolViolation};
pub use source::BridgeSource;
pub use subscriber::{AnyCancellable, Cancellable, Completion, Subscriber, Subscription};
pub use subscription::BridgeSubscription;
