//! Async Stream/Sink adapters for demand-bridge
//!
//! This crate connects [`demand_bridge::BridgeSource`] to the `futures`
//! ecosystem in both directions.
//!
//! # Features
//!
//! - **Stream consumption**: [`IntoStream::into_stream`] attaches to a source
//!   and yields `Result<T, E>`, requesting credit in prefetch-sized batches
//! - **Sink production**: [`EmitterSink`] lets async producers push through
//!   `SinkExt::send`; closing the sink finishes the attachment
//! - **Stream sources**: [`from_stream`] turns any `Stream<Item = Result<T, E>>`
//!   into a source driven by a tokio task
//! - **Cancellation on drop**: dropping a [`BridgeStream`] cancels its attachment
//!
//! # Example
//!
//! ```ignore
//! use demand_bridge::{AnyCancellable, BridgeSource};
//! use demand_bridge_stream::{IntoStream, StreamConfig, StreamExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = BridgeSource::<u64, std::io::Error>::new(|emitter| {
//!         for i in 0..10 {
//!             emitter.send(i);
//!         }
//!         emitter.finish();
//!         AnyCancellable::empty()
//!     });
//!
//!     let mut stream = source.into_stream_with_config(StreamConfig::one_by_one());
//!     while let Some(item) = stream.next().await {
//!         println!("Received: {}", item.unwrap());
//!     }
//! }
//! ```

mod config;
mod error;
mod from_stream;
mod sink;
mod stream;

pub use config::StreamConfig;
pub use error::StreamError;
pub use from_stream::from_stream;
pub use sink::EmitterSink;
pub use stream::{BridgeStream, IntoStream};

// Re-export useful stream combinators
pub use tokio_stream::StreamExt;
