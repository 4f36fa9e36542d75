//! Ready-made sources and subscribers built on [`BridgeSource`](crate::BridgeSource).

mod future;
mod merge;
mod shape;
mod sink;

pub use future::Promise;
