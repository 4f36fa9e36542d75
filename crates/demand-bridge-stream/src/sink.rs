//! `futures::Sink` over a producer's [`Emitter`].

use crate::error::StreamError;
use demand_bridge::{Completion, EmitError, Emitter};
use futures_sink::Sink;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Async sink feeding an [`Emitter`].
///
/// The bridge never makes a producer wait, so the sink is always ready while
/// the attachment is live. Closing it sends `Finished`.
///
/// ```ignore
/// use demand_bridge::BridgeSource;
/// use demand_bridge_stream::EmitterSink;
/// use futures::SinkExt;
///
/// let source = BridgeSource::<u32, ()>::new(|emitter| {
///     let mut sink = EmitterSink::new(emitter);
///     tokio::spawn(async move {
///         sink.send(1).await.ok();
///         sink.close().await.ok();
///     });
///     demand_bridge::AnyCancellable::empty()
/// });
/// ```
#[derive(Debug, Clone)]
pub struct EmitterSink<T, E> {
    emitter: Emitter<T, E>,
    closed: bool,
}

impl<T, E> EmitterSink<T, E> {
    /// Wraps an emitter.
    pub fn new(emitter: Emitter<T, E>) -> Self {
        Self {
            emitter,
            closed: false,
        }
    }

    /// Sends a failure and closes the sink.
    pub fn fail(&mut self, error: E) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.closed = true;
        self.emitter
            .try_send_completion(Completion::Failed(error))
            .map_err(StreamError::from)
    }

    /// Returns `true` once the sink was closed or failed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The wrapped emitter.
    pub fn emitter(&self) -> &Emitter<T, E> {
        &self.emitter
    }
}

impl<T, E> From<Emitter<T, E>> for EmitterSink<T, E> {
    fn from(emitter: Emitter<T, E>) -> Self {
        Self::new(emitter)
    }
}

impl<T, E> Sink<T> for EmitterSink<T, E> {
    type Error = StreamError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.closed {
            return Poll::Ready(Err(StreamError::Closed));
        }
        if self.emitter.is_detached() {
            return Poll::Ready(Err(EmitError::Detached.into()));
        }
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: T) -> Result<(), Self::Error> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.emitter.try_send(item)?;
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Values are handed to the attachment in `start_send`.
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Ok(()));
        }
        this.closed = true;
        let result = match this.emitter.try_send_completion(Completion::Finished) {
            // Nobody is left to tell.
            Ok(()) | Err(EmitError::Detached | EmitError::Cancelled) => Ok(()),
            Err(e) => Err(e.into()),
        };
        Poll::Ready(result)
    }
}
