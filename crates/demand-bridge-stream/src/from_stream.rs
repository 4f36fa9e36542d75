//! Sources fed by async streams.

use demand_bridge::{AnyCancellable, BridgeSource, Completion, Emitter};
use futures_core::{ready, Stream};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Items forwarded before the task yields back to the runtime.
const FORWARD_BUDGET: usize = 32;

pin_project! {
    /// Drives a stream into an emitter until it ends or the attachment goes
    /// away.
    struct Forward<St, T, E> {
        #[pin]
        stream: St,
        emitter: Emitter<T, E>,
    }
}

impl<St, T, E> Future for Forward<St, T, E>
where
    St: Stream<Item = Result<T, E>>,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut this = self.project();

        for _ in 0..FORWARD_BUDGET {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(value)) => {
                    if let Err(e) = this.emitter.try_send(value) {
                        tracing::debug!(error = %e, "stream forwarding stopped");
                        return Poll::Ready(());
                    }
                }
                Some(Err(error)) => {
                    let _ = this.emitter.try_send_completion(Completion::Failed(error));
                    return Poll::Ready(());
                }
                None => {
                    let _ = this.emitter.try_send_completion(Completion::Finished);
                    return Poll::Ready(());
                }
            }
        }

        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Creates a source whose every attachment forwards a fresh stream from
/// `make_stream` on a spawned tokio task.
///
/// `Ok` items become values; the first `Err` fails the attachment and the end
/// of the stream finishes it. Cancelling the attachment aborts the task.
///
/// # Panics
///
/// Attaching panics when called outside a tokio runtime, like
/// [`tokio::spawn`].
pub fn from_stream<F, St, T, E>(make_stream: F) -> BridgeSource<T, E>
where
    F: Fn() -> St + Send + Sync + 'static,
    St: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    BridgeSource::new(move |emitter: Emitter<T, E>| {
        let task = tokio::spawn(Forward {
            stream: make_stream(),
            emitter,
        });
        AnyCancellable::new(move || task.abort())
    })
}
