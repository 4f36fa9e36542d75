//! Conversions between value-less and value-free sources.

use crate::emitter::Emitter;
use crate::source::BridgeSource;
use crate::subscriber::{AnyCancellable, Completion};
use std::convert::Infallible;

impl<E: Send + 'static> BridgeSource<Infallible, E> {
    /// Emits a single `()` when this source finishes, then finishes.
    ///
    /// A failure passes through without the unit value.
    pub fn as_void(&self) -> BridgeSource<(), E> {
        let upstream = self.clone();
        BridgeSource::with_config(
            move |emitter: Emitter<(), E>| {
                upstream.sink(
                    |never| match never {},
                    move |completion| match completion {
                        Completion::Finished => {
                            let _ = emitter.try_send(());
                            let _ = emitter.try_send_completion(Completion::Finished);
                        }
                        Completion::Failed(error) => {
                            let _ = emitter.try_send_completion(Completion::Failed(error));
                        }
                    },
                )
            },
            self.config().clone(),
        )
    }
}

impl<E: Send + 'static> BridgeSource<(), E> {
    /// Drops every value and forwards only the completion.
    ///
    /// With `complete_immediately`, the upstream is attached and cancelled
    /// straight away and the result finishes without waiting for it.
    pub fn as_never(&self, complete_immediately: bool) -> BridgeSource<Infallible, E> {
        let upstream = self.clone();
        BridgeSource::with_config(
            move |emitter: Emitter<Infallible, E>| {
                if complete_immediately {
                    drop(upstream.sink(|()| {}, |_| {}));
                    emitter.finish();
                    return AnyCancellable::empty();
                }
                upstream.sink(
                    |()| {},
                    move |completion| {
                        let _ = emitter.try_send_completion(completion);
                    },
                )
            },
            self.config().clone(),
        )
    }
}
