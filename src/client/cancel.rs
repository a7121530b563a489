//! Caller-initiated cancellation for in-flight streams.

use crate::BoxStream;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::watch;

/// Handle to cancel an in-flight streaming call.
///
/// Cancelling ends the wrapped stream at its next poll and drops the inner
/// stream there, releasing the connection it owns. Content already delivered
/// to the caller is retained; there is no rollback.
/// Dropping the handle without calling [`CancelHandle::cancel`] leaves the
/// stream running.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

pub(crate) type CancelReceiver = watch::Receiver<bool>;

pub(crate) fn cancel_pair() -> (CancelHandle, CancelReceiver) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, rx)
}

/// A stream wrapper that observes a cancellation signal.
///
/// The cancel future is held across polls so its waker registration
/// survives; a caller blocked on `next()` wakes and sees end-of-stream
/// promptly after `cancel()`. The inner stream owns the connection, so it
/// is dropped the moment cancellation is observed rather than whenever the
/// caller gets around to dropping the wrapper. Handle drop without an
/// explicit cancel keeps the stream running.
pub struct ControlledStream<T> {
    inner: Option<BoxStream<'static, T>>,
    cancelled: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
    cancel_fired: bool,
}

impl<T> ControlledStream<T> {
    pub(crate) fn new(inner: BoxStream<'static, T>, cancel: Option<CancelReceiver>) -> Self {
        let cancelled = cancel.map(|mut rx| {
            let fut: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
                // Resolve only on a true cancel; a dropped sender is not one.
                while rx.changed().await.is_ok() {
                    if *rx.borrow() {
                        return;
                    }
                }
                std::future::pending::<()>().await
            });
            fut
        });
        Self {
            inner: Some(inner),
            cancelled,
            cancel_fired: false,
        }
    }
}

impl<T> Stream for ControlledStream<T> {
    type Item = crate::Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.cancel_fired {
            return Poll::Ready(None);
        }

        if let Some(cancelled) = this.cancelled.as_mut() {
            if cancelled.as_mut().poll(cx).is_ready() {
                this.cancel_fired = true;
                this.cancelled = None;
                this.inner = None;
                return Poll::Ready(None);
            }
        }

        match this.inner.as_mut() {
            Some(inner) => inner.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}
