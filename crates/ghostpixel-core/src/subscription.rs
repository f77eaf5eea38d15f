//! Cancellable live subscriptions.
//!
//! A [`Subscription`] is the consumer end of a push-based stream of snapshots.
//! The producer holds a [`SubscriptionSink`] and pushes a full snapshot on every
//! change. Stopping a subscription (explicitly, through a [`StopHandle`], or by
//! dropping it) guarantees that no further item is yielded, even if the producer
//! had already queued one.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::error::{GhostError, Result};

/// Creates a connected sink/subscription pair.
pub fn channel<T>() -> (SubscriptionSink<T>, Subscription<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let token = CancellationToken::new();
    let sink = SubscriptionSink {
        sender,
        token: token.clone(),
    };
    let subscription = Subscription {
        receiver,
        cancelled: Box::pin(token.clone().cancelled_owned()),
        token,
    };
    (sink, subscription)
}

/// Consumer end of a live snapshot stream.
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<Result<T>>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    token: CancellationToken,
}

impl<T> Subscription<T> {
    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the subscription is stopped or the producer went away.
    pub async fn next(&mut self) -> Option<Result<T>> {
        StreamExt::next(self).await
    }

    /// Stops delivery. Queued snapshots are discarded.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a handle that can stop this subscription from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.token.clone(),
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Stops a subscription that is owned by another task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Producer end of a live snapshot stream.
pub struct SubscriptionSink<T> {
    sender: mpsc::UnboundedSender<Result<T>>,
    token: CancellationToken,
}

impl<T> SubscriptionSink<T> {
    /// Pushes a snapshot. Returns `false` if the consumer is gone.
    pub fn emit(&self, snapshot: T) -> bool {
        if self.is_closed() {
            return false;
        }
        self.sender.send(Ok(snapshot)).is_ok()
    }

    /// Pushes a failure. The consumer decides whether to keep listening.
    pub fn fail(&self, error: GhostError) -> bool {
        if self.is_closed() {
            return false;
        }
        self.sender.send(Err(error)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.sender.is_closed()
    }
}

impl<T> Clone for SubscriptionSink<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            token: self.token.clone(),
        }
    }
}
