//! Bounded, drop-oldest watch channel used to fan registry events out to
//! `Find(Watch=true)` subscribers (`spec.md` §4.E, Design Notes §9: "Watch
//! fan-out backpressure... document the policy explicitly (drop-oldest with
//! bounded buffer is recommended) rather than inheriting the implicit
//! blocking behavior" of the Go original's unbounded, blocking
//! `eventChannels`).
//!
//! Doubles as the stream-to-channel adapter recovered from
//! `pkg/registry/core/streamchannel` in the original source: the same type
//! backs both production watch delivery and test harnesses that assert on
//! streamed events without a real transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::sync::Mutex as AsyncMutex;

struct Inner<E> {
    queue: AsyncMutex<VecDeque<E>>,
    notify: Notify,
    closed: AtomicBool,
    capacity: usize,
}

/// Producer half. Cheap to clone; every clone pushes into the same bounded
/// queue.
pub struct WatchSender<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for WatchSender<E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

/// Consumer half, not clonable — one receiver drains one subscription.
pub struct WatchReceiver<E> {
    inner: Arc<Inner<E>>,
}

pub fn watch_channel<E>(capacity: usize) -> (WatchSender<E>, WatchReceiver<E>) {
    let inner = Arc::new(Inner {
        queue: AsyncMutex::new(VecDeque::with_capacity(capacity.min(64))),
        notify: Notify::new(),
        closed: AtomicBool::new(false),
        capacity: capacity.max(1),
    });
    (
        WatchSender { inner: inner.clone() },
        WatchReceiver { inner },
    )
}

impl<E> WatchSender<E> {
    /// Pushes an event, evicting the oldest queued event first if the
    /// channel is at capacity. A no-op once the channel is closed.
    pub async fn send(&self, item: E) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut queue = self.inner.queue.lock().await;
            if queue.len() >= self.inner.capacity {
                queue.pop_front();
            }
            queue.push_back(item);
        }
        self.inner.notify.notify_one();
    }

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }
}

impl<E> WatchReceiver<E> {
    /// Awaits the next event, or `None` once the channel is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            {
                let mut queue = self.inner.queue.lock().await;
                if let Some(item) = queue.pop_front() {
                    return Some(item);
                }
                if self.inner.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            self.inner.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let (tx, mut rx) = watch_channel(8);
        tx.send(1).await;
        tx.send(2).await;
        tx.send(3).await;
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn drops_oldest_when_over_capacity() {
        let (tx, mut rx) = watch_channel(2);
        tx.send(1).await;
        tx.send(2).await;
        tx.send(3).await;
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn close_drains_then_ends_stream() {
        let (tx, mut rx) = watch_channel(4);
        tx.send(1).await;
        tx.close();
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
    }
}
