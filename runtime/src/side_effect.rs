//! One-shot notifications from a controller to its presentation layer.
//!
//! Unlike state, a side effect ("show the undo prompt", "navigate back") must
//! be handled exactly once. The channel is unbounded with a single receiver,
//! so each posted item is delivered at most once and never replayed.
//!
//! # Example
//!
//! ```
//! use tasklist_runtime::side_effect;
//!
//! let (tx, mut rx) = side_effect::channel::<&str>();
//! assert!(tx.post("navigate-back"));
//! assert_eq!(rx.try_recv(), Some("navigate-back"));
//! assert_eq!(rx.try_recv(), None);
//! ```

use tokio::sync::mpsc;

/// Creates a connected sender/receiver pair
#[must_use]
pub fn channel<E>() -> (SideEffectSender<E>, SideEffectReceiver<E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SideEffectSender { tx }, SideEffectReceiver { rx })
}

/// Posting half, held by the controller's environment
#[derive(Debug)]
pub struct SideEffectSender<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for SideEffectSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E> SideEffectSender<E> {
    /// Queue a side effect. Returns false if the receiver is gone.
    pub fn post(&self, effect: E) -> bool {
        if self.tx.send(effect).is_err() {
            tracing::debug!("Side effect dropped: receiver closed");
            return false;
        }
        true
    }

    /// Returns true once the receiver has been dropped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, held by the presentation layer
#[derive(Debug)]
pub struct SideEffectReceiver<E> {
    rx: mpsc::UnboundedReceiver<E>,
}

impl<E> SideEffectReceiver<E> {
    /// Wait for the next side effect; `None` once every sender is dropped
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    /// Wait up to `timeout` for the next side effect
    pub async fn recv_timeout(&mut self, timeout: std::time::Duration) -> Option<E> {
        tokio::time::timeout(timeout, self.rx.recv()).await.ok().flatten()
    }

    /// Take the next side effect if one is queued
    pub fn try_recv(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Take every queued side effect
    pub fn drain(&mut self) -> Vec<E> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_order_exactly_once() {
        let (tx, mut rx) = channel();
        let other = tx.clone();

        assert!(tx.post(1));
        assert!(other.post(2));

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.drain(), vec![2]);
        assert!(rx.drain().is_empty());
    }

    #[tokio::test]
    async fn recv_timeout_gives_up() {
        let (_tx, mut rx) = channel::<u8>();

        assert_eq!(rx.recv_timeout(std::time::Duration::from_millis(10)).await, None);
    }

    #[tokio::test]
    async fn recv_ends_when_senders_dropped() {
        let (tx, mut rx) = channel::<u8>();
        drop(tx);

        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn post_after_receiver_dropped() {
        let (tx, rx) = channel();
        drop(rx);

        assert!(tx.is_closed());
        assert!(!tx.post("lost"));
    }
}
