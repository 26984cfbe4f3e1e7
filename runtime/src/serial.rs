//! Ordered execution of effect work.
//!
//! Effects run as independent tasks, so two store calls started by
//! consecutive actions can finish in either order. A [`SerialQueue`] hands
//! out numbered [`Ticket`]s; work run through a ticket waits until every
//! earlier ticket is done. Take the ticket inside the reducer, where actions
//! are already serialized, and move it into the effect.
//!
//! A ticket that is dropped without running gives up its place, so an
//! aborted or discarded effect never blocks the ones behind it.
//!
//! # Example
//!
//! ```
//! use tasklist_runtime::serial::SerialQueue;
//!
//! # async fn example() {
//! let queue = SerialQueue::new();
//! let first = queue.ticket();
//! let second = queue.ticket();
//!
//! let later = tokio::spawn(second.run(async { "second" }));
//! assert_eq!(first.run(async { "first" }).await, "first");
//! assert_eq!(later.await.ok(), Some("second"));
//! # }
//! ```

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Which tickets are done
#[derive(Debug, Default)]
struct Turns {
    /// Lowest ticket not yet done
    next: u64,
    /// Done tickets above `next`
    finished: BTreeSet<u64>,
}

impl Turns {
    fn finish(&mut self, ticket: u64) {
        self.finished.insert(ticket);
        while self.finished.remove(&self.next) {
            self.next += 1;
        }
    }
}

#[derive(Debug)]
struct Shared {
    issued: AtomicU64,
    turns: watch::Sender<Turns>,
}

/// Hands out tickets that run in the order they were taken
#[derive(Clone, Debug)]
pub struct SerialQueue {
    shared: Arc<Shared>,
}

impl SerialQueue {
    /// Creates an empty queue
    #[must_use]
    pub fn new() -> Self {
        let (turns, _) = watch::channel(Turns::default());
        Self {
            shared: Arc::new(Shared {
                issued: AtomicU64::new(0),
                turns,
            }),
        }
    }

    /// Take the next place in line
    pub fn ticket(&self) -> Ticket {
        Ticket {
            number: self.shared.issued.fetch_add(1, Ordering::Relaxed),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Tickets taken but not yet done
    #[must_use]
    pub fn pending(&self) -> u64 {
        let turns = self.shared.turns.borrow();
        self.shared.issued.load(Ordering::Relaxed) - turns.next - turns.finished.len() as u64
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A place in a [`SerialQueue`]
#[derive(Debug)]
#[must_use = "a ticket gives up its place when dropped"]
pub struct Ticket {
    number: u64,
    shared: Arc<Shared>,
}

impl Ticket {
    /// Position in the queue, starting at 0
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// Wait for every earlier ticket, then run `work`
    ///
    /// The next ticket may start as soon as `work` completes.
    pub async fn run<F: Future>(self, work: F) -> F::Output {
        let mut turns = self.shared.turns.subscribe();
        loop {
            let ready = turns.borrow_and_update().next >= self.number;
            if ready || turns.changed().await.is_err() {
                break;
            }
        }
        tracing::trace!(ticket = self.number, "Serial turn started");
        work.await
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let number = self.number;
        self.shared.turns.send_modify(|turns| turns.finish(number));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn later_ticket_waits_for_slower_earlier_one() {
        let queue = SerialQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let slow = queue.ticket();
        let fast = queue.ticket();

        let log = Arc::clone(&order);
        let second = tokio::spawn(fast.run(async move { log.lock().unwrap().push("fast") }));
        let log = Arc::clone(&order);
        let first = tokio::spawn(slow.run(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            log.lock().unwrap().push("slow");
        }));

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["slow", "fast"]);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn dropped_ticket_gives_up_its_place() {
        let queue = SerialQueue::new();
        let skipped = queue.ticket();
        let next = queue.ticket();
        assert_eq!(next.number(), 1);
        assert_eq!(queue.pending(), 2);

        drop(skipped);
        let ran = tokio::time::timeout(Duration::from_secs(1), next.run(async { true })).await;

        assert_eq!(ran.ok(), Some(true));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn out_of_order_drops_still_advance() {
        let queue = SerialQueue::new();
        let a = queue.ticket();
        let b = queue.ticket();
        let c = queue.ticket();

        drop(b);
        assert_eq!(queue.pending(), 2);
        drop(a);

        let ran = tokio::time::timeout(Duration::from_secs(1), c.run(async { 3 })).await;
        assert_eq!(ran.ok(), Some(3));
    }
}
