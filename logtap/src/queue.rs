//! The background queue (C4): a bounded MPSC channel with drop-oldest-on-full
//! semantics and wait-free enqueue.
//!
//! Built on [`crossbeam_queue::ArrayQueue`], a lock-free bounded ring buffer,
//! plus a [`tokio::sync::Notify`] so the single consumer can sleep between
//! batches instead of spinning.
use crossbeam_queue::ArrayQueue;
use logtap_core::LogEntry;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

/// Point-in-time counters exposed through [`BackgroundQueue::diagnostics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueDiagnostics {
    pub enqueued: u64,
    pub dropped_on_full: u64,
    pub drained: u64,
}

/// The bounded, drop-oldest, single-consumer queue sitting between the
/// interceptor (C3) and the drain worker (C5).
#[derive(Debug)]
pub struct BackgroundQueue {
    ring: ArrayQueue<LogEntry>,
    ready: Notify,
    closed: AtomicBool,
    enqueued: AtomicU64,
    dropped_on_full: AtomicU64,
    drained: AtomicU64,
}

impl BackgroundQueue {
    pub fn new(capacity: usize) -> Self {
        BackgroundQueue {
            ring: ArrayQueue::new(capacity.max(1)),
            ready: Notify::new(),
            closed: AtomicBool::new(false),
            enqueued: AtomicU64::new(0),
            dropped_on_full: AtomicU64::new(0),
            drained: AtomicU64::new(0),
        }
    }

    /// Non-blocking, wait-free on the producer side. Returns `false` only
    /// once the queue has been closed; while open, an enqueue always
    /// succeeds, dropping the oldest pending entry to make room if the ring
    /// is full.
    pub fn try_enqueue(&self, entry: LogEntry) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        match self.ring.push(entry) {
            Ok(()) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
                self.ready.notify_one();
                true
            }
            Err(entry) => {
                // Full: drop the oldest pending entry, then retry once. A
                // concurrent consumer may have drained a slot between our
                // failed push and this pop, which is fine either way.
                if self.ring.pop().is_some() {
                    self.dropped_on_full.fetch_add(1, Ordering::Relaxed);
                }
                match self.ring.push(entry) {
                    Ok(()) => {
                        self.enqueued.fetch_add(1, Ordering::Relaxed);
                        self.ready.notify_one();
                        true
                    }
                    Err(_) => false,
                }
            }
        }
    }

    /// Non-blocking dequeue, used by both the steady-state drain batch loop
    /// and the synchronous shutdown flush.
    pub fn try_dequeue(&self) -> Option<LogEntry> {
        let entry = self.ring.pop();
        if entry.is_some() {
            self.drained.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    /// Suspends until an entry is enqueued or the queue is closed. The
    /// caller must still re-check with [`BackgroundQueue::try_dequeue`],
    /// since a woken consumer may race another and find nothing.
    pub async fn wait_ready(&self) {
        if !self.ring.is_empty() || self.closed.load(Ordering::Acquire) {
            return;
        }
        self.ready.notified().await;
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn diagnostics(&self) -> QueueDiagnostics {
        QueueDiagnostics {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped_on_full: self.dropped_on_full.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtap_core::Level;

    fn entry(name: &str) -> LogEntry {
        LogEntry::start(name, "T", None, Level::Information, Level::Error, None, None, None, vec![])
    }

    #[test]
    fn enqueue_drains_in_fifo_order() {
        let queue = BackgroundQueue::new(8);
        for name in ["a", "b", "c"] {
            assert!(queue.try_enqueue(entry(name)));
        }
        let drained: Vec<_> = std::iter::from_fn(|| queue.try_dequeue())
            .map(|e| e.method_name)
            .collect();
        assert_eq!(drained, vec!["a", "b", "c"]);
    }

    #[test]
    fn overload_drops_oldest_and_keeps_newest_n() {
        let queue = BackgroundQueue::new(4);
        for name in ["A", "B", "C", "D", "E"] {
            assert!(queue.try_enqueue(entry(name)));
        }
        assert_eq!(queue.diagnostics().dropped_on_full, 1);
        let drained: Vec<_> = std::iter::from_fn(|| queue.try_dequeue())
            .map(|e| e.method_name)
            .collect();
        assert_eq!(drained, vec!["B", "C", "D", "E"]);
    }

    #[test]
    fn closed_queue_rejects_enqueue() {
        let queue = BackgroundQueue::new(4);
        queue.close();
        assert!(!queue.try_enqueue(entry("a")));
    }

    #[tokio::test]
    async fn wait_ready_returns_once_entry_is_enqueued() {
        let queue = std::sync::Arc::new(BackgroundQueue::new(4));
        let waiter = queue.clone();
        let handle = tokio::spawn(async move {
            waiter.wait_ready().await;
        });
        queue.try_enqueue(entry("a"));
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("wait_ready should return promptly")
            .unwrap();
    }
}
