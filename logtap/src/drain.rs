//! The drain worker (C5): a single-reader loop that batches queued entries
//! and hands each to the writer.
//!
//! Runs on whatever cooperative task the host's background-service runner
//! spawns it onto (see [`crate::lifecycle::LifecycleController::start`]).
//! Batch processing is serialized by a single-permit semaphore so a manual
//! [`DrainWorker::flush`] can never interleave with the steady-state drain
//! loop started by [`DrainWorker::run`].
use crate::config::Config;
use crate::queue::BackgroundQueue;
use crate::router::SinkRouter;
use crate::template::TemplateEngine;
use crate::writer::LogEntryWriter;
use logtap_core::LogEntry;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tokio::time::sleep;

/// The cooperative shutdown signal [`crate::lifecycle::LifecycleController`]
/// holds; the drain task observes it between batches and, within a batch,
/// stops starting new entries once it has fired (already-dequeued entries
/// in the current batch are still processed to completion).
#[derive(Clone, Default, Debug)]
pub struct CancellationToken {
    notify: Arc<Notify>,
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Resolves immediately if already cancelled, otherwise suspends until
    /// [`CancellationToken::cancel`] is called.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Runs the formatting + routing chain (C8 + C9) for entries dequeued from
/// the background queue (C4).
pub struct DrainWorker {
    queue: Arc<BackgroundQueue>,
    writer: Arc<LogEntryWriter>,
    engine: Arc<TemplateEngine>,
    config: Arc<Config>,
    router: Arc<SinkRouter>,
    batch_permit: Semaphore,
}

impl std::fmt::Debug for DrainWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrainWorker").finish_non_exhaustive()
    }
}

impl DrainWorker {
    pub fn new(
        queue: Arc<BackgroundQueue>,
        writer: Arc<LogEntryWriter>,
        engine: Arc<TemplateEngine>,
        config: Arc<Config>,
        router: Arc<SinkRouter>,
    ) -> Self {
        DrainWorker {
            queue,
            writer,
            engine,
            config,
            router,
            batch_permit: Semaphore::new(1),
        }
    }

    /// The steady-state drain loop: reads batches of up to `MaxBatchSize`
    /// entries or the batch timeout, whichever comes first, until
    /// `cancel` fires. On cancellation, performs the synchronous final
    /// flush (draining the queue to empty) before returning.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.drain_one_batch(&cancel) => {}
            }
        }
        self.flush_to_empty();
    }

    async fn drain_one_batch(&self, cancel: &CancellationToken) {
        let _permit = self
            .batch_permit
            .acquire()
            .await
            .expect("logtap: batch permit semaphore is never closed");

        tokio::select! {
            _ = self.queue.wait_ready() => {}
            _ = sleep(self.config.batch_timeout) => {}
            _ = cancel.cancelled() => return,
        }

        let mut batch = Vec::with_capacity(self.config.max_batch_size.min(256));
        while batch.len() < self.config.max_batch_size {
            match self.queue.try_dequeue() {
                Some(entry) => batch.push(entry),
                None => break,
            }
        }
        for entry in batch {
            self.process_one(&entry);
        }
    }

    /// Runs the writer for one entry, catching a panicking sink so that one
    /// bad entry logs a warning and does not take down the rest of the
    /// batch.
    fn process_one(&self, entry: &LogEntry) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.writer.write(entry, &self.engine, &self.config, &self.router);
        }));
        if outcome.is_err() {
            log::warn!(
                "logtap: sink emit panicked for {}.{} (id {}); continuing with next entry",
                entry.type_name,
                entry.method_name,
                entry.id
            );
        }
    }

    /// A manual flush: serialized against the steady drain by the same
    /// single permit, so it never races a concurrently running batch.
    /// Idempotent: a flush with nothing queued is a no-op.
    pub async fn flush(&self) {
        let _permit = self
            .batch_permit
            .acquire()
            .await
            .expect("logtap: batch permit semaphore is never closed");
        self.flush_to_empty();
    }

    /// Drains the queue to empty without acquiring the batch permit, for use
    /// from the best-effort, possibly non-async, process-exit hook. Not
    /// safe to call concurrently with [`DrainWorker::run`] or
    /// [`DrainWorker::flush`]; the process-exit path only runs this after
    /// those have had their chance during graceful shutdown.
    pub fn flush_blocking(&self) {
        self.flush_to_empty();
    }

    fn flush_to_empty(&self) {
        while let Some(entry) = self.queue.try_dequeue() {
            self.process_one(&entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::formatter::FormatterRegistry;
    use logtap_core::{Level, Sink};
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct RecordingSink {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Sink for RecordingSink {
        fn emit(&self, _category: &str, _level: Level, rendered_message: &str, _payload: Option<&serde_json::Value>) {
            self.seen.lock().push(rendered_message.to_string());
        }
    }

    fn entry(name: &str) -> LogEntry {
        LogEntry::start(name, "Payments", None, Level::Information, Level::Error, None, None, None, vec![])
            .complete_success(std::time::Duration::from_millis(1), None)
    }

    fn worker_with(seen: Arc<Mutex<Vec<String>>>) -> (Arc<BackgroundQueue>, DrainWorker) {
        let queue = Arc::new(BackgroundQueue::new(16));
        let mut router = SinkRouter::new("Console");
        router.register("Console", Box::new(RecordingSink { seen }));
        let worker = DrainWorker::new(
            queue.clone(),
            Arc::new(LogEntryWriter::new(FormatterRegistry::new())),
            Arc::new(TemplateEngine::new()),
            Arc::new(Config::default()),
            Arc::new(router),
        );
        (queue, worker)
    }

    #[tokio::test]
    async fn flush_processes_every_queued_entry() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (queue, worker) = worker_with(seen.clone());
        for name in ["a", "b", "c"] {
            queue.try_enqueue(entry(name));
        }
        worker.flush().await;
        assert_eq!(seen.lock().len(), 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn second_flush_is_a_no_op() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (queue, worker) = worker_with(seen.clone());
        queue.try_enqueue(entry("a"));
        worker.flush().await;
        worker.flush().await;
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn run_drains_until_cancelled_then_flushes_remainder() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (queue, worker) = worker_with(seen.clone());
        let worker = Arc::new(worker);
        let cancel = CancellationToken::new();

        let run_worker = worker.clone();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { run_worker.run(run_cancel).await });

        queue.try_enqueue(entry("a"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        queue.try_enqueue(entry("b"));
        cancel.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("run should return promptly after cancellation")
            .unwrap();

        assert_eq!(seen.lock().len(), 2);
    }
}
