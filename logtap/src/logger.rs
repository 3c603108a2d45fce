//! The manual logger facade (C10): a programmatic API to emit an entry
//! directly, bypassing the decision cache and interceptor, and to open or
//! close a correlation span.
use crate::queue::BackgroundQueue;
use logtap_core::{ActivityId, ActivitySource, LogEntry};
use std::sync::Arc;

/// An open correlation span. Entries created while the handle is alive carry
/// its [`ActivityId`]; dropping the handle closes the span.
pub struct ActivityHandle {
    id: ActivityId,
    source: Arc<dyn ActivitySource>,
}

impl ActivityHandle {
    pub fn id(&self) -> ActivityId {
        self.id
    }
}

impl Drop for ActivityHandle {
    fn drop(&mut self) {
        self.source.end(self.id);
    }
}

impl std::fmt::Debug for ActivityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityHandle").field("id", &self.id).finish()
    }
}

/// Programmatic entry point for code that wants to log without going
/// through method interception: `log` enqueues a caller-built
/// [`LogEntry`] directly, and `start_activity` opens a span on the host's
/// [`ActivitySource`].
#[derive(Clone)]
pub struct ManualLogger {
    queue: Arc<BackgroundQueue>,
    activity_source: Option<Arc<dyn ActivitySource>>,
}

impl std::fmt::Debug for ManualLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualLogger").finish_non_exhaustive()
    }
}

impl ManualLogger {
    pub fn new(queue: Arc<BackgroundQueue>, activity_source: Option<Arc<dyn ActivitySource>>) -> Self {
        ManualLogger { queue, activity_source }
    }

    /// Enqueues a user-constructed entry. Emits one internal warning if the
    /// queue has been closed (the only condition under which enqueue fails);
    /// a drop-oldest eviction under sustained overload is silent, same as
    /// for intercepted calls.
    pub fn log(&self, entry: LogEntry) {
        if !self.queue.try_enqueue(entry) {
            log::warn!("logtap: background queue is closed; manually logged entry dropped");
        }
    }

    /// Opens a correlation span named `name` on the host's activity source,
    /// sampled through whichever source the host registered. Returns `None`
    /// if no source was registered; callers that don't care about
    /// correlation can ignore the result.
    pub fn start_activity(&self, name: &str) -> Option<ActivityHandle> {
        let source = self.activity_source.clone()?;
        let id = source.start(name);
        Some(ActivityHandle { id, source })
    }

    /// The id of the span currently open on the calling thread, if any.
    pub fn current_activity(&self) -> Option<ActivityId> {
        self.activity_source.as_ref().and_then(|source| source.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtap_core::Level;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeActivitySource {
        open: Mutex<Vec<ActivityId>>,
    }

    impl ActivitySource for FakeActivitySource {
        fn start(&self, _name: &str) -> ActivityId {
            let id = ActivityId::generate();
            self.open.lock().push(id);
            id
        }
        fn end(&self, id: ActivityId) {
            self.open.lock().retain(|existing| *existing != id);
        }
        fn current(&self) -> Option<ActivityId> {
            self.open.lock().last().copied()
        }
    }

    fn sample_entry() -> LogEntry {
        LogEntry::start("Charge", "Payments", None, Level::Information, Level::Error, None, None, None, vec![])
            .complete_success(std::time::Duration::from_millis(1), None)
    }

    #[test]
    fn log_enqueues_entry_directly() {
        let queue = Arc::new(BackgroundQueue::new(4));
        let logger = ManualLogger::new(queue.clone(), None);
        logger.log(sample_entry());
        assert!(queue.try_dequeue().is_some());
    }

    #[test]
    fn closed_queue_drops_manual_entry_without_panicking() {
        let queue = Arc::new(BackgroundQueue::new(4));
        queue.close();
        let logger = ManualLogger::new(queue, None);
        logger.log(sample_entry());
    }

    #[test]
    fn no_activity_source_returns_none() {
        let queue = Arc::new(BackgroundQueue::new(4));
        let logger = ManualLogger::new(queue, None);
        assert!(logger.start_activity("checkout").is_none());
    }
}
