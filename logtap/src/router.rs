//! The sink router (C9): maps a target name to a sink capability and
//! dispatches a rendered entry to it.
//!
//! The source routes by broadcasting to every sink under a category equal to
//! the target name and relying on per-category severity filters so only the
//! addressed sink actually writes. Since this crate calls sinks directly
//! rather than through a shared broadcast logger, the router instead just
//! looks up the one resolved sink and calls it. The filter dance was a
//! workaround for the host's logging framework, not a requirement this
//! crate's [`logtap_core::Sink`] trait needs to preserve.
use logtap_core::{Level, Sink};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Built at startup from `Targets.<name>.*` configuration plus whatever sink
/// capabilities the host constructed for them; read-only after that, so
/// lookups need no lock beyond the `HashMap`'s own borrow.
#[derive(Default)]
pub struct SinkRouter {
    sinks: HashMap<String, Box<dyn Sink>>,
    default_target: String,
    sink_miss: AtomicU64,
}

impl fmt::Debug for SinkRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRouter")
            .field("targets", &self.sinks.keys().collect::<Vec<_>>())
            .field("default_target", &self.default_target)
            .field("sink_miss", &self.sink_miss.load(Ordering::Relaxed))
            .finish()
    }
}

impl SinkRouter {
    pub fn new(default_target: impl Into<String>) -> Self {
        SinkRouter {
            sinks: HashMap::new(),
            default_target: default_target.into(),
            sink_miss: AtomicU64::new(0),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, sink: Box<dyn Sink>) {
        self.sinks.insert(name.into(), sink);
    }

    /// Resolves `target` (an entry's override, or `None` to mean "use the
    /// default") and emits the rendered message there. Falls back to the
    /// default sink and records a `sink_miss` when the named sink has no
    /// registered capability.
    pub fn emit(
        &self,
        target: Option<&str>,
        level: Level,
        rendered_message: &str,
        structured_payload: Option<&serde_json::Value>,
    ) {
        let requested = target.unwrap_or(&self.default_target);
        if let Some(sink) = self.sinks.get(requested) {
            sink.emit(requested, level, rendered_message, structured_payload);
            return;
        }
        self.sink_miss.fetch_add(1, Ordering::Relaxed);
        if let Some(sink) = self.sinks.get(&self.default_target) {
            sink.emit(&self.default_target, level, rendered_message, structured_payload);
        }
    }

    pub fn sink_miss_count(&self) -> u64 {
        self.sink_miss.load(Ordering::Relaxed)
    }

    pub fn has_target(&self, name: &str) -> bool {
        self.sinks.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct RecordingSink {
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Sink for RecordingSink {
        fn emit(&self, category: &str, _level: Level, rendered_message: &str, _payload: Option<&serde_json::Value>) {
            self.calls.lock().push((category.to_string(), rendered_message.to_string()));
        }
    }

    #[test]
    fn routes_to_named_target() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut router = SinkRouter::new("Console");
        router.register("File", Box::new(RecordingSink { calls: calls.clone() }));
        router.register("Console", Box::new(RecordingSink { calls: calls.clone() }));
        router.emit(Some("File"), Level::Information, "hello", None);
        assert_eq!(calls.lock().as_slice(), &[("File".to_string(), "hello".to_string())]);
    }

    #[test]
    fn unknown_target_falls_back_to_default_and_counts_miss() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut router = SinkRouter::new("Console");
        router.register("Console", Box::new(RecordingSink { calls: calls.clone() }));
        router.emit(Some("Nonexistent"), Level::Information, "hello", None);
        assert_eq!(router.sink_miss_count(), 1);
        assert_eq!(calls.lock().as_slice(), &[("Console".to_string(), "hello".to_string())]);
    }

    #[test]
    fn no_target_uses_default() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut router = SinkRouter::new("Console");
        router.register("Console", Box::new(RecordingSink { calls: calls.clone() }));
        router.emit(None, Level::Information, "hello", None);
        assert_eq!(router.sink_miss_count(), 0);
        assert_eq!(calls.lock().len(), 1);
    }
}
