//! The lifecycle controller (C11): startup precompilation, graceful-shutdown
//! flush, and a best-effort process-exit hook.
//!
//! [`Logtap`] bundles the pipeline singletons the specification's design
//! notes call out as "process-wide by construction" (decision cache,
//! template cache, sink registry, background queue) behind one handle.
//! Installing it via [`install_global`] mirrors the global-default-dispatch
//! pattern `tracing-core` uses for the same reason: generated call sites
//! (what `logtap-attributes` expands an interception attribute into) need a
//! process-wide handle to reach without threading one through every
//! function signature.
use crate::config::Config;
use crate::decision::DecisionCache;
use crate::drain::{CancellationToken, DrainWorker};
use crate::formatter::FormatterRegistry;
use crate::interceptor::Interceptor;
use crate::logger::ManualLogger;
use crate::queue::BackgroundQueue;
use crate::router::SinkRouter;
use crate::template::TemplateEngine;
use crate::writer::LogEntryWriter;
use logtap_core::{ActivitySource, DecisionOverride, MethodDescriptor, NoopRedactor, Redactor, Sink, StdoutSink};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

lazy_static::lazy_static! {
    static ref GLOBAL: parking_lot::RwLock<Option<Arc<Logtap>>> = parking_lot::RwLock::new(None);
}

/// Installs `logtap` as the process-wide default instance. The specification
/// treats the decision cache and friends as singletons populated once; a
/// second call replaces the previous handle outright rather than mutating it
/// in place, the "atomic swap of the entire cache" shape its open question
/// on live reload recommends, never a per-entry mutation.
pub fn install_global(instance: Arc<Logtap>) {
    *GLOBAL.write() = Some(instance);
}

/// The installed global instance, if [`install_global`] has run.
pub fn try_global() -> Option<Arc<Logtap>> {
    GLOBAL.read().clone()
}

/// Like [`try_global`], panicking if nothing has been installed yet. Code
/// generated by `#[logtap::log_both]` and friends calls this; reaching an
/// interception call site before [`LifecycleController::start`] has run is a
/// host wiring bug, not a recoverable runtime condition.
pub fn global() -> Arc<Logtap> {
    try_global().expect("logtap: no global instance installed; call LifecycleController::start first")
}

/// Clears the installed global instance, if any. Exposed for test isolation;
/// production shutdown goes through [`LifecycleController::shutdown`]
/// instead, which leaves the instance installed (just stopped) so any
/// in-flight manual logging calls don't panic mid-teardown.
pub fn clear_global() {
    *GLOBAL.write() = None;
}

/// Bundles the pipeline singletons behind one handle: the decision cache
/// (C1), background queue (C4), template engine (C7), sink router (C9), and
/// the facades built on top of them (the interceptor, C3, and the manual
/// logger, C10).
pub struct Logtap {
    decisions: Arc<DecisionCache>,
    queue: Arc<BackgroundQueue>,
    engine: Arc<TemplateEngine>,
    router: Arc<SinkRouter>,
    writer: Arc<LogEntryWriter>,
    config: Arc<Config>,
    interceptor: Interceptor,
    logger: ManualLogger,
}

impl std::fmt::Debug for Logtap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logtap").finish_non_exhaustive()
    }
}

impl Logtap {
    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    pub fn logger(&self) -> &ManualLogger {
        &self.logger
    }

    pub fn decisions(&self) -> &DecisionCache {
        &self.decisions
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &BackgroundQueue {
        &self.queue
    }

    pub fn router(&self) -> &SinkRouter {
        &self.router
    }
}

/// Assembles a [`Logtap`] instance: the host registers sinks, a redactor, an
/// activity source, and candidate methods (the tier-1 attribute overrides a
/// build-time scan or derive macro discovered), then calls
/// [`LogtapBuilder::build`]. The resulting instance does no background work
/// until [`LifecycleController::start`] spawns the drain worker.
pub struct LogtapBuilder {
    config: Config,
    redactor: Arc<dyn Redactor>,
    activity_source: Option<Arc<dyn ActivitySource>>,
    sinks: Vec<(String, Box<dyn Sink>)>,
    candidates: Vec<(MethodDescriptor, DecisionOverride)>,
}

impl std::fmt::Debug for LogtapBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogtapBuilder").finish_non_exhaustive()
    }
}

impl LogtapBuilder {
    pub fn new(config: Config) -> Self {
        LogtapBuilder {
            config,
            redactor: Arc::new(NoopRedactor),
            activity_source: None,
            sinks: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn activity_source(mut self, source: Arc<dyn ActivitySource>) -> Self {
        self.activity_source = Some(source);
        self
    }

    pub fn sink(mut self, name: impl Into<String>, sink: Box<dyn Sink>) -> Self {
        self.sinks.push((name.into(), sink));
        self
    }

    /// Registers one candidate method with its tier-1 attribute override
    /// (or [`DecisionOverride::None`] if the method carries no attribute),
    /// so its decision is precomputed during [`LogtapBuilder::build`] rather
    /// than on first touch.
    pub fn candidate(mut self, descriptor: MethodDescriptor, attribute: DecisionOverride) -> Self {
        self.candidates.push((descriptor, attribute));
        self
    }

    /// Builds the instance and registers every candidate method against the
    /// decision cache. If the host registered no sink for the configured
    /// default target, a [`StdoutSink`] is installed there so a
    /// zero-configuration setup still has somewhere to write.
    pub fn build(self) -> Arc<Logtap> {
        let config = Arc::new(self.config);
        let decisions = Arc::new(DecisionCache::new(config.clone()));
        for (descriptor, attribute) in self.candidates {
            decisions.register(&descriptor, attribute);
        }

        let queue = Arc::new(BackgroundQueue::new(config.queue_capacity));
        let engine = Arc::new(TemplateEngine::new());

        let mut router = SinkRouter::new(config.default_target.clone());
        let mut has_default = false;
        for (name, sink) in self.sinks {
            if name == config.default_target {
                has_default = true;
            }
            router.register(name, sink);
        }
        if !has_default {
            router.register(config.default_target.clone(), Box::new(StdoutSink));
        }
        let router = Arc::new(router);

        let writer = Arc::new(LogEntryWriter::new(FormatterRegistry::new()));

        let interceptor = Interceptor::new(decisions.clone(), queue.clone(), self.redactor, self.activity_source.clone());
        let logger = ManualLogger::new(queue.clone(), self.activity_source);

        Arc::new(Logtap {
            decisions,
            queue,
            engine,
            router,
            writer,
            config,
            interceptor,
            logger,
        })
    }
}

/// Owns the background drain task and its shutdown handshake, tying
/// together a [`Logtap`] instance's queue, writer, and router with the
/// cancellation token and deadline that govern teardown.
pub struct LifecycleController {
    logtap: Arc<Logtap>,
    drain: Arc<DrainWorker>,
    cancel: CancellationToken,
    task: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
    shutdown_deadline: Duration,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController").finish_non_exhaustive()
    }
}

impl LifecycleController {
    pub fn new(logtap: Arc<Logtap>) -> Self {
        let drain = Arc::new(DrainWorker::new(
            logtap.queue.clone(),
            logtap.writer.clone(),
            logtap.engine.clone(),
            logtap.config.clone(),
            logtap.router.clone(),
        ));
        LifecycleController {
            logtap,
            drain,
            cancel: CancellationToken::new(),
            task: parking_lot::Mutex::new(None),
            shutdown_deadline: Duration::from_secs(5),
        }
    }

    pub fn shutdown_deadline(mut self, deadline: Duration) -> Self {
        self.shutdown_deadline = deadline;
        self
    }

    /// Startup: precompiles every template named by configuration plus the
    /// built-in set, installs this instance as the process-wide global
    /// ([`global`] / `#[logtap::log_both]`-generated call sites depend on
    /// it), and spawns the drain worker onto the ambient Tokio runtime,
    /// the stand-in for "the host's background-service runner" the
    /// specification names as an external collaborator.
    pub fn start(self: Arc<Self>) -> Arc<Self> {
        self.logtap
            .engine
            .precompile(self.logtap.config.referenced_templates().iter().map(String::as_str));
        install_global(self.logtap.clone());

        let drain = self.drain.clone();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move { drain.run(cancel).await });
        *self.task.lock() = Some(handle);
        self
    }

    /// Graceful shutdown: cancels the drain task, waits up to
    /// `shutdown_deadline` for it to finish processing what it already
    /// dequeued, then performs a synchronous final flush regardless of
    /// whether the task returned in time. Idempotent: a second call finds
    /// nothing left to drain.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.logtap.queue.close();
        if let Some(handle) = self.task.lock().take() {
            if tokio::time::timeout(self.shutdown_deadline, handle).await.is_err() {
                log::warn!("logtap: drain task did not finish within the shutdown deadline; flushing directly");
            }
        }
        self.drain.flush().await;
    }

    /// A best-effort safety net for abrupt process termination: runs the
    /// synchronous flush directly (no `.await`, so it's callable from a
    /// `std::process`-level exit hook), swallowing any panic rather than
    /// letting teardown abort the process a second time. Prefer an explicit
    /// [`LifecycleController::shutdown`] call from the host's own lifecycle
    /// hook; this exists only as a fallback per the specification's design
    /// notes on process-exit hooks.
    pub fn flush_on_exit(&self) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.drain.flush_blocking()));
        if outcome.is_err() {
            log::error!("logtap: process-exit flush panicked; process is already terminating");
        }
    }

    pub fn logtap(&self) -> &Arc<Logtap> {
        &self.logtap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtap_core::{Behavior, Level};

    fn builder() -> LogtapBuilder {
        let mut config = Config::default();
        config.auto_intercept = true;
        config.batch_timeout = Duration::from_millis(20);
        LogtapBuilder::new(config)
    }

    #[tokio::test]
    async fn start_installs_global_and_precompiles_builtins() {
        let instance = builder().build();
        let controller = Arc::new(LifecycleController::new(instance)).start();
        assert!(controller.logtap().engine.len() >= crate::template::engine::BUILTIN_TEMPLATES.len());
        assert!(try_global().is_some());
        controller.shutdown().await;
        clear_global();
    }

    #[tokio::test]
    async fn shutdown_flushes_remaining_entries() {
        let instance = builder().build();
        let descriptor = MethodDescriptor::new("Payments", "Charge", vec![]);
        instance.decisions().register(&descriptor, DecisionOverride::None);
        let controller = Arc::new(LifecycleController::new(instance.clone())).start();

        let entry = logtap_core::LogEntry::start(
            "Charge",
            "Payments",
            None,
            Level::Information,
            Level::Error,
            None,
            None,
            None,
            vec![],
        )
        .complete_success(std::time::Duration::from_millis(1), None);
        instance.logger().log(entry);

        controller.shutdown().await;
        assert!(instance.queue().is_empty());
        clear_global();
    }

    #[test]
    fn builder_accepts_precomputed_candidates_without_panicking() {
        let descriptor = MethodDescriptor::new("Payments", "Charge", vec![]);
        let instance = builder()
            .candidate(
                descriptor,
                DecisionOverride::LogBoth {
                    level: None,
                    error_level: None,
                    target: None,
                    formatter: None,
                },
            )
            .build();

        // A fresh registration for an unrelated candidate still resolves
        // through the normal three-tier path the builder didn't touch.
        let other = MethodDescriptor::new("Other", "Run", vec![]);
        let handle = instance.decisions().register(&other, DecisionOverride::None);
        let decision = instance.decisions().decision_for(handle).unwrap();
        assert_eq!(decision.behavior, Behavior::LogInput);
    }
}
