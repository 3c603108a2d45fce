//! Exercises the attribute macros end to end: build a `Logtap` instance with
//! a capturing sink, call attribute-decorated methods, and assert on what
//! made it through the background drain.
use logtap::{Config, LifecycleController, LogtapBuilder, Sink};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Proc-macro expansions reach the process-wide global through
// `logtap::global()`. Serialize every test in this file so installing one
// instance doesn't race another test's.
static GLOBAL_GUARD: Mutex<()> = Mutex::new(());

#[derive(Default, Clone)]
struct CapturingSink {
    entries: Arc<Mutex<Vec<(String, logtap::Level, String)>>>,
}

impl Sink for CapturingSink {
    fn emit(
        &self,
        category: &str,
        level: logtap::Level,
        rendered_message: &str,
        _structured_payload: Option<&serde_json::Value>,
    ) {
        self.entries
            .lock()
            .unwrap()
            .push((category.to_string(), level, rendered_message.to_string()));
    }
}

#[derive(Debug, Serialize)]
struct Receipt {
    id: u32,
}

#[derive(Debug)]
struct PaymentError(String);

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment failed: {}", self.0)
    }
}

impl std::error::Error for PaymentError {}

struct PaymentService;

impl PaymentService {
    #[logtap::log_both(type_name = "PaymentService")]
    fn charge(&self, amount: u64) -> Result<Receipt, PaymentError> {
        if amount == 0 {
            return Err(PaymentError("zero amount".to_string()));
        }
        Ok(Receipt { id: amount as u32 })
    }

    #[logtap::log_input(type_name = "PaymentService", target = "audit")]
    fn record_note(&self, note: String) -> String {
        format!("recorded: {}", note)
    }

    #[logtap::no_log(type_name = "PaymentService")]
    fn internal_helper(&self, x: u64) -> u64 {
        x + 1
    }
}

async fn start_with_sink() -> (Arc<LifecycleController>, CapturingSink) {
    let sink = CapturingSink::default();
    let mut config = Config::default();
    config.auto_intercept = false;
    config.batch_timeout = Duration::from_millis(10);
    let default_target = config.default_target.clone();

    let instance = LogtapBuilder::new(config)
        .sink(default_target, Box::new(sink.clone()))
        .sink("audit", Box::new(sink.clone()))
        .build();
    let controller = Arc::new(LifecycleController::new(instance)).start();
    (controller, sink)
}

#[tokio::test]
async fn log_both_captures_success_and_failure() {
    let _guard = GLOBAL_GUARD.lock().unwrap();
    let (controller, sink) = start_with_sink().await;

    let service = PaymentService;
    assert_eq!(service.charge(10).unwrap().id, 10);
    assert!(service.charge(0).is_err());

    controller.shutdown().await;
    logtap::clear_global();

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].2.contains("charge"));
    assert!(entries[1].2.contains("charge"));
}

#[tokio::test]
async fn log_input_routes_to_its_configured_target() {
    let _guard = GLOBAL_GUARD.lock().unwrap();
    let (controller, sink) = start_with_sink().await;

    let service = PaymentService;
    assert_eq!(service.record_note("hello".to_string()), "recorded: hello");

    controller.shutdown().await;
    logtap::clear_global();

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "audit");
    assert!(entries[0].2.contains("record_note"));
}

#[tokio::test]
async fn no_log_never_reaches_a_sink() {
    let _guard = GLOBAL_GUARD.lock().unwrap();
    let (controller, sink) = start_with_sink().await;

    let service = PaymentService;
    assert_eq!(service.internal_helper(41), 42);

    controller.shutdown().await;
    logtap::clear_global();

    assert!(sink.entries.lock().unwrap().is_empty());
}
