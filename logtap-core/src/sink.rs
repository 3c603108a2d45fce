//! The sink contract consumed by the router (C9); concrete drivers (console,
//! file, syslog, cloud telemetry) are external collaborators out of scope for
//! this crate.
use crate::level::Level;

/// A named destination that accepts rendered messages.
///
/// Sinks are not required to be thread-safe: the drain worker is the only
/// caller, from a single cooperative task, so implementations may use
/// interior mutability without synchronization if convenient.
pub trait Sink: Send {
    /// Emits one rendered message under `category` (the routed sink name)
    /// at `level`, with an optional structured payload alongside the
    /// rendered text (e.g. for sinks that also forward JSON to a search
    /// index).
    ///
    /// Implementations should be idempotent with respect to duplicate
    /// `category` filtering performed upstream by the router: being asked to
    /// emit under a category that isn't "this sink's own" name should never
    /// happen once the router is wired correctly, but a defensive
    /// implementation may simply ignore such calls.
    fn emit(
        &self,
        category: &str,
        level: Level,
        rendered_message: &str,
        structured_payload: Option<&serde_json::Value>,
    );
}

/// A [`Sink`] used by tests and as a last-resort default: writes to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn emit(
        &self,
        category: &str,
        level: Level,
        rendered_message: &str,
        _structured_payload: Option<&serde_json::Value>,
    ) {
        println!("[{}] {} {}", category, level, rendered_message);
    }
}
