//! [`LogEntry`], the immutable value carried from the interceptor through the
//! background pipeline to a sink.
use crate::id::{ActivityId, EntryId};
use crate::level::Level;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A JSON-shaped value. Parameter and return values are stored in this form
/// once they have passed through the [`crate::redact::Redactor`], so that the
/// JSON formatter and the `json` template format specifier can destructure
/// them without a second conversion step.
pub type LogValue = serde_json::Value;

/// A single redacted input argument captured on a start entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Param {
    pub name: String,
    pub type_name: String,
    pub value: LogValue,
}

impl Param {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, value: LogValue) -> Self {
        Param {
            name: name.into(),
            type_name: type_name.into(),
            value,
        }
    }

    /// The fallback name used when the host can't supply a parameter name,
    /// per the `arg{index}` rule in the interceptor's parameter structuring
    /// contract.
    pub fn fallback_name(index: usize) -> String {
        format!("arg{}", index)
    }
}

/// Exception metadata captured on a failed completion entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExceptionInfo {
    pub kind_name: String,
    pub message: String,
    pub stack_snapshot: Option<String>,
    /// The kind name of the innermost cause, if the exception wraps another.
    pub base_cause_kind_name: Option<String>,
}

/// The tri-state completion status of an entry.
///
/// Once an entry leaves [`Outcome::Pending`] it never returns to it; the
/// writer (C8) never observes a `Pending` entry, since the interceptor only
/// enqueues an entry after calling [`LogEntry::complete_success`] or
/// [`LogEntry::complete_failure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Outcome {
    Pending,
    Success,
    Failure,
}

/// An immutable record of one method invocation: its identity, timing,
/// captured input/output, and routing hints.
#[derive(Clone, Debug, serde::Serialize)]
pub struct LogEntry {
    pub id: EntryId,
    pub method_name: String,
    pub type_name: String,
    pub activity_id: Option<ActivityId>,
    pub thread_id: u64,
    pub timestamp_start: DateTime<Utc>,
    duration: Option<Duration>,
    pub success: Outcome,
    pub input_parameters: Vec<Param>,
    pub output_value: Option<LogValue>,
    pub exception: Option<ExceptionInfo>,
    pub level: Level,
    pub error_level: Level,
    pub target: Option<String>,
    pub formatter: Option<String>,
    pub template_hint: Option<String>,
}

impl serde::Serialize for ActivityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl LogEntry {
    /// Builds the start entry: the record created before `proceed()` runs.
    /// `success` begins `Pending` and the entry is not yet fit to enqueue.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        method_name: impl Into<String>,
        type_name: impl Into<String>,
        activity_id: Option<ActivityId>,
        level: Level,
        error_level: Level,
        target: Option<String>,
        formatter: Option<String>,
        template_hint: Option<String>,
        input_parameters: Vec<Param>,
    ) -> Self {
        LogEntry {
            id: EntryId::generate(),
            method_name: method_name.into(),
            type_name: type_name.into(),
            activity_id,
            thread_id: crate::id::current_thread_id(),
            timestamp_start: Utc::now(),
            duration: None,
            success: Outcome::Pending,
            input_parameters,
            output_value: None,
            exception: None,
            level,
            error_level,
            target,
            formatter,
            template_hint,
        }
    }

    /// Finalizes the entry for a successful completion. `output` is `None`
    /// when the method returns nothing, or when the decision did not require
    /// capturing output.
    pub fn complete_success(mut self, duration: Duration, output: Option<LogValue>) -> Self {
        debug_assert_eq!(self.success, Outcome::Pending, "entry completed twice");
        self.duration = Some(duration);
        self.success = Outcome::Success;
        self.output_value = output;
        self
    }

    /// Finalizes the entry for a failed completion.
    pub fn complete_failure(mut self, duration: Duration, exception: ExceptionInfo) -> Self {
        debug_assert_eq!(self.success, Outcome::Pending, "entry completed twice");
        self.duration = Some(duration);
        self.success = Outcome::Failure;
        self.exception = Some(exception);
        self
    }

    /// Elapsed ticks (nanoseconds) between the start entry and completion.
    /// `0` until the entry completes.
    pub fn duration_ticks(&self) -> u128 {
        self.duration.map(|d| d.as_nanos()).unwrap_or(0)
    }

    /// The elapsed duration, if the entry has completed.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Duration in fractional milliseconds, the unit the `N2` format
    /// specifier renders.
    pub fn duration_millis(&self) -> f64 {
        self.duration.map(|d| d.as_secs_f64() * 1000.0).unwrap_or(0.0)
    }

    /// `true` once the entry has been completed (successfully or not) and is
    /// therefore fit to hand to the writer.
    pub fn is_complete(&self) -> bool {
        self.success != Outcome::Pending
    }

    /// The severity a sink should log this entry at: `error_level` once the
    /// entry has failed, `level` otherwise.
    pub fn effective_level(&self) -> Level {
        match self.success {
            Outcome::Failure => self.error_level,
            _ => self.level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogEntry {
        LogEntry::start(
            "Charge",
            "Payments",
            None,
            Level::Information,
            Level::Error,
            None,
            None,
            None,
            vec![Param::new("amount", "i64", LogValue::from(10))],
        )
    }

    #[test]
    fn start_entry_is_pending() {
        let entry = sample();
        assert_eq!(entry.success, Outcome::Pending);
        assert_eq!(entry.duration_ticks(), 0);
    }

    #[test]
    fn success_completion_sets_output_and_duration() {
        let entry = sample().complete_success(Duration::from_millis(5), Some(LogValue::from(true)));
        assert_eq!(entry.success, Outcome::Success);
        assert!(entry.duration_ticks() > 0);
        assert_eq!(entry.output_value, Some(LogValue::from(true)));
        assert!(entry.exception.is_none());
    }

    #[test]
    fn failure_completion_sets_exception() {
        let exc = ExceptionInfo {
            kind_name: "ValidationError".into(),
            message: "bad amount".into(),
            stack_snapshot: None,
            base_cause_kind_name: None,
        };
        let entry = sample().complete_failure(Duration::from_millis(1), exc.clone());
        assert_eq!(entry.success, Outcome::Failure);
        assert_eq!(entry.exception, Some(exc));
        assert!(entry.output_value.is_none());
    }

    #[test]
    fn effective_level_switches_to_error_level_on_failure() {
        let exc = ExceptionInfo {
            kind_name: "ValidationError".into(),
            message: "bad amount".into(),
            stack_snapshot: None,
            base_cause_kind_name: None,
        };
        let entry = sample().complete_failure(Duration::from_millis(1), exc);
        assert_eq!(entry.effective_level(), Level::Error);
    }

    #[test]
    fn empty_input_parameters_stay_empty_not_missing() {
        let entry = LogEntry::start(
            "GetUser",
            "App.Hot.Reader",
            None,
            Level::Information,
            Level::Error,
            None,
            None,
            None,
            vec![],
        );
        assert!(entry.input_parameters.is_empty());
    }
}
