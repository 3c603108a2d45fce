//! The redaction contract consulted before a value enters an entry.
//!
//! This crate does not define redaction policy; a host application supplies
//! a [`Redactor`] implementation and registers it with the interceptor.
use crate::descriptor::ParameterDescriptor;
use crate::entry::LogValue;

/// Masks sensitive values before they are attached to a [`crate::entry::LogEntry`].
///
/// Implementations must not panic; a `Redactor` that needs to reject a value
/// outright should return a marker value (e.g. a JSON string `"<redacted>"`)
/// rather than abort the call.
pub trait Redactor: Send + Sync {
    /// Redacts a single input parameter's value before it is attached to the
    /// entry's `input_parameters`.
    fn redact_parameter(
        &self,
        declaring_type: &str,
        descriptor: &ParameterDescriptor,
        value: LogValue,
    ) -> LogValue;

    /// Redacts a method's return value before it is attached as
    /// `output_value`.
    fn redact_output(&self, declaring_type: &str, method_name: &str, value: LogValue) -> LogValue {
        let _ = (declaring_type, method_name);
        value
    }
}

/// A [`Redactor`] that passes every value through unchanged. The default
/// when a host registers no redaction policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRedactor;

impl Redactor for NoopRedactor {
    fn redact_parameter(
        &self,
        _declaring_type: &str,
        _descriptor: &ParameterDescriptor,
        value: LogValue,
    ) -> LogValue {
        value
    }
}

/// Substituted for a parameter value when the redactor itself fails; the
/// interceptor must not let a redactor panic or error abort the call.
pub fn redaction_failure_marker() -> LogValue {
    LogValue::String("<redaction failed>".to_string())
}
