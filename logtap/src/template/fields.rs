//! Parameter alignment: resolving a template's `parameter_names` against an
//! entry's fields and its `input_parameters`, producing the positional
//! argument vector `CompiledTemplate::render` expects.
use logtap_core::{LogEntry, LogValue, Outcome};
use serde_json::json;

/// Builds the positional argument vector for `template_names`, given the
/// runtime entry. A name that resolves to neither a known entry field nor an
/// input parameter becomes `None`, which renders as an empty string (or is
/// skipped by a `json` spec) rather than an error.
pub fn align_arguments(entry: &LogEntry, template_names: &[String]) -> Vec<Option<LogValue>> {
    template_names.iter().map(|name| resolve(entry, name)).collect()
}

fn resolve(entry: &LogEntry, name: &str) -> Option<LogValue> {
    match name {
        "TypeName" => Some(LogValue::String(entry.type_name.clone())),
        "MethodName" => Some(LogValue::String(entry.method_name.clone())),
        "Id" => Some(LogValue::String(entry.id.to_string())),
        "Success" => match entry.success {
            Outcome::Success => Some(LogValue::Bool(true)),
            Outcome::Failure => Some(LogValue::Bool(false)),
            Outcome::Pending => None,
        },
        "Duration" => Some(json!(entry.duration_millis())),
        "InputParameters" => serde_json::to_value(&entry.input_parameters).ok(),
        "OutputValue" => entry.output_value.clone(),
        "Exception" => entry
            .exception
            .as_ref()
            .map(|exc| json!({
                "kind_name": exc.kind_name,
                "message": exc.message,
                "stack_snapshot": exc.stack_snapshot,
                "base_cause_kind_name": exc.base_cause_kind_name,
            })),
        "Level" => Some(LogValue::String(entry.level.to_string())),
        "Target" => entry.target.clone().map(LogValue::String),
        "ActivityId" => entry.activity_id.map(|id| LogValue::String(id.to_string())),
        "ThreadId" => Some(json!(entry.thread_id)),
        "Timestamp" => Some(LogValue::String(entry.timestamp_start.to_rfc3339())),
        "Metadata" => Some(metadata_of(entry)),
        other => entry
            .input_parameters
            .iter()
            .find(|p| p.name == other)
            .map(|p| p.value.clone()),
    }
}

/// The compact key-metadata object used by the hybrid formatter's suffix and
/// by a bare `{Metadata}` template.
pub fn metadata_of(entry: &LogEntry) -> LogValue {
    json!({
        "id": entry.id.to_string(),
        "type_name": entry.type_name,
        "method_name": entry.method_name,
        "level": entry.level.to_string(),
        "duration_ms": entry.duration_millis(),
        "success": matches!(entry.success, Outcome::Success),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtap_core::{Level, Param};

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
            vec![Param::new("amount", "i64", json!(10))],
        )
        .complete_success(std::time::Duration::from_millis(5), None)
    }

    #[test]
    fn resolves_known_entry_fields() {
        let entry = sample();
        let args = align_arguments(&entry, &["TypeName".to_string(), "MethodName".to_string()]);
        assert_eq!(args[0], Some(LogValue::String("Payments".to_string())));
        assert_eq!(args[1], Some(LogValue::String("Charge".to_string())));
    }

    #[test]
    fn resolves_input_parameter_by_name() {
        let entry = sample();
        let args = align_arguments(&entry, &["amount".to_string()]);
        assert_eq!(args[0], Some(json!(10)));
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        let entry = sample();
        let args = align_arguments(&entry, &["Unknown".to_string()]);
        assert_eq!(args[0], None);
    }

    #[test]
    fn missing_output_value_is_none_not_null_string() {
        let entry = sample();
        let args = align_arguments(&entry, &["OutputValue".to_string()]);
        assert_eq!(args[0], None);
    }
}
