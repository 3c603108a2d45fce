//! The log entry writer (C8): runs the formatter, falls back on formatting
//! failure, and hands the rendered message to the sink router.
use crate::config::Config;
use crate::formatter::FormatterRegistry;
use crate::router::SinkRouter;
use crate::template::{fields, TemplateEngine};
use logtap_core::LogEntry;

/// Runs the formatting + fallback + routing chain for one entry. Stateless
/// beyond the formatter registry, so it can be shared across entries within
/// a batch without locking.
#[derive(Debug, Default)]
pub struct LogEntryWriter {
    formatters: FormatterRegistry,
}

impl LogEntryWriter {
    pub fn new(formatters: FormatterRegistry) -> Self {
        LogEntryWriter { formatters }
    }

    /// Formats `entry` and dispatches it to `router`. Never panics and never
    /// fails to deliver: a broken or empty render still reaches the sink,
    /// either via the fallback template or the `[Formatting Error: ...]`
    /// marker.
    pub fn write(&self, entry: &LogEntry, engine: &TemplateEngine, config: &Config, router: &SinkRouter) {
        let formatter = self.formatters.resolve(entry, config);
        let formatted = formatter.format(entry, engine, config);

        let (text, payload) = if formatted.text.is_empty() {
            log::warn!(
                "logtap: formatter produced no output for {}.{} (id {}), applying fallback",
                entry.type_name,
                entry.method_name,
                entry.id
            );
            if config.enable_fallback_formatting {
                (render_fallback(entry, engine, &config.fallback_template), None)
            } else {
                ("[Formatting Error: renderer produced no output]".to_string(), None)
            }
        } else {
            (formatted.text, formatted.structured_payload)
        };

        router.emit(entry.target.as_deref(), entry.effective_level(), &text, payload.as_ref());
    }
}

/// Substitutes `{TypeName}`, `{MethodName}`, `{Success}`, `{Id}`,
/// `{InputParameters}`, `{OutputValue}` (and any other recognized field name)
/// in the configured fallback template using the entry's literal values.
fn render_fallback(entry: &LogEntry, engine: &TemplateEngine, fallback_template: &str) -> String {
    let compiled = engine.get_or_compile(fallback_template);
    let args = fields::align_arguments(entry, compiled.parameter_names());
    let mut text = String::new();
    compiled.render(&mut text, &args, false);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatterKind;
    use logtap_core::{Level, Sink};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct RecordingSink {
        last: Arc<Mutex<Option<String>>>,
    }

    impl Sink for RecordingSink {
        fn emit(&self, _category: &str, _level: Level, rendered_message: &str, _payload: Option<&serde_json::Value>) {
            *self.last.lock() = Some(rendered_message.to_string());
        }
    }

    fn router_with_console(last: Arc<Mutex<Option<String>>>) -> SinkRouter {
        let mut router = SinkRouter::new("Console");
        router.register("Console", Box::new(RecordingSink { last }));
        router
    }

    fn sample_entry() -> LogEntry {
        LogEntry::start(
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
        .complete_success(std::time::Duration::from_millis(1), None)
    }

    #[test]
    fn writes_rendered_standard_message_to_default_sink() {
        let last = Arc::new(Mutex::new(None));
        let router = router_with_console(last.clone());
        let engine = TemplateEngine::new();
        let mut config = Config::default();
        config.default_formatter = FormatterKind::Standard;
        let writer = LogEntryWriter::new(FormatterRegistry::new());

        writer.write(&sample_entry(), &engine, &config, &router);

        assert_eq!(last.lock().as_deref(), Some("Method Payments.Charge completed in 1.00ms"));
    }

    #[test]
    fn empty_render_falls_back_to_configured_template() {
        let last = Arc::new(Mutex::new(None));
        let router = router_with_console(last.clone());
        let engine = TemplateEngine::new();
        let mut config = Config::default();
        config.custom_template_default = Some(String::new());
        config.default_formatter = FormatterKind::CustomTemplate;
        config.fallback_template = "[{TypeName}.{MethodName}] id={Id}".to_string();
        let writer = LogEntryWriter::new(FormatterRegistry::new());

        writer.write(&sample_entry(), &engine, &config, &router);

        let rendered = last.lock().clone().unwrap();
        assert!(rendered.starts_with("[Payments.Charge] id="));
    }

    #[test]
    fn empty_render_without_fallback_emits_formatting_error_marker() {
        let last = Arc::new(Mutex::new(None));
        let router = router_with_console(last.clone());
        let engine = TemplateEngine::new();
        let mut config = Config::default();
        config.custom_template_default = Some(String::new());
        config.default_formatter = FormatterKind::CustomTemplate;
        config.enable_fallback_formatting = false;
        let writer = LogEntryWriter::new(FormatterRegistry::new());

        writer.write(&sample_entry(), &engine, &config, &router);

        assert_eq!(last.lock().as_deref(), Some("[Formatting Error: renderer produced no output]"));
    }
}
