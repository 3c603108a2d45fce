//! The formatter registry (C6): resolves a formatter by name per entry and
//! renders it. Five built-in formatters are provided, distinguished by how
//! they present an entry; the registry returns a formatter capability, not a
//! string name, once selection has been made.
pub mod registry;

pub use registry::FormatterRegistry;

use crate::config::{Config, FormatterKind};
use crate::template::{fields, TemplateEngine};
use logtap_core::{LogEntry, LogValue, Outcome};
use std::fmt::Write as _;

/// What a formatter produces: the rendered text, plus an optional structured
/// payload a sink may forward alongside it (e.g. for a JSON sink that also
/// indexes the raw document).
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedOutput {
    pub text: String,
    pub structured_payload: Option<LogValue>,
}

impl FormattedOutput {
    fn text_only(text: String) -> Self {
        FormattedOutput {
            text,
            structured_payload: None,
        }
    }
}

/// A formatter capability: converts an entry into rendered text (and an
/// optional structured payload).
pub trait Formatter: Send + Sync {
    fn format(&self, entry: &LogEntry, engine: &TemplateEngine, config: &Config) -> FormattedOutput;
}

fn render_headline(engine: &TemplateEngine, template_source: &str, entry: &LogEntry, json_non_pretty: bool) -> String {
    let compiled = engine.get_or_compile(template_source);
    let args = fields::align_arguments(entry, compiled.parameter_names());
    let mut text = String::new();
    compiled.render(&mut text, &args, json_non_pretty);
    text
}

/// Human-readable headline built from the built-in success/failure
/// templates, e.g. `Method Payments.Charge completed in 10.00ms`.
#[derive(Debug, Default)]
pub struct StandardFormatter;

impl Formatter for StandardFormatter {
    fn format(&self, entry: &LogEntry, engine: &TemplateEngine, config: &Config) -> FormattedOutput {
        let template = match entry.success {
            Outcome::Failure => crate::template::engine::STANDARD_FAILURE_TEMPLATE,
            _ => crate::template::engine::STANDARD_SUCCESS_TEMPLATE,
        };
        FormattedOutput::text_only(render_headline(engine, template, entry, !config.json_pretty_print))
    }
}

/// Like [`StandardFormatter`], but the success/failure template pair can be
/// swapped per entry via `Templates.<name>.SuccessTemplate`/`ErrorTemplate`,
/// selected by `entry.template_hint`.
#[derive(Debug, Default)]
pub struct SuccessErrorFormatter;

impl Formatter for SuccessErrorFormatter {
    fn format(&self, entry: &LogEntry, engine: &TemplateEngine, config: &Config) -> FormattedOutput {
        let named = entry.template_hint.as_deref().and_then(|hint| config.named_templates.get(hint));
        let template: &str = match (entry.success, named) {
            (Outcome::Failure, Some(n)) if n.enabled => n
                .error_template
                .as_deref()
                .or(n.general_template.as_deref())
                .unwrap_or(crate::template::engine::STANDARD_FAILURE_TEMPLATE),
            (_, Some(n)) if n.enabled => n
                .success_template
                .as_deref()
                .or(n.general_template.as_deref())
                .unwrap_or(crate::template::engine::STANDARD_SUCCESS_TEMPLATE),
            (Outcome::Failure, _) => crate::template::engine::STANDARD_FAILURE_TEMPLATE,
            _ => crate::template::engine::STANDARD_SUCCESS_TEMPLATE,
        };
        FormattedOutput::text_only(render_headline(engine, template, entry, !config.json_pretty_print))
    }
}

/// Destructures the whole entry into a JSON document.
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, entry: &LogEntry, _engine: &TemplateEngine, config: &Config) -> FormattedOutput {
        let text = if config.json_pretty_print {
            serde_json::to_string_pretty(entry)
        } else {
            serde_json::to_string(entry)
        }
        .unwrap_or_else(|err| format!("{{\"formatting_error\":{:?}}}", err.to_string()));
        let structured_payload = serde_json::to_value(entry).ok();
        FormattedOutput {
            text,
            structured_payload,
        }
    }
}

/// User-supplied template strings, optionally per service
/// (`Formatters.CustomTemplate.ServiceTemplates.<name>`), falling back to
/// `Formatters.CustomTemplate.DefaultTemplate`, and finally to the built-in
/// standard templates if configuration supplies neither.
#[derive(Debug, Default)]
pub struct CustomTemplateFormatter;

impl Formatter for CustomTemplateFormatter {
    fn format(&self, entry: &LogEntry, engine: &TemplateEngine, config: &Config) -> FormattedOutput {
        let template: &str = config
            .custom_template_per_service
            .get(&entry.type_name)
            .map(String::as_str)
            .or(config.custom_template_default.as_deref())
            .unwrap_or(match entry.success {
                Outcome::Failure => crate::template::engine::STANDARD_FAILURE_TEMPLATE,
                _ => crate::template::engine::STANDARD_SUCCESS_TEMPLATE,
            });

        let compiled = engine.get_or_compile(template);
        if compiled.is_bare_metadata() {
            let metadata = fields::metadata_of(entry);
            return FormattedOutput {
                text: serde_json::to_string(&metadata).unwrap_or_default(),
                structured_payload: Some(metadata),
            };
        }
        FormattedOutput::text_only(render_headline(engine, template, entry, !config.json_pretty_print))
    }
}

/// A human-readable prefix (`Formatters.Hybrid.MessageTemplate`) followed by
/// a compact structured suffix carrying key metadata.
#[derive(Debug, Default)]
pub struct HybridFormatter;

impl Formatter for HybridFormatter {
    fn format(&self, entry: &LogEntry, engine: &TemplateEngine, config: &Config) -> FormattedOutput {
        let template = config
            .hybrid_message_template
            .as_deref()
            .unwrap_or(crate::template::engine::HYBRID_DEFAULT_TEMPLATE);
        let mut text = render_headline(engine, template, entry, false);
        let metadata = fields::metadata_of(entry);
        if let Ok(suffix) = serde_json::to_string(&metadata) {
            let _ = write!(text, " {}", suffix);
        }
        FormattedOutput {
            text,
            structured_payload: Some(metadata),
        }
    }
}

pub(crate) fn build(kind: FormatterKind) -> Box<dyn Formatter> {
    match kind {
        FormatterKind::Standard => Box::new(StandardFormatter),
        FormatterKind::SuccessError => Box::new(SuccessErrorFormatter),
        FormatterKind::Json => Box::new(JsonFormatter),
        FormatterKind::CustomTemplate => Box::new(CustomTemplateFormatter),
        FormatterKind::Hybrid => Box::new(HybridFormatter),
    }
}
