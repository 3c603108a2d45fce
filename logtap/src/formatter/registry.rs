//! [`FormatterRegistry`]: selects a formatter capability for an entry.
//!
//! Selection order: `entry.formatter` override, then the service-matched
//! formatter from configuration, then the configured default.
use crate::config::{Config, FormatterKind};
use crate::decision::service;
use crate::formatter::{self, Formatter};

#[derive(Debug)]
pub struct FormatterRegistry {
    standard: Box<dyn Formatter>,
    success_error: Box<dyn Formatter>,
    json: Box<dyn Formatter>,
    custom_template: Box<dyn Formatter>,
    hybrid: Box<dyn Formatter>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        FormatterRegistry::new()
    }
}

impl FormatterRegistry {
    pub fn new() -> Self {
        FormatterRegistry {
            standard: formatter::build(FormatterKind::Standard),
            success_error: formatter::build(FormatterKind::SuccessError),
            json: formatter::build(FormatterKind::Json),
            custom_template: formatter::build(FormatterKind::CustomTemplate),
            hybrid: formatter::build(FormatterKind::Hybrid),
        }
    }

    fn by_kind(&self, kind: FormatterKind) -> &dyn Formatter {
        match kind {
            FormatterKind::Standard => self.standard.as_ref(),
            FormatterKind::SuccessError => self.success_error.as_ref(),
            FormatterKind::Json => self.json.as_ref(),
            FormatterKind::CustomTemplate => self.custom_template.as_ref(),
            FormatterKind::Hybrid => self.hybrid.as_ref(),
        }
    }

    /// Resolves the formatter for `entry` per the selection order.
    pub fn resolve(&self, entry: &logtap_core::LogEntry, config: &Config) -> &dyn Formatter {
        let kind = entry
            .formatter
            .as_deref()
            .and_then(FormatterKind::parse)
            .or_else(|| {
                service::select_for_type(&config.services, &entry.type_name)
                    .and_then(|matched| matched.formatter)
                    .and_then(FormatterKind::parse)
            })
            .unwrap_or(config.default_formatter);
        self.by_kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtap_core::{Level, LogEntry};

    fn entry_with_formatter(formatter: Option<&str>) -> LogEntry {
        LogEntry::start(
            "Charge",
            "Payments",
            None,
            Level::Information,
            Level::Error,
            None,
            formatter.map(str::to_string),
            None,
            vec![],
        )
    }

    #[test]
    fn entry_override_wins_over_default() {
        let registry = FormatterRegistry::new();
        let mut config = Config::default();
        config.default_formatter = FormatterKind::Standard;
        let entry = entry_with_formatter(Some("json"));
        let formatted = registry.resolve(&entry, &config).format(&entry, &crate::template::TemplateEngine::new(), &config);
        let parsed: serde_json::Value = serde_json::from_str(&formatted.text).unwrap();
        assert_eq!(parsed["method_name"], "Charge");
    }

    #[test]
    fn falls_back_to_configured_default() {
        let registry = FormatterRegistry::new();
        let mut config = Config::default();
        config.default_formatter = FormatterKind::Json;
        let entry = entry_with_formatter(None);
        let formatted = registry.resolve(&entry, &config).format(&entry, &crate::template::TemplateEngine::new(), &config);
        assert!(serde_json::from_str::<serde_json::Value>(&formatted.text).is_ok());
    }
}
