//! Parses the flat, hierarchically-named key/value configuration map described
//! in the specification's external interfaces section into strongly-typed
//! configuration the rest of the crate consumes.
//!
//! Loading the map itself (from a file, environment, secret store, or remote
//! KV) is a host concern; this module only interprets a
//! `HashMap<String, String>` that has already been assembled.
use crate::decision::service::ServiceConfig;
use logtap_core::Level;
use std::collections::HashMap;
use std::time::Duration;

/// The formatter named by `DefaultFormatter` / `Services.<selector>.Formatter`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatterKind {
    Standard,
    SuccessError,
    Json,
    CustomTemplate,
    Hybrid,
}

impl FormatterKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "standard" => Some(FormatterKind::Standard),
            "success-error" => Some(FormatterKind::SuccessError),
            "json" => Some(FormatterKind::Json),
            "custom-template" => Some(FormatterKind::CustomTemplate),
            "hybrid" => Some(FormatterKind::Hybrid),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FormatterKind::Standard => "standard",
            FormatterKind::SuccessError => "success-error",
            FormatterKind::Json => "json",
            FormatterKind::CustomTemplate => "custom-template",
            FormatterKind::Hybrid => "hybrid",
        }
    }
}

/// A reusable named template, from the `Templates.<name>.*` keys.
#[derive(Clone, Debug, Default)]
pub struct NamedTemplate {
    pub enabled: bool,
    pub success_template: Option<String>,
    pub error_template: Option<String>,
    pub general_template: Option<String>,
}

/// Fully parsed configuration. Produced once at startup via [`Config::from_map`]
/// and handed to the [`crate::lifecycle::LifecycleController`].
#[derive(Clone, Debug)]
pub struct Config {
    pub auto_intercept: bool,
    pub queue_capacity: usize,
    pub max_batch_size: usize,
    pub batch_timeout: Duration,
    pub default_target: String,
    pub default_formatter: FormatterKind,
    pub fallback_template: String,
    pub enable_fallback_formatting: bool,
    pub activity_source_name: String,
    pub services: Vec<ServiceConfig>,
    pub targets: HashMap<String, TargetConfig>,
    pub json_pretty_print: bool,
    pub custom_template_default: Option<String>,
    pub custom_template_per_service: HashMap<String, String>,
    pub hybrid_message_template: Option<String>,
    pub named_templates: HashMap<String, NamedTemplate>,
}

/// A sink's pass-through driver configuration (`Targets.<name>.*`). The
/// driver itself is constructed by the host; this is just the configuration
/// it's handed.
#[derive(Clone, Debug, Default)]
pub struct TargetConfig {
    pub type_name: Option<String>,
    pub enabled: bool,
    pub properties: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auto_intercept: false,
            queue_capacity: 10_000,
            max_batch_size: 100,
            batch_timeout: Duration::from_secs(1),
            default_target: "Console".to_string(),
            default_formatter: FormatterKind::Standard,
            fallback_template: "[{TypeName}.{MethodName}] success={Success} id={Id}".to_string(),
            enable_fallback_formatting: true,
            activity_source_name: "logtap".to_string(),
            services: Vec::new(),
            targets: HashMap::new(),
            json_pretty_print: false,
            custom_template_default: None,
            custom_template_per_service: HashMap::new(),
            hybrid_message_template: None,
            named_templates: HashMap::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: expected a boolean, got {value:?}")]
    Bool { key: String, value: String },
    #[error("{key}: expected an integer >= 1, got {value:?}")]
    PositiveInt { key: String, value: String },
    #[error("{key}: expected a duration (e.g. \"1s\", \"500ms\"), got {value:?}")]
    Duration { key: String, value: String },
    #[error("{key}: unknown formatter {value:?}")]
    Formatter { key: String, value: String },
    #[error("{key}: unknown level {value:?}")]
    Level { key: String, value: String },
}

impl Config {
    /// Parses a flat key/value map into a `Config`. Unrecognized keys are
    /// ignored, so a host can pass through its entire configuration source
    /// without first filtering it down to keys this crate understands.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(v) = map.get("AutoIntercept") {
            config.auto_intercept = parse_bool("AutoIntercept", v)?;
        }
        if let Some(v) = map.get("QueueCapacity") {
            config.queue_capacity = parse_positive_usize("QueueCapacity", v)?;
        }
        if let Some(v) = map.get("MaxBatchSize") {
            config.max_batch_size = parse_positive_usize("MaxBatchSize", v)?;
        }
        if let Some(v) = map.get("BatchTimeout") {
            config.batch_timeout = parse_duration("BatchTimeout", v)?;
        }
        if let Some(v) = map.get("DefaultTarget") {
            config.default_target = v.clone();
        }
        if let Some(v) = map.get("DefaultFormatter") {
            config.default_formatter = FormatterKind::parse(v).ok_or_else(|| ConfigError::Formatter {
                key: "DefaultFormatter".to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = map.get("FallbackTemplate") {
            config.fallback_template = v.clone();
        }
        if let Some(v) = map.get("EnableFallbackFormatting") {
            config.enable_fallback_formatting = parse_bool("EnableFallbackFormatting", v)?;
        }
        if let Some(v) = map.get("ActivitySourceName") {
            config.activity_source_name = v.clone();
        }
        if let Some(v) = map.get("Formatters.Json.PrettyPrint") {
            config.json_pretty_print = parse_bool("Formatters.Json.PrettyPrint", v)?;
        }
        if let Some(v) = map.get("Formatters.CustomTemplate.DefaultTemplate") {
            config.custom_template_default = Some(v.clone());
        }
        if let Some(v) = map.get("Formatters.Hybrid.MessageTemplate") {
            config.hybrid_message_template = Some(v.clone());
        }

        const CUSTOM_TEMPLATE_SERVICE_PREFIX: &str = "Formatters.CustomTemplate.ServiceTemplates.";
        const TARGET_PREFIX: &str = "Targets.";
        const TEMPLATE_PREFIX: &str = "Templates.";
        const SERVICE_PREFIX: &str = "Services.";

        for (key, value) in map {
            if let Some(name) = key.strip_prefix(CUSTOM_TEMPLATE_SERVICE_PREFIX) {
                config
                    .custom_template_per_service
                    .insert(name.to_string(), value.clone());
            } else if let Some(rest) = key.strip_prefix(TARGET_PREFIX) {
                apply_target_key(&mut config.targets, rest, value)?;
            } else if let Some(rest) = key.strip_prefix(TEMPLATE_PREFIX) {
                apply_named_template_key(&mut config.named_templates, rest, value)?;
            } else if key.strip_prefix(SERVICE_PREFIX).is_some() {
                // handled below in a second pass, since a selector may
                // contain '.' itself (e.g. "App.Hot.*")
            }
        }

        config.services = crate::decision::service::parse_service_configs(map)?;

        Ok(config)
    }
}

impl Config {
    /// Every template string named by this configuration: the fallback
    /// template, the custom-template default and per-service overrides, the
    /// hybrid message template, and every enabled named template's
    /// success/error/general variants. Used by
    /// [`crate::lifecycle::LifecycleController::start`] to precompile
    /// everything configuration references, per the template engine's
    /// precompilation contract, in addition to the built-in template set.
    pub fn referenced_templates(&self) -> Vec<String> {
        let mut templates = vec![self.fallback_template.clone()];
        templates.extend(self.custom_template_default.iter().cloned());
        templates.extend(self.custom_template_per_service.values().cloned());
        templates.extend(self.hybrid_message_template.iter().cloned());
        for named in self.named_templates.values() {
            if !named.enabled {
                continue;
            }
            templates.extend(named.success_template.iter().cloned());
            templates.extend(named.error_template.iter().cloned());
            templates.extend(named.general_template.iter().cloned());
        }
        templates
    }
}

fn apply_target_key(
    targets: &mut HashMap<String, TargetConfig>,
    rest: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let mut parts = rest.splitn(2, '.');
    let name = parts.next().unwrap_or_default().to_string();
    let field = parts.next().unwrap_or_default();
    let entry = targets.entry(name).or_default();
    if field == "Type" {
        entry.type_name = Some(value.to_string());
    } else if field == "Enabled" {
        entry.enabled = parse_bool("Targets.*.Enabled", value)?;
    } else if let Some(prop) = field.strip_prefix("Properties.") {
        entry.properties.insert(prop.to_string(), value.to_string());
    }
    Ok(())
}

fn apply_named_template_key(
    templates: &mut HashMap<String, NamedTemplate>,
    rest: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let mut parts = rest.splitn(2, '.');
    let name = parts.next().unwrap_or_default().to_string();
    let field = parts.next().unwrap_or_default();
    let entry = templates.entry(name).or_default();
    match field {
        "Enabled" => entry.enabled = parse_bool("Templates.*.Enabled", value)?,
        "SuccessTemplate" => entry.success_template = Some(value.to_string()),
        "ErrorTemplate" => entry.error_template = Some(value.to_string()),
        "GeneralTemplate" => entry.general_template = Some(value.to_string()),
        _ => {}
    }
    Ok(())
}

pub(crate) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Bool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_positive_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| ConfigError::PositiveInt {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let err = || ConfigError::Duration {
        key: key.to_string(),
        value: value.to_string(),
    };
    if let Some(ms) = value.strip_suffix("ms") {
        return ms.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| err());
    }
    if let Some(secs) = value.strip_suffix('s') {
        return secs
            .trim()
            .parse::<f64>()
            .map(Duration::from_secs_f64)
            .map_err(|_| err());
    }
    value.parse::<u64>().map(Duration::from_secs).map_err(|_| err())
}

pub(crate) fn parse_level(key: &str, value: &str) -> Result<Level, ConfigError> {
    value.parse::<Level>().map_err(|_| ConfigError::Level {
        key: key.to_string(),
        value: value.to_string(),
    })
}
