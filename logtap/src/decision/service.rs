//! Tier 2 of the three-tier precedence resolver: configuration patterns.
//!
//! A [`ServiceConfig`] is one `Services.<selector>.*` group from the flat
//! configuration map. The selector is either an exact fully-qualified type
//! name or a `prefix*` wildcard; [`select_for_type`] implements the
//! precedence rule (exact match beats any wildcard; among wildcards, the
//! longest prefix wins).
use crate::config::{parse_bool, parse_level, ConfigError};
use logtap_core::{Behavior, Level, MethodPattern};
use std::collections::HashMap;

/// One `Services.<selector>` configuration group.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub selector: Selector,
    pub behavior: Option<Behavior>,
    pub level: Option<Level>,
    pub error_level: Option<Level>,
    pub target: Option<String>,
    pub formatter: Option<String>,
    pub exclude_method_patterns: Vec<MethodPattern>,
}

/// A parsed `Services.<selector>` key. Selectors ending in `*` are wildcards
/// matched by prefix; anything else must match the type name exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Exact(String),
    Wildcard(String),
}

impl Selector {
    fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => Selector::Wildcard(prefix.to_string()),
            None => Selector::Exact(raw.to_string()),
        }
    }

    fn matches(&self, type_name: &str) -> bool {
        match self {
            Selector::Exact(s) => s == type_name,
            Selector::Wildcard(prefix) => type_name.starts_with(prefix.as_str()),
        }
    }

    /// Specificity used to break ties among multiple matches: an exact match
    /// always outranks a wildcard; among wildcards, the longer prefix wins.
    fn specificity(&self) -> (u8, usize) {
        match self {
            Selector::Exact(s) => (1, s.len()),
            Selector::Wildcard(prefix) => (0, prefix.len()),
        }
    }
}

/// The fields a matched [`ServiceConfig`] contributes, with `Behavior`
/// defaulted the same way the attribute tier defaults an unspecified level:
/// a service entry that names no explicit `LogInput`/`LogOutput`/`LogBoth`
/// flag still participates (it may exist only to set `Target`, `Formatter`,
/// or excludes), so it falls back to `LogInput`, the same floor
/// auto-interception uses.
#[derive(Debug)]
pub struct MatchedService<'a> {
    pub behavior: Behavior,
    pub level: Level,
    pub error_level: Level,
    pub target: Option<&'a str>,
    pub formatter: Option<&'a str>,
    pub exclude_method_patterns: &'a [MethodPattern],
}

/// Selects the single best-matching [`ServiceConfig`] for `type_name`, per
/// the precedence rule: exact match beats any wildcard; among wildcards, the
/// longest prefix wins. Returns `None` if no selector matches.
pub fn select_for_type<'a>(
    services: &'a [ServiceConfig],
    type_name: &str,
) -> Option<MatchedService<'a>> {
    services
        .iter()
        .filter(|svc| svc.selector.matches(type_name))
        .max_by_key(|svc| svc.selector.specificity())
        .map(|svc| MatchedService {
            behavior: svc.behavior.unwrap_or(Behavior::LogInput),
            level: svc.level.unwrap_or_else(Level::auto_default),
            error_level: svc.error_level.unwrap_or_else(Level::auto_error_default),
            target: svc.target.as_deref(),
            formatter: svc.formatter.as_deref(),
            exclude_method_patterns: &svc.exclude_method_patterns,
        })
}

const SERVICE_PREFIX: &str = "Services.";

/// Parses every `Services.<selector>.<field>` key in `map` into a list of
/// [`ServiceConfig`]s, one per distinct selector. Selectors may themselves
/// contain `.` (e.g. `App.Hot.*`), so the field name is recovered by
/// stripping a recognized suffix rather than splitting on the first `.`.
pub fn parse_service_configs(map: &HashMap<String, String>) -> Result<Vec<ServiceConfig>, ConfigError> {
    const FIELDS: &[&str] = &[
        "LogInput",
        "LogOutput",
        "LogBoth",
        "Level",
        "ExceptionLevel",
        "Target",
        "Formatter",
        "ExcludeMethodPatterns",
    ];

    let mut by_selector: HashMap<String, ServiceConfig> = HashMap::new();

    for (key, value) in map {
        let rest = match key.strip_prefix(SERVICE_PREFIX) {
            Some(rest) => rest,
            None => continue,
        };
        let (selector_raw, field) = match FIELDS.iter().find_map(|f| {
            let suffix = format!(".{}", f);
            rest.strip_suffix(suffix.as_str()).map(|selector| (selector, *f))
        }) {
            Some(found) => found,
            None => continue,
        };

        let entry = by_selector
            .entry(selector_raw.to_string())
            .or_insert_with(|| ServiceConfig {
                selector: Selector::parse(selector_raw),
                behavior: None,
                level: None,
                error_level: None,
                target: None,
                formatter: None,
                exclude_method_patterns: Vec::new(),
            });

        let full_key = || format!("Services.{}.{}", selector_raw, field);
        match field {
            "LogInput" => {
                if parse_bool(&full_key(), value)? {
                    entry.behavior = Some(Behavior::LogInput);
                }
            }
            "LogOutput" => {
                if parse_bool(&full_key(), value)? {
                    entry.behavior = Some(Behavior::LogOutput);
                }
            }
            "LogBoth" => {
                if parse_bool(&full_key(), value)? {
                    entry.behavior = Some(Behavior::LogBoth);
                }
            }
            "Level" => entry.level = Some(parse_level(&full_key(), value)?),
            "ExceptionLevel" => entry.error_level = Some(parse_level(&full_key(), value)?),
            "Target" => entry.target = Some(value.clone()),
            "Formatter" => entry.formatter = Some(value.clone()),
            "ExcludeMethodPatterns" => {
                entry.exclude_method_patterns = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(MethodPattern::parse)
                    .collect();
            }
            _ => unreachable!("FIELDS is exhaustive over match arms above"),
        }
    }

    Ok(by_selector.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn exact_selector_beats_wildcard() {
        let services = parse_service_configs(&map(&[
            ("Services.App.Hot.Reader.Level", "Critical"),
            ("Services.App.Hot.*.Level", "Warning"),
        ]))
        .unwrap();
        let matched = select_for_type(&services, "App.Hot.Reader").unwrap();
        assert_eq!(matched.level, Level::Critical);
    }

    #[test]
    fn longest_wildcard_prefix_wins() {
        let services = parse_service_configs(&map(&[
            ("Services.App.*.Level", "Warning"),
            ("Services.App.Hot.*.Level", "Critical"),
        ]))
        .unwrap();
        let matched = select_for_type(&services, "App.Hot.Reader").unwrap();
        assert_eq!(matched.level, Level::Critical);
    }

    #[test]
    fn exclude_patterns_split_on_comma() {
        let services = parse_service_configs(&map(&[(
            "Services.App.Hot.*.ExcludeMethodPatterns",
            "Get*,*Cache*",
        )]))
        .unwrap();
        let matched = select_for_type(&services, "App.Hot.Reader").unwrap();
        assert_eq!(matched.exclude_method_patterns.len(), 2);
        assert!(matched.exclude_method_patterns[0].matches("GetUser"));
    }

    #[test]
    fn no_matching_selector_returns_none() {
        let services = parse_service_configs(&map(&[("Services.Other.Level", "Warning")])).unwrap();
        assert!(select_for_type(&services, "App.Hot.Reader").is_none());
    }
}
