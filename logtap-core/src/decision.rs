//! The precomputed interception verdict and the pieces used to build one.
use crate::level::Level;

/// What the interceptor should capture around a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    LogInput,
    LogOutput,
    LogBoth,
}

impl Behavior {
    pub fn captures_input(self) -> bool {
        matches!(self, Behavior::LogInput | Behavior::LogBoth)
    }

    pub fn captures_output(self) -> bool {
        matches!(self, Behavior::LogOutput | Behavior::LogBoth)
    }
}

/// A simple glob-like pattern for method names, used both by excludes in a
/// service configuration tier and, indirectly, by the attribute tier's
/// `no-log` veto list.
///
/// Grammar: exact | `prefix*` | `*suffix` | `*contains*`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl MethodPattern {
    /// Parses a single pattern string per the grammar above. A literal `*`
    /// with nothing else is treated as the empty-contains pattern, which
    /// matches every method name.
    pub fn parse(raw: &str) -> Self {
        let starts = raw.starts_with('*');
        let ends = raw.ends_with('*') && raw.len() > 1;
        match (starts, ends) {
            (true, true) => MethodPattern::Contains(raw[1..raw.len() - 1].to_string()),
            (true, false) => MethodPattern::Suffix(raw[1..].to_string()),
            (false, true) => MethodPattern::Prefix(raw[..raw.len() - 1].to_string()),
            (false, false) => MethodPattern::Exact(raw.to_string()),
        }
    }

    pub fn matches(&self, method_name: &str) -> bool {
        match self {
            MethodPattern::Exact(s) => method_name == s,
            MethodPattern::Prefix(p) => method_name.starts_with(p.as_str()),
            MethodPattern::Suffix(s) => method_name.ends_with(s.as_str()),
            MethodPattern::Contains(s) => s.is_empty() || method_name.contains(s.as_str()),
        }
    }
}

/// Matches `method_name` against any of `patterns`.
pub fn any_pattern_matches(patterns: &[MethodPattern], method_name: &str) -> bool {
    patterns.iter().any(|p| p.matches(method_name))
}

/// The immutable, precomputed verdict for a single method, produced once
/// during cache population and never mutated afterward.
#[derive(Clone, Debug, PartialEq)]
pub struct InterceptionDecision {
    pub behavior: Behavior,
    pub level: Level,
    pub error_level: Level,
    pub target: Option<String>,
    pub formatter: Option<String>,
    /// Consulted only while the cache is being populated: methods matching
    /// one of these patterns are excluded from interception entirely, i.e.
    /// resolve to `None` rather than this decision.
    pub exclude_method_patterns: Vec<MethodPattern>,
}

impl InterceptionDecision {
    pub fn auto_default() -> Self {
        InterceptionDecision {
            behavior: Behavior::LogInput,
            level: Level::auto_default(),
            error_level: Level::auto_error_default(),
            target: None,
            formatter: None,
            exclude_method_patterns: Vec::new(),
        }
    }
}

/// What a declarative (attribute/annotation) override on a method or its
/// declaring type supplies, discovered via whatever metadata mechanism the
/// host uses (derive macro, build-time scan, or explicit registration).
///
/// This is the systems-language replacement for source-language reflection
/// over method attributes: the host decides how `DecisionOverride`s come to
/// exist; the decision cache only consumes them.
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionOverride {
    /// No attribute present; fall through to tier 2/3.
    None,
    /// `no-log` / `no-auto-log`: veto everything, including lower tiers.
    Disabled,
    LogInput {
        level: Option<Level>,
        target: Option<String>,
        formatter: Option<String>,
    },
    LogOutput {
        level: Option<Level>,
        error_level: Option<Level>,
        target: Option<String>,
        formatter: Option<String>,
    },
    LogBoth {
        level: Option<Level>,
        error_level: Option<Level>,
        target: Option<String>,
        formatter: Option<String>,
    },
}

impl DecisionOverride {
    /// Converts a tier-1 override into a fully-formed decision using
    /// `Level::auto_default()`/`auto_error_default()` to fill in any level
    /// the attribute left unspecified. Returns `None` for `None`/`Disabled`,
    /// since both of those are handled by the caller before tier resolution
    /// reaches this point.
    pub fn into_decision(self) -> Option<InterceptionDecision> {
        match self {
            DecisionOverride::None | DecisionOverride::Disabled => None,
            DecisionOverride::LogInput {
                level,
                target,
                formatter,
            } => Some(InterceptionDecision {
                behavior: Behavior::LogInput,
                level: level.unwrap_or_else(Level::auto_default),
                error_level: Level::auto_error_default(),
                target,
                formatter,
                exclude_method_patterns: Vec::new(),
            }),
            DecisionOverride::LogOutput {
                level,
                error_level,
                target,
                formatter,
            } => Some(InterceptionDecision {
                behavior: Behavior::LogOutput,
                level: level.unwrap_or_else(Level::auto_default),
                error_level: error_level.unwrap_or_else(Level::auto_error_default),
                target,
                formatter,
                exclude_method_patterns: Vec::new(),
            }),
            DecisionOverride::LogBoth {
                level,
                error_level,
                target,
                formatter,
            } => Some(InterceptionDecision {
                behavior: Behavior::LogBoth,
                level: level.unwrap_or_else(Level::auto_default),
                error_level: error_level.unwrap_or_else(Level::auto_error_default),
                target,
                formatter,
                exclude_method_patterns: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_grammar_covers_all_four_shapes() {
        assert_eq!(MethodPattern::parse("Get"), MethodPattern::Exact("Get".into()));
        assert_eq!(MethodPattern::parse("Get*"), MethodPattern::Prefix("Get".into()));
        assert_eq!(MethodPattern::parse("*Async"), MethodPattern::Suffix("Async".into()));
        assert_eq!(
            MethodPattern::parse("*Cache*"),
            MethodPattern::Contains("Cache".into())
        );
    }

    #[test]
    fn prefix_pattern_matches_start() {
        let p = MethodPattern::parse("Get*");
        assert!(p.matches("GetUser"));
        assert!(!p.matches("Recompute"));
    }

    #[test]
    fn contains_pattern_matches_anywhere() {
        let p = MethodPattern::parse("*Cache*");
        assert!(p.matches("InvalidateCacheEntry"));
        assert!(!p.matches("Recompute"));
    }

    #[test]
    fn disabled_override_yields_no_decision() {
        assert!(DecisionOverride::Disabled.into_decision().is_none());
    }
}
