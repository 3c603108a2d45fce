//! The template engine (C7): parses, compiles, and caches templates as
//! callable renderers, and applies format specifiers.
//!
//! Grammar: `{name}` or `{name:spec}` placeholders; literal `{` and `}` are
//! escaped by doubling (`{{`, `}}`). Names reference entry fields (see
//! [`fields`]) or input-parameter names.
pub mod engine;
pub mod fields;

pub use engine::TemplateEngine;

use logtap_core::LogValue;

/// One piece of a compiled template: either literal text copied verbatim, or
/// a placeholder resolved at render time from the positional argument
/// vector.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Placeholder { index: usize, spec: Option<String> },
}

/// A template, parsed once and never re-parsed. `render` walks `ordered_parts`
/// and writes resolved values straight into the output buffer; it never
/// throws. A `None` argument or an unrecognized spec falls back to an empty
/// or best-effort rendering, per the specification's rendering-failure
/// contract.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledTemplate {
    ordered_parts: Vec<TemplatePart>,
    /// Names as they appeared in the source template, left to right, one
    /// entry per placeholder occurrence (not deduplicated: the same name
    /// used twice gets two positional indices).
    parameter_names: Vec<String>,
    literal_length: usize,
    placeholder_count: usize,
}

/// Returned when a template's braces are unbalanced.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("unterminated placeholder starting at byte {0}")]
pub struct TemplateParseError(pub usize);

impl CompiledTemplate {
    /// Parses and compiles `source`. The only failure mode is an unterminated
    /// `{...}` placeholder; see [`CompiledTemplate::noop`] for the fallback a
    /// caller installs on failure instead of propagating an error.
    pub fn compile(source: &str) -> Result<Self, TemplateParseError> {
        let mut ordered_parts = Vec::new();
        let mut parameter_names = Vec::new();
        let mut literal_length = 0usize;
        let mut literal_buf = String::new();

        let bytes = source.as_bytes();
        let mut i = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    literal_buf.push('{');
                    i += 2;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    literal_buf.push('}');
                    i += 2;
                }
                b'{' => {
                    let start = i;
                    let close = source[i..]
                        .find('}')
                        .map(|offset| i + offset)
                        .ok_or(TemplateParseError(start))?;
                    let content = &source[i + 1..close];
                    let (name, spec) = match content.split_once(':') {
                        Some((n, s)) => (n.to_string(), Some(s.to_string())),
                        None => (content.to_string(), None),
                    };
                    if !literal_buf.is_empty() {
                        literal_length += literal_buf.len();
                        ordered_parts.push(TemplatePart::Literal(std::mem::take(&mut literal_buf)));
                    }
                    let index = parameter_names.len();
                    parameter_names.push(name);
                    ordered_parts.push(TemplatePart::Placeholder { index, spec });
                    i = close + 1;
                }
                other => {
                    literal_buf.push(other as char);
                    i += 1;
                }
            }
        }
        if !literal_buf.is_empty() {
            literal_length += literal_buf.len();
            ordered_parts.push(TemplatePart::Literal(literal_buf));
        }

        let placeholder_count = parameter_names.len();
        Ok(CompiledTemplate {
            ordered_parts,
            parameter_names,
            literal_length,
            placeholder_count,
        })
    }

    /// A renderer installed when precompilation or on-demand compilation
    /// fails: it always emits no output, plus a diagnostic logged once by
    /// the caller, per the template-compile-failed error handling rule.
    pub fn noop() -> Self {
        CompiledTemplate {
            ordered_parts: Vec::new(),
            parameter_names: Vec::new(),
            literal_length: 0,
            placeholder_count: 0,
        }
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn literal_length(&self) -> usize {
        self.literal_length
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholder_count
    }

    /// `true` for the special-cased template that is exactly `{Metadata}`:
    /// when the aligned argument is a non-string JSON value, the writer
    /// should hand it through untouched as the sink's structured payload
    /// rather than stringify it.
    pub fn is_bare_metadata(&self) -> bool {
        matches!(
            self.ordered_parts.as_slice(),
            [TemplatePart::Placeholder { .. }]
        ) && self.parameter_names.first().map(String::as_str) == Some("Metadata")
    }

    /// Renders into `out`, given the positional argument vector produced by
    /// [`fields::align_arguments`]. `json_non_pretty` resolves the
    /// formatter-dependent default spec for a bare `Metadata` placeholder.
    pub fn render(&self, out: &mut String, args: &[Option<LogValue>], json_non_pretty: bool) {
        for part in &self.ordered_parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Placeholder { index, spec } => {
                    let name = self.parameter_names.get(*index).map(String::as_str).unwrap_or("");
                    let value = args.get(*index).and_then(|v| v.as_ref());
                    let effective_spec = spec.as_deref().or_else(|| default_spec_for(name, json_non_pretty));
                    render_value(out, value, effective_spec);
                }
            }
        }
    }
}

/// The built-in default format specifiers applied when the source template
/// omits one, per the specification's table.
fn default_spec_for(name: &str, json_non_pretty: bool) -> Option<&'static str> {
    match name {
        "InputParameters" | "OutputValue" => Some("json"),
        "Duration" => Some("N2"),
        "Metadata" if json_non_pretty => Some("json"),
        _ => None,
    }
}

/// Renders one resolved placeholder value into `out` according to `spec`.
/// Unknown values render as empty text, not an error: a template whose
/// placeholder name has no matching entry field or input parameter is a
/// boundary case the specification requires to render `""`, not fail.
fn render_value(out: &mut String, value: Option<&LogValue>, spec: Option<&str>) {
    let value = match value {
        None | Some(LogValue::Null) => return,
        Some(v) => v,
    };
    match spec {
        Some("json") => {
            if let Ok(rendered) = serde_json::to_string(value) {
                out.push_str(&rendered);
            }
        }
        Some(spec) if spec.eq_ignore_ascii_case("n2") => {
            if let Some(n) = value.as_f64() {
                out.push_str(&format!("{:.2}", n));
            } else {
                push_plain(out, value);
            }
        }
        Some(other) if other.starts_with('N') || other.starts_with('n') => {
            let decimals: usize = other[1..].parse().unwrap_or(2);
            if let Some(n) = value.as_f64() {
                out.push_str(&format!("{:.*}", decimals, n));
            } else {
                push_plain(out, value);
            }
        }
        _ => push_plain(out, value),
    }
}

/// The "none" format spec: strings render raw (no surrounding quotes),
/// scalars render their natural textual form, and anything structured falls
/// back to compact JSON.
fn push_plain(out: &mut String, value: &LogValue) {
    match value {
        LogValue::Null => {}
        LogValue::String(s) => out.push_str(s),
        LogValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        LogValue::Number(n) => out.push_str(&n.to_string()),
        other => {
            if let Ok(rendered) = serde_json::to_string(other) {
                out.push_str(&rendered);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_doubled_braces() {
        let tpl = CompiledTemplate::compile("{{literal}} {Name}").unwrap();
        assert_eq!(tpl.parameter_names(), &["Name".to_string()]);
        let mut out = String::new();
        tpl.render(&mut out, &[Some(json!("Alice"))], false);
        assert_eq!(out, "{literal} Alice");
    }

    #[test]
    fn unterminated_placeholder_is_a_parse_error() {
        assert!(CompiledTemplate::compile("U={Unknown").is_err());
    }

    #[test]
    fn missing_argument_renders_empty_not_error() {
        let tpl = CompiledTemplate::compile("U={Unknown}").unwrap();
        let mut out = String::new();
        tpl.render(&mut out, &[None], false);
        assert_eq!(out, "U=");
    }

    #[test]
    fn default_spec_applies_json_to_input_parameters() {
        let tpl = CompiledTemplate::compile("{InputParameters}").unwrap();
        let mut out = String::new();
        tpl.render(&mut out, &[Some(json!([{"name": "amount", "value": 10}]))], false);
        assert_eq!(out, r#"[{"name":"amount","value":10}]"#);
    }

    #[test]
    fn default_spec_applies_n2_to_duration() {
        let tpl = CompiledTemplate::compile("{Duration}ms").unwrap();
        let mut out = String::new();
        tpl.render(&mut out, &[Some(json!(12.3456))], false);
        assert_eq!(out, "12.35ms");
    }

    #[test]
    fn explicit_spec_overrides_default() {
        let tpl = CompiledTemplate::compile("{Duration:N0}").unwrap();
        let mut out = String::new();
        tpl.render(&mut out, &[Some(json!(12.6))], false);
        assert_eq!(out, "13");
    }

    #[test]
    fn bare_metadata_template_is_flagged_for_passthrough() {
        let tpl = CompiledTemplate::compile("{Metadata}").unwrap();
        assert!(tpl.is_bare_metadata());
        let tpl = CompiledTemplate::compile("{Metadata} suffix").unwrap();
        assert!(!tpl.is_bare_metadata());
    }

    #[test]
    fn duplicate_placeholder_names_get_distinct_positions() {
        let tpl = CompiledTemplate::compile("{Name}-{Name}").unwrap();
        assert_eq!(tpl.parameter_names(), &["Name".to_string(), "Name".to_string()]);
        assert_eq!(tpl.placeholder_count(), 2);
    }

    #[test]
    fn noop_template_renders_nothing() {
        let tpl = CompiledTemplate::noop();
        let mut out = String::new();
        tpl.render(&mut out, &[], false);
        assert!(out.is_empty());
    }
}
