//! [`TemplateEngine`]: the concurrent, write-once template cache, built
//! lazily on first use and precompiled at startup for a built-in set of
//! common templates plus everything named by configuration.
use crate::template::CompiledTemplate;
use dashmap::DashMap;
use std::sync::Arc;

/// The default rendering for a successful completion under the standard and
/// success/error formatters.
pub const STANDARD_SUCCESS_TEMPLATE: &str = "Method {TypeName}.{MethodName} completed in {Duration}ms";
/// The default rendering for a failed completion under the standard and
/// success/error formatters.
pub const STANDARD_FAILURE_TEMPLATE: &str =
    "Method {TypeName}.{MethodName} failed after {Duration}ms: {Exception}";
/// Emoji-adorned success variant, available as a named template.
pub const EMOJI_SUCCESS_TEMPLATE: &str = "\u{2705} {TypeName}.{MethodName} ({Duration}ms)";
/// Emoji-adorned failure variant, available as a named template.
pub const EMOJI_FAILURE_TEMPLATE: &str = "\u{274c} {TypeName}.{MethodName} failed: {Exception}";
/// The hybrid formatter's default human-readable prefix.
pub const HYBRID_DEFAULT_TEMPLATE: &str = "{TypeName}.{MethodName} [{Success}] {Duration}ms";

/// The built-in set of common templates, precompiled unconditionally at
/// startup alongside whatever configuration names.
pub const BUILTIN_TEMPLATES: &[&str] = &[
    STANDARD_SUCCESS_TEMPLATE,
    STANDARD_FAILURE_TEMPLATE,
    EMOJI_SUCCESS_TEMPLATE,
    EMOJI_FAILURE_TEMPLATE,
    HYBRID_DEFAULT_TEMPLATE,
];

/// The concurrent map of raw template string to compiled renderer. Entries
/// are never evicted: a template compiled once lives until process exit.
#[derive(Debug, Default)]
pub struct TemplateEngine {
    cache: DashMap<String, Arc<CompiledTemplate>>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        TemplateEngine { cache: DashMap::new() }
    }

    /// Returns the cached renderer for `source`, compiling and inserting it
    /// on first use. A template that fails to parse gets
    /// [`CompiledTemplate::noop`] installed instead, logged once here, so
    /// every subsequent lookup for the same broken template is a cache hit
    /// rather than a repeated parse-and-fail.
    pub fn get_or_compile(&self, source: &str) -> Arc<CompiledTemplate> {
        if let Some(existing) = self.cache.get(source) {
            return existing.clone();
        }
        let compiled = match CompiledTemplate::compile(source) {
            Ok(compiled) => compiled,
            Err(err) => {
                log::warn!("logtap: template {:?} failed to compile ({}); using a no-op renderer", source, err);
                CompiledTemplate::noop()
            }
        };
        let compiled = Arc::new(compiled);
        self.cache.insert(source.to_string(), compiled.clone());
        compiled
    }

    /// Compiles every template in `sources` plus [`BUILTIN_TEMPLATES`],
    /// called once during [`crate::lifecycle::LifecycleController::start`].
    pub fn precompile<'a>(&self, sources: impl IntoIterator<Item = &'a str>) {
        for source in BUILTIN_TEMPLATES.iter().copied().chain(sources) {
            self.get_or_compile(source);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
