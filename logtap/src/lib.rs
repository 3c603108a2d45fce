//! `logtap`: zero-configuration, attribute/configuration-driven method
//! interception with background-processed structured logging.
//!
//! A host wires a [`LogtapBuilder`] with sinks, a redactor, and (optionally)
//! an activity source, builds it, and drives it through a
//! [`LifecycleController`]:
//!
//! ```no_run
//! use logtap::{Config, LifecycleController, LogtapBuilder};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let config = Config::default();
//! let instance = LogtapBuilder::new(config).build();
//! let controller = Arc::new(LifecycleController::new(instance)).start();
//! // ... the process runs, intercepted methods log through `logtap::global()` ...
//! controller.shutdown().await;
//! # }
//! ```
//!
//! See the module-level docs on [`decision`], [`queue`], [`drain`],
//! [`template`], [`formatter`], [`writer`], and [`router`] for the pipeline
//! stages each one implements.
#![deny(missing_debug_implementations)]

pub mod config;
pub mod decision;
pub mod drain;
pub mod formatter;
pub mod interceptor;
mod lifecycle;
pub mod logger;
pub mod queue;
pub mod router;
pub mod template;
pub mod writer;

pub use config::{Config, ConfigError, FormatterKind, NamedTemplate, TargetConfig};
pub use decision::DecisionCache;
pub use drain::{CancellationToken, DrainWorker};
pub use formatter::{Formatter, FormattedOutput, FormatterRegistry};
pub use interceptor::{CallContext, Interceptor, ParamBuf, RawParam};
pub use lifecycle::{clear_global, global, install_global, try_global, LifecycleController, Logtap, LogtapBuilder};
pub use logger::{ActivityHandle, ManualLogger};
pub use queue::{BackgroundQueue, QueueDiagnostics};
pub use router::SinkRouter;
pub use template::{CompiledTemplate, TemplateEngine, TemplateParseError};
pub use writer::LogEntryWriter;

// Re-exported so downstream code (and the `logtap-attributes` macro
// expansions) can depend on `logtap` alone rather than also naming
// `logtap-core` directly.
pub use logtap_core::{
    any_pattern_matches, current_thread_id, ActivityId, ActivitySource, Behavior, DecisionOverride, EntryId,
    ExceptionInfo, InterceptionDecision, Level, LogEntry, LogValue, MethodDescriptor, MethodHandle, MethodPattern,
    NoopRedactor, Outcome, Param, ParameterDescriptor, Redactor, Sink, StdoutSink, TypeRegistry,
};

#[cfg(feature = "attributes")]
pub use logtap_attributes::{log_both, log_input, log_output, no_auto_log, no_log};

// Re-exported so code generated by `logtap-attributes`' function-rewriting
// macros can serialize captured parameters without requiring every crate
// that uses `#[logtap::log_input]` and friends to also add `serde_json` as
// its own direct dependency.
#[cfg(feature = "attributes")]
#[doc(hidden)]
pub use serde_json;
