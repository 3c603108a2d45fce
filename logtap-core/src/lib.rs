//! Core data model and collaborator traits for `logtap`.
//!
//! `logtap` is a zero-configuration, attribute/configuration-driven method
//! interceptor that routes structured call records through a background
//! logging pipeline. This crate defines the pieces that are shared between
//! the decision engine and the pipeline, and the traits a host application
//! implements to plug in redaction, sinks, and correlation spans.
//!
//! Application code will typically depend on the `logtap` crate directly;
//! this crate exists so that collaborator traits ([`redact::Redactor`],
//! [`sink::Sink`], [`host::TypeRegistry`], [`host::ActivitySource`]) and the
//! wire-level value types ([`entry::LogEntry`], [`decision::InterceptionDecision`])
//! can be depended on without pulling in the decision cache, queue, or
//! template engine.
#![deny(missing_debug_implementations)]

pub mod decision;
pub mod descriptor;
pub mod entry;
pub mod host;
pub mod id;
pub mod level;
pub mod redact;
pub mod sink;

pub use decision::{any_pattern_matches, Behavior, DecisionOverride, InterceptionDecision, MethodPattern};
pub use descriptor::{MethodDescriptor, ParameterDescriptor};
pub use entry::{ExceptionInfo, LogEntry, LogValue, Outcome, Param};
pub use host::{ActivitySource, TypeRegistry};
pub use id::{current_thread_id, ActivityId, EntryId, MethodHandle};
pub use level::Level;
pub use redact::{redaction_failure_marker, NoopRedactor, Redactor};
pub use sink::{Sink, StdoutSink};
