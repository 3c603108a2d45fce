//! The interceptor (C3): wraps a method call, building start/completion
//! entries, timing execution, and enqueueing the result.
//!
//! The source models this as a dynamic proxy handed an `Invocation`
//! capability (method metadata, a mutable argument list, `proceed()`, and a
//! mutable return slot). This crate has no runtime reflection to build that
//! capability from, so the host-chosen mechanism the specification allows
//! ("generated shim types, codegen at registration, or explicit wrapper
//! methods") takes the form of a plain closure: `body` below *is*
//! `proceed()`, and [`CallContext`] *is* the static half of `Invocation`
//! (the rest, a mutable argument list and a mutable return slot, has no
//! Rust-idiomatic analogue once the call is expressed as `FnOnce`, since the
//! closure already owns what it needs to run).
use crate::decision::DecisionCache;
use crate::queue::BackgroundQueue;
use logtap_core::{
    redaction_failure_marker, ActivitySource, ExceptionInfo, LogEntry, LogValue, MethodHandle,
    ParameterDescriptor, Redactor,
};
use smallvec::SmallVec;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// One raw (pre-redaction) argument, paired with the metadata the redactor
/// and the entry's `input_parameters` need.
#[derive(Debug)]
pub struct RawParam {
    pub descriptor: ParameterDescriptor,
    pub value: LogValue,
}

/// Call sites rarely carry more than a handful of parameters, so the
/// pre-redaction buffer is stack-allocated for the common case instead of
/// heap-allocated on every single call.
pub type ParamBuf = SmallVec<[RawParam; 4]>;

/// The static identity of a call site: everything the interceptor needs that
/// doesn't depend on actually running the method.
#[derive(Debug)]
pub struct CallContext {
    pub method_name: String,
    pub type_name: String,
    pub handle: MethodHandle,
    pub parameters: ParamBuf,
}

impl CallContext {
    pub fn new(method_name: impl Into<String>, type_name: impl Into<String>, handle: MethodHandle) -> Self {
        CallContext {
            method_name: method_name.into(),
            type_name: type_name.into(),
            handle,
            parameters: ParamBuf::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: impl Into<ParamBuf>) -> Self {
        self.parameters = parameters.into();
        self
    }
}

/// Wraps method calls with the decision-gated logging pipeline described by
/// C3. Cheap to clone: every field is a shared handle to process-wide state.
#[derive(Clone)]
pub struct Interceptor {
    decisions: Arc<DecisionCache>,
    queue: Arc<BackgroundQueue>,
    redactor: Arc<dyn Redactor>,
    activity_source: Option<Arc<dyn ActivitySource>>,
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor").finish_non_exhaustive()
    }
}

impl Interceptor {
    pub fn new(
        decisions: Arc<DecisionCache>,
        queue: Arc<BackgroundQueue>,
        redactor: Arc<dyn Redactor>,
        activity_source: Option<Arc<dyn ActivitySource>>,
    ) -> Self {
        Interceptor {
            decisions,
            queue,
            redactor,
            activity_source,
        }
    }

    /// The synchronous completion path (§4.2 step 4): runs `body` inline,
    /// timing it and enqueueing a completion entry either way. `body`'s
    /// `Result` is returned unchanged; on failure, after logging, the
    /// original error is rethrown rather than swallowed.
    pub fn intercept_sync<T, E>(&self, ctx: CallContext, body: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        T: serde::Serialize,
        E: std::error::Error,
    {
        let decision = match self.decisions.decision_for(ctx.handle) {
            Some(decision) => decision,
            None => return body(),
        };

        let input_parameters = if decision.behavior.captures_input() {
            self.redact_parameters(&ctx.type_name, ctx.parameters)
        } else {
            Vec::new()
        };
        let start_entry = LogEntry::start(
            ctx.method_name,
            ctx.type_name.clone(),
            self.activity_source.as_ref().and_then(|source| source.current()),
            decision.level,
            decision.error_level,
            decision.target.clone(),
            decision.formatter.clone(),
            None,
            input_parameters,
        );

        let started = Instant::now();
        let result = body();
        let duration = started.elapsed();

        match result {
            Ok(value) => {
                let output = if decision.behavior.captures_output() {
                    self.redact_output(&ctx.type_name, &start_entry.method_name, &value)
                } else {
                    None
                };
                let entry = start_entry.complete_success(duration, output);
                self.enqueue(entry);
                Ok(value)
            }
            Err(err) => {
                let entry = start_entry.complete_failure(duration, exception_info_of(&err));
                self.enqueue(entry);
                Err(err)
            }
        }
    }

    /// The deferred completion path (§4.2 step 5): awaits `fut` inline and
    /// attaches the completion entry once it resolves. Suspending on
    /// `.await` doesn't block an OS thread, so this satisfies "must not
    /// block the caller" the way a non-blocking continuation would in a
    /// host with its own task scheduler.
    pub async fn intercept_async<Fut, T, E>(&self, ctx: CallContext, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: serde::Serialize,
        E: std::error::Error,
    {
        let decision = match self.decisions.decision_for(ctx.handle) {
            Some(decision) => decision,
            None => return fut.await,
        };

        let input_parameters = if decision.behavior.captures_input() {
            self.redact_parameters(&ctx.type_name, ctx.parameters)
        } else {
            Vec::new()
        };
        let start_entry = LogEntry::start(
            ctx.method_name,
            ctx.type_name.clone(),
            self.activity_source.as_ref().and_then(|source| source.current()),
            decision.level,
            decision.error_level,
            decision.target.clone(),
            decision.formatter.clone(),
            None,
            input_parameters,
        );

        let started = Instant::now();
        let result = fut.await;
        let duration = started.elapsed();

        match result {
            Ok(value) => {
                let output = if decision.behavior.captures_output() {
                    self.redact_output(&ctx.type_name, &start_entry.method_name, &value)
                } else {
                    None
                };
                let entry = start_entry.complete_success(duration, output);
                self.enqueue(entry);
                Ok(value)
            }
            Err(err) => {
                let entry = start_entry.complete_failure(duration, exception_info_of(&err));
                self.enqueue(entry);
                Err(err)
            }
        }
    }

    fn redact_parameters(&self, declaring_type: &str, parameters: ParamBuf) -> Vec<logtap_core::Param> {
        parameters
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let name = raw.descriptor.name.clone().unwrap_or_else(|| logtap_core::Param::fallback_name(index));
                let type_name = raw.descriptor.type_name.clone().unwrap_or_else(|| "null".to_string());
                let redacted = self.redact_value_guarded(declaring_type, &raw.descriptor, raw.value);
                logtap_core::Param::new(name, type_name, redacted)
            })
            .collect()
    }

    /// Redaction must never abort the call: a panicking [`Redactor`]
    /// implementation is caught and replaced with the redaction-failure
    /// marker, logged once at warning severity.
    fn redact_value_guarded(&self, declaring_type: &str, descriptor: &ParameterDescriptor, value: LogValue) -> LogValue {
        let redactor = self.redactor.clone();
        let declaring_type = declaring_type.to_string();
        match panic::catch_unwind(AssertUnwindSafe(|| redactor.redact_parameter(&declaring_type, descriptor, value))) {
            Ok(redacted) => redacted,
            Err(_) => {
                log::warn!("logtap: redactor panicked on {}::{}; substituting marker", declaring_type, descriptor.name_or_fallback());
                redaction_failure_marker()
            }
        }
    }

    fn redact_output<T: serde::Serialize>(&self, declaring_type: &str, method_name: &str, value: &T) -> Option<LogValue> {
        let raw = serde_json::to_value(value).ok()?;
        if raw.is_null() {
            // A `()`-returning method serializes to `Value::Null`; the
            // specification's boundary for "no return value" is an absent
            // `output_value`, not a recorded null.
            return None;
        }
        let redactor = self.redactor.clone();
        let declaring_type = declaring_type.to_string();
        let method_name = method_name.to_string();
        match panic::catch_unwind(AssertUnwindSafe(|| redactor.redact_output(&declaring_type, &method_name, raw))) {
            Ok(redacted) => Some(redacted),
            Err(_) => {
                log::warn!("logtap: redactor panicked redacting output of {}::{}; substituting marker", declaring_type, method_name);
                Some(redaction_failure_marker())
            }
        }
    }

    /// Enqueues `entry`, emitting a single internal warning on drop. Never
    /// propagates a failure to the caller: a full, closed queue is the
    /// background pipeline's problem, not the intercepted call's.
    fn enqueue(&self, entry: LogEntry) {
        if !self.queue.try_enqueue(entry) {
            log::warn!("logtap: background queue is closed; entry dropped");
        }
    }
}

/// Builds the exception metadata attached to a failed completion entry.
/// Rust has no runtime type registry to name an error's "kind" the way a
/// managed host would, so `kind_name` uses the statically known error
/// type's name, and `base_cause_kind_name` falls back to the cause's
/// `Display` text, since `std::error::Error::source()` returns a trait
/// object with no type name without an explicit `Any` downcast.
fn exception_info_of<E: std::error::Error>(err: &E) -> ExceptionInfo {
    ExceptionInfo {
        kind_name: short_type_name::<E>(),
        message: err.to_string(),
        stack_snapshot: None,
        base_cause_kind_name: std::error::Error::source(err).map(|cause| cause.to_string()),
    }
}

fn short_type_name<T>() -> String {
    std::any::type_name::<T>().rsplit("::").next().unwrap_or("Error").to_string()
}
