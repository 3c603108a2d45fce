//! Proc-macro front door for `logtap`'s attribute-driven interception tier.
//!
//! Each of these expands a single `fn` (free function or method) into one
//! that builds a [`logtap::CallContext`] and routes its body through
//! [`logtap::Interceptor`], the same way `tracing-attributes`'
//! `#[instrument]` routes a function body through a `Span`. See
//! [`expand`] for the shared codegen these five thin entry points drive.
mod args;
mod expand;

use expand::Mode;
use proc_macro::TokenStream;

/// Forces `Behavior::LogInput` for the annotated method regardless of
/// configuration or the auto-intercept default. The attribute tier always
/// wins over tier 2 and tier 3 in the decision cache's resolver.
///
/// ```ignore
/// #[logtap::log_input(level = "debug")]
/// fn charge(&self, amount: u64) -> Result<Receipt, PaymentError> { .. }
/// ```
#[proc_macro_attribute]
pub fn log_input(args: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand(Mode::LogInput, args.into(), item.into()).into()
}

/// Forces `Behavior::LogOutput`.
#[proc_macro_attribute]
pub fn log_output(args: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand(Mode::LogOutput, args.into(), item.into()).into()
}

/// Forces `Behavior::LogBoth`.
#[proc_macro_attribute]
pub fn log_both(args: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand(Mode::LogBoth, args.into(), item.into()).into()
}

/// Vetoes interception outright: the decision cache always resolves this
/// method to `None`, and no `CallContext` parameters are ever captured for
/// it, regardless of auto-intercept or any configuration pattern.
#[proc_macro_attribute]
pub fn no_log(args: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand(Mode::NoLog, args.into(), item.into()).into()
}

/// Opts a method out of the auto-intercept default. `DecisionOverride` has
/// only one veto tier, not a separate "skip tier 3 but still allow tier 2"
/// one, so this expands to the same `DecisionOverride::Disabled` as
/// [`no_log`]; an attribute-tier veto beats a configuration pattern the
/// same way it beats the auto-intercept default. A host that wants a method
/// logged only when a configuration pattern names it, with the
/// auto-intercept default otherwise skipping it, should omit the attribute
/// and rely on `auto_intercept = false` plus an explicit include pattern
/// instead.
#[proc_macro_attribute]
pub fn no_auto_log(args: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand(Mode::NoAutoLog, args.into(), item.into()).into()
}
