//! Traits describing the host collaborators this crate consumes but does not
//! implement: a registry of candidate concrete types (stand-in for DI
//! container assembly scanning) and a source of correlation spans.
use crate::id::ActivityId;

/// A registry of concrete types known to the host, consulted when the
/// decision cache needs to resolve an interface method to a concrete
/// implementation.
///
/// A real host populates this via whatever mechanism it uses for type
/// discovery (build-time codegen, an explicit bootstrap list, a
/// dependency-injection container's assembly scan); this crate only consumes
/// the result.
pub trait TypeRegistry: Send + Sync {
    /// Names of concrete types previously registered as assignable to
    /// `interface_type`.
    fn implementations_of(&self, interface_type: &str) -> Vec<String>;
}

/// A source of correlation spans ("activities"), consulted by
/// [`crate::entry::LogEntry`] to propagate an `activity_id`.
pub trait ActivitySource: Send + Sync {
    /// Opens a new span named `name`, nested under the current one if any,
    /// and returns its id.
    fn start(&self, name: &str) -> ActivityId;

    /// Closes the span identified by `id`.
    fn end(&self, id: ActivityId);

    /// The id of the span currently open on the calling thread, if any.
    fn current(&self) -> Option<ActivityId>;
}
