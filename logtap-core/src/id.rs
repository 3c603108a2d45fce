//! Identity types used across the pipeline.
//!
//! [`EntryId`] identifies a single [`crate::entry::LogEntry`]; [`MethodHandle`]
//! identifies a method registered with the decision cache; [`ActivityId`]
//! identifies a correlation span opened through the manual logger facade.
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// A 128-bit identifier unique (with overwhelming probability) within the
/// lifetime of the process, attached to every [`crate::entry::LogEntry`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EntryId(uuid::Uuid);

impl EntryId {
    /// Generates a new, random entry id.
    pub fn generate() -> Self {
        EntryId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// A stable per-process handle identifying a method registered with the
/// decision cache.
///
/// Handles are allocated once, at registration time, by the decision cache.
/// Using an integer handle rather than a `(type, method)` string pair as the
/// cache key keeps the hot-path lookup allocation-free.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodHandle(NonZeroU64);

impl MethodHandle {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        MethodHandle(NonZeroU64::new(id).expect("method handle counter overflowed past u64::MAX"))
    }

    /// Returns the handle's raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

/// Identifies a correlation span opened via
/// [`crate::logger::ManualLogger::start_activity`].
///
/// Entries created while a span is open carry its `ActivityId` so they can be
/// grouped by an external viewer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityId(NonZeroU64);

impl ActivityId {
    /// Mints a new, process-unique span id. A host [`crate::host::ActivitySource`]
    /// implementation calls this from `start()`; the crate does not assume
    /// any particular span-id generation scheme beyond "unique for the
    /// process lifetime", so this is the constructor host code outside this
    /// crate is expected to use.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        ActivityId(NonZeroU64::new(id).expect("activity id counter overflowed past u64::MAX"))
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0.get())
    }
}

impl fmt::Debug for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActivityId({:x})", self.0.get())
    }
}

/// Returns an integer identifying the calling OS thread, for
/// [`crate::entry::LogEntry::thread_id`].
pub fn current_thread_id() -> u64 {
    // `ThreadId`'s internal representation isn't guaranteed stable or numeric
    // across std versions, so we mint our own small dense counter the first
    // time each thread touches the pipeline.
    thread_local! {
        static TID: u64 = next_thread_id();
    }
    TID.with(|id| *id)
}

fn next_thread_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_ids_are_unique() {
        let a = EntryId::generate();
        let b = EntryId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn method_handles_increase_monotonically() {
        let a = MethodHandle::next();
        let b = MethodHandle::next();
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn thread_id_is_stable_per_thread() {
        assert_eq!(current_thread_id(), current_thread_id());
    }
}
