//! Cumulative runtime counters and the probe seam.

use crate::history::PauseHistory;

/// Point-in-time view of the process's cumulative runtime counters.
///
/// Everything except the gauges (`tasks` and the live byte counts) is
/// monotonic; the tracker differences the monotonic fields across samples.
#[derive(Debug, Clone, Default)]
pub struct RuntimeCounters {
    /// Live lightweight tasks.
    pub tasks: i32,
    /// Cumulative foreign-function calls.
    pub ffi_calls: u64,

    /// Bytes of live heap data.
    pub alloc_bytes: u64,
    /// Cumulative bytes allocated over the process lifetime.
    pub total_alloc_bytes: u64,
    /// Bytes obtained from the OS.
    pub sys_bytes: u64,
    /// Pointer lookups performed by the runtime.
    pub lookups: u64,
    /// Cumulative allocations.
    pub mallocs: u64,
    /// Cumulative frees.
    pub frees: u64,
    /// Stack bytes in use.
    pub stack_in_use: u64,

    /// Heap bytes holding live objects.
    pub heap_alloc: u64,
    /// Heap bytes obtained from the OS.
    pub heap_sys: u64,
    /// Heap bytes in spans with no live objects.
    pub heap_idle: u64,
    /// Heap bytes in spans with at least one live object.
    pub heap_in_use: u64,
    /// Heap bytes returned to the OS.
    pub heap_released: u64,
    /// Live heap objects.
    pub heap_objects: u64,

    /// Heap size that triggers the next collection.
    pub gc_next: u64,
    /// Unix nanoseconds of the most recent collection, 0 if none.
    pub gc_last_unix_ns: u64,
    /// Cumulative collections.
    pub gc_count: u64,
    /// Cumulative pause nanoseconds across all collections.
    pub gc_pause_total_ns: u64,
    /// Per-collection pause ring.
    pub pause_history: PauseHistory,
}

/// Source of runtime counters.
///
/// Implemented by [`RuntimeRegistry`](crate::registry::RuntimeRegistry) for
/// in-process collection; tests substitute scripted probes. Reads are
/// best-effort queries that cannot fail.
pub trait RuntimeProbe: Send + Sync {
    fn read(&self) -> RuntimeCounters;
}
