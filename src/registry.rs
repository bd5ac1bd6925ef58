//! In-process runtime registry.
//!
//! The registry is the ambient-runtime stand-in: the embedding application
//! reports GC activity, task lifecycles, and foreign calls into it, and the
//! snapshot service probes it for cumulative counters.

use crate::alloc::AllocStatSource;
use crate::counters::{RuntimeCounters, RuntimeProbe};
use crate::history::PauseHistory;
use log::debug;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cumulative GC counters, kept behind one lock so reporting and probing
/// observe a consistent triple of count, pause total, and ring contents.
#[derive(Debug, Default)]
struct GcCounters {
    count: u64,
    pause_total_ns: u64,
    last_unix_ns: u64,
    next_target_bytes: u64,
    pauses: PauseHistory,
}

/// Default [`RuntimeProbe`]: cumulative counters fed by the embedding
/// application, plus an optional counting allocator for the memory fields.
pub struct RuntimeRegistry {
    alloc: Option<&'static dyn AllocStatSource>,
    tasks: AtomicI64,
    ffi_calls: AtomicU64,
    gc: Mutex<GcCounters>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        RuntimeRegistry {
            alloc: None,
            tasks: AtomicI64::new(0),
            ffi_calls: AtomicU64::new(0),
            gc: Mutex::new(GcCounters::default()),
        }
    }

    /// Wire the registry to a counting allocator so the memory fields of the
    /// snapshot are populated.
    pub fn with_allocator(mut self, alloc: &'static dyn AllocStatSource) -> Self {
        self.alloc = Some(alloc);
        self
    }

    /// Track one live lightweight task; the gauge drops back when the guard
    /// is dropped.
    pub fn task(&self) -> TaskGuard<'_> {
        self.tasks.fetch_add(1, Ordering::Relaxed);
        TaskGuard { registry: self }
    }

    /// Count one foreign-function call.
    pub fn record_ffi_call(&self) {
        self.ffi_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Report a completed collection and its stop-the-world pause.
    pub fn record_collection(&self, pause: Duration) {
        let pause_ns = pause.as_nanos() as u64;
        let mut gc = self.gc.lock().unwrap_or_else(PoisonError::into_inner);
        gc.count += 1;
        gc.pause_total_ns += pause_ns;
        gc.last_unix_ns = unix_now_ns();
        let seq = gc.count;
        gc.pauses.record(seq, pause_ns);
        debug!("collection {} recorded, pause {}ns", seq, pause_ns);
    }

    /// Record the heap size that will trigger the next collection.
    pub fn set_gc_target(&self, bytes: u64) {
        self.gc.lock().unwrap_or_else(PoisonError::into_inner).next_target_bytes = bytes;
    }
}

impl Default for RuntimeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeProbe for RuntimeRegistry {
    fn read(&self) -> RuntimeCounters {
        let alloc = self.alloc.map(|a| a.counters()).unwrap_or_default();
        let gc = self.gc.lock().unwrap_or_else(PoisonError::into_inner);

        RuntimeCounters {
            tasks: self.tasks.load(Ordering::Relaxed) as i32,
            ffi_calls: self.ffi_calls.load(Ordering::Relaxed),
            alloc_bytes: alloc.live_bytes,
            total_alloc_bytes: alloc.total_bytes,
            sys_bytes: alloc.sys_bytes,
            // Pointer lookups, stack usage, and released-to-OS bytes are not
            // observable from an allocator wrapper.
            lookups: 0,
            mallocs: alloc.mallocs,
            frees: alloc.frees,
            stack_in_use: 0,
            heap_alloc: alloc.live_bytes,
            heap_sys: alloc.sys_bytes,
            heap_idle: alloc.sys_bytes.saturating_sub(alloc.live_bytes),
            heap_in_use: alloc.live_bytes,
            heap_released: 0,
            heap_objects: alloc.mallocs.saturating_sub(alloc.frees),
            gc_next: gc.next_target_bytes,
            gc_last_unix_ns: gc.last_unix_ns,
            gc_count: gc.count,
            gc_pause_total_ns: gc.pause_total_ns,
            pause_history: gc.pauses.clone(),
        }
    }
}

/// Live-task handle returned by [`RuntimeRegistry::task`].
pub struct TaskGuard<'a> {
    registry: &'a RuntimeRegistry,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.registry.tasks.fetch_sub(1, Ordering::Relaxed);
    }
}

fn unix_now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
