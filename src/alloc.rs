//! Allocator instrumentation.
//!
//! [`CountingAllocator`] wraps the host's allocator and keeps cumulative
//! counters for every allocation that flows through it. Install it as the
//! global allocator and hand it to the registry:
//!
//! ```rust,ignore
//! #[global_allocator]
//! static ALLOC: runstat::CountingAllocator = runstat::CountingAllocator::system();
//!
//! let registry = RuntimeRegistry::new().with_allocator(&ALLOC);
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of allocator counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocCounters {
    /// Bytes currently live (allocated minus freed).
    pub live_bytes: u64,
    /// Cumulative bytes allocated.
    pub total_bytes: u64,
    /// High-water mark of live bytes; stands in for bytes obtained from the OS.
    pub sys_bytes: u64,
    /// Cumulative allocations.
    pub mallocs: u64,
    /// Cumulative frees.
    pub frees: u64,
}

/// Anything that can report allocator counters.
pub trait AllocStatSource: Sync {
    fn counters(&self) -> AllocCounters;
}

/// `GlobalAlloc` wrapper that counts allocations flowing through it.
///
/// A `realloc` counts as a free of the old block plus a fresh allocation.
/// Counters are per-instance so the wrapper can also be exercised without
/// being installed globally.
pub struct CountingAllocator<A = System> {
    inner: A,
    allocated: AtomicU64,
    freed: AtomicU64,
    mallocs: AtomicU64,
    frees: AtomicU64,
    high_water: AtomicU64,
}

impl CountingAllocator<System> {
    /// Counting wrapper around the system allocator.
    pub const fn system() -> Self {
        Self::new(System)
    }
}

impl<A> CountingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        CountingAllocator {
            inner,
            allocated: AtomicU64::new(0),
            freed: AtomicU64::new(0),
            mallocs: AtomicU64::new(0),
            frees: AtomicU64::new(0),
            high_water: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_alloc(&self, size: usize) {
        let allocated = self.allocated.fetch_add(size as u64, Ordering::Relaxed) + size as u64;
        self.mallocs.fetch_add(1, Ordering::Relaxed);
        let live = allocated.saturating_sub(self.freed.load(Ordering::Relaxed));
        self.high_water.fetch_max(live, Ordering::Relaxed);
    }

    #[inline]
    fn record_free(&self, size: usize) {
        self.freed.fetch_add(size as u64, Ordering::Relaxed);
        self.frees.fetch_add(1, Ordering::Relaxed);
    }
}

impl<A: Sync> AllocStatSource for CountingAllocator<A> {
    fn counters(&self) -> AllocCounters {
        let allocated = self.allocated.load(Ordering::Relaxed);
        let freed = self.freed.load(Ordering::Relaxed);
        AllocCounters {
            live_bytes: allocated.saturating_sub(freed),
            total_bytes: allocated,
            sys_bytes: self.high_water.load(Ordering::Relaxed),
            mallocs: self.mallocs.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
        }
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAllocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.record_free(layout.size());
        unsafe { self.inner.dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            self.record_free(layout.size());
            self.record_alloc(new_size);
        }
        new_ptr
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_alloc_and_free() {
        let alloc = CountingAllocator::system();
        let layout = Layout::from_size_align(64, 8).unwrap();

        unsafe {
            let ptr = alloc.alloc(layout);
            assert!(!ptr.is_null());

            let counters = alloc.counters();
            assert_eq!(counters.mallocs, 1);
            assert_eq!(counters.live_bytes, 64);
            assert_eq!(counters.sys_bytes, 64);

            alloc.dealloc(ptr, layout);
        }

        let counters = alloc.counters();
        assert_eq!(counters.frees, 1);
        assert_eq!(counters.live_bytes, 0);
        assert_eq!(counters.total_bytes, 64);
        // High-water mark outlives the allocation.
        assert_eq!(counters.sys_bytes, 64);
    }

    #[test]
    fn realloc_counts_free_plus_alloc() {
        let alloc = CountingAllocator::system();
        let layout = Layout::from_size_align(32, 8).unwrap();

        unsafe {
            let ptr = alloc.alloc(layout);
            assert!(!ptr.is_null());
            let grown = alloc.realloc(ptr, layout, 128);
            assert!(!grown.is_null());

            let counters = alloc.counters();
            assert_eq!(counters.mallocs, 2);
            assert_eq!(counters.frees, 1);
            assert_eq!(counters.live_bytes, 128);
            assert_eq!(counters.total_bytes, 32 + 128);

            alloc.dealloc(grown, Layout::from_size_align(128, 8).unwrap());
        }

        assert_eq!(alloc.counters().live_bytes, 0);
    }
}
