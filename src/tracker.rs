//! Incremental GC-statistics derivation.
//!
//! Cumulative runtime counters are monotonic and the pause history wraps, so
//! a single reading says nothing about recent activity. The tracker keeps
//! the previous sample's cumulative pause total, collection count, and
//! timestamp, and turns each new reading into per-interval figures: how many
//! collections happened, how much pause time accrued, and the individual
//! pauses still recoverable from the ring.

use crate::counters::RuntimeCounters;
use crate::history::HISTORY_CAPACITY;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// One immutable runtime snapshot, produced fresh on every sample.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStat {
    /// Sample timestamp, RFC 3339 with nanoseconds, UTC.
    pub time: String,

    /// Live lightweight tasks.
    pub tasks: i32,
    /// Cumulative foreign-function calls.
    pub ffi_calls: u64,

    pub memory_alloc: u64,
    pub memory_total_alloc: u64,
    pub memory_sys: u64,
    pub memory_lookups: u64,
    pub memory_mallocs: u64,
    pub memory_frees: u64,
    pub stack_in_use: u64,

    pub heap_alloc: u64,
    pub heap_sys: u64,
    pub heap_idle: u64,
    pub heap_in_use: u64,
    pub heap_released: u64,
    pub heap_objects: u64,

    /// Heap size that triggers the next collection.
    pub gc_next: u64,
    /// Unix nanoseconds of the most recent collection, 0 if none.
    pub gc_last: u64,
    /// Cumulative collections.
    pub gc_num: u64,
    /// Collections per second since the previous sample, over true elapsed
    /// wall-clock time.
    pub gc_per_second: f64,
    /// Pause milliseconds accrued since the previous sample. The divisor is
    /// a fixed nanosecond-to-millisecond unit conversion, not the sampling
    /// interval: the "per second" reading is only accurate when samples are
    /// taken roughly once per second.
    pub gc_pause_per_second: f64,
    /// Individual pauses since the previous sample, in milliseconds, newest
    /// first, capped at [`HISTORY_CAPACITY`] entries.
    pub gc_pause_ms: Vec<f64>,
}

/// Derives per-interval GC statistics from cumulative counters.
///
/// Holds the previous sample's cumulative pause total, collection count, and
/// timestamp; the initial all-unset state means "no prior sample" and
/// suppresses the rate fields on the first call. Not independently
/// thread-safe: callers serialize access (the snapshot service holds its
/// lock across `sample`).
#[derive(Debug, Default)]
pub struct GcDeltaTracker {
    last_pause_total_ns: u64,
    last_gc_count: u64,
    last_sample_at: Option<DateTime<Utc>>,
}

impl GcDeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a snapshot against the current wall clock.
    pub fn sample(&mut self, counters: &RuntimeCounters) -> RuntimeStat {
        self.sample_at(counters, Utc::now())
    }

    /// Take a snapshot as of `now`. Mutates the stored previous-sample state
    /// exactly once; this cannot fail.
    pub fn sample_at(&mut self, counters: &RuntimeCounters, now: DateTime<Utc>) -> RuntimeStat {
        // Collections since the previous sample. Anything past the ring
        // capacity has been overwritten, so the delta is clamped before it
        // feeds either the slice length or the rate numerator.
        let delta = counters
            .gc_count
            .saturating_sub(self.last_gc_count)
            .min(HISTORY_CAPACITY as u64);

        let mut gc_per_second = 0.0;
        let mut gc_pause_per_second = 0.0;
        if let Some(prev) = self.last_sample_at {
            // Fixed ns-to-ms unit conversion, deliberately not divided by
            // the sampling interval.
            gc_pause_per_second = counters
                .gc_pause_total_ns
                .saturating_sub(self.last_pause_total_ns) as f64
                / NANOS_PER_MILLI;

            // The collection rate is a true rate over the wall-clock gap. A
            // non-positive gap yields zero rather than a division artifact.
            let elapsed = (now - prev).to_std().map(|d| d.as_secs_f64()).unwrap_or(0.0);
            if elapsed > 0.0 {
                gc_per_second = delta as f64 / elapsed;
            }
        }

        let gc_pause_ms: Vec<f64> = counters
            .pause_history
            .recent(counters.gc_count, delta)
            .into_iter()
            .map(|ns| ns as f64 / NANOS_PER_MILLI)
            .collect();

        self.last_pause_total_ns = counters.gc_pause_total_ns;
        self.last_gc_count = counters.gc_count;
        self.last_sample_at = Some(now);

        RuntimeStat {
            time: now.to_rfc3339_opts(SecondsFormat::Nanos, true),
            tasks: counters.tasks,
            ffi_calls: counters.ffi_calls,
            memory_alloc: counters.alloc_bytes,
            memory_total_alloc: counters.total_alloc_bytes,
            memory_sys: counters.sys_bytes,
            memory_lookups: counters.lookups,
            memory_mallocs: counters.mallocs,
            memory_frees: counters.frees,
            stack_in_use: counters.stack_in_use,
            heap_alloc: counters.heap_alloc,
            heap_sys: counters.heap_sys,
            heap_idle: counters.heap_idle,
            heap_in_use: counters.heap_in_use,
            heap_released: counters.heap_released,
            heap_objects: counters.heap_objects,
            gc_next: counters.gc_next,
            gc_last: counters.gc_last_unix_ns,
            gc_num: counters.gc_count,
            gc_per_second,
            gc_pause_per_second,
            gc_pause_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::PauseHistory;
    use chrono::{Duration, TimeZone};

    fn counters_with_gc(count: u64, pause_total_ns: u64, pauses: &[(u64, u64)]) -> RuntimeCounters {
        let mut history = PauseHistory::new();
        for &(seq, ns) in pauses {
            history.record(seq, ns);
        }
        RuntimeCounters {
            gc_count: count,
            gc_pause_total_ns: pause_total_ns,
            pause_history: history,
            ..RuntimeCounters::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_sample_suppresses_rates_but_extracts_history() {
        let mut tracker = GcDeltaTracker::new();
        let counters = counters_with_gc(
            3,
            6_000_000,
            &[(1, 1_000_000), (2, 2_000_000), (3, 3_000_000)],
        );

        let stat = tracker.sample_at(&counters, t0());
        assert_eq!(stat.gc_per_second, 0.0);
        assert_eq!(stat.gc_pause_per_second, 0.0);
        assert_eq!(stat.gc_pause_ms, vec![3.0, 2.0, 1.0]);
        assert_eq!(stat.gc_num, 3);
    }

    #[test]
    fn second_sample_derives_rates() {
        let mut tracker = GcDeltaTracker::new();
        tracker.sample_at(&counters_with_gc(0, 0, &[]), t0());

        let pauses: Vec<(u64, u64)> = (1..=5).map(|seq| (seq, seq * 1_000_000)).collect();
        let counters = counters_with_gc(5, 15_000_000, &pauses);
        let stat = tracker.sample_at(&counters, t0() + Duration::seconds(2));

        assert_eq!(stat.gc_per_second, 2.5);
        assert_eq!(stat.gc_pause_per_second, 15.0);
        assert_eq!(stat.gc_pause_ms, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn pause_rate_ignores_wall_clock_gap() {
        for gap_ms in [10_000i64, 100] {
            let mut tracker = GcDeltaTracker::new();
            tracker.sample_at(&counters_with_gc(1, 1_000_000, &[(1, 1_000_000)]), t0());

            let counters = counters_with_gc(2, 8_000_000, &[(1, 1_000_000), (2, 7_000_000)]);
            let stat = tracker.sample_at(&counters, t0() + Duration::milliseconds(gap_ms));
            assert_eq!(stat.gc_pause_per_second, 7.0, "gap {}ms", gap_ms);
        }
    }

    #[test]
    fn collection_rate_scales_with_elapsed_time() {
        for (gap_secs, expected) in [(1i64, 4.0), (2, 2.0), (8, 0.5)] {
            let mut tracker = GcDeltaTracker::new();
            tracker.sample_at(&counters_with_gc(0, 0, &[]), t0());

            let pauses: Vec<(u64, u64)> = (1..=4).map(|seq| (seq, 1_000_000)).collect();
            let counters = counters_with_gc(4, 4_000_000, &pauses);
            let stat = tracker.sample_at(&counters, t0() + Duration::seconds(gap_secs));
            assert_eq!(stat.gc_per_second, expected, "gap {}s", gap_secs);
        }
    }

    #[test]
    fn no_collections_between_samples() {
        let mut tracker = GcDeltaTracker::new();
        let counters = counters_with_gc(2, 5_000_000, &[(1, 2_000_000), (2, 3_000_000)]);
        tracker.sample_at(&counters, t0());

        let stat = tracker.sample_at(&counters, t0() + Duration::seconds(1));
        assert_eq!(stat.gc_per_second, 0.0);
        assert_eq!(stat.gc_pause_per_second, 0.0);
        assert!(stat.gc_pause_ms.is_empty());
    }

    #[test]
    fn delta_clamps_to_history_capacity() {
        let mut tracker = GcDeltaTracker::new();
        let mut first = counters_with_gc(10, 10_000_000, &[]);
        for seq in 1..=10 {
            first.pause_history.record(seq, 1_000_000);
        }
        tracker.sample_at(&first, t0());

        let mut counters = counters_with_gc(300, 300_000_000, &[]);
        for seq in 1..=300 {
            counters.pause_history.record(seq, 1_000_000);
        }
        let stat = tracker.sample_at(&counters, t0() + Duration::seconds(4));

        // Raw delta is 290; only the newest 256 are recoverable, and the
        // clamped count also feeds the rate numerator.
        assert_eq!(stat.gc_pause_ms.len(), HISTORY_CAPACITY);
        assert_eq!(stat.gc_per_second, 64.0);
    }

    #[test]
    fn zero_elapsed_interval_yields_zero_rate() {
        let mut tracker = GcDeltaTracker::new();
        tracker.sample_at(&counters_with_gc(1, 1_000_000, &[(1, 1_000_000)]), t0());

        let counters = counters_with_gc(2, 2_000_000, &[(1, 1_000_000), (2, 1_000_000)]);
        let stat = tracker.sample_at(&counters, t0());
        assert_eq!(stat.gc_per_second, 0.0);
        assert_eq!(stat.gc_pause_per_second, 1.0);
    }

    #[test]
    fn deltas_are_relative_to_the_previous_sample() {
        let mut tracker = GcDeltaTracker::new();
        tracker.sample_at(&counters_with_gc(0, 0, &[]), t0());

        let counters = counters_with_gc(2, 4_000_000, &[(1, 1_000_000), (2, 3_000_000)]);
        tracker.sample_at(&counters, t0() + Duration::seconds(1));

        // Third call: two more collections on top of the second sample.
        let counters = counters_with_gc(
            4,
            9_000_000,
            &[(1, 1_000_000), (2, 3_000_000), (3, 2_000_000), (4, 3_000_000)],
        );
        let stat = tracker.sample_at(&counters, t0() + Duration::seconds(3));
        assert_eq!(stat.gc_per_second, 1.0);
        assert_eq!(stat.gc_pause_per_second, 5.0);
        assert_eq!(stat.gc_pause_ms, vec![3.0, 2.0]);
    }

    #[test]
    fn counter_fields_pass_through() {
        let mut tracker = GcDeltaTracker::new();
        let mut counters = counters_with_gc(0, 0, &[]);
        counters.tasks = 7;
        counters.ffi_calls = 9;
        counters.alloc_bytes = 1024;
        counters.heap_objects = 12;
        counters.gc_next = 2048;

        let stat = tracker.sample_at(&counters, t0());
        assert_eq!(stat.tasks, 7);
        assert_eq!(stat.ffi_calls, 9);
        assert_eq!(stat.memory_alloc, 1024);
        assert_eq!(stat.heap_objects, 12);
        assert_eq!(stat.gc_next, 2048);
        assert!(stat.time.starts_with("2024-05-01T12:00:00"));
    }
}
