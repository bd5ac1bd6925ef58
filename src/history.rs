//! Fixed-capacity history of GC pause durations.
//!
//! The runtime records one pause per collection into a ring addressed by the
//! cumulative collection count modulo the capacity. Old entries are silently
//! overwritten once the count exceeds the capacity, so reads clamp to the
//! window that is still recoverable.

/// Number of pause slots retained. Collections more than this many behind
/// the cumulative count have been overwritten and are unrecoverable.
pub const HISTORY_CAPACITY: usize = 256;

/// Ring of per-collection pause durations in nanoseconds.
#[derive(Debug, Clone)]
pub struct PauseHistory {
    slots: [u64; HISTORY_CAPACITY],
}

impl PauseHistory {
    pub const fn new() -> Self {
        PauseHistory {
            slots: [0; HISTORY_CAPACITY],
        }
    }

    /// Record the pause for collection number `seq` (cumulative, 1-based).
    pub fn record(&mut self, seq: u64, pause_ns: u64) {
        debug_assert!(seq > 0, "collection numbers are 1-based");
        self.slots[((seq - 1) % HISTORY_CAPACITY as u64) as usize] = pause_ns;
    }

    /// The newest `take` pauses as of cumulative collection count `count`,
    /// newest first. Clamped to the capacity and to `count`: entries that
    /// have been overwritten are never returned.
    pub fn recent(&self, count: u64, take: u64) -> Vec<u64> {
        let take = take.min(count).min(HISTORY_CAPACITY as u64);
        (0..take)
            .map(|i| self.slots[((count - 1 - i) % HISTORY_CAPACITY as u64) as usize])
            .collect()
    }
}

impl Default for PauseHistory {
    fn default() -> Self {
        Self::new()
    }
}
