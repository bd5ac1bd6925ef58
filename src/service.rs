//! Snapshot assembly and the `get` operation.

use crate::counters::RuntimeProbe;
use crate::error::{Error, Result};
use crate::tracker::{GcDeltaTracker, RuntimeStat};
use chrono::{SecondsFormat, Utc};
use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

/// Snapshot request. Carries no fields; reserved for future use.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GetRequest {}

impl GetRequest {
    /// Decode a request from the wire.
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(Error::Decode)
    }
}

/// One complete snapshot: process metadata, runtime statistics, and the
/// caller-supplied internal status.
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// Snapshot timestamp, RFC 3339 with nanoseconds, UTC.
    pub time: String,
    /// Compiler identity the process was built with.
    pub runtime_version: String,
    pub os: String,
    pub arch: String,
    /// Logical CPUs.
    pub cpu_num: i32,
    /// Configured parallelism level.
    pub parallelism: i32,
    pub runtime_stat: RuntimeStat,
    /// Opaque internal status, passed through verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_stat: Option<Value>,
}

impl GetResponse {
    /// Encode for the wire.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Runtime-health snapshot service.
///
/// One `get` call captures the process metadata, samples the GC-delta
/// tracker, and merges in the registered internal-status payload. Requests
/// are serialized behind a single lock so every caller's deltas are computed
/// against fully-updated tracker state.
pub struct StatService {
    probe: Arc<dyn RuntimeProbe>,
    tracker: Mutex<GcDeltaTracker>,
    internal: Box<dyn Fn() -> Option<Value> + Send + Sync>,
    parallelism: i32,
}

impl StatService {
    /// Create a service over `probe`.
    ///
    /// `internal` is invoked exactly once per `get`, while the snapshot lock
    /// is held; it must not call back into this service.
    pub fn new<F>(probe: Arc<dyn RuntimeProbe>, internal: F) -> Self
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        StatService {
            probe,
            tracker: Mutex::new(GcDeltaTracker::new()),
            internal: Box::new(internal),
            parallelism: default_parallelism(),
        }
    }

    /// Override the reported parallelism level.
    pub fn with_parallelism(mut self, parallelism: i32) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Assemble one snapshot.
    ///
    /// The lock is held for the whole assembly and released by scope on
    /// every exit path. The tracker mutation happens before the result is
    /// returned, so a transport that abandons the response has still
    /// advanced the rate baseline for subsequent calls.
    pub fn get(&self, _req: &GetRequest) -> GetResponse {
        let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);

        let runtime_stat = tracker.sample(&self.probe.read());
        trace!("runtime snapshot assembled, gc_num={}", runtime_stat.gc_num);

        GetResponse {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            runtime_version: env!("RUNSTAT_RUSTC_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_num: num_cpus::get() as i32,
            parallelism: self.parallelism,
            runtime_stat,
            internal_stat: (self.internal)(),
        }
    }
}

fn default_parallelism() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(1)
}
