//! Point-in-time runtime-health snapshots.
//!
//! One `get` call captures process metadata, allocator and GC counters, and
//! per-interval GC rates derived incrementally against the previous call,
//! merged with a caller-supplied opaque internal-status payload. Cumulative
//! counters and a 256-entry wrapping pause ring are turned into
//! collections/second, pause-milliseconds/second, and the individual pauses
//! since the last sample.
//!
//! # Embedding
//!
//! ```rust,ignore
//! use runstat::{CountingAllocator, GetRequest, RuntimeRegistry, StatService};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[global_allocator]
//! static ALLOC: CountingAllocator = CountingAllocator::system();
//!
//! let registry = Arc::new(RuntimeRegistry::new().with_allocator(&ALLOC));
//!
//! // The embedding runtime reports GC activity as it happens:
//! registry.record_collection(Duration::from_micros(150));
//!
//! let service = StatService::new(registry, || None);
//! let snapshot = service.get(&GetRequest::default());
//! println!("{}", snapshot.to_json()?);
//! ```

pub mod alloc;
pub mod counters;
pub mod error;
pub mod history;
pub mod registry;
pub mod service;
pub mod tracker;

pub use alloc::{AllocCounters, AllocStatSource, CountingAllocator};
pub use counters::{RuntimeCounters, RuntimeProbe};
pub use error::{Error, Result};
pub use history::{PauseHistory, HISTORY_CAPACITY};
pub use registry::{RuntimeRegistry, TaskGuard};
pub use service::{GetRequest, GetResponse, StatService};
pub use tracker::{GcDeltaTracker, RuntimeStat};
