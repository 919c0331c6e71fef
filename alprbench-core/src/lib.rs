//! Multi-stream speed benchmark harness for automatic license plate recognition engines.
//!
//! A fixed pool of worker threads fans out over a round-robin set of simulated camera
//! streams, drains their frame queues through a recognizer, and aggregates frame counts
//! and CPU utilisation samples under a shared lock. An adaptive search wraps the harness
//! and keeps adding streams until the lowest per-resolution CPU average crosses a target.
//!
//! ```text
//! AdaptiveSearch ──► ExperimentRunner ──► WorkerPool (one per resolution)
//!                         │                    │
//!                         │                    ├─ RecognitionWorker × cpus
//!                         │                    │     └─ RoundRobin → VideoStream → Recognizer
//!                         │                    └─ SharedCounters (frames, CPU samples)
//!                         └─► ResultsTable (one row per resolution)
//! ```

#![warn(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo
)]
#![deny(clippy::unwrap_in_result, clippy::panic_in_result_fn)]

pub mod assets;
pub mod config;
pub mod counters;
pub mod cpu;
pub mod engine;
pub mod error;
pub mod experiment;
pub mod host;
pub mod results;
pub mod round_robin;
pub mod search;
pub mod synthetic;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod worker_pool;

pub use config::{BenchmarkConfig, Resolution, parse_resolutions};
pub use counters::SharedCounters;
pub use cpu::{CpuSampler, SystemCpuSampler};
pub use engine::{
    EngineBackend, EngineSettings, Frame, FrameResult, PlateGroup, Recognizer, VehicleAttributes,
    VehicleClassifier, VideoStream,
};
pub use error::{BenchError, BenchResult};
pub use experiment::{ExperimentRunner, PassOutcome};
pub use results::{ResultRow, ResultsTable};
pub use round_robin::RoundRobin;
pub use search::{AdaptiveSearch, Experiment, SearchOutcome, SearchState};
pub use synthetic::{SyntheticBackend, SyntheticSettings};
pub use worker_pool::{CancellationFlag, PoolReport, WorkerPool};
