//! Fixed-size pool of recognition workers draining one resolution's streams.
//!
//! ## Architecture
//!
//! ```text
//! WorkerPool::run(pass)
//!        │
//!        ├── alpr-worker-0 ─┐
//!        ├── alpr-worker-1 ─┼─ RoundRobin.next_index() → VideoStream
//!        └── alpr-worker-N ─┘        │
//!                                    ├─ queue empty → sleep(poll_interval), retry
//!                                    └─ process_frame(recognizer)
//!                                          │ valid
//!                                          ├─ pop_completed_groups_and_classify
//!                                          └─ SharedCounters.record (locked)
//! ```
//!
//! Each worker owns one recognizer and one classifier for the whole pass, so
//! engine load cost is paid once per resolution rather than per frame. The
//! lock around the shared counters is never held across a recognizer call.
//!
//! In GPU mode the pool runs a single batch loop on the calling thread, since
//! several threads contending for one device only slows it down.
//!
//! ## Termination
//!
//! A worker stops when no stream is active and none has queued work, or when
//! the cancellation flag is raised. The flag is polled at the top of every
//! iteration and the only blocking wait is the fixed poll sleep, so a
//! cancelled pool joins within roughly one poll interval. Recognizer calls
//! have no timeout; a hung engine hangs its worker.

use crate::config::{BenchmarkConfig, Resolution};
use crate::counters::SharedCounters;
use crate::cpu::CpuSampler;
use crate::engine::{EngineBackend, EngineSettings, Recognizer, VideoStream};
use crate::error::{BenchError, BenchResult};
use crate::round_robin::RoundRobin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Cooperative stop signal shared by the driver and every worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads (one per logical CPU)
    pub num_workers: usize,
    /// Sleep when the drawn stream has nothing queued
    pub poll_interval: Duration,
    /// Single-threaded batch mode
    pub gpu: bool,
    /// Frames per batch in GPU mode
    pub batch_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            poll_interval: Duration::from_millis(100),
            gpu: false,
            batch_size: 10,
        }
    }
}

impl From<&BenchmarkConfig> for WorkerPoolConfig {
    fn from(config: &BenchmarkConfig) -> Self {
        Self {
            num_workers: config.workers,
            poll_interval: config.poll_interval,
            gpu: config.gpu,
            batch_size: config.gpu_batch_size,
        }
    }
}

/// Everything the workers of one resolution pass share.
pub struct PassContext<'a, B: EngineBackend> {
    pub resolution: Resolution,
    pub backend: &'a B,
    pub settings: &'a EngineSettings,
    pub streams: &'a [B::Stream],
    pub round_robin: &'a RoundRobin,
    pub counters: &'a SharedCounters,
    pub sampler: &'a dyn CpuSampler,
    pub cancel: &'a CancellationFlag,
}

/// Statistics for a single worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Valid results counted into the shared frame counter
    pub valid_results: u64,
    /// Results rejected as invalid
    pub invalid_results: u64,
    /// Draws that found an empty queue and slept
    pub idle_polls: u64,
    /// Plate groups handed to the classifier
    pub groups_classified: u64,
}

/// Outcome of one pool run.
#[derive(Debug, Clone)]
pub struct PoolReport {
    /// Wall time from pool start to the last worker joining
    pub elapsed: Duration,
    /// Whether the run ended because the cancellation flag was raised
    pub cancelled: bool,
    pub workers: Vec<WorkerStats>,
}

impl PoolReport {
    #[must_use]
    pub fn valid_results(&self) -> u64 {
        self.workers.iter().map(|w| w.valid_results).sum()
    }
}

pub struct WorkerPool {
    config: WorkerPoolConfig,
}

impl WorkerPool {
    #[must_use]
    pub const fn new(config: WorkerPoolConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Run workers over the pass's streams and block until all of them stop.
    ///
    /// # Errors
    ///
    /// Returns the first worker failure: a recognizer or classifier that could
    /// not be loaded, `BenchError::BatchUnsupported` in GPU mode, or a worker
    /// thread that could not be spawned or panicked.
    pub fn run<B: EngineBackend>(&self, pass: &PassContext<'_, B>) -> BenchResult<PoolReport> {
        let halt = AtomicBool::new(false);
        let start = Instant::now();

        let outcomes = if self.config.gpu {
            vec![RecognitionWorker::load(0, pass, &self.config, &halt).and_then(|w| w.run())]
        } else {
            self.run_threads(pass, &halt)
        };

        let elapsed = start.elapsed();
        let mut workers = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            workers.push(outcome?);
        }

        let report = PoolReport {
            elapsed,
            cancelled: pass.cancel.is_cancelled(),
            workers,
        };
        tracing::debug!(
            resolution = %pass.resolution,
            elapsed_ms = report.elapsed.as_millis() as u64,
            valid = report.valid_results(),
            cancelled = report.cancelled,
            "worker pool joined"
        );
        Ok(report)
    }

    fn run_threads<B: EngineBackend>(
        &self,
        pass: &PassContext<'_, B>,
        halt: &AtomicBool,
    ) -> Vec<BenchResult<WorkerStats>> {
        let config = &self.config;
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(config.num_workers);
            let mut outcomes = Vec::with_capacity(config.num_workers);

            for worker_id in 0..config.num_workers {
                let spawned = thread::Builder::new()
                    .name(format!("alpr-worker-{worker_id}"))
                    .spawn_scoped(scope, move || {
                        let outcome = RecognitionWorker::load(worker_id, pass, config, halt)
                            .and_then(RecognitionWorker::run);
                        if outcome.is_err() {
                            halt.store(true, Ordering::SeqCst);
                        }
                        outcome
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        halt.store(true, Ordering::SeqCst);
                        outcomes.push(Err(BenchError::Engine(format!(
                            "failed to spawn worker thread {worker_id}: {e}"
                        ))));
                        break;
                    }
                }
            }

            for handle in handles {
                let outcome = handle.join().unwrap_or_else(|_| {
                    halt.store(true, Ordering::SeqCst);
                    Err(BenchError::Engine("recognition worker panicked".to_string()))
                });
                outcomes.push(outcome);
            }
            outcomes
        })
    }
}

/// One unit of execution: a recognizer and classifier pair pulling frames
/// from the shared streams in round-robin order.
struct RecognitionWorker<'p, 'a, B: EngineBackend> {
    id: usize,
    pass: &'p PassContext<'a, B>,
    config: &'p WorkerPoolConfig,
    halt: &'p AtomicBool,
    recognizer: B::Recognizer,
    classifier: B::Classifier,
    stats: WorkerStats,
}

impl<'p, 'a, B: EngineBackend> RecognitionWorker<'p, 'a, B> {
    fn load(
        id: usize,
        pass: &'p PassContext<'a, B>,
        config: &'p WorkerPoolConfig,
        halt: &'p AtomicBool,
    ) -> BenchResult<Self> {
        let recognizer = pass.backend.recognizer(pass.settings)?;
        if config.gpu && !recognizer.supports_batch() {
            return Err(BenchError::BatchUnsupported {
                version: recognizer.version(),
            });
        }
        let classifier = pass.backend.classifier(pass.settings)?;

        Ok(Self {
            id,
            pass,
            config,
            halt,
            recognizer,
            classifier,
            stats: WorkerStats::default(),
        })
    }

    fn should_stop(&self) -> bool {
        self.pass.cancel.is_cancelled() || self.halt.load(Ordering::Relaxed)
    }

    fn work_remaining(&self) -> bool {
        self.pass
            .streams
            .iter()
            .any(|s| s.is_active() || s.queue_size() > 0)
    }

    fn run(mut self) -> BenchResult<WorkerStats> {
        let frames_per_result = if self.config.gpu {
            self.config.batch_size as u64
        } else {
            1
        };

        loop {
            if !self.work_remaining() || self.should_stop() {
                break;
            }

            let idx = self.pass.round_robin.next_index();
            let Some(stream) = self.pass.streams.get(idx) else {
                break;
            };
            if stream.queue_size() == 0 {
                self.stats.idle_polls += 1;
                thread::sleep(self.config.poll_interval);
                continue;
            }

            let result = if self.config.gpu {
                stream.process_batch(&mut self.recognizer, self.config.batch_size)?
            } else {
                stream.process_frame(&mut self.recognizer)
            };
            if !result.is_valid() {
                self.stats.invalid_results += 1;
                continue;
            }

            let groups = stream.pop_completed_groups_and_classify(&mut self.classifier);
            self.stats.groups_classified += groups.len() as u64;
            self.pass
                .counters
                .record(self.pass.resolution, frames_per_result, self.pass.sampler);
            self.stats.valid_results += 1;
        }

        tracing::trace!(worker = self.id, stats = ?self.stats, "worker finished");
        Ok(self.stats)
    }
}
