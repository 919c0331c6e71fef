//! One full benchmark pass at a fixed stream count.

use crate::config::{BenchmarkConfig, Resolution};
use crate::counters::SharedCounters;
use crate::cpu::CpuSampler;
use crate::engine::{EngineBackend, EngineSettings, VideoStream};
use crate::error::BenchResult;
use crate::results::{ResultRow, ResultsTable};
use crate::round_robin::RoundRobin;
use crate::search::Experiment;
use crate::worker_pool::{CancellationFlag, PassContext, PoolReport, WorkerPool, WorkerPoolConfig};
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of running every resolution once at a given stream count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassOutcome {
    pub streams: usize,
    /// Lowest per-resolution average CPU utilisation, 0.0 if nothing was sampled
    pub min_cpu: f64,
    /// The pass stopped early on user cancellation
    pub cancelled: bool,
}

/// Drives resolution passes over freshly created streams and keeps the
/// result rows of the most recent experiment.
pub struct ExperimentRunner<'a, B: EngineBackend> {
    backend: &'a B,
    config: &'a BenchmarkConfig,
    settings: EngineSettings,
    videos: Vec<(Resolution, PathBuf)>,
    counters: SharedCounters,
    sampler: &'a dyn CpuSampler,
    cancel: CancellationFlag,
    pool: WorkerPool,
    results: ResultsTable,
}

impl<'a, B: EngineBackend> ExperimentRunner<'a, B> {
    /// `videos` holds one benchmark file per requested resolution, in the
    /// order the resolutions are processed.
    #[must_use]
    pub fn new(
        backend: &'a B,
        config: &'a BenchmarkConfig,
        videos: Vec<(Resolution, PathBuf)>,
        sampler: &'a dyn CpuSampler,
        cancel: CancellationFlag,
    ) -> Self {
        Self {
            backend,
            config,
            settings: config.engine_settings(),
            videos,
            counters: SharedCounters::new(config.cpu_sample_every),
            sampler,
            cancel,
            pool: WorkerPool::new(WorkerPoolConfig::from(config)),
            results: ResultsTable::new(),
        }
    }

    /// Rows of the last experiment.
    #[must_use]
    pub const fn results(&self) -> &ResultsTable {
        &self.results
    }

    #[must_use]
    pub fn into_results(self) -> ResultsTable {
        self.results
    }

    /// Run every resolution once with `num_streams` new streams.
    ///
    /// Streams, the round-robin sequence, the counters and the result rows
    /// from any previous experiment are discarded first. On cancellation the
    /// interrupted resolution still gets a row and the remaining ones are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Fails if a stream cannot bind its video file or the worker pool fails.
    pub fn run_pass(&mut self, num_streams: usize) -> BenchResult<PassOutcome> {
        let streams: Vec<B::Stream> = (0..num_streams)
            .map(|_| self.backend.stream(self.config.queue_capacity))
            .collect();
        let round_robin = RoundRobin::new(num_streams);
        let resolutions: Vec<Resolution> = self.videos.iter().map(|(res, _)| *res).collect();
        self.counters.reset(&resolutions);
        self.results.clear_rows();

        info!(streams = num_streams, "testing with {num_streams} stream(s)");
        let mut cancelled = false;
        for (resolution, video) in &self.videos {
            let resolution = *resolution;
            info!(%resolution, "processing");
            self.counters.reset_frames();
            for stream in &streams {
                stream.connect_video_file(video, false)?;
            }

            let pass = PassContext {
                resolution,
                backend: self.backend,
                settings: &self.settings,
                streams: &streams,
                round_robin: &round_robin,
                counters: &self.counters,
                sampler: self.sampler,
                cancel: &self.cancel,
            };
            let report = self.pool.run(&pass)?;
            let row = self.row_for(resolution, num_streams, &report);
            info!(
                %resolution,
                fps = row.total_fps,
                avg_cpu = row.avg_cpu,
                max_cpu = row.max_cpu,
                frames = row.avg_frames,
                "resolution finished"
            );
            self.results.push(&row);

            if report.cancelled {
                warn!(%resolution, "cancelled, skipping remaining resolutions");
                cancelled = true;
                break;
            }
        }

        let min_cpu = self.counters.min_average_cpu().unwrap_or_else(|| {
            warn!(
                streams = num_streams,
                "no CPU samples collected in any resolution, reporting 0.0"
            );
            0.0
        });
        Ok(PassOutcome {
            streams: num_streams,
            min_cpu,
            cancelled,
        })
    }

    fn row_for(&self, resolution: Resolution, num_streams: usize, report: &PoolReport) -> ResultRow {
        let frames = self.counters.frames();
        let seconds = report.elapsed.as_secs_f64();
        let total_fps = if seconds > 0.0 {
            frames as f64 / seconds
        } else {
            0.0
        };
        let cpu = self.counters.cpu_summary(resolution);
        if cpu.samples == 0 {
            warn!(%resolution, frames, "no CPU samples collected");
        }
        ResultRow {
            resolution,
            total_fps,
            avg_cpu: cpu.average.unwrap_or(0.0),
            max_cpu: cpu.max.unwrap_or(0.0),
            avg_frames: frames / num_streams.max(1) as u64,
        }
    }
}

impl<B: EngineBackend> Experiment for ExperimentRunner<'_, B> {
    fn run_pass(&mut self, streams: usize) -> BenchResult<PassOutcome> {
        Self::run_pass(self, streams)
    }
}
