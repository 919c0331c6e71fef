//! Frame and CPU-sample aggregation shared by the workers of one experiment.

use crate::config::Resolution;
use crate::cpu::{self, CpuSampler};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Per-experiment counters guarded by a single lock.
///
/// The frame counter restarts for every resolution pass while the CPU sample
/// lists persist until the next experiment resets them all.
pub struct SharedCounters {
    inner: Mutex<CountersInner>,
    sample_every: u64,
}

struct CountersInner {
    frames: u64,
    cpu_usage: HashMap<Resolution, Vec<f32>>,
}

/// Snapshot of one resolution's CPU statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSummary {
    pub samples: usize,
    pub average: Option<f64>,
    pub max: Option<f64>,
}

impl SharedCounters {
    #[must_use]
    pub fn new(sample_every: u64) -> Self {
        Self {
            inner: Mutex::new(CountersInner {
                frames: 0,
                cpu_usage: HashMap::new(),
            }),
            sample_every: sample_every.max(1),
        }
    }

    /// Clear the frame counter and give every resolution an empty sample list.
    pub fn reset(&self, resolutions: &[Resolution]) {
        let mut inner = self.inner.lock();
        inner.frames = 0;
        inner.cpu_usage = resolutions.iter().map(|&res| (res, Vec::new())).collect();
    }

    /// Restart the frame counter at the beginning of a resolution pass.
    pub fn reset_frames(&self) {
        self.inner.lock().frames = 0;
    }

    /// Count `frames` processed frames for `resolution`, sampling CPU
    /// utilisation whenever the running total lands on the sample cadence.
    pub fn record(&self, resolution: Resolution, frames: u64, sampler: &dyn CpuSampler) {
        let mut inner = self.inner.lock();
        inner.frames += frames;
        if inner.frames % self.sample_every == 0 {
            let reading = sampler.sample();
            inner.cpu_usage.entry(resolution).or_default().push(reading);
        }
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.inner.lock().frames
    }

    #[must_use]
    pub fn cpu_samples(&self, resolution: Resolution) -> Vec<f32> {
        self.inner
            .lock()
            .cpu_usage
            .get(&resolution)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn cpu_summary(&self, resolution: Resolution) -> CpuSummary {
        let inner = self.inner.lock();
        let samples = inner
            .cpu_usage
            .get(&resolution)
            .map_or(&[][..], Vec::as_slice);
        CpuSummary {
            samples: samples.len(),
            average: cpu::mean(samples),
            max: cpu::max(samples),
        }
    }

    /// Lowest average CPU utilisation across resolutions that collected at
    /// least one sample; `None` when none did.
    #[must_use]
    pub fn min_average_cpu(&self) -> Option<f64> {
        let inner = self.inner.lock();
        inner
            .cpu_usage
            .values()
            .filter_map(|samples| cpu::mean(samples))
            .reduce(f64::min)
    }
}
