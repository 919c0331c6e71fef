//! CPU utilisation sampling

use parking_lot::Mutex;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Source of whole-machine CPU utilisation percentages.
pub trait CpuSampler: Send + Sync {
    /// Utilisation since the previous call, in percent.
    fn sample(&self) -> f32;
}

/// Samples global CPU usage through `sysinfo`.
///
/// Like a non-blocking `cpu_percent`, each reading covers the interval since
/// the previous refresh, so the first reading after construction is primed
/// here rather than returned to a caller.
pub struct SystemCpuSampler {
    system: Mutex<System>,
}

impl SystemCpuSampler {
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage()),
        );
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemCpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSampler for SystemCpuSampler {
    fn sample(&self) -> f32 {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.global_cpu_usage()
    }
}

/// Arithmetic mean, or `None` for an empty sequence.
#[must_use]
pub fn mean(samples: &[f32]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = samples.len() as f64;
    Some(samples.iter().map(|&s| f64::from(s)).sum::<f64>() / count)
}

/// Largest sample, or `None` for an empty sequence.
#[must_use]
pub fn max(samples: &[f32]) -> Option<f64> {
    samples.iter().copied().map(f64::from).reduce(f64::max)
}
