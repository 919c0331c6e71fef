//! Adaptive stream-count search.
//!
//! ```text
//!            min_cpu <= threshold, next <= ceiling
//!              ┌──────────────┐
//!              ▼              │
//! start ──► GROWING(n) ── run_pass(n) ──► DONE
//!                               threshold off, min_cpu > threshold,
//!                               ceiling reached, or cancelled
//! ```
//!
//! The reported stream count is the one of the last completed pass, which is
//! also the pass that ended the search.

use crate::config::BenchmarkConfig;
use crate::error::BenchResult;
use crate::experiment::PassOutcome;
use tracing::{info, warn};

/// Anything that can run a full pass at a given stream count.
pub trait Experiment {
    /// # Errors
    ///
    /// Any error aborts the search.
    fn run_pass(&mut self, streams: usize) -> BenchResult<PassOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Next pass will run with this many streams
    Growing(usize),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub final_streams: usize,
    pub passes: usize,
    /// Lowest average CPU of the final pass
    pub min_cpu: f64,
    /// Growth stopped at the stream ceiling before the threshold was exceeded
    pub hit_ceiling: bool,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveSearch {
    pub start: usize,
    pub step: usize,
    /// Percent; 0 disables growth
    pub threshold: f64,
    pub ceiling: usize,
}

impl From<&BenchmarkConfig> for AdaptiveSearch {
    fn from(config: &BenchmarkConfig) -> Self {
        Self {
            start: config.start_streams,
            step: config.step,
            threshold: config.cpu_threshold,
            ceiling: config.stream_ceiling,
        }
    }
}

impl AdaptiveSearch {
    /// State after a completed pass.
    #[must_use]
    pub fn next_state(&self, pass: &PassOutcome) -> SearchState {
        if pass.cancelled || self.threshold <= 0.0 || pass.min_cpu > self.threshold {
            return SearchState::Done;
        }
        match pass.streams.checked_add(self.step.max(1)) {
            Some(next) if next <= self.ceiling => SearchState::Growing(next),
            _ => SearchState::Done,
        }
    }

    /// Run passes until the state machine reaches DONE.
    ///
    /// # Errors
    ///
    /// Propagates the first failed pass.
    pub fn run<E: Experiment + ?Sized>(&self, experiment: &mut E) -> BenchResult<SearchOutcome> {
        let mut outcome = SearchOutcome {
            final_streams: self.start,
            passes: 0,
            min_cpu: 0.0,
            hit_ceiling: false,
            cancelled: false,
        };
        let mut state = SearchState::Growing(self.start);

        while let SearchState::Growing(streams) = state {
            let pass = experiment.run_pass(streams)?;
            info!(
                streams,
                min_cpu = pass.min_cpu,
                "lowest average CPU usage {:.1}%",
                pass.min_cpu
            );
            outcome.passes += 1;
            outcome.final_streams = streams;
            outcome.min_cpu = pass.min_cpu;
            outcome.cancelled = pass.cancelled;

            state = self.next_state(&pass);
            if state == SearchState::Done
                && !pass.cancelled
                && self.threshold > 0.0
                && pass.min_cpu <= self.threshold
            {
                warn!(
                    streams,
                    ceiling = self.ceiling,
                    threshold = self.threshold,
                    "stream ceiling reached before the CPU threshold"
                );
                outcome.hit_ceiling = true;
            }
        }

        Ok(outcome)
    }
}
