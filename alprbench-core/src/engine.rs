//! Collaborator contracts for the recognition engine, vehicle classifier and
//! video stream.
//!
//! The harness never looks past these traits. A backend supplies all three so
//! that the worker pool can be driven by the native engine, by the synthetic
//! CPU-bound stand-in, or by a scripted double in tests.

use crate::error::{BenchError, BenchResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of processing one unit of work (a frame, or a batch in GPU mode).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameResult {
    /// Capture time in milliseconds since the Unix epoch
    pub epoch_time: u64,
    /// Wall time the recognizer spent on the frame
    pub processing_time_ms: f64,
}

impl FrameResult {
    /// What a stream reports when it had nothing to hand out.
    pub const INVALID: Self = Self {
        epoch_time: 0,
        processing_time_ms: 0.0,
    };

    /// Only valid results advance the shared frame counter.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.epoch_time > 0 && self.processing_time_ms > 0.0
    }
}

/// One decoded video frame handed from a stream to a recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub stream: usize,
    pub index: u64,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    #[must_use]
    pub fn megapixels(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height) / 1_000_000.0
    }
}

/// A plate tracked across consecutive frames, ready for vehicle classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateGroup {
    pub plate: String,
    pub frames: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleAttributes {
    pub color: String,
    pub make: String,
    pub body_type: String,
}

/// Construction parameters shared by recognizers and classifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub country: String,
    pub config_path: PathBuf,
    pub runtime_path: PathBuf,
    pub gpu: bool,
    pub batch_size: usize,
}

/// Plate recognizer. One instance is owned by one worker for a whole
/// resolution pass; dropping it unloads the engine.
pub trait Recognizer: Send {
    /// Run recognition on a single frame.
    fn recognize(&mut self, frame: &Frame) -> FrameResult;

    /// Run recognition on a batch of frames as one unit of work.
    ///
    /// # Errors
    ///
    /// The default implementation reports that the binding has no batch support.
    fn recognize_batch(&mut self, frames: &[Frame]) -> BenchResult<FrameResult> {
        let _ = frames;
        Err(BenchError::BatchUnsupported {
            version: self.version(),
        })
    }

    fn supports_batch(&self) -> bool {
        false
    }

    fn version(&self) -> String;
}

pub trait VehicleClassifier: Send {
    fn classify(&mut self, group: &PlateGroup) -> Option<VehicleAttributes>;
}

/// A simulated camera feed bound to a video file.
///
/// Streams are shared by every worker of a pass, so implementations
/// synchronise internally and hand each queued frame out exactly once.
pub trait VideoStream: Send + Sync {
    /// Bind the stream to a file, discarding anything still queued.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the file cannot be opened.
    fn connect_video_file(&self, path: &Path, loop_video: bool) -> BenchResult<()>;

    fn queue_size(&self) -> usize;

    /// False once the file is exhausted (queued frames may remain).
    fn is_active(&self) -> bool;

    /// Pop one frame and pass it through the recognizer. Returns
    /// `FrameResult::INVALID` when another worker drained the queue first.
    fn process_frame(&self, recognizer: &mut dyn Recognizer) -> FrameResult;

    /// Pop up to `batch_size` frames and recognize them as one batch.
    ///
    /// # Errors
    ///
    /// Propagates `BenchError::BatchUnsupported` from the recognizer.
    fn process_batch(
        &self,
        recognizer: &mut dyn Recognizer,
        batch_size: usize,
    ) -> BenchResult<FrameResult>;

    /// Drain plate groups whose tracking has finished and classify each vehicle.
    fn pop_completed_groups_and_classify(
        &self,
        classifier: &mut dyn VehicleClassifier,
    ) -> Vec<(PlateGroup, Option<VehicleAttributes>)>;
}

/// Factory for the three collaborators of one engine implementation.
pub trait EngineBackend: Send + Sync {
    type Recognizer: Recognizer + 'static;
    type Classifier: VehicleClassifier + 'static;
    type Stream: VideoStream + 'static;

    /// # Errors
    ///
    /// Returns an engine error if the recognizer cannot be loaded.
    fn recognizer(&self, settings: &EngineSettings) -> BenchResult<Self::Recognizer>;

    /// # Errors
    ///
    /// Returns an engine error if the classifier cannot be loaded.
    fn classifier(&self, settings: &EngineSettings) -> BenchResult<Self::Classifier>;

    fn stream(&self, queue_capacity: usize) -> Self::Stream;

    /// Load a throwaway recognizer to report the engine version.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the recognizer cannot be loaded.
    fn version(&self, settings: &EngineSettings) -> BenchResult<String> {
        let recognizer = self.recognizer(settings)?;
        Ok(recognizer.version())
    }
}

/// Write a copy of the recognizer configuration with hardware acceleration
/// enabled into `work_dir` and return its path.
///
/// # Errors
///
/// Returns an I/O error if the source cannot be read or the copy written.
pub fn prepare_gpu_config(config_path: &Path, work_dir: &Path) -> BenchResult<PathBuf> {
    let contents = fs::read_to_string(config_path)?;
    let mut lines: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines.push("hardware_acceleration = 1");

    fs::create_dir_all(work_dir)?;
    let out = work_dir.join("openalpr.conf");
    let mut rendered = lines.join("\n");
    rendered.push('\n');
    fs::write(&out, rendered)?;

    tracing::debug!(path = %out.display(), "wrote GPU-enabled recognizer config");
    Ok(out)
}
