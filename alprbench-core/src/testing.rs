//! Deterministic collaborators for exercising the harness in tests.

use crate::cpu::CpuSampler;
use crate::engine::{
    EngineBackend, EngineSettings, Frame, FrameResult, PlateGroup, Recognizer, VehicleAttributes,
    VehicleClassifier, VideoStream,
};
use crate::error::{BenchError, BenchResult};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Sampler that always reports the same value and counts how often it was read.
pub struct FixedCpuSampler {
    bits: AtomicU32,
    calls: AtomicUsize,
}

impl FixedCpuSampler {
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl CpuSampler for FixedCpuSampler {
    fn sample(&self) -> f32 {
        self.calls.fetch_add(1, Ordering::Relaxed);
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// What a scripted stream hands out once bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Exactly this many frames, then inactive with an empty queue
    Frames(u64),
    /// Always active with one frame queued
    Endless,
    /// Always active with nothing ever queued
    Stalled,
}

/// Backend whose streams follow a [`Script`] and whose recognizer can be told
/// to return invalid results or to sleep per frame.
pub struct ScriptedBackend {
    script: Script,
    /// Every n-th frame (1-based) comes back invalid
    invalid_every: Option<u64>,
    batch_support: bool,
    recognize_delay: Duration,
    fail_recognizer: bool,
    stats: Arc<ScriptStats>,
}

/// Counters observed across every collaborator a backend created.
#[derive(Default)]
pub struct ScriptStats {
    pub recognizers_loaded: AtomicUsize,
    pub classifiers_loaded: AtomicUsize,
    pub frames_recognized: AtomicU64,
    pub groups_classified: AtomicU64,
    pub streams_created: AtomicUsize,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new(script: Script) -> Self {
        Self {
            script,
            invalid_every: None,
            batch_support: false,
            recognize_delay: Duration::ZERO,
            fail_recognizer: false,
            stats: Arc::new(ScriptStats::default()),
        }
    }

    #[must_use]
    pub const fn with_invalid_every(mut self, n: u64) -> Self {
        self.invalid_every = Some(n);
        self
    }

    #[must_use]
    pub const fn with_batch_support(mut self) -> Self {
        self.batch_support = true;
        self
    }

    #[must_use]
    pub const fn with_recognize_delay(mut self, delay: Duration) -> Self {
        self.recognize_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_failing_recognizer(mut self) -> Self {
        self.fail_recognizer = true;
        self
    }

    #[must_use]
    pub fn stats(&self) -> Arc<ScriptStats> {
        Arc::clone(&self.stats)
    }
}

impl EngineBackend for ScriptedBackend {
    type Recognizer = ScriptedRecognizer;
    type Classifier = ScriptedClassifier;
    type Stream = ScriptedStream;

    fn recognizer(&self, _settings: &EngineSettings) -> BenchResult<Self::Recognizer> {
        if self.fail_recognizer {
            return Err(BenchError::Engine("runtime data not found".to_string()));
        }
        self.stats.recognizers_loaded.fetch_add(1, Ordering::Relaxed);
        Ok(ScriptedRecognizer {
            invalid_every: self.invalid_every,
            batch_support: self.batch_support,
            delay: self.recognize_delay,
            stats: Arc::clone(&self.stats),
        })
    }

    fn classifier(&self, _settings: &EngineSettings) -> BenchResult<Self::Classifier> {
        self.stats.classifiers_loaded.fetch_add(1, Ordering::Relaxed);
        Ok(ScriptedClassifier {
            stats: Arc::clone(&self.stats),
        })
    }

    fn stream(&self, _queue_capacity: usize) -> Self::Stream {
        let id = self.stats.streams_created.fetch_add(1, Ordering::Relaxed);
        ScriptedStream {
            id,
            script: self.script,
            state: Mutex::new(ScriptState::default()),
        }
    }
}

pub struct ScriptedRecognizer {
    invalid_every: Option<u64>,
    batch_support: bool,
    delay: Duration,
    stats: Arc<ScriptStats>,
}

impl ScriptedRecognizer {
    fn result_for(&self, frame: &Frame) -> FrameResult {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.stats.frames_recognized.fetch_add(1, Ordering::Relaxed);
        let invalid = self
            .invalid_every
            .is_some_and(|n| n > 0 && (frame.index + 1) % n == 0);
        if invalid {
            FrameResult::INVALID
        } else {
            FrameResult {
                epoch_time: 1_700_000_000_000 + frame.index,
                processing_time_ms: 1.0,
            }
        }
    }
}

impl Recognizer for ScriptedRecognizer {
    fn recognize(&mut self, frame: &Frame) -> FrameResult {
        self.result_for(frame)
    }

    fn recognize_batch(&mut self, frames: &[Frame]) -> BenchResult<FrameResult> {
        if !self.batch_support {
            return Err(BenchError::BatchUnsupported {
                version: self.version(),
            });
        }
        Ok(frames
            .last()
            .map_or(FrameResult::INVALID, |frame| self.result_for(frame)))
    }

    fn supports_batch(&self) -> bool {
        self.batch_support
    }

    fn version(&self) -> String {
        "scripted-1.0".to_string()
    }
}

pub struct ScriptedClassifier {
    stats: Arc<ScriptStats>,
}

impl VehicleClassifier for ScriptedClassifier {
    fn classify(&mut self, group: &PlateGroup) -> Option<VehicleAttributes> {
        self.stats.groups_classified.fetch_add(1, Ordering::Relaxed);
        Some(VehicleAttributes {
            color: "white".to_string(),
            make: "scripted".to_string(),
            body_type: group.plate.clone(),
        })
    }
}

#[derive(Default)]
struct ScriptState {
    bound: bool,
    handed_out: u64,
    completed: Vec<PlateGroup>,
}

pub struct ScriptedStream {
    id: usize,
    script: Script,
    state: Mutex<ScriptState>,
}

impl ScriptedStream {
    fn remaining(&self, state: &ScriptState) -> u64 {
        if !state.bound {
            return 0;
        }
        match self.script {
            Script::Frames(total) => total.saturating_sub(state.handed_out),
            Script::Endless => 1,
            Script::Stalled => 0,
        }
    }

    fn take(&self, max: usize) -> Vec<Frame> {
        let mut state = self.state.lock();
        let available = usize::try_from(self.remaining(&state)).unwrap_or(usize::MAX);
        let count = max.min(available);
        let frames = (0..count as u64)
            .map(|offset| Frame {
                stream: self.id,
                index: state.handed_out + offset,
                width: 640,
                height: 480,
            })
            .collect();
        state.handed_out += count as u64;
        frames
    }

    fn complete(&self) {
        let mut state = self.state.lock();
        let plate = format!("T{}-{}", self.id, state.completed.len());
        state.completed.push(PlateGroup { plate, frames: 1 });
    }
}

impl VideoStream for ScriptedStream {
    fn connect_video_file(&self, _path: &Path, _loop_video: bool) -> BenchResult<()> {
        *self.state.lock() = ScriptState {
            bound: true,
            ..ScriptState::default()
        };
        Ok(())
    }

    fn queue_size(&self) -> usize {
        let state = self.state.lock();
        match self.script {
            Script::Frames(_) => usize::from(self.remaining(&state) > 0),
            Script::Endless => usize::from(state.bound),
            Script::Stalled => 0,
        }
    }

    fn is_active(&self) -> bool {
        let state = self.state.lock();
        match self.script {
            // Inactive as soon as the last frame is queued
            Script::Frames(_) => self.remaining(&state) > 1,
            Script::Endless | Script::Stalled => state.bound,
        }
    }

    fn process_frame(&self, recognizer: &mut dyn Recognizer) -> FrameResult {
        let Some(frame) = self.take(1).pop() else {
            return FrameResult::INVALID;
        };
        let result = recognizer.recognize(&frame);
        if result.is_valid() {
            self.complete();
        }
        result
    }

    fn process_batch(
        &self,
        recognizer: &mut dyn Recognizer,
        batch_size: usize,
    ) -> BenchResult<FrameResult> {
        let frames = self.take(batch_size);
        if frames.is_empty() {
            return Ok(FrameResult::INVALID);
        }
        let result = recognizer.recognize_batch(&frames)?;
        if result.is_valid() {
            self.complete();
        }
        Ok(result)
    }

    fn pop_completed_groups_and_classify(
        &self,
        classifier: &mut dyn VehicleClassifier,
    ) -> Vec<(PlateGroup, Option<VehicleAttributes>)> {
        let groups = std::mem::take(&mut self.state.lock().completed);
        groups
            .into_iter()
            .map(|group| {
                let attributes = classifier.classify(&group);
                (group, attributes)
            })
            .collect()
    }
}
