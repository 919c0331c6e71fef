//! CPU-bound stand-in for the native recognition engine.
//!
//! Frames are "decoded" lazily into a bounded queue and recognition burns CPU
//! in proportion to frame area, so the harness sees the same shape of load
//! (more pixels, fewer frames per second) without the native library.

use crate::config::Resolution;
use crate::engine::{
    EngineBackend, EngineSettings, Frame, FrameResult, PlateGroup, Recognizer, VehicleAttributes,
    VehicleClassifier, VideoStream,
};
use crate::error::{BenchError, BenchResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::hint::black_box;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSettings {
    /// Frames in every bound video file
    pub frames_per_video: u64,
    /// Hash rounds spent per megapixel of frame area
    pub work_per_megapixel: u32,
    /// Whether recognizers accept batches (GPU mode)
    pub batch_support: bool,
    /// Frames tracked before a plate group completes
    pub plates_per_group: u32,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            frames_per_video: 300,
            work_per_megapixel: 20_000_000,
            batch_support: false,
            plates_per_group: 15,
        }
    }
}

pub struct SyntheticBackend {
    settings: SyntheticSettings,
    next_stream_id: AtomicUsize,
}

impl SyntheticBackend {
    #[must_use]
    pub fn new(settings: SyntheticSettings) -> Self {
        Self {
            settings,
            next_stream_id: AtomicUsize::new(0),
        }
    }
}

impl EngineBackend for SyntheticBackend {
    type Recognizer = SyntheticRecognizer;
    type Classifier = SyntheticClassifier;
    type Stream = SyntheticStream;

    fn recognizer(&self, settings: &EngineSettings) -> BenchResult<Self::Recognizer> {
        tracing::trace!(
            country = %settings.country,
            config = %settings.config_path.display(),
            "loading synthetic recognizer"
        );
        Ok(SyntheticRecognizer {
            work_per_megapixel: self.settings.work_per_megapixel,
            batch_support: self.settings.batch_support,
            scratch: 0x9E37_79B9_7F4A_7C15,
        })
    }

    fn classifier(&self, _settings: &EngineSettings) -> BenchResult<Self::Classifier> {
        Ok(SyntheticClassifier)
    }

    fn stream(&self, queue_capacity: usize) -> Self::Stream {
        SyntheticStream {
            id: self.next_stream_id.fetch_add(1, Ordering::Relaxed),
            capacity: queue_capacity.max(1),
            frames_per_video: self.settings.frames_per_video,
            plates_per_group: self.settings.plates_per_group.max(1),
            state: Mutex::new(StreamState::default()),
        }
    }
}

pub struct SyntheticRecognizer {
    work_per_megapixel: u32,
    batch_support: bool,
    scratch: u64,
}

impl SyntheticRecognizer {
    fn burn(&mut self, megapixels: f64) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounds = (megapixels * f64::from(self.work_per_megapixel)) as u64;
        let mut x = self.scratch;
        for _ in 0..rounds {
            // xorshift64
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
        }
        self.scratch = black_box(x);
    }

    fn timed(&mut self, megapixels: f64) -> FrameResult {
        let start = Instant::now();
        self.burn(megapixels);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        FrameResult {
            epoch_time: u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0),
            // Timer granularity can report zero for tiny frames
            processing_time_ms: elapsed_ms.max(f64::EPSILON),
        }
    }
}

impl Recognizer for SyntheticRecognizer {
    fn recognize(&mut self, frame: &Frame) -> FrameResult {
        self.timed(frame.megapixels())
    }

    fn recognize_batch(&mut self, frames: &[Frame]) -> BenchResult<FrameResult> {
        if !self.batch_support {
            return Err(BenchError::BatchUnsupported {
                version: self.version(),
            });
        }
        if frames.is_empty() {
            return Ok(FrameResult::INVALID);
        }
        let megapixels = frames.iter().map(Frame::megapixels).sum();
        Ok(self.timed(megapixels))
    }

    fn supports_batch(&self) -> bool {
        self.batch_support
    }

    fn version(&self) -> String {
        format!("synthetic-{}", env!("CARGO_PKG_VERSION"))
    }
}

pub struct SyntheticClassifier;

impl VehicleClassifier for SyntheticClassifier {
    fn classify(&mut self, group: &PlateGroup) -> Option<VehicleAttributes> {
        const COLORS: [&str; 5] = ["white", "black", "silver", "red", "blue"];
        const MAKES: [&str; 5] = ["toyota", "ford", "honda", "chevrolet", "nissan"];
        const BODIES: [&str; 4] = ["sedan", "suv", "pickup", "van"];

        let seed = group
            .plate
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(usize::from(b)));
        Some(VehicleAttributes {
            color: COLORS[seed % COLORS.len()].to_string(),
            make: MAKES[(seed / 7) % MAKES.len()].to_string(),
            body_type: BODIES[(seed / 13) % BODIES.len()].to_string(),
        })
    }
}

#[derive(Default)]
struct StreamState {
    bound: bool,
    looping: bool,
    width: u32,
    height: u32,
    decoded: u64,
    processed: u64,
    queue: VecDeque<Frame>,
    completed: Vec<PlateGroup>,
}

pub struct SyntheticStream {
    id: usize,
    capacity: usize,
    frames_per_video: u64,
    plates_per_group: u32,
    state: Mutex<StreamState>,
}

impl SyntheticStream {
    fn exhausted(&self, state: &StreamState) -> bool {
        !state.looping && state.decoded >= self.frames_per_video
    }

    fn fill(&self, state: &mut StreamState) {
        if !state.bound {
            return;
        }
        while state.queue.len() < self.capacity && !self.exhausted(state) {
            state.queue.push_back(Frame {
                stream: self.id,
                index: state.decoded,
                width: state.width,
                height: state.height,
            });
            state.decoded += 1;
        }
    }

    fn pop(&self, max: usize) -> Vec<Frame> {
        let mut state = self.state.lock();
        self.fill(&mut state);
        let take = max.min(state.queue.len());
        state.queue.drain(..take).collect()
    }

    fn complete(&self, frames: u64) {
        let mut state = self.state.lock();
        for _ in 0..frames {
            state.processed += 1;
            if state.processed % u64::from(self.plates_per_group) == 0 {
                let group = state.processed / u64::from(self.plates_per_group);
                state.completed.push(PlateGroup {
                    plate: format!("S{:02}X{:04}", self.id % 100, group % 10_000),
                    frames: self.plates_per_group,
                });
            }
        }
    }
}

impl VideoStream for SyntheticStream {
    fn connect_video_file(&self, path: &Path, loop_video: bool) -> BenchResult<()> {
        if !path.is_file() {
            return Err(BenchError::Engine(format!(
                "video file {} does not exist",
                path.display()
            )));
        }
        let (width, height) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| Resolution::from_str(stem).ok())
            .unwrap_or(Resolution::Vga)
            .dimensions();

        let mut state = self.state.lock();
        *state = StreamState {
            bound: true,
            looping: loop_video,
            width,
            height,
            ..StreamState::default()
        };
        Ok(())
    }

    fn queue_size(&self) -> usize {
        let mut state = self.state.lock();
        self.fill(&mut state);
        state.queue.len()
    }

    fn is_active(&self) -> bool {
        let state = self.state.lock();
        state.bound && !self.exhausted(&state)
    }

    fn process_frame(&self, recognizer: &mut dyn Recognizer) -> FrameResult {
        let Some(frame) = self.pop(1).pop() else {
            return FrameResult::INVALID;
        };
        let result = recognizer.recognize(&frame);
        if result.is_valid() {
            self.complete(1);
        }
        result
    }

    fn process_batch(
        &self,
        recognizer: &mut dyn Recognizer,
        batch_size: usize,
    ) -> BenchResult<FrameResult> {
        let frames = self.pop(batch_size);
        if frames.is_empty() {
            return Ok(FrameResult::INVALID);
        }
        let result = recognizer.recognize_batch(&frames)?;
        if result.is_valid() {
            self.complete(frames.len() as u64);
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
