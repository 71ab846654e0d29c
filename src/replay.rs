//! Recorded sessions played back as if they were live: a directory of still
//! images shown at a fixed rate, plus the landmarks that were detected on
//! them in `landmarks.jsonl`.

use crate::common::{VideoFrame, VideoSource};
use crate::error::{AppError, DetectorError};
use crate::tracking::{Detector, ModelKind, RawDetection, RawInstance};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const LANDMARKS_FILE: &str = "landmarks.jsonl";
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Loops over the images in a directory, in file name order.
pub struct ReplaySource {
    frames: Vec<PathBuf>,
    fps: f64,
    origin: Instant,
    // Tick last reported by `presentation_timestamp`; `current_frame` serves it.
    presented: Option<u64>,
    current: Option<(u64, VideoFrame)>,
}

impl ReplaySource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self, AppError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(AppError::Source(format!("invalid replay rate {fps}")));
        }
        let mut frames: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| AppError::Source(format!("{}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(AppError::Source(format!("no images in {}", dir.display())));
        }
        info!(dir = %dir.display(), frames = frames.len(), fps, "Replay source opened");

        Ok(Self {
            frames,
            fps,
            origin: Instant::now(),
            presented: None,
            current: None,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Absolute tick (not wrapped) for time elapsed since the source opened.
    pub fn tick_at(&self, elapsed: Duration) -> u64 {
        (elapsed.as_secs_f64() * self.fps).floor() as u64
    }

    /// Index of the image shown at `tick`. Playback loops.
    pub fn frame_index(&self, tick: u64) -> usize {
        (tick % self.frames.len() as u64) as usize
    }

    fn current_tick(&self) -> u64 {
        self.tick_at(self.origin.elapsed())
    }

    fn load(&self, tick: u64) -> Option<VideoFrame> {
        let index = self.frame_index(tick);
        let path = &self.frames[index];
        match image::open(path) {
            Ok(img) => Some(VideoFrame::new(img, tick as f64 / self.fps, index as u64)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to decode replay frame");
                None
            }
        }
    }
}

impl VideoSource for ReplaySource {
    // Keeps rising across loops so every shown frame counts as new.
    fn presentation_timestamp(&mut self) -> Option<f64> {
        let tick = self.current_tick();
        self.presented = Some(tick);
        Some(tick as f64 / self.fps)
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        let tick = match self.presented {
            Some(tick) => tick,
            None => self.current_tick(),
        };
        if let Some((cached, frame)) = &self.current {
            if *cached == tick {
                return Some(frame.clone());
            }
        }
        let frame = self.load(tick)?;
        self.current = Some((tick, frame.clone()));
        Some(frame)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct RecordedLine {
    frame: u64,
    model: ModelKind,
    #[serde(default)]
    instances: Vec<RawInstance>,
}

/// Answers `detect` from recorded landmarks, keyed by the frame's position
/// in the replay directory. Frames with nothing recorded detect nothing.
#[derive(Debug, Default)]
pub struct ReplayDetector {
    by_frame: HashMap<u64, RawDetection>,
}

impl ReplayDetector {
    pub fn new(by_frame: HashMap<u64, RawDetection>) -> Self {
        Self { by_frame }
    }

    /// Reads `landmarks.jsonl` and splits it per model.
    pub fn load_all(path: &Path) -> Result<IndexMap<ModelKind, ReplayDetector>, AppError> {
        let text = fs::read_to_string(path)
            .map_err(|e| AppError::Source(format!("{}: {e}", path.display())))?;

        let mut detectors: IndexMap<ModelKind, ReplayDetector> = IndexMap::new();
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let recorded: RecordedLine = serde_json::from_str(line).map_err(|e| {
                AppError::Source(format!("{}:{}: {e}", path.display(), number + 1))
            })?;
            detectors
                .entry(recorded.model)
                .or_default()
                .by_frame
                .entry(recorded.frame)
                .or_default()
                .instances
                .extend(recorded.instances);
        }

        for (kind, detector) in &detectors {
            debug!(model = %kind, frames = detector.by_frame.len(), "Loaded recorded landmarks");
        }
        Ok(detectors)
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, frame: &VideoFrame, _timestamp_ms: f64) -> Result<RawDetection, DetectorError> {
        Ok(self
            .by_frame
            .get(&frame.sequence())
            .cloned()
            .unwrap_or_default())
    }
}
