use crate::common::{Category, Landmark, VideoFrame};
use crate::error::DetectorError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Hands,
    Pose,
    Face,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Hands, ModelKind::Pose, ModelKind::Face];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Hands => "hands",
            ModelKind::Pose => "pose",
            ModelKind::Face => "face",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a landmark model hands back for one frame, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(default)]
    pub instances: Vec<RawInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInstance {
    pub landmarks: Vec<Landmark>,
    /// Ranked best-first, as the model reports them.
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl RawDetection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// A black-box landmark model run in video mode.
pub trait Detector: Send {
    fn detect(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> Result<RawDetection, DetectorError>;
}

impl<F> Detector for F
where
    F: FnMut(&VideoFrame, f64) -> Result<RawDetection, DetectorError> + Send,
{
    fn detect(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> Result<RawDetection, DetectorError> {
        self(frame, timestamp_ms)
    }
}
