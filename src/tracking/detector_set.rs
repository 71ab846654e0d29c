use crate::common::VideoFrame;
use crate::config::TrackingSettings;
use crate::error::DetectorError;
use crate::tracking::detector::{Detector, ModelKind, RawDetection};
use crate::tracking::observation::{Instance, Observation, ObservationStore};
use indexmap::IndexMap;
use tracing::{debug, instrument, warn};

/// Result of running every enabled detector against one frame.
#[derive(Debug, Default)]
pub struct FramePass {
    /// Enabled models that ran cleanly. Disabled and failed models are absent.
    pub observations: IndexMap<ModelKind, Observation>,
    pub failures: Vec<(ModelKind, DetectorError)>,
}

struct Slot {
    kind: ModelKind,
    max_instances: usize,
    detector: Box<dyn Detector>,
}

/// Holds the configured landmark models and turns their raw output into
/// Observations.
pub struct DetectorSet {
    slots: Vec<Slot>,
    keep_face_scores: bool,
}

impl DetectorSet {
    pub fn builder(settings: &TrackingSettings) -> DetectorSetBuilder {
        DetectorSetBuilder::new(settings.clone())
    }

    pub fn enabled_models(&self) -> impl Iterator<Item = ModelKind> + '_ {
        self.slots.iter().map(|slot| slot.kind)
    }

    pub fn is_enabled(&self, kind: ModelKind) -> bool {
        self.slots.iter().any(|slot| slot.kind == kind)
    }

    /// A store holding an empty Observation for each enabled model.
    pub fn seed_store(&self) -> ObservationStore {
        ObservationStore::seeded(self.enabled_models())
    }

    /// Runs each enabled detector once. Call only for a novel frame.
    #[instrument(skip(self, frame), fields(frame = frame.sequence()))]
    pub fn process_frame(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> FramePass {
        let mut pass = FramePass::default();
        for slot in &mut self.slots {
            match slot.detector.detect(frame, timestamp_ms) {
                Ok(raw) => {
                    let observation = normalize(slot.kind, raw, slot.max_instances, self.keep_face_scores);
                    debug!(model = %slot.kind, instances = observation.len(), "Detector pass");
                    pass.observations.insert(slot.kind, observation);
                }
                Err(e) => {
                    warn!(model = %slot.kind, "Detector failed, keeping previous observation: {}", e);
                    pass.failures.push((slot.kind, e));
                }
            }
        }
        pass
    }
}

fn normalize(kind: ModelKind, raw: RawDetection, max_instances: usize, keep_face_scores: bool) -> Observation {
    let instances = raw
        .instances
        .into_iter()
        .take(max_instances)
        .map(|raw| match kind {
            ModelKind::Hands => Instance {
                label: raw.categories.first().map(|c| c.name.clone()),
                landmarks: raw.landmarks,
                scores: Vec::new(),
            },
            ModelKind::Pose => Instance {
                landmarks: raw.landmarks,
                label: None,
                scores: Vec::new(),
            },
            ModelKind::Face => Instance {
                landmarks: raw.landmarks,
                label: None,
                scores: if keep_face_scores { raw.categories } else { Vec::new() },
            },
        })
        .collect();
    Observation::new(instances)
}

pub struct DetectorSetBuilder {
    settings: TrackingSettings,
    detectors: IndexMap<ModelKind, Box<dyn Detector>>,
}

impl DetectorSetBuilder {
    pub fn new(settings: TrackingSettings) -> Self {
        Self {
            settings,
            detectors: IndexMap::new(),
        }
    }

    /// Registers the model backing `kind`. Ignored at build time when the
    /// configuration has that model switched off.
    pub fn detector(mut self, kind: ModelKind, detector: Box<dyn Detector>) -> Self {
        self.detectors.insert(kind, detector);
        self
    }

    pub fn build(self) -> DetectorSet {
        let mut slots = Vec::new();
        for (kind, detector) in self.detectors {
            if !self.settings.is_enabled(kind) {
                debug!(model = %kind, "Model disabled by configuration");
                continue;
            }
            slots.push(Slot {
                kind,
                max_instances: self.settings.max_instances(kind),
                detector,
            });
        }
        for kind in ModelKind::ALL {
            if self.settings.is_enabled(kind) && !slots.iter().any(|s| s.kind == kind) {
                warn!(model = %kind, "Model enabled but no detector registered");
            }
        }
        DetectorSet {
            slots,
            keep_face_scores: self.settings.face_metrics,
        }
    }
}
