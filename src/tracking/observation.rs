use crate::common::{Category, Landmark};
use crate::tracking::detector::ModelKind;
use crate::tracking::detector_set::FramePass;
use indexmap::IndexMap;

/// One detected subject (a hand, a body, a face).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    pub landmarks: Vec<Landmark>,
    /// Handedness for hands ("Left"/"Right").
    pub label: Option<String>,
    /// Blendshape scores for faces, when face metrics are on.
    pub scores: Vec<Category>,
}

impl Instance {
    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }
}

/// Normalized output of one model for one frame. Empty means the model ran
/// and found nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    instances: Vec<Instance>,
}

impl Observation {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn first(&self) -> Option<&Instance> {
        self.instances.first()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }
}

/// Latest Observation per model. A key is present exactly when the model is
/// enabled; values are overwritten in place and no history is kept.
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    latest: IndexMap<ModelKind, Observation>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with an empty Observation for each enabled model.
    pub fn seeded(enabled: impl IntoIterator<Item = ModelKind>) -> Self {
        Self {
            latest: enabled
                .into_iter()
                .map(|kind| (kind, Observation::empty()))
                .collect(),
        }
    }

    /// Overwrites the models present in the pass; models that failed this
    /// frame are absent from it and keep their previous Observation.
    pub fn apply(&mut self, pass: FramePass) {
        for (kind, observation) in pass.observations {
            self.latest.insert(kind, observation);
        }
    }

    pub fn get(&self, kind: ModelKind) -> Option<&Observation> {
        self.latest.get(&kind)
    }

    pub fn contains(&self, kind: ModelKind) -> bool {
        self.latest.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelKind, &Observation)> {
        self.latest.iter().map(|(kind, obs)| (*kind, obs))
    }
}
