pub mod classification;
pub mod classifier;
pub mod gate;
pub mod http_classifier;

pub use classification::{
    Classification, ClassificationCache, ClassificationResult, Gesture, GestureLabel,
};
pub use classifier::{Classifier, ClassifierBuilder, ClassifierService, ClassifierStack};
pub use gate::{GateEvent, GatePhase, GateState, InferenceGate, SubmitOutcome};
pub use http_classifier::HttpClassifier;
