pub mod detector;
pub mod detector_set;
pub mod frame_clock;
pub mod observation;

pub use detector::{Detector, ModelKind, RawDetection, RawInstance};
pub use detector_set::{DetectorSet, DetectorSetBuilder, FramePass};
pub use frame_clock::FrameClock;
pub use observation::{Instance, Observation, ObservationStore};
