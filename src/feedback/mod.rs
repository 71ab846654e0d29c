pub mod dispatcher;
pub mod particle;
pub mod pitch;
pub mod shapes;

pub use dispatcher::{FeedbackDispatcher, FeedbackOutcome, ToneSink};
pub use particle::{ParticleEntity, ParticleField};
pub use pitch::Pitch;
pub use shapes::Primitive;
