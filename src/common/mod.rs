pub mod frame;
pub mod geometry;
pub mod landmark;

pub use frame::{StillImage, VideoFrame, VideoSource, capture_still};
pub use geometry::{Point, Vec2};
pub use landmark::{Category, Landmark};
