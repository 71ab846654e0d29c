pub mod canvas;
pub mod overlay;
pub mod viewport;

pub use canvas::{Canvas, Color, DrawOp, RecordingCanvas, Stroke};
pub use viewport::Viewport;
