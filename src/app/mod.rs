pub mod egui_canvas;
pub mod tracker_app;

pub use egui_canvas::EguiCanvas;
pub use tracker_app::TrackerApp;
