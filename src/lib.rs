pub mod app;
pub mod audio;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod feedback;
pub mod inference;
pub mod render;
pub mod replay;
pub mod tracking;

pub use config::Settings;
pub use coordinator::{Session, SessionBuilder, SessionState, TickReport};
pub use error::{AppError, CaptureError, ClassifyError, ConfigError, DetectorError};
