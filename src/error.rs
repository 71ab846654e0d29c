use thiserror::Error;
use tower::BoxError;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Runtime Error: {0}")]
    Runtime(String),
    #[error("Source Error: {0}")]
    Source(String),
    #[error("UI Error: {0}")]
    Ui(String),
    #[error("Audio Error: {0}")]
    Audio(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Still-frame capture. Never penalized by the inference gate.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("video source is not ready")]
    NotReady,
    #[error("video frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("failed to encode still frame: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector failed: {0}")]
    Failed(String),
    #[error("detector is not loaded")]
    Unavailable,
}

// Any of these pushes the inference gate into its backoff window.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("classifier returned HTTP {0}")]
    Status(u16),
    #[error("malformed classifier response: {0}")]
    Malformed(String),
    #[error("classifier request timed out")]
    Timeout,
    #[error("classifier task failed: {0}")]
    Task(String),
}

impl ClassifyError {
    /// Recovers a `ClassifyError` from the boxed error a tower stack hands back.
    pub fn from_boxed(error: BoxError) -> Self {
        if error.is::<tower::timeout::error::Elapsed>() {
            return ClassifyError::Timeout;
        }
        match error.downcast::<ClassifyError>() {
            Ok(inner) => *inner,
            Err(other) => ClassifyError::Transport(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ClassifyError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ClassifyError::Timeout
        } else if error.is_decode() {
            ClassifyError::Malformed(error.to_string())
        } else {
            ClassifyError::Transport(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_classify_error_round_trips() {
        let boxed: BoxError = Box::new(ClassifyError::Status(503));
        assert!(matches!(ClassifyError::from_boxed(boxed), ClassifyError::Status(503)));
    }

    #[test]
    fn boxed_elapsed_becomes_timeout() {
        let boxed: BoxError = Box::new(tower::timeout::error::Elapsed::new());
        assert!(matches!(ClassifyError::from_boxed(boxed), ClassifyError::Timeout));
    }

    #[test]
    fn foreign_boxed_error_becomes_transport() {
        let boxed: BoxError = "connection reset".into();
        match ClassifyError::from_boxed(boxed) {
            ClassifyError::Transport(message) => assert_eq!(message, "connection reset"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
