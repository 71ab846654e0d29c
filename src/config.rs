use crate::error::ConfigError;
use crate::tracking::ModelKind;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "handtone.toml";
pub const ENV_PREFIX: &str = "HANDTONE";

/// Startup configuration. Loaded once; nothing here is hot-reloaded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tracking: TrackingSettings,
    pub inference: InferenceSettings,
    pub feedback: FeedbackSettings,
    pub display: DisplaySettings,
    pub source: SourceSettings,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    Cpu,
    #[default]
    Gpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseModel {
    Lite,
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    pub hands: bool,
    pub pose: bool,
    pub face: bool,
    /// Keep face blendshape scores alongside the face landmarks.
    pub face_metrics: bool,
    pub max_hands: usize,
    pub max_poses: usize,
    pub max_faces: usize,
    // Handed to the detector backends as-is; the core never branches on these.
    pub delegate: Delegate,
    pub pose_model: PoseModel,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            hands: true,
            pose: false,
            face: false,
            face_metrics: false,
            max_hands: 2,
            max_poses: 1,
            max_faces: 1,
            delegate: Delegate::Gpu,
            pose_model: PoseModel::Full,
        }
    }
}

impl TrackingSettings {
    pub fn is_enabled(&self, kind: ModelKind) -> bool {
        match kind {
            ModelKind::Hands => self.hands,
            ModelKind::Pose => self.pose,
            ModelKind::Face => self.face,
        }
    }

    pub fn max_instances(&self, kind: ModelKind) -> usize {
        match kind {
            ModelKind::Hands => self.max_hands,
            ModelKind::Pose => self.max_poses,
            ModelKind::Face => self.max_faces,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub endpoint: String,
    pub predict_path: String,
    pub min_interval_ms: u64,
    pub error_pause_ms: u64,
    /// No timeout is applied unless this is set; the transport signals failure.
    pub request_timeout_ms: Option<u64>,
    pub jpeg_quality: u8,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000".to_string(),
            predict_path: "/api/predict".to_string(),
            min_interval_ms: 1200,
            error_pause_ms: 4000,
            request_timeout_ms: None,
            jpeg_quality: 90,
        }
    }
}

impl InferenceSettings {
    pub fn predict_url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.predict_path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    pub note_ms: u64,
    /// Skip feedback when a success repeats the previous label.
    pub suppress_repeats: bool,
    /// Substring of the MIDI output port name to prefer.
    pub midi_port: Option<String>,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            note_ms: 167,
            suppress_repeats: false,
            midi_port: None,
        }
    }
}

impl FeedbackSettings {
    pub fn note_duration(&self) -> Duration {
        Duration::from_millis(self.note_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub box_width: f32,
    pub box_height: f32,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            box_width: 800.0,
            box_height: 600.0,
            window_width: 1280.0,
            window_height: 720.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub replay_dir: Option<String>,
    pub fps: f64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            replay_dir: None,
            fps: 30.0,
        }
    }
}

impl Settings {
    /// Layers defaults, an optional TOML file and `HANDTONE__*` environment
    /// variables, then validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inference.min_interval_ms == 0 {
            return Err(invalid("Minimum request interval must be greater than 0"));
        }

        if !(1..=100).contains(&self.inference.jpeg_quality) {
            return Err(invalid("JPEG quality must be between 1 and 100"));
        }

        if self.inference.endpoint.trim().is_empty() {
            return Err(invalid("Inference endpoint must not be empty"));
        }

        for kind in ModelKind::ALL {
            if self.tracking.is_enabled(kind) && self.tracking.max_instances(kind) == 0 {
                return Err(invalid(&format!(
                    "Model {kind} is enabled but tracks 0 instances"
                )));
            }
        }

        if self.display.box_width <= 0.0 || self.display.box_height <= 0.0 {
            return Err(invalid("Display box must have a positive size"));
        }

        if !(self.source.fps > 0.0) {
            return Err(invalid("Source fps must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_documented_values() {
        let settings = Settings::default();
        assert!(settings.tracking.hands);
        assert!(!settings.tracking.pose);
        assert_eq!(settings.tracking.max_hands, 2);
        assert_eq!(settings.inference.min_interval_ms, 1200);
        assert_eq!(settings.inference.error_pause_ms, 4000);
        assert_eq!(settings.inference.request_timeout(), None);
        assert_eq!(
            settings.inference.predict_url(),
            "http://127.0.0.1:8000/api/predict"
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn loads_overrides_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"

[tracking]
pose = true
delegate = "cpu"

[inference]
endpoint = "http://classifier:9000/"
min_interval_ms = 800
request_timeout_ms = 2500
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert!(settings.tracking.pose);
        assert!(settings.tracking.hands);
        assert_eq!(settings.tracking.delegate, Delegate::Cpu);
        assert_eq!(settings.inference.min_interval_ms, 800);
        assert_eq!(settings.inference.error_pause_ms, 4000);
        assert_eq!(
            settings.inference.request_timeout(),
            Some(Duration::from_millis(2500))
        );
        assert_eq!(
            settings.inference.predict_url(),
            "http://classifier:9000/api/predict"
        );
        assert_eq!(settings.log_level, LogLevel::Debug);
    }

    #[test]
    fn rejects_enabled_model_with_zero_instances() {
        let mut settings = Settings::default();
        settings.tracking.face = true;
        settings.tracking.max_faces = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn disabled_model_may_track_zero_instances() {
        let mut settings = Settings::default();
        settings.tracking.max_faces = 0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_jpeg_quality() {
        let mut settings = Settings::default();
        settings.inference.jpeg_quality = 0;
        assert!(settings.validate().is_err());
    }
}
