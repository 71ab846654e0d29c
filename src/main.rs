use handtone::app::TrackerApp;
use handtone::config::Settings;
use handtone::coordinator::Session;
use handtone::error::AppError;
use handtone::replay::{LANDMARKS_FILE, ReplayDetector, ReplaySource};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, warn};

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;
    init_logging(settings.log_level.into());

    let session = match build_session(&settings) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to start session: {}", e);
            return Err(e);
        }
    };

    info!(replay_dir = ?settings.source.replay_dir, "Handtone starting");
    TrackerApp::start_gui(&settings, session)
}

fn build_session(settings: &Settings) -> Result<Session, AppError> {
    let replay_dir = settings
        .source
        .replay_dir
        .as_deref()
        .map(Path::new)
        .ok_or(AppError::Source("source.replay_dir is not set".to_string()))?;

    let mut builder = Session::builder(settings.clone())
        .source(Box::new(ReplaySource::open(replay_dir, settings.source.fps)?));

    let landmarks = replay_dir.join(LANDMARKS_FILE);
    if landmarks.is_file() {
        for (kind, detector) in ReplayDetector::load_all(&landmarks)? {
            builder = builder.detector(kind, Box::new(detector));
        }
    } else {
        warn!(path = %landmarks.display(), "No recorded landmarks, detectors will see nothing");
    }

    builder.build()
}
