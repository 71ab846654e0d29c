use handtone::common::{Landmark, VideoFrame, VideoSource};
use handtone::config::Settings;
use handtone::coordinator::{Session, TickReport};
use handtone::error::{ClassifyError, DetectorError};
use handtone::feedback::{FeedbackOutcome, Pitch, Primitive, ToneSink};
use handtone::inference::{GatePhase, Gesture, GestureLabel, SubmitOutcome};
use handtone::render::RecordingCanvas;
use handtone::tracking::{ModelKind, RawDetection, RawInstance};
use image::DynamicImage;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves one canned HTTP response on a local port.
async fn classifier_stub(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"--\r\n") {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

/// A camera stuck on one frame.
struct StillCamera;

impl VideoSource for StillCamera {
    fn presentation_timestamp(&mut self) -> Option<f64> {
        Some(0.033)
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        Some(VideoFrame::new(DynamicImage::new_rgb8(64, 48), 0.033, 1))
    }
}

#[derive(Clone, Default)]
struct Tones(Arc<Mutex<Vec<Pitch>>>);

impl ToneSink for Tones {
    fn play(&mut self, pitch: &Pitch, _duration: Duration) {
        self.0.lock().unwrap().push(*pitch);
    }
}

fn open_hand() -> Vec<Landmark> {
    (0..21)
        .map(|i| Landmark::new(0.2 + i as f32 * 0.03, 0.3 + (i % 4) as f32 * 0.1))
        .collect()
}

fn session(endpoint: String, tones: &Tones) -> Session {
    let mut settings = Settings::default();
    settings.inference.endpoint = endpoint;

    let hand = open_hand();
    Session::builder(settings)
        .source(Box::new(StillCamera))
        .detector(
            ModelKind::Hands,
            Box::new(
                move |_frame: &VideoFrame, _ts: f64| -> Result<RawDetection, DetectorError> {
                    Ok(RawDetection {
                        instances: vec![RawInstance {
                            landmarks: hand.clone(),
                            categories: Vec::new(),
                        }],
                    })
                },
            ),
        )
        .tone_sink(Box::new(tones.clone()))
        .seed(42)
        .build()
        .unwrap()
}

/// Ticks at a fixed time until the outstanding request has been applied.
async fn tick_until_settled(session: &mut Session, now_ms: f64) -> TickReport {
    let mut canvas = RecordingCanvas::new();
    for _ in 0..1000 {
        tokio::time::sleep(Duration::from_millis(2)).await;
        let report = session.tick(now_ms, &mut canvas);
        if report.classified.is_some() || report.failure.is_some() {
            return report;
        }
    }
    panic!("request never completed");
}

#[tokio::test]
async fn recognized_gesture_plays_tone_and_bursts_at_fingertips() {
    let endpoint =
        classifier_stub("200 OK", r#"{"prediction":[{"label":"Do","confidence":0.92}]}"#).await;
    let tones = Tones::default();
    let mut session = session(endpoint, &tones);
    let mut canvas = RecordingCanvas::new();

    let report = session.tick(1200.0, &mut canvas);
    assert!(report.new_frame);
    assert!(matches!(report.submit, SubmitOutcome::Submitted(_)));

    let report = tick_until_settled(&mut session, 1500.0).await;
    assert_eq!(report.classified, Some(GestureLabel::Known(Gesture::Do)));
    assert!(matches!(
        report.feedback,
        Some(FeedbackOutcome::Played { anchors: 5, particles: 20, .. })
    ));

    let played = tones.0.lock().unwrap().clone();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].note, "C4");
    assert!((played[0].hz - 261.63).abs() < 1e-3);

    // Particles were spawned this tick, so they still sit on the fingertips.
    let viewport = *session.viewport();
    let hand = open_hand();
    let tips: Vec<_> = [4, 8, 12, 16, 20]
        .iter()
        .map(|&i| viewport.to_screen(&hand[i]))
        .collect();
    let particles = session.state().particles.particles();
    assert_eq!(particles.len(), 20);
    for tip in &tips {
        assert_eq!(particles.iter().filter(|p| p.position == *tip).count(), 4);
    }
    assert!(particles.iter().all(|p| p.tag == Some(Gesture::Do)));
    assert!(Gesture::Do
        .outline(10.0)
        .iter()
        .all(|p| matches!(p, Primitive::Circle { .. })));

    assert_eq!(session.state().cache.display_label(), "Do");
    assert!((session.state().cache.confidence() - 0.92).abs() < 1e-6);
    assert_eq!(session.gate().next_allowed_ms(), 2700.0);
}

#[tokio::test]
async fn server_error_backs_off_before_next_request() {
    let endpoint = classifier_stub("500 Internal Server Error", r#"{"error":"boom"}"#).await;
    let tones = Tones::default();
    let mut session = session(endpoint, &tones);
    let mut canvas = RecordingCanvas::new();

    let report = session.tick(8000.0, &mut canvas);
    assert!(matches!(report.submit, SubmitOutcome::Submitted(_)));

    let report = tick_until_settled(&mut session, 10000.0).await;
    assert!(matches!(report.failure, Some(ClassifyError::Status(500))));
    assert_eq!(session.gate().next_allowed_ms(), 15200.0);
    assert!(!session.gate().state().in_flight);

    let report = session.tick(12000.0, &mut canvas);
    assert!(matches!(
        report.submit,
        SubmitOutcome::TooSoon { next_allowed_ms } if next_allowed_ms == 15200.0
    ));
    assert_eq!(session.gate().phase(12000.0), GatePhase::CoolingDown);

    let report = session.tick(15300.0, &mut canvas);
    assert!(matches!(report.submit, SubmitOutcome::Submitted(_)));

    assert!(tones.0.lock().unwrap().is_empty());
    assert_eq!(session.state().cache.display_label(), "No Hand");
}

#[tokio::test]
async fn unrecognized_label_is_shown_but_silent() {
    let endpoint =
        classifier_stub("200 OK", r#"{"prediction":[{"label":"Unknown","confidence":0.4}]}"#).await;
    let tones = Tones::default();
    let mut session = session(endpoint, &tones);
    let mut canvas = RecordingCanvas::new();

    session.tick(1200.0, &mut canvas);
    let report = tick_until_settled(&mut session, 1300.0).await;

    assert_eq!(
        report.classified,
        Some(GestureLabel::Unrecognized("Unknown".to_string()))
    );
    assert_eq!(report.feedback, Some(FeedbackOutcome::Ignored));
    assert!(report.failure.is_none());
    assert!(tones.0.lock().unwrap().is_empty());
    assert!(session.state().particles.is_empty());
    assert_eq!(session.state().cache.display_label(), "Unknown");
}
