use crate::common::StillImage;
use crate::config::InferenceSettings;
use crate::error::{CaptureError, ClassifyError};
use crate::inference::classification::{Classification, ClassificationResult};
use crate::inference::classifier::ClassifierStack;
use chrono::Utc;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tower::{Service, ServiceExt};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Mutable record owned by the gate alone. Normal spacing and error backoff
/// share `last_request_ms`: a failure writes a time in the future.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GateState {
    pub last_request_ms: f64,
    pub in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Idle,
    Requesting,
    CoolingDown,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Submitted(Uuid),
    /// A request is already outstanding.
    InFlight,
    /// Too soon since the last request (or still inside a backoff window).
    TooSoon { next_allowed_ms: f64 },
    /// No still frame could be produced; nothing was sent and nothing is penalized.
    CaptureSkipped(CaptureError),
    /// The classifier stack reported it cannot take a request right now.
    Unavailable,
}

#[derive(Debug)]
pub enum GateEvent {
    Classified(ClassificationResult),
    Failed(ClassifyError),
}

struct PendingRequest {
    id: Uuid,
    started_ms: f64,
    handle: JoinHandle<Result<Classification, ClassifyError>>,
}

/// Serializes and paces classification requests: at most one in flight, a
/// minimum spacing between requests, and a longer pause after a failure.
pub struct InferenceGate {
    state: GateState,
    min_interval_ms: f64,
    error_pause_ms: f64,
    classifier: ClassifierStack,
    runtime: Handle,
    pending: Option<PendingRequest>,
}

impl InferenceGate {
    pub const DEFAULT_MIN_INTERVAL_MS: f64 = 1200.0;
    pub const DEFAULT_ERROR_PAUSE_MS: f64 = 4000.0;

    pub fn new(classifier: ClassifierStack, runtime: Handle) -> Self {
        Self {
            state: GateState::default(),
            min_interval_ms: Self::DEFAULT_MIN_INTERVAL_MS,
            error_pause_ms: Self::DEFAULT_ERROR_PAUSE_MS,
            classifier,
            runtime,
            pending: None,
        }
    }

    pub fn from_settings(settings: &InferenceSettings, classifier: ClassifierStack, runtime: Handle) -> Self {
        Self::new(classifier, runtime)
            .with_min_interval_ms(settings.min_interval_ms as f64)
            .with_error_pause_ms(settings.error_pause_ms as f64)
    }

    pub fn with_min_interval_ms(mut self, min_interval_ms: f64) -> Self {
        self.min_interval_ms = min_interval_ms;
        self
    }

    pub fn with_error_pause_ms(mut self, error_pause_ms: f64) -> Self {
        self.error_pause_ms = error_pause_ms;
        self
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn next_allowed_ms(&self) -> f64 {
        self.state.last_request_ms + self.min_interval_ms
    }

    pub fn is_eligible(&self, now_ms: f64) -> bool {
        !self.state.in_flight && now_ms - self.state.last_request_ms >= self.min_interval_ms
    }

    pub fn phase(&self, now_ms: f64) -> GatePhase {
        if self.state.in_flight {
            GatePhase::Requesting
        } else if now_ms < self.state.last_request_ms {
            // Only a failure can push the threshold past the present.
            GatePhase::CoolingDown
        } else {
            GatePhase::Idle
        }
    }

    /// Starts a request if the gate allows one at `now_ms`. The eligibility
    /// check and the in-flight flag are set in this one synchronous call.
    pub fn try_submit<F>(&mut self, now_ms: f64, capture: F) -> SubmitOutcome
    where
        F: FnOnce() -> Result<StillImage, CaptureError>,
    {
        if self.state.in_flight {
            return SubmitOutcome::InFlight;
        }
        if !self.is_eligible(now_ms) {
            return SubmitOutcome::TooSoon {
                next_allowed_ms: self.next_allowed_ms(),
            };
        }

        let image = match capture() {
            Ok(image) => image,
            Err(e) => {
                debug!("Skipping classification this tick: {}", e);
                return SubmitOutcome::CaptureSkipped(e);
            }
        };

        match self.classifier.ready().now_or_never() {
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("Classifier unavailable: {}", e);
                return SubmitOutcome::Unavailable;
            }
            None => return SubmitOutcome::Unavailable,
        }

        let id = Uuid::new_v4();
        let span = info_span!("classify", request_id = %id, bytes = image.bytes.len());
        let request = self.classifier.call(image).instrument(span);
        let handle = self.runtime.spawn(request);

        self.state.in_flight = true;
        self.pending = Some(PendingRequest {
            id,
            started_ms: now_ms,
            handle,
        });
        debug!(request_id = %id, now_ms, "Classification request submitted");
        SubmitOutcome::Submitted(id)
    }

    /// Applies the outstanding request's outcome if it has finished. Never
    /// blocks; called at a fixed point of every tick.
    pub fn poll_completion(&mut self, now_ms: f64) -> Option<GateEvent> {
        let pending = self.pending.as_mut()?;
        if !pending.handle.is_finished() {
            return None;
        }
        let joined = (&mut pending.handle).now_or_never()?;
        Some(self.finish(now_ms, joined))
    }

    /// Waits for the outstanding request, then applies it as of `now_ms`.
    pub async fn settle(&mut self, now_ms: f64) -> Option<GateEvent> {
        let pending = self.pending.as_mut()?;
        let joined = (&mut pending.handle).await;
        Some(self.finish(now_ms, joined))
    }

    fn finish(
        &mut self,
        now_ms: f64,
        joined: Result<Result<Classification, ClassifyError>, tokio::task::JoinError>,
    ) -> GateEvent {
        let (id, started_ms) = match self.pending.take() {
            Some(pending) => (pending.id, pending.started_ms),
            None => (Uuid::nil(), now_ms),
        };
        self.state.in_flight = false;

        let outcome = joined.unwrap_or_else(|e| Err(ClassifyError::Task(e.to_string())));
        match outcome {
            Ok(classification) => {
                self.state.last_request_ms = now_ms;
                let result = ClassificationResult::new(classification, Utc::now());
                info!(
                    request_id = %id,
                    label = %result.label(),
                    confidence = result.confidence(),
                    elapsed_ms = now_ms - started_ms,
                    "Gesture classified"
                );
                GateEvent::Classified(result)
            }
            Err(e) => {
                self.state.last_request_ms = now_ms + self.error_pause_ms;
                warn!(
                    request_id = %id,
                    next_allowed_ms = self.next_allowed_ms(),
                    "Classification failed, backing off: {}",
                    e
                );
                GateEvent::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::classification::{Gesture, GestureLabel};
    use crate::inference::classifier::{Classifier, ClassifierBuilder};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Replies from a script, one entry per request.
    struct Scripted {
        replies: Mutex<VecDeque<Result<Classification, ClassifyError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Classification, ClassifyError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Classifier for Scripted {
        async fn classify(&self, _image: StillImage) -> Result<Classification, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ClassifyError::Transport("script exhausted".to_string())))
        }
    }

    /// Holds every request until released.
    struct Held(Arc<Notify>);

    #[async_trait]
    impl Classifier for Held {
        async fn classify(&self, _image: StillImage) -> Result<Classification, ClassifyError> {
            self.0.notified().await;
            Ok(ok("Fa"))
        }
    }

    fn ok(label: &str) -> Classification {
        Classification {
            label: GestureLabel::parse(label),
            confidence: 0.9,
        }
    }

    fn still() -> Result<StillImage, CaptureError> {
        Ok(StillImage {
            bytes: vec![0xFF, 0xD8],
            width: 1,
            height: 1,
        })
    }

    fn gate(classifier: Arc<dyn Classifier>) -> InferenceGate {
        InferenceGate::new(ClassifierBuilder::new(classifier).build(), Handle::current())
    }

    #[tokio::test]
    async fn first_request_waits_one_interval_from_start() {
        let mut gate = gate(Scripted::new(vec![Ok(ok("Do"))]));
        assert!(matches!(
            gate.try_submit(500.0, still),
            SubmitOutcome::TooSoon { next_allowed_ms } if next_allowed_ms == 1200.0
        ));
        assert!(matches!(gate.try_submit(1200.0, still), SubmitOutcome::Submitted(_)));
    }

    #[tokio::test]
    async fn success_spaces_next_request_from_completion() {
        let script = Scripted::new(vec![Ok(ok("Do")), Ok(ok("Re"))]);
        let mut gate = gate(script.clone());

        assert!(matches!(gate.try_submit(2000.0, still), SubmitOutcome::Submitted(_)));
        assert_eq!(gate.phase(2000.0), GatePhase::Requesting);

        match gate.settle(2300.0).await {
            Some(GateEvent::Classified(result)) => {
                assert_eq!(result.label(), &GestureLabel::Known(Gesture::Do));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(gate.state(), GateState { last_request_ms: 2300.0, in_flight: false });
        assert_eq!(gate.next_allowed_ms(), 3500.0);
        assert_eq!(gate.phase(2400.0), GatePhase::Idle);

        assert!(matches!(gate.try_submit(3499.0, still), SubmitOutcome::TooSoon { .. }));
        assert!(matches!(gate.try_submit(3500.0, still), SubmitOutcome::Submitted(_)));
        assert_eq!(script.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_pushes_threshold_past_interval_plus_pause() {
        let mut gate = gate(Scripted::new(vec![Err(ClassifyError::Status(500)), Ok(ok("Mi"))]));

        assert!(matches!(gate.try_submit(9000.0, still), SubmitOutcome::Submitted(_)));
        assert!(matches!(gate.settle(10000.0).await, Some(GateEvent::Failed(ClassifyError::Status(500)))));

        assert_eq!(gate.state().last_request_ms, 14000.0);
        assert_eq!(gate.next_allowed_ms(), 15200.0);
        assert_eq!(gate.phase(12000.0), GatePhase::CoolingDown);
        assert!(matches!(gate.try_submit(12000.0, still), SubmitOutcome::TooSoon { .. }));
        assert!(matches!(gate.try_submit(15199.0, still), SubmitOutcome::TooSoon { .. }));
        assert!(matches!(gate.try_submit(15300.0, still), SubmitOutcome::Submitted(_)));
    }

    #[tokio::test]
    async fn never_two_requests_in_flight() {
        let release = Arc::new(Notify::new());
        let mut gate = gate(Arc::new(Held(release.clone())));

        assert!(matches!(gate.try_submit(1200.0, still), SubmitOutcome::Submitted(_)));
        for now in [5000.0, 10_000.0, 60_000.0] {
            assert!(matches!(gate.try_submit(now, still), SubmitOutcome::InFlight));
            assert!(gate.poll_completion(now).is_none());
            assert!(gate.state().in_flight);
        }

        release.notify_one();
        assert!(matches!(gate.settle(61_000.0).await, Some(GateEvent::Classified(_))));
        assert!(!gate.state().in_flight);
        assert!(gate.settle(61_000.0).await.is_none());
    }

    #[tokio::test]
    async fn capture_failure_is_skipped_without_penalty() {
        let script = Scripted::new(vec![Ok(ok("Sol"))]);
        let mut gate = gate(script.clone());
        let before = gate.state();

        let outcome = gate.try_submit(5000.0, || Err(CaptureError::NotReady));
        assert!(matches!(outcome, SubmitOutcome::CaptureSkipped(CaptureError::NotReady)));
        assert_eq!(gate.state(), before);
        assert_eq!(script.calls.load(Ordering::SeqCst), 0);

        // The very next tick may try again.
        assert!(matches!(gate.try_submit(5016.0, still), SubmitOutcome::Submitted(_)));
    }

    #[tokio::test]
    async fn capture_is_not_attempted_when_ineligible() {
        let mut gate = gate(Scripted::new(vec![]));
        let mut captured = false;
        gate.try_submit(100.0, || {
            captured = true;
            still()
        });
        assert!(!captured);
    }

    #[tokio::test]
    async fn poll_completion_applies_finished_request() {
        let mut gate = gate(Scripted::new(vec![Ok(ok("Ti"))]));
        assert!(matches!(gate.try_submit(1500.0, still), SubmitOutcome::Submitted(_)));

        let mut event = None;
        for tick in 0..100 {
            tokio::task::yield_now().await;
            event = gate.poll_completion(1500.0 + tick as f64 * 16.0);
            if event.is_some() {
                break;
            }
        }
        assert!(matches!(event, Some(GateEvent::Classified(_))));
        assert!(!gate.state().in_flight);
    }

    #[tokio::test]
    async fn from_settings_uses_configured_timings() {
        let settings = InferenceSettings {
            min_interval_ms: 500,
            error_pause_ms: 1000,
            ..InferenceSettings::default()
        };
        let stack = ClassifierBuilder::new(Scripted::new(vec![Err(ClassifyError::Timeout)])).build();
        let mut gate = InferenceGate::from_settings(&settings, stack, Handle::current());

        assert!(matches!(gate.try_submit(500.0, still), SubmitOutcome::Submitted(_)));
        gate.settle(600.0).await;
        assert_eq!(gate.next_allowed_ms(), 600.0 + 1000.0 + 500.0);
    }
}
