use crate::{
    audio,
    common::{VideoFrame, VideoSource, capture_still},
    config::Settings,
    error::{AppError, ClassifyError},
    feedback::{FeedbackDispatcher, FeedbackOutcome, ParticleField, ToneSink},
    inference::{
        ClassificationCache, Classifier, ClassifierBuilder, GateEvent, GestureLabel,
        HttpClassifier, InferenceGate, SubmitOutcome,
    },
    render::{Canvas, Viewport, overlay},
    tracking::{Detector, DetectorSet, FrameClock, ModelKind, ObservationStore},
};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Particle ages advance one unit per tick.
const TICK_DELTA: f32 = 1.0;

/// Everything the components share, owned in one place and lent out per tick.
pub struct SessionState {
    pub observations: ObservationStore,
    pub cache: ClassificationCache,
    pub particles: ParticleField,
}

/// What happened during one tick.
#[derive(Debug)]
pub struct TickReport {
    /// Detectors ran on a frame not seen before.
    pub new_frame: bool,
    pub detector_failures: usize,
    pub expired_particles: usize,
    pub classified: Option<GestureLabel>,
    pub failure: Option<ClassifyError>,
    pub feedback: Option<FeedbackOutcome>,
    pub submit: SubmitOutcome,
}

/// Drives the whole pipeline from a single `tick` call per display frame.
pub struct Session {
    source: Box<dyn VideoSource>,
    clock: FrameClock,
    detectors: DetectorSet,
    gate: InferenceGate,
    feedback: FeedbackDispatcher,
    viewport: Viewport,
    jpeg_quality: u8,
    last_frame: Option<VideoFrame>,
    state: SessionState,
}

impl Session {
    pub fn builder(settings: Settings) -> SessionBuilder {
        SessionBuilder::new(settings)
    }

    /// One display frame. All shared state changes here and nowhere else.
    pub fn tick(&mut self, now_ms: f64, canvas: &mut dyn Canvas) -> TickReport {
        let mut new_frame = false;
        let mut detector_failures = 0;
        if self.clock.has_new_frame(self.source.presentation_timestamp()) {
            if let Some(frame) = self.source.current_frame() {
                let pass = self.detectors.process_frame(&frame, now_ms);
                detector_failures = pass.failures.len();
                self.state.observations.apply(pass);
                self.last_frame = Some(frame);
                new_frame = true;
            }
        }

        overlay::draw_observations(canvas, &self.viewport, &self.state.observations);

        let expired_particles = self.state.particles.advance(TICK_DELTA);
        self.state.particles.render(canvas);

        let mut classified = None;
        let mut failure = None;
        let mut feedback = None;
        match self.gate.poll_completion(now_ms) {
            Some(GateEvent::Classified(result)) => {
                classified = Some(result.label().clone());
                self.state.cache.update(result);
            }
            Some(GateEvent::Failed(e)) => failure = Some(e),
            None => {}
        }
        if let Some(fresh) = self.state.cache.take_fresh() {
            feedback = Some(self.feedback.on_classified(
                fresh,
                &self.state.observations,
                &self.viewport,
                &mut self.state.particles,
            ));
        }

        let quality = self.jpeg_quality;
        let source = &mut self.source;
        let submit = self
            .gate
            .try_submit(now_ms, || capture_still(&mut **source, quality));

        overlay::draw_label(canvas, &self.viewport, self.state.cache.display_label());

        TickReport {
            new_frame,
            detector_failures,
            expired_particles,
            classified,
            failure,
            feedback,
            submit,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn gate(&self) -> &InferenceGate {
        &self.gate
    }

    /// The frame the current observations were detected on.
    pub fn last_frame(&self) -> Option<&VideoFrame> {
        self.last_frame.as_ref()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Follows the window size; the capture box keeps its configured size.
    pub fn resize(&mut self, width: f32, height: f32) {
        if (width, height) != (self.viewport.width, self.viewport.height) {
            debug!(width, height, "Viewport resized");
            self.viewport = self.viewport.resized(width, height);
        }
    }
}

pub struct SessionBuilder {
    settings: Settings,
    source: Option<Box<dyn VideoSource>>,
    detectors: IndexMap<ModelKind, Box<dyn Detector>>,
    classifier: Option<Arc<dyn Classifier>>,
    tone_sink: Option<Box<dyn ToneSink>>,
    runtime: Option<Handle>,
    seed: Option<u64>,
}

impl SessionBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            source: None,
            detectors: IndexMap::new(),
            classifier: None,
            tone_sink: None,
            runtime: None,
            seed: None,
        }
    }

    pub fn source(mut self, source: Box<dyn VideoSource>) -> Self {
        self.source = Some(source);
        self
    }

    // Registers the model for `kind`. Only used if the model is enabled.
    pub fn detector(mut self, kind: ModelKind, detector: Box<dyn Detector>) -> Self {
        self.detectors.insert(kind, detector);
        self
    }

    // Overrides the HTTP classifier built from the inference settings.
    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn tone_sink(mut self, sink: Box<dyn ToneSink>) -> Self {
        self.tone_sink = Some(sink);
        self
    }

    // Runtime the classification requests are spawned on. Defaults to the
    // runtime `build` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<Session, AppError> {
        let settings = self.settings;
        settings.validate()?;

        let source = self
            .source
            .ok_or(AppError::Runtime("Video source not set".to_string()))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| AppError::Runtime(e.to_string()))?,
        };

        let mut detectors = DetectorSet::builder(&settings.tracking);
        for (kind, detector) in self.detectors {
            detectors = detectors.detector(kind, detector);
        }
        let detectors = detectors.build();

        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(HttpClassifier::from_settings(&settings.inference)));
        let stack = ClassifierBuilder::new(classifier)
            .timeout(settings.inference.request_timeout())
            .build();
        let gate = InferenceGate::from_settings(&settings.inference, stack, runtime);

        let sink = self
            .tone_sink
            .unwrap_or_else(|| audio::default_sink(settings.feedback.midi_port.as_deref()));
        let mut feedback = FeedbackDispatcher::new(sink, &settings.feedback);
        if let Some(seed) = self.seed {
            feedback = feedback.with_seed(seed);
        }

        let state = SessionState {
            observations: detectors.seed_store(),
            cache: ClassificationCache::new(),
            particles: ParticleField::new(),
        };
        info!(
            models = ?detectors.enabled_models().collect::<Vec<_>>(),
            endpoint = %settings.inference.predict_url(),
            "Session ready"
        );

        Ok(Session {
            source,
            clock: FrameClock::new(),
            detectors,
            gate,
            feedback,
            viewport: Viewport::from_settings(&settings.display),
            jpeg_quality: settings.inference.jpeg_quality,
            last_frame: None,
            state,
        })
    }
}
