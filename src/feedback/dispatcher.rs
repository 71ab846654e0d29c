use crate::common::landmark::FINGERTIPS;
use crate::config::FeedbackSettings;
use crate::feedback::particle::{ParticleEntity, ParticleField};
use crate::feedback::pitch::Pitch;
use crate::inference::{ClassificationResult, GestureLabel};
use crate::render::Viewport;
use crate::tracking::{ModelKind, ObservationStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tracing::{debug, info};

/// Anything that can sound a short note.
pub trait ToneSink: Send {
    fn play(&mut self, pitch: &Pitch, duration: Duration);
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    /// Label has no pitch; nothing played or spawned.
    Ignored,
    /// Same label as last time while repeat suppression is on.
    Suppressed,
    Played {
        pitch: Pitch,
        anchors: usize,
        particles: usize,
    },
}

/// Turns each fresh classification into a tone plus particle bursts at the
/// fingertips of the first tracked hand.
pub struct FeedbackDispatcher {
    sink: Box<dyn ToneSink>,
    rng: StdRng,
    note: Duration,
    suppress_repeats: bool,
    last_label: Option<GestureLabel>,
}

impl FeedbackDispatcher {
    pub fn new(sink: Box<dyn ToneSink>, settings: &FeedbackSettings) -> Self {
        Self {
            sink,
            rng: StdRng::from_os_rng(),
            note: settings.note_duration(),
            suppress_repeats: settings.suppress_repeats,
            last_label: None,
        }
    }

    /// Fixes the particle randomness, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn on_classified(
        &mut self,
        result: &ClassificationResult,
        observations: &ObservationStore,
        viewport: &Viewport,
        field: &mut ParticleField,
    ) -> FeedbackOutcome {
        let label = result.label();
        let repeated = self.last_label.as_ref() == Some(label);
        self.last_label = Some(label.clone());
        if self.suppress_repeats && repeated {
            debug!(label = %label, "Repeated label, feedback suppressed");
            return FeedbackOutcome::Suppressed;
        }

        let Some(gesture) = label.gesture() else {
            debug!(label = %label, "No pitch for label");
            return FeedbackOutcome::Ignored;
        };
        let pitch = gesture.pitch();
        self.sink.play(&pitch, self.note);

        let mut anchors = 0;
        let mut particles = 0;
        let hand = observations.get(ModelKind::Hands).and_then(|o| o.first());
        if let Some(hand) = hand {
            let per_anchor = pitch.burst_per_anchor();
            for tip in FINGERTIPS.iter().filter_map(|&i| hand.landmark(i)) {
                let origin = viewport.to_screen(tip);
                for _ in 0..per_anchor {
                    field.spawn(ParticleEntity::burst(origin, &pitch, Some(gesture), &mut self.rng));
                }
                anchors += 1;
                particles += per_anchor as usize;
            }
        }

        info!(
            label = %label,
            note = pitch.note,
            confidence = result.confidence(),
            anchors,
            particles,
            "Feedback played"
        );
        FeedbackOutcome::Played {
            pitch,
            anchors,
            particles,
        }
    }
}
