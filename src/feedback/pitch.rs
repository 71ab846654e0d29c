use crate::common::geometry::remap;
use crate::inference::Gesture;
use std::fmt;

/// Frequency band the burst mappings are defined over.
const FREQ_RANGE: (f32, f32) = (260.0, 500.0);
/// Fingertips per hand, the number of anchors a full burst is split across.
const ANCHORS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pitch {
    pub note: &'static str,
    pub midi: u8,
    pub hz: f32,
}

impl Pitch {
    pub const fn new(note: &'static str, midi: u8, hz: f32) -> Self {
        Self { note, midi, hz }
    }

    /// Total particles a burst of this pitch is worth.
    pub fn burst_total(&self) -> u32 {
        remap(self.hz, FREQ_RANGE, (20.0, 40.0)).floor().max(0.0) as u32
    }

    /// Particles spawned at each fingertip.
    pub fn burst_per_anchor(&self) -> u32 {
        self.burst_total().div_ceil(ANCHORS)
    }

    pub fn particle_speed(&self) -> f32 {
        remap(self.hz, FREQ_RANGE, (1.0, 3.0))
    }

    pub fn hue(&self) -> f32 {
        remap(self.hz, FREQ_RANGE, (180.0, 320.0))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2} Hz)", self.note, self.hz)
    }
}

impl Gesture {
    /// Solfège syllable to its note in the fourth octave, C major.
    pub fn pitch(self) -> Pitch {
        match self {
            Gesture::Do => Pitch::new("C4", 60, 261.63),
            Gesture::Re => Pitch::new("D4", 62, 293.66),
            Gesture::Mi => Pitch::new("E4", 64, 329.63),
            Gesture::Fa => Pitch::new("F4", 65, 349.23),
            Gesture::Sol => Pitch::new("G4", 67, 392.00),
            Gesture::La => Pitch::new("A4", 69, 440.00),
            Gesture::Ti => Pitch::new("B4", 71, 493.88),
        }
    }
}
