use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// The solfège hand signs the classifier knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Do,
    Re,
    Mi,
    Fa,
    Sol,
    La,
    Ti,
}

impl Gesture {
    pub const ALL: [Gesture; 7] = [
        Gesture::Do,
        Gesture::Re,
        Gesture::Mi,
        Gesture::Fa,
        Gesture::Sol,
        Gesture::La,
        Gesture::Ti,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Gesture::Do => "Do",
            Gesture::Re => "Re",
            Gesture::Mi => "Mi",
            Gesture::Fa => "Fa",
            Gesture::Sol => "Sol",
            Gesture::La => "La",
            Gesture::Ti => "Ti",
        }
    }
}

impl FromStr for Gesture {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gesture::ALL
            .into_iter()
            .find(|g| g.name() == s)
            .ok_or(())
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Label as returned by the classifier. Anything outside the gesture set
/// ("No Hand", "Unknown") is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    Known(Gesture),
    Unrecognized(String),
}

impl GestureLabel {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<Gesture>() {
            Ok(gesture) => GestureLabel::Known(gesture),
            Err(()) => GestureLabel::Unrecognized(raw.to_string()),
        }
    }

    pub fn gesture(&self) -> Option<Gesture> {
        match self {
            GestureLabel::Known(gesture) => Some(*gesture),
            GestureLabel::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GestureLabel::Known(gesture) => gesture.name(),
            GestureLabel::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the classifier said about one still frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: GestureLabel,
    pub confidence: f32,
}

/// A classification stamped with the moment the gate accepted it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    label: GestureLabel,
    confidence: f32,
    produced_at: DateTime<Utc>,
}

impl ClassificationResult {
    pub fn new(classification: Classification, produced_at: DateTime<Utc>) -> Self {
        Self {
            label: classification.label,
            confidence: classification.confidence.clamp(0.0, 1.0),
            produced_at,
        }
    }

    pub fn label(&self) -> &GestureLabel {
        &self.label
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }
}

/// Most recent successful classification. Each success replaces the previous
/// value outright and is handed out once through `take_fresh`, even when the
/// label did not change.
#[derive(Debug, Default)]
pub struct ClassificationCache {
    latest: Option<ClassificationResult>,
    fresh: bool,
}

impl ClassificationCache {
    pub const DEFAULT_LABEL: &'static str = "No Hand";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, result: ClassificationResult) {
        self.latest = Some(result);
        self.fresh = true;
    }

    pub fn latest(&self) -> Option<&ClassificationResult> {
        self.latest.as_ref()
    }

    /// The newest result if it has not been taken yet.
    pub fn take_fresh(&mut self) -> Option<&ClassificationResult> {
        if !self.fresh {
            return None;
        }
        self.fresh = false;
        self.latest.as_ref()
    }

    pub fn display_label(&self) -> &str {
        self.latest
            .as_ref()
            .map(|r| r.label.as_str())
            .unwrap_or(Self::DEFAULT_LABEL)
    }

    pub fn confidence(&self) -> f32 {
        self.latest.as_ref().map(|r| r.confidence).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, confidence: f32) -> ClassificationResult {
        ClassificationResult::new(
            Classification {
                label: GestureLabel::parse(label),
                confidence,
            },
            Utc::now(),
        )
    }

    #[test]
    fn parses_known_and_unknown_labels() {
        assert_eq!(GestureLabel::parse("Sol"), GestureLabel::Known(Gesture::Sol));
        assert_eq!(
            GestureLabel::parse("No Hand"),
            GestureLabel::Unrecognized("No Hand".to_string())
        );
        // Labels are case-sensitive, as the classifier emits them.
        assert_eq!(GestureLabel::parse("do").gesture(), None);
    }

    #[test]
    fn cache_defaults_to_no_hand() {
        let cache = ClassificationCache::new();
        assert_eq!(cache.display_label(), "No Hand");
        assert_eq!(cache.confidence(), 0.0);
        assert!(cache.latest().is_none());
    }

    #[test]
    fn repeated_label_is_fresh_each_time() {
        let mut cache = ClassificationCache::new();
        cache.update(result("Mi", 0.8));
        assert!(cache.take_fresh().is_some());
        assert!(cache.take_fresh().is_none());

        cache.update(result("Mi", 0.85));
        let fresh = cache.take_fresh().unwrap();
        assert_eq!(fresh.label(), &GestureLabel::Known(Gesture::Mi));
        assert_eq!(fresh.confidence(), 0.85);
    }

    #[test]
    fn update_replaces_wholesale() {
        let mut cache = ClassificationCache::new();
        let first = result("Do", 0.9);
        let first_at = first.produced_at();
        cache.update(first);
        let second = result("Unknown", 0.1);
        let second_at = second.produced_at();
        cache.update(second);
        assert_eq!(cache.display_label(), "Unknown");
        assert_eq!(cache.confidence(), 0.1);
        assert_eq!(cache.latest().unwrap().produced_at(), second_at);
        assert!(second_at >= first_at);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(result("La", 1.5).confidence(), 1.0);
        assert_eq!(result("La", -0.2).confidence(), 0.0);
    }
}
