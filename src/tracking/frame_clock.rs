use tracing::trace;

/// Decides, once per render tick, whether the source has moved on to a new
/// frame. Render ticks usually outpace capture, so most ticks see the same
/// presentation timestamp and must not re-run detection.
#[derive(Debug, Default)]
pub struct FrameClock {
    last_processed: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true, and records the timestamp, only when it differs from the
    /// last one seen. A missing or non-finite timestamp is "no new frame".
    pub fn has_new_frame(&mut self, source_timestamp: Option<f64>) -> bool {
        let Some(ts) = source_timestamp.filter(|ts| ts.is_finite()) else {
            return false;
        };
        if self.last_processed == Some(ts) {
            return false;
        }
        trace!(previous = ?self.last_processed, current = ts, "New video frame");
        self.last_processed = Some(ts);
        true
    }

    pub fn last_processed(&self) -> Option<f64> {
        self.last_processed
    }
}
