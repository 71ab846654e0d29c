use crate::common::geometry::remap;
use crate::common::{Landmark, Point};
use crate::config::DisplaySettings;

/// The centered capture box landmarks are drawn into. The x axis is mirrored
/// so the preview behaves like a mirror for the person in front of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub box_width: f32,
    pub box_height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, box_width: f32, box_height: f32) -> Self {
        Self {
            width,
            height,
            box_width,
            box_height,
        }
    }

    pub fn from_settings(display: &DisplaySettings) -> Self {
        Self::new(
            display.window_width,
            display.window_height,
            display.box_width,
            display.box_height,
        )
    }

    pub fn resized(self, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn box_min(&self) -> Point {
        let c = self.center();
        Point::new(c.x - self.box_width / 2.0, c.y - self.box_height / 2.0)
    }

    pub fn box_max(&self) -> Point {
        let c = self.center();
        Point::new(c.x + self.box_width / 2.0, c.y + self.box_height / 2.0)
    }

    pub fn to_screen(&self, landmark: &Landmark) -> Point {
        let (min, max) = (self.box_min(), self.box_max());
        Point::new(
            remap(landmark.x, (0.0, 1.0), (max.x, min.x)),
            remap(landmark.y, (0.0, 1.0), (min.y, max.y)),
        )
    }
}
