use crate::common::Point;

/// Straight RGBA, each channel in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb8(255, 255, 255);

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba8(r, g, b, 255)
    }

    pub const fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Hue in degrees, saturation and value in [0, 100], alpha in [0, 1].
    pub fn hsva(hue: f32, saturation: f32, value: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let v = (value / 100.0).clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = v - c;
        Self {
            r: r + m,
            g: g + m,
            b: b + m,
            a: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: Color,
}

impl Stroke {
    pub const fn new(width: f32, color: Color) -> Self {
        Self { width, color }
    }
}

/// Drawing surface in screen pixels. Write-only, single producer.
pub trait Canvas {
    fn circle(&mut self, center: Point, diameter: f32, fill: Option<Color>, stroke: Option<Stroke>);
    fn line(&mut self, from: Point, to: Point, stroke: Stroke);
    fn text(&mut self, anchor: Point, text: &str, size: f32, color: Color);
}

/// Canvas that keeps every call, for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Circle {
        center: Point,
        diameter: f32,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Text {
        anchor: Point,
        text: String,
        size: f32,
        color: Color,
    },
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn circle_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { .. }))
            .count()
    }

    pub fn line_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count()
    }
}

impl Canvas for RecordingCanvas {
    fn circle(&mut self, center: Point, diameter: f32, fill: Option<Color>, stroke: Option<Stroke>) {
        self.ops.push(DrawOp::Circle {
            center,
            diameter,
            fill,
            stroke,
        });
    }

    fn line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.ops.push(DrawOp::Line { from, to, stroke });
    }

    fn text(&mut self, anchor: Point, text: &str, size: f32, color: Color) {
        self.ops.push(DrawOp::Text {
            anchor,
            text: text.to_string(),
            size,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsva_primary_hues() {
        assert_eq!(Color::hsva(0.0, 100.0, 100.0, 1.0).to_rgba8(), [255, 0, 0, 255]);
        assert_eq!(Color::hsva(120.0, 100.0, 100.0, 1.0).to_rgba8(), [0, 255, 0, 255]);
        assert_eq!(Color::hsva(240.0, 100.0, 100.0, 0.5).to_rgba8(), [0, 0, 255, 128]);
    }

    #[test]
    fn zero_saturation_is_grey() {
        let [r, g, b, _] = Color::hsva(200.0, 0.0, 50.0, 1.0).to_rgba8();
        assert_eq!((r, g, b), (128, 128, 128));
    }
}
