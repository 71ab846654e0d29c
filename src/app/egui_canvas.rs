use crate::common::Point;
use crate::render::{Canvas, Color, Stroke};
use egui::{Align2, Color32, FontId, Painter, Pos2, Vec2};

/// Adapts the session's drawing calls onto an egui painter. Session
/// coordinates are relative to `origin`, the top-left of the drawing area.
pub struct EguiCanvas<'a> {
    painter: &'a Painter,
    origin: Vec2,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(painter: &'a Painter, origin: Pos2) -> Self {
        Self {
            painter,
            origin: origin.to_vec2(),
        }
    }

    fn pos(&self, p: Point) -> Pos2 {
        Pos2::new(p.x, p.y) + self.origin
    }
}

fn color32(color: Color) -> Color32 {
    let [r, g, b, a] = color.to_rgba8();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn stroke(stroke: Stroke) -> egui::Stroke {
    egui::Stroke::new(stroke.width, color32(stroke.color))
}

impl Canvas for EguiCanvas<'_> {
    fn circle(&mut self, center: Point, diameter: f32, fill: Option<Color>, outline: Option<Stroke>) {
        self.painter.circle(
            self.pos(center),
            diameter / 2.0,
            fill.map(color32).unwrap_or(Color32::TRANSPARENT),
            outline.map(stroke).unwrap_or(egui::Stroke::NONE),
        );
    }

    fn line(&mut self, from: Point, to: Point, line: Stroke) {
        self.painter
            .line_segment([self.pos(from), self.pos(to)], stroke(line));
    }

    fn text(&mut self, anchor: Point, text: &str, size: f32, color: Color) {
        self.painter.text(
            self.pos(anchor),
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(size),
            color32(color),
        );
    }
}
