use crate::common::landmark::{INDEX_TIP, POSE_CONNECTIONS, THUMB_TIP, WRIST, is_fingertip};
use crate::common::geometry::remap;
use crate::common::{Category, Point};
use crate::render::canvas::{Canvas, Color, Stroke};
use crate::render::viewport::Viewport;
use crate::tracking::{Instance, ModelKind, ObservationStore};

pub const FINGERTIP_DIAMETER: f32 = 24.0;
pub const JOINT_DIAMETER: f32 = 8.0;
pub const PINCH_DISTANCE: f32 = 30.0;
pub const PINCH_DIAMETER: f32 = 40.0;

const FINGERTIP_COLOR: Color = Color::rgb8(200, 200, 120);
const JOINT_COLOR: Color = Color::rgb8(200, 200, 200);
const PINCH_COLOR: Color = Color::rgba8(128, 0, 128, 180);
const POSE_COLOR: Color = Color::rgba8(120, 200, 255, 200);
const FACE_COLOR: Color = Color::rgba8(255, 255, 255, 120);
const LABEL_COLOR: Color = Color::WHITE;

// Blendshape bar chart, pinned to the top-left corner of the drawing area.
const METRICS_TEXT_X: f32 = 40.0;
const METRICS_TOP: f32 = 40.0;
const METRICS_ROW: f32 = 8.5;
const METRICS_TEXT_SIZE: f32 = 7.0;
const METRICS_BAR_START: f32 = METRICS_TEXT_X - 5.0;
const METRICS_BAR_END: f32 = METRICS_TEXT_X - 35.0;

/// Draws every stored observation. Models without an entry are disabled and
/// draw nothing.
pub fn draw_observations(canvas: &mut dyn Canvas, viewport: &Viewport, store: &ObservationStore) {
    for (kind, observation) in store.iter() {
        for instance in observation.instances() {
            match kind {
                ModelKind::Hands => draw_hand(canvas, viewport, instance),
                ModelKind::Pose => draw_pose(canvas, viewport, instance),
                ModelKind::Face => draw_face(canvas, viewport, instance),
            }
        }
    }
}

pub fn draw_hand(canvas: &mut dyn Canvas, viewport: &Viewport, hand: &Instance) {
    for (index, landmark) in hand.landmarks.iter().enumerate() {
        let p = viewport.to_screen(landmark);
        if is_fingertip(index) {
            canvas.circle(p, FINGERTIP_DIAMETER, Some(FINGERTIP_COLOR), None);
        } else {
            canvas.circle(p, JOINT_DIAMETER, Some(JOINT_COLOR), None);
        }
    }

    if let (Some(thumb), Some(index)) = (hand.landmark(THUMB_TIP), hand.landmark(INDEX_TIP)) {
        let thumb = viewport.to_screen(thumb);
        if thumb.distance(viewport.to_screen(index)) < PINCH_DISTANCE {
            canvas.circle(thumb, PINCH_DIAMETER, Some(PINCH_COLOR), None);
        }
    }

    if let (Some(label), Some(wrist)) = (hand.label.as_deref(), hand.landmark(WRIST)) {
        let p = viewport.to_screen(wrist);
        canvas.text(Point::new(p.x, p.y + 20.0), label, 16.0, LABEL_COLOR);
    }
}

fn draw_pose(canvas: &mut dyn Canvas, viewport: &Viewport, pose: &Instance) {
    let stroke = Stroke::new(2.0, POSE_COLOR);
    for &(a, b) in POSE_CONNECTIONS.iter() {
        if let (Some(a), Some(b)) = (pose.landmark(a), pose.landmark(b)) {
            canvas.line(viewport.to_screen(a), viewport.to_screen(b), stroke);
        }
    }
}

fn draw_face(canvas: &mut dyn Canvas, viewport: &Viewport, face: &Instance) {
    for landmark in &face.landmarks {
        canvas.circle(viewport.to_screen(landmark), 2.0, Some(FACE_COLOR), None);
    }
    if !face.scores.is_empty() {
        draw_face_metrics(canvas, &face.scores);
    }
}

/// One row per blendshape: its name, then a bar growing leftwards with the
/// score over a faint full-length track. The first category is the neutral
/// score and is skipped.
pub fn draw_face_metrics(canvas: &mut dyn Canvas, scores: &[Category]) {
    let value = Stroke::new(2.0, LABEL_COLOR);
    let track = Stroke::new(2.0, LABEL_COLOR.with_alpha(20.0 / 255.0));
    let mut y = METRICS_TOP;
    for category in scores.iter().skip(1) {
        canvas.text(Point::new(METRICS_TEXT_X, y), &category.name, METRICS_TEXT_SIZE, LABEL_COLOR);

        let bar_y = y - 2.0;
        let end = remap(
            category.score.clamp(0.0, 1.0),
            (0.0, 1.0),
            (METRICS_BAR_START, METRICS_BAR_END),
        );
        canvas.line(Point::new(METRICS_BAR_START, bar_y), Point::new(end, bar_y), value);
        canvas.line(
            Point::new(METRICS_BAR_START, bar_y),
            Point::new(METRICS_BAR_END, bar_y),
            track,
        );
        y += METRICS_ROW;
    }
}

/// Current gesture label, centered above the capture box.
pub fn draw_label(canvas: &mut dyn Canvas, viewport: &Viewport, label: &str) {
    let top = viewport.box_min();
    canvas.text(
        Point::new(viewport.center().x, top.y - 32.0),
        label,
        32.0,
        LABEL_COLOR,
    );
}
