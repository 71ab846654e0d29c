//! Outline geometry for each gesture, in a particle's local frame (origin at
//! the particle, unrotated). `ParticleField` rotates and translates the
//! primitives before they reach the canvas.

use crate::common::Vec2;
use crate::inference::Gesture;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Circle { center: Vec2, diameter: f32 },
    Line { from: Vec2, to: Vec2 },
}

impl Primitive {
    fn circle(diameter: f32) -> Self {
        Primitive::Circle {
            center: Vec2::ZERO,
            diameter,
        }
    }

    fn line(from: Vec2, to: Vec2) -> Self {
        Primitive::Line { from, to }
    }

    fn spoke(to: Vec2) -> Self {
        Primitive::Line { from: Vec2::ZERO, to }
    }

    /// Rotate about the local origin.
    pub fn rotated(self, angle: f32) -> Self {
        match self {
            Primitive::Circle { center, diameter } => Primitive::Circle {
                center: center.rotated(angle),
                diameter,
            },
            Primitive::Line { from, to } => Primitive::Line {
                from: from.rotated(angle),
                to: to.rotated(angle),
            },
        }
    }
}

/// Outline for a particle tag. Unrecognized labels get a plain circle.
pub fn outline(tag: Option<Gesture>, size: f32) -> Vec<Primitive> {
    match tag {
        Some(gesture) => gesture.outline(size),
        None => vec![Primitive::circle(size)],
    }
}

impl Gesture {
    pub fn outline(self, s: f32) -> Vec<Primitive> {
        match self {
            Gesture::Do => vec![Primitive::circle(s), Primitive::circle(s * 0.6)],
            Gesture::Re => polygon(3, s / 2.0),
            Gesture::Mi => {
                let mut out = square(s);
                out.extend(square(s * 0.7).into_iter().map(|p| p.rotated(FRAC_PI_4)));
                out
            }
            Gesture::Fa => star(8, s),
            Gesture::Sol => {
                let mut out = polygon(6, s / 2.0);
                out.extend((0..6).map(|i| Primitive::spoke(Vec2::from_angle(TAU / 6.0 * i as f32, s / 2.0))));
                out
            }
            Gesture::La => {
                let mut out = Vec::with_capacity(9);
                for i in 0..4 {
                    let angle = FRAC_PI_2 * i as f32;
                    out.push(Primitive::line(Vec2::new(0.0, -s / 2.0), Vec2::new(0.0, s / 2.0)).rotated(angle));
                    out.push(Primitive::line(Vec2::new(-s / 4.0, 0.0), Vec2::new(s / 4.0, 0.0)).rotated(angle));
                }
                out.push(Primitive::circle(s * 0.3));
                out
            }
            Gesture::Ti => {
                let mut out: Vec<Primitive> = (0..12)
                    .map(|i| Primitive::spoke(Vec2::from_angle(TAU / 12.0 * i as f32, s / 2.0)))
                    .collect();
                out.push(Primitive::circle(s));
                out
            }
        }
    }
}

/// Three vertical and three horizontal lines across the particle's core.
pub fn inner_grid(size: f32) -> Vec<Primitive> {
    let s = size * 0.4;
    let mut out = Vec::with_capacity(6);
    for i in -1..=1 {
        let offset = i as f32 * s / 3.0;
        out.push(Primitive::line(Vec2::new(offset, -s / 2.0), Vec2::new(offset, s / 2.0)));
        out.push(Primitive::line(Vec2::new(-s / 2.0, offset), Vec2::new(s / 2.0, offset)));
    }
    out
}

fn polygon(sides: usize, radius: f32) -> Vec<Primitive> {
    let step = TAU / sides as f32;
    (0..sides)
        .map(|i| {
            let angle = step * i as f32;
            Primitive::line(
                Vec2::from_angle(angle, radius),
                Vec2::from_angle(angle + step, radius),
            )
        })
        .collect()
}

fn square(side: f32) -> Vec<Primitive> {
    let h = side / 2.0;
    let corners = [
        Vec2::new(-h, -h),
        Vec2::new(h, -h),
        Vec2::new(h, h),
        Vec2::new(-h, h),
    ];
    (0..4)
        .map(|i| Primitive::line(corners[i], corners[(i + 1) % 4]))
        .collect()
}

fn star(points: usize, s: f32) -> Vec<Primitive> {
    let mut out = Vec::with_capacity(points * 2 + 1);
    for i in 0..points {
        let angle = TAU / points as f32 * i as f32;
        let outer = Vec2::from_angle(angle, s / 2.0);
        let inner = Vec2::from_angle(angle + PI / points as f32, s / 4.0);
        out.push(Primitive::line(outer, inner));
        out.push(Primitive::spoke(outer));
    }
    out.push(Primitive::circle(s * 0.2));
    out
}
