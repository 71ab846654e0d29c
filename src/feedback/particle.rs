use crate::common::{Point, Vec2};
use crate::feedback::pitch::Pitch;
use crate::feedback::shapes::{self, Primitive};
use crate::inference::Gesture;
use crate::render::{Canvas, Color, Stroke};
use rand::Rng;
use std::f32::consts::TAU;

pub const INITIAL_LIFETIME: f32 = 600.0;
pub const DECAY_PER_TICK: f32 = 2.0;
pub const SPIN_PER_TICK: f32 = 0.03;
const ALPHA_PER_LIFETIME: f32 = 0.4;
const GLOW_PASSES: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEntity {
    pub position: Point,
    pub velocity: Vec2,
    pub lifetime: f32,
    pub tag: Option<Gesture>,
    pub hue: f32,
    pub size: f32,
    pub rotation: f32,
    pub glow_size: f32,
}

impl ParticleEntity {
    /// A particle leaving `position` at the pitch's speed in a random direction.
    pub fn burst<R: Rng>(position: Point, pitch: &Pitch, tag: Option<Gesture>, rng: &mut R) -> Self {
        let size = rng.random_range(4.0..20.0);
        Self {
            position,
            velocity: Vec2::from_angle(rng.random_range(0.0..TAU), pitch.particle_speed()),
            lifetime: INITIAL_LIFETIME,
            tag,
            hue: pitch.hue(),
            size,
            rotation: rng.random_range(0.0..TAU),
            glow_size: size * 2.0,
        }
    }

    /// Opacity in [0, 1], fading with the remaining lifetime.
    pub fn alpha(&self) -> f32 {
        (self.lifetime * ALPHA_PER_LIFETIME / 255.0).clamp(0.0, 1.0)
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }

    fn step(&mut self, delta: f32, pulse: f32) {
        self.position += self.velocity * delta;
        self.lifetime -= DECAY_PER_TICK * delta;
        self.rotation += SPIN_PER_TICK * delta;
        self.glow_size = self.size * 2.0 + pulse * 5.0;
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        let alpha = self.alpha();

        for i in (1..=GLOW_PASSES).rev() {
            let i = i as f32;
            let stroke = Stroke::new(2.0, Color::hsva(self.hue, 80.0, 100.0, alpha * 0.15 * i));
            self.draw_primitives(canvas, shapes::outline(self.tag, self.glow_size * (1.0 + i * 0.3)), stroke);
        }

        let main = Stroke::new(2.0, Color::hsva(self.hue, 100.0, 100.0, alpha));
        self.draw_primitives(canvas, shapes::outline(self.tag, self.size), main);

        let grid = Stroke::new(0.5, Color::hsva(self.hue, 60.0, 100.0, alpha * 0.6));
        self.draw_primitives(canvas, shapes::inner_grid(self.size), grid);
    }

    fn draw_primitives(&self, canvas: &mut dyn Canvas, primitives: Vec<Primitive>, stroke: Stroke) {
        for primitive in primitives {
            match primitive.rotated(self.rotation) {
                Primitive::Circle { center, diameter } => {
                    canvas.circle(self.position + center, diameter, None, Some(stroke));
                }
                Primitive::Line { from, to } => {
                    canvas.line(self.position + from, self.position + to, stroke);
                }
            }
        }
    }
}

/// Live particles, each aging on its own. Entities leave only by expiring;
/// anything drifting off screen keeps living until its lifetime runs out.
#[derive(Debug, Default)]
pub struct ParticleField {
    particles: Vec<ParticleEntity>,
    ticks: u64,
}

impl ParticleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn spawn(&mut self, particle: ParticleEntity) {
        self.particles.push(particle);
    }

    /// Moves and ages every particle, then drops the expired ones.
    /// Returns how many were removed.
    pub fn advance(&mut self, delta_ticks: f32) -> usize {
        self.ticks += 1;
        let pulse = (self.ticks as f32 * 0.1).sin();
        for particle in &mut self.particles {
            particle.step(delta_ticks, pulse);
        }
        let before = self.particles.len();
        self.particles.retain(|p| !p.is_expired());
        before - self.particles.len()
    }

    pub fn render(&self, canvas: &mut dyn Canvas) {
        for particle in &self.particles {
            particle.draw(canvas);
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[ParticleEntity] {
        &self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawOp, RecordingCanvas};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn particle(lifetime: f32, tag: Option<Gesture>) -> ParticleEntity {
        ParticleEntity {
            position: Point::new(100.0, 100.0),
            velocity: Vec2::new(1.0, -2.0),
            lifetime,
            tag,
            hue: 200.0,
            size: 10.0,
            rotation: 0.0,
            glow_size: 20.0,
        }
    }

    #[test]
    fn burst_uses_pitch_speed_and_hue() {
        let mut rng = StdRng::seed_from_u64(7);
        let pitch = Gesture::La.pitch();
        let p = ParticleEntity::burst(Point::new(5.0, 5.0), &pitch, Some(Gesture::La), &mut rng);
        assert!((p.velocity.length() - pitch.particle_speed()).abs() < 1e-4);
        assert_eq!(p.hue, pitch.hue());
        assert!((4.0..20.0).contains(&p.size));
        assert_eq!(p.lifetime, INITIAL_LIFETIME);
    }

    #[test]
    fn advance_moves_ages_and_spins() {
        let mut field = ParticleField::new();
        field.spawn(particle(600.0, Some(Gesture::Do)));
        assert_eq!(field.advance(1.0), 0);

        let p = &field.particles()[0];
        assert_eq!(p.position, Point::new(101.0, 98.0));
        assert_eq!(p.lifetime, 598.0);
        assert!((p.rotation - SPIN_PER_TICK).abs() < 1e-6);
        assert!((p.alpha() - 598.0 * 0.4 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn removes_exactly_the_expired() {
        let mut field = ParticleField::new();
        field.spawn(particle(2.0, None));
        field.spawn(particle(1.0, None));
        field.spawn(particle(600.0, None));

        assert_eq!(field.advance(1.0), 2);
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn off_screen_particles_survive() {
        let mut field = ParticleField::new();
        let mut far = particle(600.0, None);
        far.position = Point::new(-10_000.0, 50_000.0);
        field.spawn(far);
        assert_eq!(field.advance(1.0), 0);
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn lifetime_runs_out_after_three_hundred_ticks() {
        let mut field = ParticleField::new();
        field.spawn(particle(INITIAL_LIFETIME, None));
        let removed: usize = (0..299).map(|_| field.advance(1.0)).sum();
        assert_eq!(removed, 0);
        assert_eq!(field.advance(1.0), 1);
        assert!(field.is_empty());
    }

    #[test]
    fn render_draws_glow_outline_and_grid() {
        let mut field = ParticleField::new();
        field.spawn(particle(600.0, None));
        let mut canvas = RecordingCanvas::new();
        field.render(&mut canvas);

        // three glow circles plus the main circle, then the 6-line grid
        assert_eq!(canvas.circle_count(), 4);
        assert_eq!(canvas.line_count(), 6);
        let outlines_unfilled = canvas
            .ops
            .iter()
            .all(|op| !matches!(op, DrawOp::Circle { fill: Some(_), .. }));
        assert!(outlines_unfilled);
    }
}
