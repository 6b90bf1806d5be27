use std::time::Duration;

use super::{pick, Bounds, Effect};
use crate::canvas::{Canvas, Rgb};
use crate::error::SurfaceError;

const COLORS: [Rgb; 10] = [
    (255, 0, 0),     // red
    (0, 255, 0),     // green
    (0, 0, 255),     // blue
    (255, 255, 0),   // yellow
    (255, 0, 255),   // magenta
    (0, 255, 255),   // cyan
    (255, 165, 0),   // orange
    (255, 215, 0),   // gold
    (255, 20, 147),  // deep pink
    (127, 255, 212), // aquamarine
];

const SPAWN_CHANCE: f32 = 0.05;
const PARTICLES_PER_BURST: usize = 50;
const GRAVITY: f32 = 0.05;
const ALPHA_DECAY: f32 = 0.005;
const RADIUS: f32 = 2.0;

#[derive(Debug, Clone)]
struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    alpha: f32,
    life: f32,
    color: Rgb,
}

impl Particle {
    fn update(&mut self) {
        self.vy += GRAVITY;
        self.x += self.vx;
        self.y += self.vy;
        self.alpha -= ALPHA_DECAY;
        self.life -= 1.0;
    }

    fn is_alive(&self) -> bool {
        self.life > 0.0 && self.alpha > 0.0
    }
}

/// Bursts appear at random, one colour each, falling under light gravity.
pub struct ClassicEffect {
    particles: Vec<Particle>,
    rng: fastrand::Rng,
}

impl ClassicEffect {
    fn burst(&mut self, bounds: Bounds) {
        let x = self.rng.f32() * bounds.width;
        let y = 100.0 + self.rng.f32() * (bounds.height - 200.0).max(0.0);
        let color = pick(&mut self.rng, &COLORS);
        for _ in 0..PARTICLES_PER_BURST {
            let particle = Particle {
                x,
                y,
                vx: (self.rng.f32() - 0.5) * 8.0,
                vy: (self.rng.f32() - 0.5) * 8.0,
                alpha: 1.0,
                life: self.rng.f32() * 150.0 + 50.0,
                color,
            };
            self.particles.push(particle);
        }
    }
}

impl Effect for ClassicEffect {
    fn new(rng: fastrand::Rng) -> Self {
        Self {
            particles: Vec::new(),
            rng,
        }
    }

    fn trail_fade(&self) -> f32 {
        0.1
    }

    fn update(&mut self, _now: Duration, bounds: Bounds) {
        if self.rng.f32() < SPAWN_CHANCE {
            self.burst(bounds);
        }
        self.particles.retain_mut(|p| {
            p.update();
            p.is_alive()
        });
    }

    fn render(&self, canvas: &mut Canvas) -> Result<(), SurfaceError> {
        for p in &self.particles {
            canvas.fill_circle(p.x, p.y, RADIUS, p.color, p.alpha)?;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.particles.clear();
    }

    fn live_count(&self) -> usize {
        self.particles.len()
    }
}
