use std::f32::consts::TAU;
use std::time::Duration;

use super::{pick, place, Bounds, Effect, LaunchClock};
use crate::canvas::{Canvas, Rgb};
use crate::error::SurfaceError;

const COLORS: [Rgb; 10] = [
    (255, 105, 180), // hot pink
    (75, 0, 130),    // indigo
    (0, 255, 127),   // spring green
    (255, 69, 0),    // orange red
    (30, 144, 255),  // dodger blue
    (255, 215, 0),   // gold
    (255, 20, 147),  // deep pink
    (0, 206, 209),   // dark turquoise
    (255, 140, 0),   // dark orange
    (50, 205, 50),   // lime green
];

const PARTICLES_PER_SPIRAL: usize = 30;
const SLOWDOWN: f32 = 0.98;
const STAR_POINTS: usize = 5;

struct Particle {
    x: f32,
    y: f32,
    heading: f32,
    speed: f32,
    radius: f32,
    rotation: f32,
    spin: f32,
    alpha: f32,
    life: f32,
    initial_life: f32,
    color: Rgb,
}

impl Particle {
    fn star(&self) -> [(f32, f32); STAR_POINTS] {
        std::array::from_fn(|i| {
            let angle = i as f32 * TAU / STAR_POINTS as f32;
            place(
                self.x,
                self.y,
                angle.cos() * self.radius,
                angle.sin() * self.radius,
                self.rotation,
            )
        })
    }
}

/// Rings of star particles flying out on evenly spaced headings while each
/// star spins on its own.
pub struct SpiralEffect {
    particles: Vec<Particle>,
    launch: LaunchClock,
    rng: fastrand::Rng,
}

impl SpiralEffect {
    fn spiral(&mut self, x: f32, y: f32) {
        let color = pick(&mut self.rng, &COLORS);
        let step = TAU / PARTICLES_PER_SPIRAL as f32;
        for i in 0..PARTICLES_PER_SPIRAL {
            let life = self.rng.f32() * 100.0 + 50.0;
            let particle = Particle {
                x,
                y,
                heading: step * i as f32,
                speed: self.rng.f32() * 2.0 + 3.0,
                radius: self.rng.f32() * 2.0 + 1.0,
                rotation: 0.0,
                spin: (self.rng.f32() - 0.5) * 0.2,
                alpha: 1.0,
                life,
                initial_life: life,
                color,
            };
            self.particles.push(particle);
        }
    }
}

impl Effect for SpiralEffect {
    fn new(rng: fastrand::Rng) -> Self {
        Self {
            particles: Vec::new(),
            launch: LaunchClock::new(2000),
            rng,
        }
    }

    fn trail_fade(&self) -> f32 {
        0.15
    }

    fn arm(&mut self, now: Duration) {
        self.launch.reset(now);
    }

    fn update(&mut self, now: Duration, bounds: Bounds) {
        if self.launch.fire(now) {
            let x = self.rng.f32() * bounds.width * 0.8 + bounds.width * 0.1;
            let y = self.rng.f32() * bounds.height * 0.6 + bounds.height * 0.2;
            self.spiral(x, y);
        }

        self.particles.retain_mut(|p| {
            p.x += p.heading.cos() * p.speed;
            p.y += p.heading.sin() * p.speed;
            p.rotation += p.spin;
            p.speed *= SLOWDOWN;
            p.alpha = p.life / p.initial_life;
            p.life -= 1.0;
            p.life > 0.0 && p.alpha > 0.0
        });
    }

    fn render(&self, canvas: &mut Canvas) -> Result<(), SurfaceError> {
        for p in &self.particles {
            canvas.fill_polygon(&p.star(), p.color, p.alpha)?;
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
