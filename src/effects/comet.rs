use std::f32::consts::TAU;
use std::time::Duration;

use super::{pick, Bounds, Effect, LaunchClock};
use crate::canvas::{Canvas, Rgb};
use crate::error::SurfaceError;

pub(crate) const COLORS: [Rgb; 12] = [
    (255, 0, 0),
    (255, 165, 0),
    (255, 255, 0),
    (0, 255, 0),
    (0, 255, 255),
    (0, 0, 255),
    (255, 0, 255),
    (255, 20, 147),
    (255, 215, 0),
    (127, 255, 212),
    (255, 105, 180),
    (50, 205, 50),
];

const WHITE: Rgb = (255, 255, 255);
const ROCKET_SPEED: f32 = 8.0;
const TRAIL_LENGTH: usize = 5;
const BURST_SIZE: usize = 60;
const FRICTION: f32 = 0.98;
const GRAVITY: f32 = 0.15;

struct Rocket {
    x: f32,
    y: f32,
    target_x: f32,
    target_y: f32,
    trail: Vec<(f32, f32)>,
    color: Rgb,
}

impl Rocket {
    /// Moves one step towards the target. Returns false once it is close
    /// enough to burst.
    fn advance(&mut self) -> bool {
        let dx = self.target_x - self.x;
        let dy = self.target_y - self.y;
        let distance = dx.hypot(dy);
        if distance < 5.0 {
            return false;
        }
        self.x += dx / distance * ROCKET_SPEED;
        self.y += dy / distance * ROCKET_SPEED;
        self.trail.push((self.x, self.y));
        if self.trail.len() > TRAIL_LENGTH {
            self.trail.remove(0);
        }
        true
    }
}

struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    alpha: f32,
    decay: f32,
    color: Rgb,
}

/// Rockets with a short white trail that burst into their own colour.
pub struct CometEffect {
    rockets: Vec<Rocket>,
    particles: Vec<Particle>,
    launch: LaunchClock,
    rng: fastrand::Rng,
}

impl CometEffect {
    fn launch_rocket(&mut self, bounds: Bounds) {
        let x = self.rng.f32() * bounds.width;
        self.rockets.push(Rocket {
            x,
            y: bounds.height,
            target_x: x + (self.rng.f32() - 0.5) * 200.0,
            target_y: bounds.height * 0.2 + self.rng.f32() * bounds.height * 0.3,
            trail: Vec::with_capacity(TRAIL_LENGTH + 1),
            color: pick(&mut self.rng, &COLORS),
        });
    }

    fn explode(&mut self, x: f32, y: f32, color: Rgb) {
        for _ in 0..BURST_SIZE {
            let angle = self.rng.f32() * TAU;
            let speed = self.rng.f32() * 8.0 + 4.0;
            self.particles.push(Particle {
                x,
                y,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                alpha: 1.0,
                decay: self.rng.f32() * 0.02 + 0.02,
                color,
            });
        }
    }
}

impl Effect for CometEffect {
    fn new(rng: fastrand::Rng) -> Self {
        Self {
            rockets: Vec::new(),
            particles: Vec::new(),
            launch: LaunchClock::new(400),
            rng,
        }
    }

    fn trail_fade(&self) -> f32 {
        0.2
    }

    fn arm(&mut self, now: Duration) {
        self.launch.reset(now);
    }

    fn update(&mut self, now: Duration, bounds: Bounds) {
        if self.launch.fire(now) {
            self.launch_rocket(bounds);
            let next = 300.0 + self.rng.f32() * 200.0;
            self.launch.set_interval_ms(next);
        }

        let mut bursts = Vec::new();
        self.rockets.retain_mut(|rocket| {
            let flying = rocket.advance();
            if !flying {
                bursts.push((rocket.x, rocket.y, rocket.color));
            }
            flying
        });
        for (x, y, color) in bursts {
            self.explode(x, y, color);
        }

        self.particles.retain_mut(|p| {
            p.x += p.vx;
            p.y += p.vy;
            p.vx *= FRICTION;
            p.vy *= FRICTION;
            p.vy += GRAVITY;
            p.alpha -= p.decay;
            p.alpha > 0.0
        });
    }

    fn render(&self, canvas: &mut Canvas) -> Result<(), SurfaceError> {
        for rocket in &self.rockets {
            if !rocket.trail.is_empty() {
                canvas.stroke_path(&rocket.trail, false, 2.0, WHITE, 1.0)?;
            }
            canvas.fill_circle(rocket.x, rocket.y, 2.0, WHITE, 1.0)?;
        }
        for p in &self.particles {
            canvas.glow_circle(p.x, p.y, 2.0, 4.0, p.color, p.alpha)?;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.rockets.clear();
        self.particles.clear();
    }

    fn live_count(&self) -> usize {
        self.rockets.len() + self.particles.len()
    }
}
