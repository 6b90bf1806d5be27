use std::f32::consts::TAU;
use std::time::Duration;

use super::comet::COLORS;
use super::{pick, Bounds, Effect, LaunchClock};
use crate::canvas::{Canvas, Rgb};
use crate::error::SurfaceError;

const ROCKET_SPEED: f32 = 8.0;
const TRAIL_LENGTH: usize = 5;
const BURST_SIZE: usize = 60;
const FRICTION: f32 = 0.98;
const GRAVITY: f32 = 0.15;
const MAX_FLIGHT: Duration = Duration::from_millis(2000);
const MAX_PARTICLE_AGE: Duration = Duration::from_millis(3000);

struct Rocket {
    x: f32,
    y: f32,
    target_x: f32,
    target_y: f32,
    angle: f32,
    trail: Vec<(f32, f32)>,
    launched: Duration,
}

/// Particles keep a fixed heading and lose speed; gravity is a constant
/// downward offset per frame, not an acceleration.
struct Particle {
    x: f32,
    y: f32,
    angle: f32,
    speed: f32,
    alpha: f32,
    decay: f32,
    color: Rgb,
    born: Duration,
}

pub struct GlowEffect {
    rockets: Vec<Rocket>,
    particles: Vec<Particle>,
    launch: LaunchClock,
    rng: fastrand::Rng,
}

impl GlowEffect {
    fn launch_rocket(&mut self, now: Duration, bounds: Bounds) {
        let x = self.rng.f32() * bounds.width;
        let y = bounds.height;
        let target_x = self.rng.f32() * bounds.width;
        let target_y = bounds.height * 0.2 + self.rng.f32() * bounds.height * 0.3;
        self.rockets.push(Rocket {
            x,
            y,
            target_x,
            target_y,
            angle: (target_y - y).atan2(target_x - x),
            trail: Vec::with_capacity(TRAIL_LENGTH + 1),
            launched: now,
        });
    }

    fn explode(&mut self, x: f32, y: f32, now: Duration) {
        let color = pick(&mut self.rng, &COLORS);
        for _ in 0..BURST_SIZE {
            let particle = Particle {
                x,
                y,
                angle: self.rng.f32() * TAU,
                speed: self.rng.f32() * 8.0 + 4.0,
                alpha: 1.0,
                decay: self.rng.f32() * 0.02 + 0.02,
                color,
                born: now,
            };
            self.particles.push(particle);
        }
    }
}

impl Effect for GlowEffect {
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
            self.launch_rocket(now, bounds);
            let next = 300.0 + self.rng.f32() * 200.0;
            self.launch.set_interval_ms(next);
        }

        let mut bursts = Vec::new();
        self.rockets.retain_mut(|rocket| {
            rocket.x += rocket.angle.cos() * ROCKET_SPEED;
            rocket.y += rocket.angle.sin() * ROCKET_SPEED;
            rocket.trail.push((rocket.x, rocket.y));
            if rocket.trail.len() > TRAIL_LENGTH {
                rocket.trail.remove(0);
            }
            let distance = (rocket.target_x - rocket.x).hypot(rocket.target_y - rocket.y);
            let burst = distance < 5.0 || now.saturating_sub(rocket.launched) > MAX_FLIGHT;
            if burst {
                bursts.push((rocket.x, rocket.y));
            }
            !burst
        });
        for (x, y) in bursts {
            self.explode(x, y, now);
        }

        self.particles.retain_mut(|p| {
            p.x += p.angle.cos() * p.speed;
            p.y += p.angle.sin() * p.speed + GRAVITY;
            p.speed *= FRICTION;
            p.alpha -= p.decay;
            p.alpha > 0.0 && now.saturating_sub(p.born) < MAX_PARTICLE_AGE
        });
    }

    fn render(&self, canvas: &mut Canvas) -> Result<(), SurfaceError> {
        for rocket in &self.rockets {
            canvas.stroke_path(&rocket.trail, false, 3.0, (255, 255, 255), 1.0)?;
        }
        for p in &self.particles {
            canvas.glow_circle(p.x, p.y, 2.0, 5.0, p.color, p.alpha)?;
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
