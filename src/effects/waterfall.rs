use std::f32::consts::TAU;
use std::time::Duration;

use super::{pick, Bounds, Effect, LaunchClock};
use crate::canvas::{lerp_rgb, Canvas, Rgb};
use crate::error::SurfaceError;

/// Top and bottom colour of a column.
const PALETTE: [(Rgb, Rgb); 5] = [
    ((0, 255, 255), (0, 0, 255)),      // cyan to blue
    ((255, 105, 180), (255, 20, 147)), // pink to deep pink
    ((255, 215, 0), (255, 165, 0)),    // gold to orange
    ((127, 255, 0), (50, 205, 50)),    // lime to green
    ((255, 69, 0), (139, 0, 0)),       // orange red to dark red
];

const GROWTH: f32 = 5.0;
const GRAVITY: f32 = 0.15;
const DROPLET_LIFETIME: u32 = 50;
const WOBBLE: f32 = 2.0;

struct Droplet {
    x: f32,
    y: f32,
    /// Centre of the sideways wobble; drifts with the droplet's velocity.
    base_x: f32,
    vx: f32,
    vy: f32,
    size: f32,
    phase: f32,
    phase_speed: f32,
    alpha: f32,
    age: u32,
}

impl Droplet {
    fn update(&mut self, wind: f32) -> bool {
        self.age += 1;
        if self.age > DROPLET_LIFETIME {
            return false;
        }
        self.vy += GRAVITY;
        self.vx += wind;
        self.base_x += self.vx;
        self.y += self.vy;
        self.x = self.base_x + self.phase.sin() * WOBBLE;
        self.phase += self.phase_speed;
        true
    }

    fn opacity(&self) -> f32 {
        self.alpha * (1.0 - self.age as f32 / DROPLET_LIFETIME as f32)
    }
}

/// A column that grows downwards, dropping one droplet per stream for every
/// step it grows.
struct Cascade {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    max_height: f32,
    streams: usize,
    colors: (Rgb, Rgb),
    wind: f32,
    age: u32,
    max_age: u32,
    droplets: Vec<Droplet>,
}

impl Cascade {
    fn stream_offset(&self, stream: usize) -> f32 {
        let n = self.streams as f32;
        (stream as f32 - (n - 1.0) / 2.0) * (self.width / n)
    }

    fn color_at(&self, y: f32) -> Rgb {
        lerp_rgb(self.colors.0, self.colors.1, y / (self.y + self.max_height))
    }
}

pub struct WaterfallEffect {
    cascades: Vec<Cascade>,
    launch: LaunchClock,
    rng: fastrand::Rng,
}

impl WaterfallEffect {
    fn cascade(&mut self, x: f32, y: f32) -> Cascade {
        Cascade {
            x,
            y,
            width: self.rng.f32() * 100.0 + 50.0,
            height: 0.0,
            max_height: self.rng.f32() * 200.0 + 300.0,
            streams: self.rng.usize(3..=5),
            colors: pick(&mut self.rng, &PALETTE),
            wind: (self.rng.f32() - 0.5) * 0.1,
            age: 0,
            max_age: self.rng.u32(150..250),
            droplets: Vec::new(),
        }
    }

    fn droplet(rng: &mut fastrand::Rng, x: f32, y: f32) -> Droplet {
        Droplet {
            x,
            y,
            base_x: x,
            vx: (rng.f32() - 0.5) * 2.0,
            vy: -(rng.f32() * 5.0 + 2.0),
            size: rng.f32() * 2.0 + 1.0,
            phase: rng.f32() * TAU,
            phase_speed: rng.f32() * 0.02 + 0.01,
            alpha: rng.f32() * 0.5 + 0.5,
            age: 0,
        }
    }
}

impl Effect for WaterfallEffect {
    fn new(rng: fastrand::Rng) -> Self {
        Self {
            cascades: Vec::new(),
            launch: LaunchClock::new(800),
            rng,
        }
    }

    fn trail_fade(&self) -> f32 {
        0.1
    }

    fn arm(&mut self, now: Duration) {
        self.launch.reset(now);
    }

    fn update(&mut self, now: Duration, bounds: Bounds) {
        if self.launch.fire(now) {
            let x = self.rng.f32() * bounds.width * 0.8 + bounds.width * 0.1;
            let y = self.rng.f32() * bounds.height * 0.3;
            let cascade = self.cascade(x, y);
            self.cascades.push(cascade);
        }

        let rng = &mut self.rng;
        self.cascades.retain_mut(|c| {
            c.age += 1;
            if c.age > c.max_age {
                return false;
            }
            if c.height < c.max_height {
                c.height += GROWTH;
                for stream in 0..c.streams {
                    let droplet = Self::droplet(rng, c.x + c.stream_offset(stream), c.y + c.height);
                    c.droplets.push(droplet);
                }
            }
            let wind = c.wind;
            c.droplets.retain_mut(|d| d.update(wind));
            !c.droplets.is_empty()
        });
    }

    fn render(&self, canvas: &mut Canvas) -> Result<(), SurfaceError> {
        for c in &self.cascades {
            for d in &c.droplets {
                canvas.fill_circle(d.x, d.y, d.size, c.color_at(d.y), d.opacity())?;
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.cascades.clear();
    }

    fn live_count(&self) -> usize {
        self.cascades.len() + self.cascades.iter().map(|c| c.droplets.len()).sum::<usize>()
    }
}
