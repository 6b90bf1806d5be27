use std::f32::consts::TAU;
use std::time::Duration;

use super::{pick, place, Bounds, Effect, LaunchClock};
use crate::canvas::{Canvas, Rgb};
use crate::error::SurfaceError;

const COLORS: [Rgb; 8] = [
    (255, 20, 147),
    (0, 255, 255),
    (255, 215, 0),
    (255, 69, 0),
    (123, 104, 238),
    (0, 250, 154),
    (255, 105, 180),
    (65, 105, 225),
];

const INNER_FRACTIONS: [f32; 4] = [0.8, 0.6, 0.4, 0.2];
const ALPHA_DECAY: f32 = 0.002;

struct Vertex {
    angle: f32,
    offset: f32,
}

/// A polygon that grows and turns while it fades. Live while alpha > 0.
struct Pattern {
    x: f32,
    y: f32,
    vertices: Vec<Vertex>,
    radius: f32,
    rotation: f32,
    spin: f32,
    expansion: f32,
    alpha: f32,
    color: Rgb,
}

impl Pattern {
    /// Outline at `fraction` of the current radius, each vertex turned a
    /// further `twist` radians.
    fn outline(&self, fraction: f32, twist: f32) -> Vec<(f32, f32)> {
        self.vertices
            .iter()
            .map(|v| {
                let r = self.radius * v.offset * fraction;
                let angle = v.angle + twist;
                place(self.x, self.y, angle.cos() * r, angle.sin() * r, self.rotation)
            })
            .collect()
    }
}

pub struct KaleidoscopeEffect {
    patterns: Vec<Pattern>,
    launch: LaunchClock,
    rng: fastrand::Rng,
}

impl KaleidoscopeEffect {
    fn pattern(&mut self, x: f32, y: f32) -> Pattern {
        let segments = self.rng.usize(6..=9);
        let direction = if self.rng.bool() { 1.0 } else { -1.0 };
        let vertices = (0..segments)
            .map(|i| Vertex {
                angle: i as f32 * TAU / segments as f32,
                offset: self.rng.f32() * 0.3 + 0.7,
            })
            .collect();
        Pattern {
            x,
            y,
            vertices,
            radius: 0.0,
            rotation: 0.0,
            spin: (self.rng.f32() * 0.02 + 0.01) * direction,
            expansion: self.rng.f32() * 0.5 + 0.5,
            alpha: 1.0,
            color: pick(&mut self.rng, &COLORS),
        }
    }
}

impl Effect for KaleidoscopeEffect {
    fn new(rng: fastrand::Rng) -> Self {
        Self {
            patterns: Vec::new(),
            launch: LaunchClock::new(1500),
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
            let y = self.rng.f32() * bounds.height * 0.6 + bounds.height * 0.2;
            let pattern = self.pattern(x, y);
            self.patterns.push(pattern);
        }

        self.patterns.retain_mut(|p| {
            p.rotation += p.spin;
            p.radius += p.expansion;
            p.alpha -= ALPHA_DECAY;
            p.alpha > 0.0
        });
    }

    fn render(&self, canvas: &mut Canvas) -> Result<(), SurfaceError> {
        for p in &self.patterns {
            canvas.stroke_path(&p.outline(1.0, 0.0), true, 3.0, p.color, p.alpha)?;
            for fraction in INNER_FRACTIONS {
                let twist = p.rotation * (1.0 - fraction);
                canvas.stroke_path(&p.outline(fraction, twist), true, 2.0, p.color, p.alpha)?;
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.patterns.clear();
    }

    fn live_count(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Bounds = Bounds {
        width: 800.0,
        height: 600.0,
    };

    #[test]
    fn patterns_have_six_to_nine_symmetric_vertices() {
        let mut effect = KaleidoscopeEffect::new(fastrand::Rng::with_seed(21));
        for _ in 0..50 {
            let p = effect.pattern(0.0, 0.0);
            let n = p.vertices.len();
            assert!((6..=9).contains(&n));
            assert!(p.vertices.iter().all(|v| (0.7..=1.0).contains(&v.offset)));
            assert!((0.01..=0.03).contains(&p.spin.abs()));
            assert!((p.vertices[1].angle - TAU / n as f32).abs() < 1e-5);
        }
    }

    #[test]
    fn pattern_lives_five_hundred_frames() {
        let mut effect = KaleidoscopeEffect::new(fastrand::Rng::with_seed(22));
        effect.launch.reset(Duration::from_secs(60));
        let pattern = effect.pattern(400.0, 300.0);
        effect.patterns.push(pattern);
        for _ in 0..499 {
            effect.update(Duration::ZERO, BOUNDS);
        }
        assert_eq!(effect.live_count(), 1);
        for _ in 0..2 {
            effect.update(Duration::ZERO, BOUNDS);
        }
        assert_eq!(effect.live_count(), 0);
    }

    #[test]
    fn inner_outlines_shrink() {
        let mut effect = KaleidoscopeEffect::new(fastrand::Rng::with_seed(23));
        let mut p = effect.pattern(0.0, 0.0);
        p.radius = 100.0;
        let outer = p.outline(1.0, 0.0);
        let inner = p.outline(0.4, 0.0);
        let len = |(x, y): (f32, f32)| x.hypot(y);
        assert!(len(inner[0]) < len(outer[0]));
        assert!((len(inner[0]) - 0.4 * len(outer[0])).abs() < 1e-3);
    }

    #[test]
    fn renders_once_it_has_grown() {
        let mut effect = KaleidoscopeEffect::new(fastrand::Rng::with_seed(24));
        let mut p = effect.pattern(160.0, 160.0);
        p.radius = 120.0;
        effect.patterns.push(p);
        let mut canvas = Canvas::new(40, 40);
        effect.render(&mut canvas).unwrap();
        assert!(canvas.lit_pixels(0.5) > 10);
    }
}
