//! The dual confetti cannon.
//!
//! One cannon lives for the whole process. Its surface is created on first
//! use, attached by [`ConfettiCannon::init`] and only detached by cleanup, so a
//! later celebration reuses it. Unlike the fireworks the surface is wiped
//! every frame instead of faded.

use tracing::{debug, warn};

use crate::canvas::{brighten, Blend, Canvas, Rgb};
use crate::effects::{pick, Bounds};
use crate::error::SurfaceError;
use crate::runtime::Runtime;
use crate::scheduler::{FrameHandle, FrameTarget};
use crate::surface::{self, EffectSurface, CONFETTI_Z};

const COLORS: [Rgb; 5] = [
    (255, 113, 141),
    (253, 255, 106),
    (88, 207, 251),
    (255, 255, 255),
    (123, 82, 255),
];

/// Particles per cannon per burst.
pub const BURST_PER_CANNON: usize = 15;

const LAUNCH_SPEED: f32 = 45.0;
const VERTICAL_BOOST: f32 = 1.4;
const GRAVITY: f32 = 0.25;
const DRAG: f32 = 0.045;
const MIN_OPACITY: f32 = 0.1;
const LIGHTEN: i16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn origin_x(self, width: f32) -> f32 {
        match self {
            Side::Left => width * 0.15,
            Side::Right => width * 0.85,
        }
    }

    fn base_angle(self) -> f32 {
        match self {
            Side::Left => -45.0,
            Side::Right => -135.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Piece {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    /// Rotation in degrees.
    wobble: f32,
    wobble_speed: f32,
    size: f32,
    color: Rgb,
    opacity: f32,
}

impl Piece {
    fn launch(side: Side, bounds: Bounds, rng: &mut fastrand::Rng) -> Self {
        let degrees = side.base_angle() + (rng.f32() - 0.5) * 20.0;
        let angle = degrees.to_radians();
        let speed = LAUNCH_SPEED * (0.95 + rng.f32() * 0.25);
        Self {
            x: side.origin_x(bounds.width),
            y: bounds.height - 20.0,
            vx: angle.cos() * speed,
            vy: angle.sin() * speed * VERTICAL_BOOST,
            wobble: rng.f32() * 360.0,
            wobble_speed: rng.f32() * 2.0 - 1.0,
            size: rng.f32() * 6.0 + 4.0,
            color: pick(rng, &COLORS),
            opacity: 1.0,
        }
    }

    /// One physics step. Returns whether the piece is still visible.
    fn update(&mut self, height: f32) -> bool {
        self.x += self.vx;
        self.y += self.vy;
        self.vy += GRAVITY;
        self.vx *= 1.0 - DRAG;
        self.vy *= 1.0 - DRAG;
        self.wobble += self.wobble_speed;

        let velocity_fade = (self.vx.hypot(self.vy) / 6.0).min(1.0);
        let height_fade = 1.0 - ((self.y - height * 0.95) / (height * 0.05)).max(0.0);
        self.opacity = velocity_fade.min(height_fade);
        self.opacity > MIN_OPACITY && self.y < height
    }

    fn draw(&self, canvas: &mut Canvas) -> Result<(), SurfaceError> {
        canvas.fill_rotated_rect(
            self.x,
            self.y,
            self.size,
            self.size / 2.0,
            self.wobble.to_radians(),
            (self.color, brighten(self.color, LIGHTEN)),
            self.opacity,
            Blend::Lighter,
        )
    }
}

pub struct ConfettiCannon {
    surface: Option<EffectSurface>,
    pieces: Vec<Piece>,
    frame: Option<FrameHandle>,
    rng: fastrand::Rng,
}

impl ConfettiCannon {
    pub fn new(rng: fastrand::Rng) -> Self {
        Self {
            surface: None,
            pieces: Vec::new(),
            frame: None,
            rng,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_animating(&self) -> bool {
        self.frame.is_some()
    }

    pub fn surface(&self) -> Option<&EffectSurface> {
        self.surface.as_ref()
    }

    /// Attaches the surface, creating it on first use. Attaching twice is a
    /// no-op.
    pub fn init(&mut self, rt: &mut Runtime) {
        if self.surface.is_none() {
            match EffectSurface::create(&mut rt.stage, CONFETTI_Z) {
                Ok(surface) => {
                    surface.listen_for_resize(&mut rt.stage);
                    self.surface = Some(surface);
                }
                Err(err) => {
                    warn!(error = %err, "could not create confetti surface");
                    return;
                }
            }
        }
        if let Some(surface) = self.surface.as_mut() {
            if let Err(err) = surface.attach(&mut rt.stage) {
                warn!(error = %err, "could not attach confetti surface");
            }
        }
    }

    /// Launches one burst from each cannon and starts the frame loop if it
    /// is not already running.
    pub fn fire(&mut self, rt: &mut Runtime) {
        let (width, height) = match self.surface.as_ref().and_then(|s| s.canvas()) {
            Some(canvas) => canvas.logical_size(),
            None => rt.stage.viewport().logical(),
        };
        let bounds = Bounds { width, height };
        for _ in 0..BURST_PER_CANNON {
            let left = Piece::launch(Side::Left, bounds, &mut self.rng);
            let right = Piece::launch(Side::Right, bounds, &mut self.rng);
            self.pieces.push(left);
            self.pieces.push(right);
        }
        if self.frame.is_none() {
            self.frame = Some(rt.scheduler.request_frame(FrameTarget::Confetti));
        }
        debug!(pieces = self.pieces.len(), "confetti fired");
    }

    /// One display frame: wipe, step, draw. The loop ends once every piece
    /// has landed or faded.
    pub fn frame(&mut self, rt: &mut Runtime) {
        if self.frame.take().is_none() {
            return;
        }
        if let Err(err) = self.step() {
            warn!(error = %err, "confetti frame failed, stopping");
            self.cleanup(rt);
            return;
        }
        if self.pieces.is_empty() {
            debug!("confetti settled");
        } else {
            self.frame = Some(rt.scheduler.request_frame(FrameTarget::Confetti));
        }
    }

    fn step(&mut self) -> Result<(), SurfaceError> {
        match self.surface.as_mut().map(|s| s.canvas_mut()) {
            Some(Ok(canvas)) => {
                canvas.clear();
                let (_, height) = canvas.logical_size();
                self.pieces.retain_mut(|p| p.update(height));
                for piece in &self.pieces {
                    piece.draw(canvas)?;
                }
                Ok(())
            }
            Some(Err(err)) => Err(err),
            None => {
                // No surface to draw on: keep the physics honest anyway.
                self.pieces.clear();
                Ok(())
            }
        }
    }

    pub fn resize(&mut self, rt: &Runtime) {
        if let Some(surface) = self.surface.as_mut() {
            surface::resize_or_warn(surface, &rt.stage, "confetti");
        }
    }

    /// Stops the loop, drops every piece and detaches the surface. Safe to
    /// call when already clean.
    pub fn cleanup(&mut self, rt: &mut Runtime) {
        if let Some(handle) = self.frame.take() {
            rt.scheduler.cancel_frame(handle);
        }
        self.pieces.clear();
        if let Some(surface) = self.surface.as_mut() {
            if let Ok(canvas) = surface.canvas_mut() {
                canvas.clear();
            }
            surface.detach(&mut rt.stage);
        }
    }
}
