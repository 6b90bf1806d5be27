//! Firework styles and the lifecycle they share.
//!
//! Every style is an [`Effect`]: it owns its particles and emitters and knows
//! how to spawn, advance and draw them. [`Fireworks`] wraps one effect with a
//! drawing surface and the frame loop, so start, per-frame update and cleanup
//! behave the same for every style.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::config::EffectDuration;
use crate::error::SurfaceError;
use crate::runtime::Runtime;
use crate::scheduler::{FrameHandle, FrameTarget};
use crate::surface::{self, EffectSurface, FIREWORKS_Z};

pub mod classic;
pub mod comet;
pub mod glow;
pub mod kaleidoscope;
pub mod spiral;
pub mod waterfall;

/// Logical size of the surface an effect draws on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

pub trait Effect {
    fn new(rng: fastrand::Rng) -> Self
    where
        Self: Sized;

    /// Alpha of the black veil painted over the previous frame.
    fn trail_fade(&self) -> f32;

    /// Resets launch timing when the display starts.
    fn arm(&mut self, _now: Duration) {}

    /// Spawns, advances and culls one frame's worth of simulation.
    fn update(&mut self, now: Duration, bounds: Bounds);

    fn render(&self, canvas: &mut Canvas) -> Result<(), SurfaceError>;

    fn clear(&mut self);

    /// Live particles plus live emitters.
    fn live_count(&self) -> usize;
}

/// Fixed or randomized spacing between launches.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LaunchClock {
    last: Duration,
    interval: Duration,
}

impl LaunchClock {
    pub(crate) fn new(interval_ms: u64) -> Self {
        Self {
            last: Duration::ZERO,
            interval: Duration::from_millis(interval_ms),
        }
    }

    pub(crate) fn reset(&mut self, now: Duration) {
        self.last = now;
    }

    /// True once more than the interval has passed since the last launch,
    /// which then counts as now.
    pub(crate) fn fire(&mut self, now: Duration) -> bool {
        if now.saturating_sub(self.last) > self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_interval_ms(&mut self, ms: f32) {
        self.interval = Duration::from_secs_f32(ms / 1000.0);
    }
}

pub(crate) fn pick<T: Copy>(rng: &mut fastrand::Rng, items: &[T]) -> T {
    items[rng.usize(..items.len())]
}

/// Rotates (x, y) around the origin, then moves it to (cx, cy).
pub(crate) fn place(cx: f32, cy: f32, x: f32, y: f32, rotation: f32) -> (f32, f32) {
    let (sin, cos) = rotation.sin_cos();
    (cx + x * cos - y * sin, cy + x * sin + y * cos)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FireworkStyle {
    /// Random bursts, simple radial velocity.
    Classic,
    /// Rockets with a short trail that burst near their target.
    Comet,
    /// Rotating star particles on fixed polar headings.
    Spiral,
    /// Rockets aimed at a target, glowing bursts.
    #[default]
    Glow,
    /// Expanding rotating polygons.
    Kaleidoscope,
    /// Columns pouring oscillating droplets.
    Waterfall,
}

impl FireworkStyle {
    pub const ALL: [FireworkStyle; 6] = [
        FireworkStyle::Classic,
        FireworkStyle::Comet,
        FireworkStyle::Spiral,
        FireworkStyle::Glow,
        FireworkStyle::Kaleidoscope,
        FireworkStyle::Waterfall,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FireworkStyle::Classic => "classic",
            FireworkStyle::Comet => "comet",
            FireworkStyle::Spiral => "spiral",
            FireworkStyle::Glow => "glow",
            FireworkStyle::Kaleidoscope => "kaleidoscope",
            FireworkStyle::Waterfall => "waterfall",
        }
    }

    pub fn build(&self, rng: fastrand::Rng) -> Box<dyn Effect> {
        match self {
            FireworkStyle::Classic => Box::new(classic::ClassicEffect::new(rng)),
            FireworkStyle::Comet => Box::new(comet::CometEffect::new(rng)),
            FireworkStyle::Spiral => Box::new(spiral::SpiralEffect::new(rng)),
            FireworkStyle::Glow => Box::new(glow::GlowEffect::new(rng)),
            FireworkStyle::Kaleidoscope => Box::new(kaleidoscope::KaleidoscopeEffect::new(rng)),
            FireworkStyle::Waterfall => Box::new(waterfall::WaterfallEffect::new(rng)),
        }
    }
}

impl fmt::Display for FireworkStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FireworkStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FireworkStyle::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = FireworkStyle::ALL.iter().map(|s| s.name()).collect();
                format!("unknown firework style {s:?}, expected one of {}", names.join(", "))
            })
    }
}

/// One firework display: a style, its surface and its frame loop.
pub struct Fireworks {
    style: FireworkStyle,
    effect: Box<dyn Effect>,
    surface: EffectSurface,
    end_time: Option<Duration>,
    frame: Option<FrameHandle>,
}

impl Fireworks {
    /// Creates the (detached) surface and starts listening for resizes.
    pub fn new(
        style: FireworkStyle,
        rt: &mut Runtime,
        rng: fastrand::Rng,
    ) -> Result<Self, SurfaceError> {
        let surface = EffectSurface::create(&mut rt.stage, FIREWORKS_Z)?;
        surface.listen_for_resize(&mut rt.stage);
        Ok(Self {
            style,
            effect: style.build(rng),
            surface,
            end_time: None,
            frame: None,
        })
    }

    pub fn style(&self) -> FireworkStyle {
        self.style
    }

    pub fn surface(&self) -> &EffectSurface {
        &self.surface
    }

    pub fn is_running(&self) -> bool {
        self.frame.is_some()
    }

    /// Cleaned up for good; a new display needs a new instance.
    pub fn is_dormant(&self) -> bool {
        self.surface.is_discarded()
    }

    pub fn live_count(&self) -> usize {
        self.effect.live_count()
    }

    pub fn end_time(&self) -> Option<Duration> {
        self.end_time
    }

    /// Attaches the surface, sets the end time and starts the frame loop
    /// unless it is already running.
    pub fn start(&mut self, duration: EffectDuration, rt: &mut Runtime) -> Result<(), SurfaceError> {
        self.surface.attach(&mut rt.stage)?;
        let now = rt.now();
        self.end_time = duration.deadline(now);
        if self.frame.is_some() {
            debug!(style = %self.style, "fireworks already running");
            return Ok(());
        }
        self.effect.arm(now);
        self.frame = Some(rt.scheduler.request_frame(FrameTarget::Fireworks));
        debug!(style = %self.style, end = ?self.end_time, "fireworks started");
        Ok(())
    }

    /// One display frame. Reaching the end time is the only way a bounded
    /// display stops on its own; a drawing error stops it early.
    pub fn frame(&mut self, rt: &mut Runtime) {
        if self.frame.take().is_none() {
            return;
        }
        let now = rt.now();
        if self.end_time.is_some_and(|end| now >= end) {
            debug!(style = %self.style, "fireworks duration elapsed");
            self.cleanup(rt);
            return;
        }
        if let Err(err) = self.step(now) {
            warn!(style = %self.style, error = %err, "fireworks frame failed, stopping");
            self.cleanup(rt);
            return;
        }
        self.frame = Some(rt.scheduler.request_frame(FrameTarget::Fireworks));
    }

    fn step(&mut self, now: Duration) -> Result<(), SurfaceError> {
        let canvas = self.surface.canvas_mut()?;
        canvas.fade(self.effect.trail_fade());
        let (width, height) = canvas.logical_size();
        self.effect.update(now, Bounds { width, height });
        self.effect.render(canvas)
    }

    pub fn resize(&mut self, rt: &Runtime) {
        surface::resize_or_warn(&mut self.surface, &rt.stage, "fireworks");
    }

    /// Stops the loop, drops every particle and discards the surface. Safe to
    /// call any number of times.
    pub fn cleanup(&mut self, rt: &mut Runtime) {
        if let Some(handle) = self.frame.take() {
            rt.scheduler.cancel_frame(handle);
        }
        self.effect.clear();
        self.end_time = None;
        if !self.surface.is_discarded() {
            debug!(style = %self.style, "fireworks cleaned up");
        }
        self.surface.discard(&mut rt.stage);
    }
}
