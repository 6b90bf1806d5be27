//! The stage the overlay draws on, and the lifecycle of one drawing surface.
//!
//! `Stage` plays the part of the page: it knows the viewport, which surfaces
//! are attached and in what stacking order, who listens for resizes, the
//! dashboard regions that can be dimmed, and the plugin's own message overlay.

use std::time::Duration;

use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::error::SurfaceError;

/// Logical pixels per terminal cell.
pub const CELL_WIDTH_PX: f32 = 8.0;
pub const CELL_HEIGHT_PX: f32 = 16.0;

/// Class name of the plugin's own region, never dimmed.
pub const BIRTHDAY_REGION: &str = "birthday-module";

pub const FIREWORKS_Z: i32 = 999_998;
pub const CONFETTI_Z: i32 = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub columns: u16,
    pub rows: u16,
}

impl Viewport {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }

    /// Raster pixels: one per column, two per row.
    pub fn raster(&self) -> (usize, usize) {
        (self.columns as usize, self.rows as usize * 2)
    }

    pub fn logical(&self) -> (f32, f32) {
        (
            self.columns as f32 * CELL_WIDTH_PX,
            self.rows as f32 * CELL_HEIGHT_PX,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

/// A `brightness()` filter with an ease-in-out transition from full
/// brightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filter {
    pub brightness: f32,
    pub since: Duration,
    pub transition: Duration,
}

impl Filter {
    pub fn brightness_at(&self, now: Duration) -> f32 {
        if self.transition.is_zero() || now >= self.since + self.transition {
            return self.brightness;
        }
        let t = (now.saturating_sub(self.since)).as_secs_f32() / self.transition.as_secs_f32();
        let eased = if t < 0.5 {
            2.0 * t * t
        } else {
            1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
        };
        1.0 + (self.brightness - 1.0) * eased
    }
}

/// A dashboard module's screen region.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRegion {
    pub name: String,
    pub column: u16,
    pub row: u16,
    pub lines: Vec<String>,
    pub visible: bool,
    pub filter: Option<Filter>,
}

impl ModuleRegion {
    pub fn new(name: impl Into<String>, column: u16, row: u16) -> Self {
        Self {
            name: name.into(),
            column,
            row,
            lines: Vec::new(),
            visible: true,
            filter: None,
        }
    }

    pub fn brightness_at(&self, now: Duration) -> f32 {
        self.filter.map_or(1.0, |f| f.brightness_at(now))
    }
}

/// The celebration message box inside the plugin's region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub message: Option<String>,
    pub visible: bool,
}

#[derive(Debug)]
pub struct Stage {
    viewport: Viewport,
    next_surface: u32,
    attached: Vec<(SurfaceId, i32)>,
    resize_listeners: Vec<SurfaceId>,
    modules: Vec<ModuleRegion>,
    overlay: Option<Overlay>,
}

impl Stage {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            next_surface: 0,
            attached: Vec::new(),
            resize_listeners: Vec::new(),
            modules: Vec::new(),
            overlay: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Stores the new viewport. Listening surfaces pick it up through
    /// [`EffectSurface::resize`].
    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.viewport = Viewport::new(columns, rows);
    }

    fn allocate_surface(&mut self) -> SurfaceId {
        self.next_surface += 1;
        SurfaceId(self.next_surface)
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.attached.iter().any(|(s, _)| *s == id)
    }

    /// Attached surfaces, bottom first.
    pub fn attached(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.attached.iter().map(|(id, _)| *id)
    }

    fn attach(&mut self, id: SurfaceId, z_index: i32) -> bool {
        if self.contains(id) {
            return false;
        }
        let at = self
            .attached
            .iter()
            .position(|(_, z)| *z > z_index)
            .unwrap_or(self.attached.len());
        self.attached.insert(at, (id, z_index));
        true
    }

    fn detach(&mut self, id: SurfaceId) -> bool {
        let before = self.attached.len();
        self.attached.retain(|(s, _)| *s != id);
        before != self.attached.len()
    }

    pub fn add_resize_listener(&mut self, id: SurfaceId) {
        if !self.resize_listeners.contains(&id) {
            self.resize_listeners.push(id);
        }
    }

    pub fn remove_resize_listener(&mut self, id: SurfaceId) {
        self.resize_listeners.retain(|s| *s != id);
    }

    pub fn has_resize_listener(&self, id: SurfaceId) -> bool {
        self.resize_listeners.contains(&id)
    }

    pub fn resize_listener_count(&self) -> usize {
        self.resize_listeners.len()
    }

    /// Adds a region, replacing any region with the same name.
    pub fn add_module(&mut self, region: ModuleRegion) {
        match self.modules.iter_mut().find(|m| m.name == region.name) {
            Some(existing) => *existing = region,
            None => self.modules.push(region),
        }
    }

    pub fn modules(&self) -> &[ModuleRegion] {
        &self.modules
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut ModuleRegion> {
        self.modules.iter_mut().find(|m| m.name == name)
    }

    /// Dims every module except the plugin's own region.
    pub fn dim_modules(&mut self, brightness: f32, now: Duration, transition: Duration) {
        for module in self.modules.iter_mut().filter(|m| m.name != BIRTHDAY_REGION) {
            module.filter = Some(Filter {
                brightness,
                since: now,
                transition,
            });
        }
    }

    pub fn clear_dimming(&mut self) {
        for module in &mut self.modules {
            module.filter = None;
        }
    }

    pub fn is_dimmed(&self) -> bool {
        self.modules.iter().any(|m| m.filter.is_some())
    }

    pub fn ensure_overlay(&mut self) -> &mut Overlay {
        self.overlay.get_or_insert_with(Overlay::default)
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        self.overlay.as_mut()
    }

    pub fn remove_overlay(&mut self) -> bool {
        self.overlay.take().is_some()
    }
}

/// One drawing surface. Created detached and sized to the viewport, attached
/// when an effect starts, discarded for good by cleanup.
pub struct EffectSurface {
    id: SurfaceId,
    z_index: i32,
    canvas: Option<Canvas>,
}

impl EffectSurface {
    pub fn create(stage: &mut Stage, z_index: i32) -> Result<Self, SurfaceError> {
        let viewport = stage.viewport();
        if viewport.is_empty() {
            return Err(SurfaceError::EmptyViewport {
                columns: viewport.columns,
                rows: viewport.rows,
            });
        }
        let (width, height) = viewport.raster();
        Ok(Self {
            id: stage.allocate_surface(),
            z_index,
            canvas: Some(Canvas::new(width, height)),
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn is_attached(&self, stage: &Stage) -> bool {
        stage.contains(self.id)
    }

    pub fn is_discarded(&self) -> bool {
        self.canvas.is_none()
    }

    /// Returns `Ok(false)` when the surface was already attached.
    pub fn attach(&mut self, stage: &mut Stage) -> Result<bool, SurfaceError> {
        if self.canvas.is_none() {
            return Err(SurfaceError::Discarded(self.id.0));
        }
        let attached = stage.attach(self.id, self.z_index);
        if attached {
            debug!(surface = self.id.0, z = self.z_index, "surface attached");
        }
        Ok(attached)
    }

    pub fn detach(&mut self, stage: &mut Stage) {
        if stage.detach(self.id) {
            debug!(surface = self.id.0, "surface detached");
        }
    }

    pub fn listen_for_resize(&self, stage: &mut Stage) {
        stage.add_resize_listener(self.id);
    }

    pub fn stop_listening(&self, stage: &mut Stage) {
        stage.remove_resize_listener(self.id);
    }

    /// Re-reads the viewport if this surface listens for resizes. Resizing
    /// to the current size keeps the content.
    pub fn resize(&mut self, stage: &Stage) -> Result<(), SurfaceError> {
        if !stage.has_resize_listener(self.id) {
            return Ok(());
        }
        let viewport = stage.viewport();
        let canvas = self.canvas.as_mut().ok_or(SurfaceError::Discarded(self.id.0))?;
        if viewport.is_empty() {
            return Err(SurfaceError::EmptyViewport {
                columns: viewport.columns,
                rows: viewport.rows,
            });
        }
        let (width, height) = viewport.raster();
        if canvas.width() != width || canvas.height() != height {
            canvas.resize(width, height);
        }
        Ok(())
    }

    /// Detaches, drops the resize listener and frees the canvas. Safe to call
    /// any number of times.
    pub fn discard(&mut self, stage: &mut Stage) {
        self.detach(stage);
        self.stop_listening(stage);
        if self.canvas.take().is_some() {
            debug!(surface = self.id.0, "surface discarded");
        }
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn canvas_mut(&mut self) -> Result<&mut Canvas, SurfaceError> {
        self.canvas.as_mut().ok_or(SurfaceError::Discarded(self.id.0))
    }
}

/// Re-reads the viewport for a surface, logging instead of failing.
pub(crate) fn resize_or_warn(surface: &mut EffectSurface, stage: &Stage, owner: &str) -> bool {
    match surface.resize(stage) {
        Ok(()) => true,
        Err(err) => {
            warn!(owner, error = %err, "could not resize surface");
            false
        }
    }
}
