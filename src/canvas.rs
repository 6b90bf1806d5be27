//! A small software raster standing in for a 2D canvas context.
//!
//! Geometry is given in logical pixels; one raster pixel covers
//! `PIXEL_SIZE` x `PIXEL_SIZE` logical pixels, which is one half of a
//! terminal cell. Shapes smaller than a raster pixel still light the pixel
//! under their centre so that sparks never vanish.

use crate::error::SurfaceError;

pub type Rgb = (u8, u8, u8);

/// Logical pixels per raster pixel on both axes.
pub const PIXEL_SIZE: f32 = 8.0;

/// Straight (non-premultiplied) colour, channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn to_rgb(self) -> Rgb {
        (
            (self.r.clamp(0.0, 1.0) * 255.0) as u8,
            (self.g.clamp(0.0, 1.0) * 255.0) as u8,
            (self.b.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    SourceOver,
    /// Additive, like `globalCompositeOperation = 'lighter'`.
    Lighter,
}

pub fn lerp_rgb(from: Rgb, to: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    (
        (from.0 as f32 + (to.0 as f32 - from.0 as f32) * t) as u8,
        (from.1 as f32 + (to.1 as f32 - from.1 as f32) * t) as u8,
        (from.2 as f32 + (to.2 as f32 - from.2 as f32) * t) as u8,
    )
}

/// Shifts every channel by `amount`, saturating at both ends.
pub fn brighten(color: Rgb, amount: i16) -> Rgb {
    let shift = |c: u8| (c as i16 + amount).clamp(0, 255) as u8;
    (shift(color.0), shift(color.1), shift(color.2))
}

fn check_finite(op: &'static str, values: &[f32]) -> Result<(), SurfaceError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SurfaceError::NonFinite(op))
    }
}

pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Size in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        (self.width as f32 * PIXEL_SIZE, self.height as f32 * PIXEL_SIZE)
    }

    /// Resizing wipes the content, like assigning `canvas.width`.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, Rgba::TRANSPARENT);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgba {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            Rgba::TRANSPARENT
        }
    }

    /// Number of raster pixels with alpha above `threshold`.
    pub fn lit_pixels(&self, threshold: f32) -> usize {
        self.pixels.iter().filter(|p| p.a > threshold).count()
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }

    /// Paints translucent black over the whole surface so that earlier frames
    /// linger as trails.
    pub fn fade(&mut self, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        for p in &mut self.pixels {
            let out_a = alpha + p.a * (1.0 - alpha);
            if out_a <= 0.0 {
                continue;
            }
            let keep = p.a * (1.0 - alpha) / out_a;
            p.r *= keep;
            p.g *= keep;
            p.b *= keep;
            p.a = out_a;
        }
    }

    fn blend_pixel(&mut self, x: i64, y: i64, color: Rgb, alpha: f32, blend: Blend) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let sa = alpha.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }
        let (sr, sg, sb) = (
            color.0 as f32 / 255.0,
            color.1 as f32 / 255.0,
            color.2 as f32 / 255.0,
        );
        let p = &mut self.pixels[y as usize * self.width + x as usize];
        match blend {
            Blend::SourceOver => {
                let out_a = sa + p.a * (1.0 - sa);
                let dst = p.a * (1.0 - sa);
                p.r = (sr * sa + p.r * dst) / out_a;
                p.g = (sg * sa + p.g * dst) / out_a;
                p.b = (sb * sa + p.b * dst) / out_a;
                p.a = out_a;
            }
            Blend::Lighter => {
                let out_a = (sa + p.a).min(1.0);
                p.r = ((sr * sa + p.r * p.a) / out_a).min(1.0);
                p.g = ((sg * sa + p.g * p.a) / out_a).min(1.0);
                p.b = ((sb * sa + p.b * p.a) / out_a).min(1.0);
                p.a = out_a;
            }
        }
    }

    fn to_raster(x: f32, y: f32) -> (f32, f32) {
        (x / PIXEL_SIZE, y / PIXEL_SIZE)
    }

    pub fn fill_circle(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        color: Rgb,
        alpha: f32,
    ) -> Result<(), SurfaceError> {
        check_finite("fill_circle", &[x, y, radius, alpha])?;
        let (cx, cy) = Self::to_raster(x, y);
        // Half a pixel diagonal, so the pixel under the centre is always hit.
        let r = (radius / PIXEL_SIZE).max(0.71);
        self.fill_disc(cx, cy, r, color, alpha, Blend::SourceOver);
        Ok(())
    }

    fn fill_disc(&mut self, cx: f32, cy: f32, r: f32, color: Rgb, alpha: f32, blend: Blend) {
        let x0 = (cx - r).floor() as i64;
        let x1 = (cx + r).ceil() as i64;
        let y0 = (cy - r).floor() as i64;
        let y1 = (cy + r).ceil() as i64;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    self.blend_pixel(px, py, color, alpha, blend);
                }
            }
        }
    }

    /// A filled circle with a soft halo, the raster version of `shadowBlur`.
    pub fn glow_circle(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        blur: f32,
        color: Rgb,
        alpha: f32,
    ) -> Result<(), SurfaceError> {
        check_finite("glow_circle", &[x, y, radius, blur, alpha])?;
        let (cx, cy) = Self::to_raster(x, y);
        let core = (radius / PIXEL_SIZE).max(0.71);
        let halo = core + (blur / PIXEL_SIZE).max(1.0);
        let x0 = (cx - halo).floor() as i64;
        let x1 = (cx + halo).ceil() as i64;
        let y0 = (cy - halo).floor() as i64;
        let y1 = (cy + halo).ceil() as i64;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist > core && dist <= halo {
                    let falloff = 1.0 - (dist - core) / (halo - core);
                    self.blend_pixel(px, py, color, alpha * 0.4 * falloff, Blend::SourceOver);
                }
            }
        }
        self.fill_disc(cx, cy, core, color, alpha, Blend::SourceOver);
        Ok(())
    }

    /// Strokes a polyline; `closed` joins the last point back to the first.
    pub fn stroke_path(
        &mut self,
        points: &[(f32, f32)],
        closed: bool,
        width: f32,
        color: Rgb,
        alpha: f32,
    ) -> Result<(), SurfaceError> {
        check_finite("stroke_path", &[width, alpha])?;
        for &(x, y) in points {
            check_finite("stroke_path", &[x, y])?;
        }
        if points.is_empty() {
            return Ok(());
        }
        let half = (width / PIXEL_SIZE / 2.0).max(0.5);
        let mut last: Option<(i64, i64)> = None;
        let segments = points.len() - 1 + usize::from(closed && points.len() > 2);
        if segments == 0 {
            let (x, y) = Self::to_raster(points[0].0, points[0].1);
            self.blend_pixel(x as i64, y as i64, color, alpha, Blend::SourceOver);
            return Ok(());
        }
        for i in 0..segments {
            let (ax, ay) = Self::to_raster(points[i].0, points[i].1);
            let (bx, by) = Self::to_raster(
                points[(i + 1) % points.len()].0,
                points[(i + 1) % points.len()].1,
            );
            let length = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
            let steps = (length * 2.0).ceil().max(1.0) as usize;
            for step in 0..=steps {
                let t = step as f32 / steps as f32;
                let px = ax + (bx - ax) * t;
                let py = ay + (by - ay) * t;
                if half <= 0.5 {
                    let cell = (px.floor() as i64, py.floor() as i64);
                    if last != Some(cell) {
                        self.blend_pixel(cell.0, cell.1, color, alpha, Blend::SourceOver);
                        last = Some(cell);
                    }
                } else {
                    self.fill_disc(px, py, half, color, alpha, Blend::SourceOver);
                }
            }
        }
        Ok(())
    }

    /// Even-odd scanline fill.
    pub fn fill_polygon(
        &mut self,
        points: &[(f32, f32)],
        color: Rgb,
        alpha: f32,
    ) -> Result<(), SurfaceError> {
        check_finite("fill_polygon", &[alpha])?;
        for &(x, y) in points {
            check_finite("fill_polygon", &[x, y])?;
        }
        if points.len() < 3 {
            return Ok(());
        }
        let raster: Vec<(f32, f32)> = points.iter().map(|&(x, y)| Self::to_raster(x, y)).collect();
        let min_y = raster.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = raster.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

        let mut filled = false;
        let mut crossings = Vec::new();
        for py in min_y.floor() as i64..=max_y.ceil() as i64 {
            let sample_y = py as f32 + 0.5;
            crossings.clear();
            for i in 0..raster.len() {
                let (x0, y0) = raster[i];
                let (x1, y1) = raster[(i + 1) % raster.len()];
                if (y0 <= sample_y) != (y1 <= sample_y) {
                    crossings.push(x0 + (sample_y - y0) / (y1 - y0) * (x1 - x0));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks(2) {
                if let [start, end] = pair {
                    let first = (start - 0.5).ceil() as i64;
                    let last = (end - 0.5).floor() as i64;
                    for px in first..=last {
                        self.blend_pixel(px, py, color, alpha, Blend::SourceOver);
                        filled = true;
                    }
                }
            }
        }

        if !filled {
            let n = raster.len() as f32;
            let cx = raster.iter().map(|p| p.0).sum::<f32>() / n;
            let cy = raster.iter().map(|p| p.1).sum::<f32>() / n;
            self.blend_pixel(cx.floor() as i64, cy.floor() as i64, color, alpha, Blend::SourceOver);
        }
        Ok(())
    }

    /// Fills a `width` x `height` rectangle centred on (x, y) and rotated by
    /// `angle` radians, shading from `from` at its left edge to `to` at its
    /// right edge.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_rotated_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        angle: f32,
        (from, to): (Rgb, Rgb),
        alpha: f32,
        blend: Blend,
    ) -> Result<(), SurfaceError> {
        check_finite("fill_rotated_rect", &[x, y, width, height, angle, alpha])?;
        let (cx, cy) = Self::to_raster(x, y);
        let reach = (width.hypot(height) / 2.0 / PIXEL_SIZE).max(0.71);
        let (sin, cos) = angle.sin_cos();
        let mut filled = false;
        for py in (cy - reach).floor() as i64..=(cy + reach).ceil() as i64 {
            for px in (cx - reach).floor() as i64..=(cx + reach).ceil() as i64 {
                let dx = (px as f32 + 0.5 - cx) * PIXEL_SIZE;
                let dy = (py as f32 + 0.5 - cy) * PIXEL_SIZE;
                let local_x = dx * cos + dy * sin;
                let local_y = -dx * sin + dy * cos;
                if local_x.abs() <= width / 2.0 && local_y.abs() <= height / 2.0 {
                    let t = (local_x + width / 2.0) / width.max(f32::EPSILON);
                    self.blend_pixel(px, py, lerp_rgb(from, to, t), alpha, blend);
                    filled = true;
                }
            }
        }
        if !filled {
            self.blend_pixel(cx.floor() as i64, cy.floor() as i64, lerp_rgb(from, to, 0.5), alpha, blend);
        }
        Ok(())
    }
}
