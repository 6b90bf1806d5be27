//! Terminal compositor.
//!
//! Flattens one frame of the stage into ANSI: effect canvases over the
//! background, dashboard text over that, and the celebration message centred
//! on top. Cells without text use the half-block glyph with the upper pixel
//! as background colour and the lower pixel as foreground colour.

use std::io::{self, Write};
use std::time::Duration;

use unicode_width::UnicodeWidthChar;

use crate::canvas::{lerp_rgb, Canvas, Rgb};
use crate::surface::{Stage, BIRTHDAY_REGION};

const HALF_BLOCK: &str = "▄";
const MODULE_TEXT: Rgb = (210, 210, 210);
const MESSAGE_TEXT: Rgb = (255, 215, 0);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Glyph {
    Pixels,
    Text { ch: char, fg: Rgb },
    /// Right half of a double-width character.
    Continuation,
}

pub struct Compositor {
    bg: Rgb,
    pixels: Vec<Rgb>,
    glyphs: Vec<Glyph>,
    output_buf: Vec<u8>,
}

fn scale(color: Rgb, brightness: f32) -> Rgb {
    lerp_rgb((0, 0, 0), color, brightness)
}

impl Compositor {
    pub fn new(bg: Rgb) -> Self {
        Self {
            bg,
            pixels: Vec::new(),
            glyphs: Vec::new(),
            output_buf: Vec::with_capacity(1024 * 64),
        }
    }

    /// Builds one frame and returns the bytes to write.
    pub fn compose(&mut self, stage: &Stage, layers: &[&Canvas], now: Duration) -> &[u8] {
        let viewport = stage.viewport();
        let columns = viewport.columns as usize;
        let rows = viewport.rows as usize;
        let (width, height) = viewport.raster();

        self.pixels.clear();
        self.pixels.resize(width * height, self.bg);
        for canvas in layers {
            let w = canvas.width().min(width);
            let h = canvas.height().min(height);
            for y in 0..h {
                for x in 0..w {
                    let src = canvas.pixel(x, y);
                    if src.a > 0.0 {
                        let dst = &mut self.pixels[y * width + x];
                        *dst = lerp_rgb(*dst, src.to_rgb(), src.a);
                    }
                }
            }
        }

        self.glyphs.clear();
        self.glyphs.resize(columns * rows, Glyph::Pixels);
        for module in stage.modules() {
            if !module.visible || module.name == BIRTHDAY_REGION {
                continue;
            }
            let fg = scale(MODULE_TEXT, module.brightness_at(now));
            for (i, line) in module.lines.iter().enumerate() {
                let row = module.row as usize + i;
                self.put_text(columns, rows, module.column as usize, row, line, fg);
            }
        }
        if let Some(overlay) = stage.overlay() {
            if let (true, Some(message)) = (overlay.visible, overlay.message.as_deref()) {
                let text_width: usize = message.chars().filter_map(|c| c.width()).sum();
                let column = columns.saturating_sub(text_width) / 2;
                self.put_text(columns, rows, column, rows / 2, message, MESSAGE_TEXT);
            }
        }

        self.encode(columns, rows, width);
        &self.output_buf
    }

    fn put_text(&mut self, columns: usize, rows: usize, column: usize, row: usize, text: &str, fg: Rgb) {
        if row >= rows {
            return;
        }
        let mut col = column;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if w == 0 {
                continue;
            }
            if col + w > columns {
                break;
            }
            self.glyphs[row * columns + col] = Glyph::Text { ch, fg };
            if w == 2 {
                self.glyphs[row * columns + col + 1] = Glyph::Continuation;
            }
            col += w;
        }
    }

    fn encode(&mut self, columns: usize, rows: usize, width: usize) {
        let buf = &mut self.output_buf;
        buf.clear();
        buf.extend_from_slice(b"\x1b[H");

        for row in 0..rows {
            let mut prev_bg: Option<Rgb> = None;
            let mut prev_fg: Option<Rgb> = None;
            for col in 0..columns {
                let top = self.pixels[row * 2 * width + col];
                let bottom = self.pixels[(row * 2 + 1) * width + col];
                let (bg, fg, text) = match self.glyphs[row * columns + col] {
                    Glyph::Pixels => (top, bottom, None),
                    Glyph::Text { ch, fg } => (lerp_rgb(top, bottom, 0.5), fg, Some(ch)),
                    Glyph::Continuation => continue,
                };
                if prev_bg != Some(bg) {
                    // Writing into a Vec cannot fail.
                    let _ = write!(buf, "\x1b[48;2;{};{};{}m", bg.0, bg.1, bg.2);
                    prev_bg = Some(bg);
                }
                if prev_fg != Some(fg) {
                    let _ = write!(buf, "\x1b[38;2;{};{};{}m", fg.0, fg.1, fg.2);
                    prev_fg = Some(fg);
                }
                match text {
                    Some(ch) => {
                        let mut utf8 = [0u8; 4];
                        buf.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                    }
                    None => buf.extend_from_slice(HALF_BLOCK.as_bytes()),
                }
            }
            buf.extend_from_slice(b"\x1b[0m");
            if row + 1 < rows {
                buf.extend_from_slice(b"\r\n");
            }
        }
    }

    pub fn render<W: Write>(
        &mut self,
        out: &mut W,
        stage: &Stage,
        layers: &[&Canvas],
        now: Duration,
    ) -> io::Result<()> {
        let frame = self.compose(stage, layers, now);
        out.write_all(frame)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{ModuleRegion, Viewport};

    fn text(frame: &[u8]) -> String {
        String::from_utf8(frame.to_vec()).unwrap()
    }

    #[test]
    fn empty_stage_is_all_background_half_blocks() {
        let stage = Stage::new(Viewport::new(4, 2));
        let mut compositor = Compositor::new((10, 20, 30));
        let out = text(compositor.compose(&stage, &[], Duration::ZERO));
        assert_eq!(out.matches(HALF_BLOCK).count(), 8);
        assert_eq!(out.matches("\x1b[48;2;10;20;30m").count(), 2, "one colour change per row");
        assert_eq!(out.matches("\r\n").count(), 1);
    }

    #[test]
    fn canvas_pixels_show_through() {
        let stage = Stage::new(Viewport::new(4, 2));
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_circle(4.0, 12.0, 1.0, (255, 0, 0), 1.0).unwrap();
        let mut compositor = Compositor::new((0, 0, 0));
        let out = text(compositor.compose(&stage, &[&canvas], Duration::ZERO));
        assert!(out.contains("\x1b[38;2;255;0;0m"));
    }

    #[test]
    fn message_is_centred() {
        let mut stage = Stage::new(Viewport::new(20, 3));
        let overlay = stage.ensure_overlay();
        overlay.message = Some("Hi Bo".into());
        overlay.visible = true;
        let mut compositor = Compositor::new((0, 0, 0));
        compositor.compose(&stage, &[], Duration::ZERO);
        let start = 20 + (20 - 5) / 2;
        assert_eq!(compositor.glyphs[start], Glyph::Text { ch: 'H', fg: MESSAGE_TEXT });
        assert_eq!(compositor.glyphs[start - 1], Glyph::Pixels);
    }

    #[test]
    fn wide_characters_take_two_cells() {
        let mut stage = Stage::new(Viewport::new(10, 1));
        let overlay = stage.ensure_overlay();
        overlay.message = Some("🎉a".into());
        overlay.visible = true;
        let mut compositor = Compositor::new((0, 0, 0));
        let out = text(compositor.compose(&stage, &[], Duration::ZERO));
        assert!(out.contains('🎉'));
        assert_eq!(out.matches(HALF_BLOCK).count(), 7);
    }

    #[test]
    fn hidden_message_is_not_drawn() {
        let mut stage = Stage::new(Viewport::new(10, 1));
        stage.ensure_overlay().message = Some("x".into());
        let mut compositor = Compositor::new((0, 0, 0));
        let out = text(compositor.compose(&stage, &[], Duration::ZERO));
        assert_eq!(out.matches(HALF_BLOCK).count(), 10);
    }

    #[test]
    fn dimmed_modules_draw_darker_text() {
        let mut stage = Stage::new(Viewport::new(10, 2));
        let mut clock = ModuleRegion::new("clock", 0, 0);
        clock.lines.push("12:00".into());
        stage.add_module(clock);
        stage.dim_modules(0.3, Duration::ZERO, Duration::from_millis(500));

        let mut compositor = Compositor::new((0, 0, 0));
        compositor.compose(&stage, &[], Duration::from_secs(1));
        let dimmed = scale(MODULE_TEXT, 0.3);
        assert_eq!(compositor.glyphs[0], Glyph::Text { ch: '1', fg: dimmed });
    }
}
