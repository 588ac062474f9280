//! Font capability consumed by the layout engine.
//!
//! The engine never touches font files itself. It asks a [`FontLoader`] for a
//! font by identifier and pixel size, and works with whatever [`LabelFont`]
//! comes back: a scalable TrueType face, the built-in bitmap font, or (in tests)
//! a synthetic font with predictable geometry.
//!
//! All geometry is measured relative to a drawing origin placed at the top-left
//! corner of the line box, i.e. on the ascender line.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use rusttype::{point, Font, PositionedGlyph, Scale};
use serde::Serialize;
use tracing::debug;

use crate::label::builtin::BuiltinFont;

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// Tight bounding box of rendered ink, relative to the drawing origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl TextBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    fn union(self, other: TextBox) -> TextBox {
        TextBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Vertical font metrics in pixels. Both values are positive distances from
/// the baseline: `ascent` above it, `descent` below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalMetrics {
    pub ascent: i32,
    pub descent: i32,
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

/// A font loaded at a fixed pixel size.
pub trait LabelFont {
    /// Ink bounding box of `text` drawn at origin (0, 0). Empty text yields a zero box.
    fn text_box(&self, text: &str) -> TextBox;

    /// Ascent/descent, when the font exposes them.
    fn vertical_metrics(&self) -> Option<VerticalMetrics>;

    /// Draws `text` in black with its origin at (`x`, `y`). Ink outside the canvas is clipped.
    fn draw(&self, canvas: &mut GrayImage, x: i32, y: i32, text: &str);
}

/// Source of fonts for the layout engine.
pub trait FontLoader: Send + Sync {
    /// Loads font `id` at `size` pixels per em, or `None` if it cannot be loaded.
    fn try_load(&self, id: &str, size: u32) -> Option<Box<dyn LabelFont>>;

    /// The last-resort font, used when no candidate loads.
    fn load_default(&self) -> Option<Box<dyn LabelFont>> {
        Some(Box::new(BuiltinFont))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scalable (TrueType / OpenType) fonts
// ────────────────────────────────────────────────────────────────────────────

/// A TrueType/OpenType face scaled to a pixel em size.
pub struct ScalableFont {
    font: Font<'static>,
    scale: Scale,
    ascent: f32,
    descent: f32,
}

impl ScalableFont {
    /// Parses font bytes and scales them so one em spans `size` pixels.
    ///
    /// rusttype scales by line height (ascent − descent), so the em size is
    /// converted through the face's own unscaled metrics.
    pub fn from_bytes(bytes: Vec<u8>, size: u32) -> Option<Self> {
        if size == 0 {
            return None;
        }
        let font = Font::try_from_vec(bytes)?;

        let units_per_em = font.units_per_em() as f32;
        let unscaled = font.v_metrics_unscaled();
        let line_units = unscaled.ascent - unscaled.descent;
        let pixel_height = if units_per_em > 0.0 && line_units > 0.0 {
            size as f32 * line_units / units_per_em
        } else {
            size as f32
        };

        let scale = Scale::uniform(pixel_height);
        let v_metrics = font.v_metrics(scale);
        Some(Self {
            font,
            scale,
            ascent: v_metrics.ascent,
            descent: v_metrics.descent,
        })
    }

    fn glyphs_at(&self, text: &str, x: f32, y: f32) -> Vec<PositionedGlyph<'_>> {
        self.font
            .layout(text, self.scale, point(x, y + self.ascent))
            .collect()
    }
}

impl LabelFont for ScalableFont {
    fn text_box(&self, text: &str) -> TextBox {
        self.glyphs_at(text, 0.0, 0.0)
            .iter()
            .filter_map(|g| g.pixel_bounding_box())
            .map(|bb| TextBox {
                left: bb.min.x,
                top: bb.min.y,
                right: bb.max.x,
                bottom: bb.max.y,
            })
            .reduce(TextBox::union)
            .unwrap_or_default()
    }

    fn vertical_metrics(&self) -> Option<VerticalMetrics> {
        Some(VerticalMetrics {
            ascent: self.ascent.ceil() as i32,
            descent: (-self.descent).ceil() as i32,
        })
    }

    fn draw(&self, canvas: &mut GrayImage, x: i32, y: i32, text: &str) {
        let (width, height) = canvas.dimensions();
        for glyph in self.glyphs_at(text, x as f32, y as f32) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let px = bb.min.x + gx as i32;
                let py = bb.min.y + gy as i32;
                if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                    return;
                }
                let pixel = canvas.get_pixel_mut(px as u32, py as u32);
                let ink = coverage.clamp(0.0, 1.0);
                let blended = pixel[0] as f32 * (1.0 - ink);
                *pixel = Luma([blended.round() as u8]);
            });
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Filesystem loader
// ────────────────────────────────────────────────────────────────────────────

/// Loads fonts from files. An identifier is tried as a path first, then
/// relative to each search directory in order.
#[derive(Debug, Clone, Default)]
pub struct FsFontLoader {
    search_dirs: Vec<PathBuf>,
}

impl FsFontLoader {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    fn resolve(&self, id: &str) -> Option<PathBuf> {
        let direct = Path::new(id);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        if direct.is_absolute() {
            return None;
        }
        self.search_dirs
            .iter()
            .map(|dir| dir.join(id))
            .find(|candidate| candidate.is_file())
    }
}

impl FontLoader for FsFontLoader {
    fn try_load(&self, id: &str, size: u32) -> Option<Box<dyn LabelFont>> {
        let Some(path) = self.resolve(id) else {
            debug!("Font '{id}' not found");
            return None;
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Could not read font {}: {e}", path.display());
                return None;
            }
        };
        match ScalableFont::from_bytes(bytes, size) {
            Some(font) => Some(Box::new(font)),
            None => {
                debug!("{} is not a usable font at size {size}", path.display());
                None
            }
        }
    }
}
