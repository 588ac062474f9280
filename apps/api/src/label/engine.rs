//! Label layout engine: fits a single line of text onto a fixed label canvas.
//!
//! # Algorithm
//! 1. Usable area = floor(canvas × margin fractions).
//! 2. Walk font sizes downward from `start_size` in `step` decrements while the
//!    size stays above `min_size`. At every size the full candidate list is
//!    re-walked and the first font that loads is measured. The first size whose
//!    tight box fits the usable area wins.
//! 3. If no candidate loads at some size, the built-in font is used and the
//!    search stops (it cannot be resized).
//! 4. If the search runs out, the text is laid out at `min_size` and may overflow.
//! 5. Centering: horizontally on the tight box, vertically on ascent − descent
//!    when the font exposes them, corrected by the box's top offset.
//!
//! The engine is synchronous and keeps no state between calls. Async callers run
//! it inside `tokio::task::spawn_blocking`.

use std::fmt;

use image::{GrayImage, Luma};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::label::fonts::{FontLoader, LabelFont, TextBox};

// ────────────────────────────────────────────────────────────────────────────
// Request / result types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// Fraction of the canvas text may occupy, each in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub max_width_fraction: f64,
    pub max_height_fraction: f64,
}

/// Descending size search: `start_size`, `start_size - step`, ... while `> min_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontSearch {
    pub start_size: u32,
    pub min_size: u32,
    pub step: u32,
}

#[derive(Debug, Clone)]
pub struct LabelRequest {
    pub text: String,
    pub canvas: Canvas,
    pub margins: Margins,
    pub font_search: FontSearch,
    /// Font identifiers, tried in order at every size.
    pub font_candidates: Vec<String>,
}

/// Which font produced the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChosenFont {
    Candidate(String),
    Default,
}

impl fmt::Display for ChosenFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChosenFont::Candidate(id) => f.write_str(id),
            ChosenFont::Default => f.write_str("default"),
        }
    }
}

/// Top-left drawing origin of the text on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
}

pub struct LabelResult {
    /// Grayscale canvas, white background, black text.
    pub image: GrayImage,
    pub chosen_font_size: u32,
    pub chosen_font: ChosenFont,
    /// Tight box of the text at the chosen size, relative to the drawing origin.
    pub text_box: TextBox,
    pub placement: Placement,
    /// False when the text overflows the usable area (minimum-size or built-in fallback).
    pub fits: bool,
}

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("no usable font could be loaded")]
    FontUnavailable,

    #[error("invalid label request: {0}")]
    InvalidRequest(String),
}

impl LabelRequest {
    /// Rejects requests the engine cannot lay out, before any font is touched.
    pub fn validate(&self) -> Result<(), LabelError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(LabelError::InvalidRequest(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas.width, self.canvas.height
            )));
        }
        for (name, fraction) in [
            ("max_width_fraction", self.margins.max_width_fraction),
            ("max_height_fraction", self.margins.max_height_fraction),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(LabelError::InvalidRequest(format!(
                    "{name} must be in (0, 1], got {fraction}"
                )));
            }
        }
        let search = &self.font_search;
        if search.step == 0 || search.min_size == 0 || search.start_size <= search.min_size {
            return Err(LabelError::InvalidRequest(format!(
                "font search requires start > min > 0 and step > 0, got start={} min={} step={}",
                search.start_size, search.min_size, search.step
            )));
        }
        Ok(())
    }

    fn max_text_width(&self) -> i32 {
        (self.canvas.width as f64 * self.margins.max_width_fraction).floor() as i32
    }

    fn max_text_height(&self) -> i32 {
        (self.canvas.height as f64 * self.margins.max_height_fraction).floor() as i32
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

struct Selection {
    font: Box<dyn LabelFont>,
    chosen: ChosenFont,
    size: u32,
    text_box: TextBox,
    fits: bool,
}

/// Lays out `request.text` on the request's canvas and renders it.
pub fn layout_and_render(
    request: &LabelRequest,
    loader: &dyn FontLoader,
) -> Result<LabelResult, LabelError> {
    request.validate()?;

    let max_width = request.max_text_width();
    let max_height = request.max_text_height();
    let fits = |tb: &TextBox| tb.width() <= max_width && tb.height() <= max_height;

    let search = request.font_search;
    let mut size = search.start_size;
    let mut selection: Option<Selection> = None;

    while size > search.min_size {
        match load_first_candidate(loader, &request.font_candidates, size) {
            Some((id, font)) => {
                let text_box = font.text_box(&request.text);
                if fits(&text_box) {
                    selection = Some(Selection {
                        font,
                        chosen: ChosenFont::Candidate(id.to_string()),
                        size,
                        text_box,
                        fits: true,
                    });
                    break;
                }
                debug!(
                    "'{}' is {}x{} at {size}px in {id}, limit {max_width}x{max_height}",
                    request.text,
                    text_box.width(),
                    text_box.height()
                );
            }
            None => {
                warn!("No candidate font loaded at {size}px, using the built-in font");
                let font = loader.load_default().ok_or(LabelError::FontUnavailable)?;
                let text_box = font.text_box(&request.text);
                selection = Some(Selection {
                    fits: fits(&text_box),
                    font,
                    chosen: ChosenFont::Default,
                    size,
                    text_box,
                });
                break;
            }
        }
        size = size.saturating_sub(search.step);
    }

    let selection = match selection {
        Some(selection) => selection,
        None => {
            let size = search.min_size;
            let (font, chosen) =
                match load_first_candidate(loader, &request.font_candidates, size) {
                    Some((id, font)) => (font, ChosenFont::Candidate(id.to_string())),
                    None => (
                        loader.load_default().ok_or(LabelError::FontUnavailable)?,
                        ChosenFont::Default,
                    ),
                };
            let text_box = font.text_box(&request.text);
            Selection {
                fits: fits(&text_box),
                font,
                chosen,
                size,
                text_box,
            }
        }
    };

    if !selection.fits {
        warn!(
            "'{}' overflows the {max_width}x{max_height} text area at {}px",
            request.text, selection.size
        );
    }

    let placement = place(request, selection.font.as_ref(), &selection.text_box);

    let mut image = GrayImage::from_pixel(
        request.canvas.width,
        request.canvas.height,
        Luma([255u8]),
    );
    if !request.text.is_empty() {
        selection
            .font
            .draw(&mut image, placement.x, placement.y, &request.text);
    }

    info!(
        "Using font size {}px ({}) for '{}'",
        selection.size, selection.chosen, request.text
    );

    Ok(LabelResult {
        image,
        chosen_font_size: selection.size,
        chosen_font: selection.chosen,
        text_box: selection.text_box,
        placement,
        fits: selection.fits,
    })
}

/// First candidate that loads at `size`, with its identifier.
fn load_first_candidate<'a>(
    loader: &dyn FontLoader,
    candidates: &'a [String],
    size: u32,
) -> Option<(&'a str, Box<dyn LabelFont>)> {
    candidates
        .iter()
        .find_map(|id| loader.try_load(id, size).map(|font| (id.as_str(), font)))
}

/// Centers the text box horizontally and the font's visual block vertically.
/// Halving floors so overflowing text (negative slack) stays symmetric.
fn place(request: &LabelRequest, font: &dyn LabelFont, text_box: &TextBox) -> Placement {
    let canvas_w = request.canvas.width as i32;
    let canvas_h = request.canvas.height as i32;

    let x = (canvas_w - text_box.width()).div_euclid(2);
    let visual_height = match font.vertical_metrics() {
        Some(m) => m.ascent - m.descent,
        None => text_box.height(),
    };
    let y = (canvas_h - visual_height).div_euclid(2) - text_box.top;

    Placement { x, y }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
