//! Label stock table and the per-deployment label settings built from it.
//!
//! Canvases are in printer dots at 300 dpi, landscape (long edge horizontal),
//! because labels are rendered for reading and rotated 90° at print time.

use crate::label::engine::{Canvas, FontSearch, LabelRequest, Margins};
use crate::label::raster::RasterOptions;

/// A physical label size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStock {
    /// Identifier as used on the command line and in config, e.g. "29x90".
    pub name: &'static str,
    pub width_mm: f32,
    pub length_mm: f32,
    pub canvas: Canvas,
}

static STOCKS: [LabelStock; 5] = [
    LabelStock {
        name: "17x54",
        width_mm: 17.0,
        length_mm: 54.0,
        canvas: Canvas { width: 566, height: 165 },
    },
    LabelStock {
        name: "29x90",
        width_mm: 29.0,
        length_mm: 90.0,
        canvas: Canvas { width: 991, height: 306 },
    },
    LabelStock {
        name: "38x90",
        width_mm: 38.0,
        length_mm: 90.0,
        canvas: Canvas { width: 991, height: 413 },
    },
    LabelStock {
        name: "62x29",
        width_mm: 62.0,
        length_mm: 29.0,
        canvas: Canvas { width: 696, height: 271 },
    },
    LabelStock {
        name: "62x100",
        width_mm: 62.0,
        length_mm: 100.0,
        canvas: Canvas { width: 1109, height: 696 },
    },
];

/// Looks up a stock by name.
pub fn find_stock(name: &str) -> Option<&'static LabelStock> {
    STOCKS.iter().find(|s| s.name.eq_ignore_ascii_case(name.trim()))
}

pub fn stock_names() -> Vec<&'static str> {
    STOCKS.iter().map(|s| s.name).collect()
}

/// Everything needed to build a `LabelRequest` for a name, except the name.
#[derive(Debug, Clone)]
pub struct LabelSettings {
    pub stock: LabelStock,
    pub margins: Margins,
    pub font_search: FontSearch,
    pub font_candidates: Vec<String>,
    pub raster: RasterOptions,
}

/// Badge defaults: 95% × 90% usable area, sizes 120 down to 20 in steps of 5.
pub fn default_label_settings(stock: &LabelStock, font_candidates: Vec<String>) -> LabelSettings {
    LabelSettings {
        stock: *stock,
        margins: Margins {
            max_width_fraction: 0.95,
            max_height_fraction: 0.9,
        },
        font_search: FontSearch {
            start_size: 120,
            min_size: 20,
            step: 5,
        },
        font_candidates,
        raster: RasterOptions::default(),
    }
}

impl LabelSettings {
    pub fn request_for(&self, text: impl Into<String>) -> LabelRequest {
        LabelRequest {
            text: text.into(),
            canvas: self.stock.canvas,
            margins: self.margins,
            font_search: self.font_search,
            font_candidates: self.font_candidates.clone(),
        }
    }
}
