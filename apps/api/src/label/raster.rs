//! Conversion of a rendered label into a packed 1-bit raster for the print sink.

use image::imageops::{self, BiLevel};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Raster conversion flags. `compress`, `high_quality` and `cut` are forwarded
/// to the sink untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterOptions {
    pub rotate: Rotation,
    /// Darkness cut-off in percent: higher keeps more gray as white.
    pub threshold_percent: f32,
    /// Floyd–Steinberg bi-level dithering instead of a hard threshold.
    pub dither: bool,
    pub compress: bool,
    pub high_quality: bool,
    pub cut: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            rotate: Rotation::Deg90,
            threshold_percent: 70.0,
            dither: false,
            compress: false,
            high_quality: true,
            cut: true,
        }
    }
}

/// 1-bit raster, rows packed MSB first, 1 = black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoRaster {
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: usize,
    data: Vec<u8>,
}

impl MonoRaster {
    #[cfg(test)]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.bytes_per_row;
        &self.data[start..start + self.bytes_per_row]
    }

    #[cfg(test)]
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        self.row(y)[x as usize / 8] & (0x80 >> (x % 8)) != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Rotates, binarizes and packs a rendered label.
pub fn to_mono_raster(image: &GrayImage, options: &RasterOptions) -> MonoRaster {
    let mut mono = match options.rotate {
        Rotation::Deg0 => image.clone(),
        Rotation::Deg90 => imageops::rotate90(image),
        Rotation::Deg180 => imageops::rotate180(image),
        Rotation::Deg270 => imageops::rotate270(image),
    };

    if options.dither {
        imageops::dither(&mut mono, &BiLevel);
    } else {
        let threshold = options.threshold_percent.clamp(0.0, 100.0);
        let cutoff = 255.0 * (1.0 - threshold / 100.0);
        for px in mono.pixels_mut() {
            *px = if (px[0] as f32) < cutoff {
                Luma([0u8])
            } else {
                Luma([255u8])
            };
        }
    }

    let (width, height) = mono.dimensions();
    let bytes_per_row = ((width + 7) / 8) as usize;
    let mut data = vec![0u8; bytes_per_row * height as usize];
    for (x, y, px) in mono.enumerate_pixels() {
        if px[0] < 128 {
            data[y as usize * bytes_per_row + x as usize / 8] |= 0x80 >> (x % 8);
        }
    }

    MonoRaster {
        width,
        height,
        bytes_per_row,
        data,
    }
}
