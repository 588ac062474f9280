//! QR code images for printed and PDF badges.

use image::{GrayImage, Luma};
use qrcode::{Color, QrCode};

use super::ExportError;

/// Encodes `data` as a QR code scaled by whole modules to at most `target_width` pixels
/// (never below one pixel per module), with a white quiet zone of four modules.
pub fn generate_qr(data: &str, target_width: u32) -> Result<GrayImage, ExportError> {
    const QUIET_ZONE: u32 = 4;

    let code = QrCode::new(data.as_bytes()).map_err(|e| ExportError::Qr(e.to_string()))?;
    let modules = code.to_colors();
    let module_count = code.width() as u32;
    let total_modules = module_count + 2 * QUIET_ZONE;

    let scale = (target_width / total_modules).max(1);
    let img_size = total_modules * scale;
    let mut img = GrayImage::from_pixel(img_size, img_size, Luma([255u8]));

    for (i, color) in modules.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let x = (i as u32 % module_count + QUIET_ZONE) * scale;
        let y = (i as u32 / module_count + QUIET_ZONE) * scale;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(x + dx, y + dy, Luma([0u8]));
            }
        }
    }

    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_is_square_and_within_target() {
        let img = generate_qr(r#"{"id":1,"nom":"Smith","prenom":"Jane"}"#, 400).unwrap();
        assert_eq!(img.width(), img.height());
        assert!(img.width() <= 400);
        assert!(img.width() > 200);
    }

    #[test]
    fn test_qr_has_quiet_zone_and_dark_modules() {
        let img = generate_qr("badge", 100).unwrap();
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        assert!(img.pixels().any(|p| p.0[0] == 0));
    }

    #[test]
    fn test_tiny_target_uses_one_pixel_per_module() {
        let img = generate_qr("badge", 1).unwrap();
        // version 1 is 21 modules plus 8 quiet modules
        assert_eq!(img.width(), 29);
    }
}
