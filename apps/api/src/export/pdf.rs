//! A4 access badge rendered as a PDF, used when no label printer is available.

use chrono::NaiveDateTime;
use image::DynamicImage;
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef, Mm,
    PdfDocument, PdfLayerReference, Px,
};
use serde_json::json;

use super::font_metrics::{text_width_pt, PdfFont};
use super::qr::generate_qr;
use super::ExportError;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const QR_SIZE_PT: f32 = 200.0;
/// Pixel width requested for the QR bitmap before it is scaled onto the page.
const QR_PIXELS: u32 = 600;

#[derive(Debug, Clone)]
pub struct BadgePdfData {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
}

fn pt_to_mm(pt: f32) -> f32 {
    pt * 25.4 / 72.0
}

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Writes `text` centred on the page at baseline `y_pt` (points from the bottom edge).
fn draw_centred(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    metrics: PdfFont,
    size_pt: f32,
    y_pt: f32,
    text: &str,
) {
    let page_width_pt = mm_to_pt(PAGE_WIDTH_MM);
    let x_pt = (page_width_pt - text_width_pt(metrics, text, size_pt)) / 2.0;
    layer.use_text(text, size_pt, Mm(pt_to_mm(x_pt)), Mm(pt_to_mm(y_pt)), font);
}

/// Builds the badge document. `issued_at` is printed in the footer and embedded in the
/// QR payload.
pub fn create_badge_pdf(data: &BadgePdfData, issued_at: NaiveDateTime) -> Result<Vec<u8>, ExportError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("Badge {}", data.id),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Badge",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let font_regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    let height_pt = mm_to_pt(PAGE_HEIGHT_MM);
    let width_pt = mm_to_pt(PAGE_WIDTH_MM);

    draw_centred(&layer, &font_bold, PdfFont::HelveticaBold, 24.0, height_pt - 100.0, "BADGE D'ACCÈS");

    let full_name = format!("{} {}", data.first_name, data.last_name).to_uppercase();
    draw_centred(&layer, &font_regular, PdfFont::Helvetica, 18.0, height_pt - 150.0, &full_name);

    draw_centred(
        &layer,
        &font_regular,
        PdfFont::Helvetica,
        12.0,
        height_pt - 180.0,
        &format!("ID: {}", data.id),
    );

    let payload = json!({
        "id": data.id,
        "nom": data.last_name,
        "prenom": data.first_name,
        "timestamp": issued_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    })
    .to_string();
    let qr = DynamicImage::ImageLuma8(generate_qr(&payload, QR_PIXELS)?).to_rgb8();
    let (qr_width, qr_height) = qr.dimensions();

    let image = Image::from(ImageXObject {
        width: Px(qr_width as usize),
        height: Px(qr_height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: qr.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });
    // dpi such that the bitmap spans QR_SIZE_PT on the page
    let dpi = qr_width as f32 / (QR_SIZE_PT / 72.0);
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(pt_to_mm((width_pt - QR_SIZE_PT) / 2.0))),
            translate_y: Some(Mm(pt_to_mm(height_pt - 450.0))),
            dpi: Some(dpi),
            ..Default::default()
        },
    );

    draw_centred(
        &layer,
        &font_regular,
        PdfFont::Helvetica,
        10.0,
        100.0,
        &format!("Émis le: {}", issued_at.format("%d/%m/%Y %H:%M")),
    );

    doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
}

/// Attachment name for a badge PDF; anything outside `[A-Za-z0-9_-]` becomes `_`.
pub fn badge_pdf_filename(first_name: &str, last_name: &str) -> String {
    let clean = |s: &str| -> String {
        s.trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    };
    format!("badge_{}_{}.pdf", clean(first_name), clean(last_name))
}
