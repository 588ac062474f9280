use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    Json,
};
use bytes::Bytes;
use chrono::Local;
use image::{DynamicImage, ImageOutputFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::badges::store;
use crate::errors::AppError;
use crate::export::{badge_pdf_filename, create_badge_pdf, BadgePdfData};
use crate::label::{layout_and_render, to_mono_raster, LabelResult};
use crate::models::badge::NewBadge;
use crate::printer::PrintJob;
use crate::state::AppState;

/// Body of `POST /print-label` and `POST /print-label-pdf`.
#[derive(Debug, Deserialize)]
pub struct PrintLabelRequest {
    #[serde(rename = "nom", alias = "last_name", default)]
    pub last_name: String,
    #[serde(rename = "prenom", alias = "first_name", default)]
    pub first_name: String,
    /// Existing badge to print. Absent (or 0) creates a new, validated badge.
    #[serde(default)]
    pub id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PrintLabelResponse {
    pub status: &'static str,
    pub message: String,
    pub id: i64,
    pub font_size: u32,
    pub font: String,
    pub fits: bool,
}

/// Body of `POST /api/label/preview`: explicit `text`, or the name fields.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "nom", alias = "last_name", default)]
    pub last_name: String,
    #[serde(rename = "prenom", alias = "first_name", default)]
    pub first_name: String,
}

fn require_names(req: &PrintLabelRequest) -> Result<(String, String), AppError> {
    let last_name = req.last_name.trim();
    let first_name = req.first_name.trim();
    if last_name.is_empty() || first_name.is_empty() {
        return Err(AppError::Validation(
            "last_name and first_name are required".to_string(),
        ));
    }
    Ok((last_name.to_string(), first_name.to_string()))
}

/// Returns the id of the badge to print, creating it when the request carries none.
async fn resolve_badge_id(
    state: &AppState,
    req: &PrintLabelRequest,
    last_name: &str,
    first_name: &str,
) -> Result<i64, AppError> {
    match req.id.filter(|id| *id != 0) {
        Some(id) => {
            store::get_badge(&state.db, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Badge {id} not found")))?;
            Ok(id)
        }
        None => {
            let new = NewBadge {
                last_name: last_name.to_string(),
                first_name: first_name.to_string(),
                validated: true,
            };
            let badge = store::create_badge(&state.db, &new).await?;
            info!("Created badge {} for {}", badge.id, badge.full_name());
            Ok(badge.id)
        }
    }
}

/// Runs the layout engine off the async executor.
async fn render_label(state: &AppState, text: String) -> Result<LabelResult, AppError> {
    let request = state.label_settings.request_for(text);
    let loader = Arc::clone(&state.font_loader);
    tokio::task::spawn_blocking(move || layout_and_render(&request, loader.as_ref()))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("label render task failed: {e}")))?
        .map_err(AppError::from)
}

/// POST /print-label
pub async fn handle_print_label(
    State(state): State<AppState>,
    Json(req): Json<PrintLabelRequest>,
) -> Result<Json<PrintLabelResponse>, AppError> {
    let (last_name, first_name) = require_names(&req)?;
    let printer_config = state.config.printer_config();
    printer_config.check_model()?;

    let id = resolve_badge_id(&state, &req, &last_name, &first_name).await?;

    let result = render_label(&state, format!("{first_name} {last_name}")).await?;
    debug!(
        "Label for badge {id}: {}x{} text box at ({}, {})",
        result.text_box.width(),
        result.text_box.height(),
        result.placement.x,
        result.placement.y
    );
    let options = state.label_settings.raster;
    let (raster, result) = tokio::task::spawn_blocking(move || {
        let raster = to_mono_raster(&result.image, &options);
        (raster, result)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("raster task failed: {e}")))?;

    let job = PrintJob {
        model: printer_config.model.clone(),
        label: state.label_settings.stock.name.to_string(),
        raster,
        options,
    };
    state.printer.send(&job).await?;
    store::log_print(&state.db, id).await?;

    info!(
        "Printed badge {id} on {} at {}px with font {}",
        state.printer.describe(),
        result.chosen_font_size,
        result.chosen_font
    );

    Ok(Json(PrintLabelResponse {
        status: "success",
        message: format!("Label printed successfully for {first_name} {last_name}"),
        id,
        font_size: result.chosen_font_size,
        font: result.chosen_font.to_string(),
        fits: result.fits,
    }))
}

/// POST /print-label-pdf
pub async fn handle_print_label_pdf(
    State(state): State<AppState>,
    Json(req): Json<PrintLabelRequest>,
) -> Result<(HeaderMap, Bytes), AppError> {
    let (last_name, first_name) = require_names(&req)?;
    let id = resolve_badge_id(&state, &req, &last_name, &first_name).await?;

    let data = BadgePdfData {
        id,
        last_name: last_name.clone(),
        first_name: first_name.clone(),
    };
    let issued_at = Local::now().naive_local();
    let pdf = tokio::task::spawn_blocking(move || create_badge_pdf(&data, issued_at))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF task failed: {e}")))??;

    store::log_print(&state.db, id).await?;
    info!("Generated PDF badge {id} ({} bytes)", pdf.len());

    let filename = badge_pdf_filename(&first_name, &last_name);
    Ok((attachment_headers("application/pdf", &filename)?, Bytes::from(pdf)))
}

/// POST /api/label/preview
pub async fn handle_label_preview(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> Result<(HeaderMap, Bytes), AppError> {
    let text = match req.text {
        Some(text) => text,
        None => format!("{} {}", req.first_name.trim(), req.last_name.trim())
            .trim()
            .to_string(),
    };

    let LabelResult {
        image,
        chosen_font_size,
        chosen_font,
        fits,
        ..
    } = render_label(&state, text).await?;

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PNG encoding failed: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert("x-label-font-size", HeaderValue::from(chosen_font_size));
    headers.insert(
        "x-label-font",
        HeaderValue::from_str(&chosen_font.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
    );
    headers.insert(
        "x-label-fits",
        HeaderValue::from_static(if fits { "true" } else { "false" }),
    );
    Ok((headers, Bytes::from(png)))
}

/// Content headers for a downloadable file.
pub fn attachment_headers(content_type: &'static str, filename: &str) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid attachment name: {e}")))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(headers)
}
