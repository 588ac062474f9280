use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "badges"
    }))
}

/// GET /
/// Service description: printer settings and the endpoint list.
pub async fn index_handler(State(state): State<AppState>) -> Json<Value> {
    let stock = &state.label_settings.stock;
    Json(json!({
        "name": "Badge Management API",
        "version": env!("CARGO_PKG_VERSION"),
        "printer": {
            "model": state.config.printer_model,
            "destination": state.printer.describe(),
            "label": {
                "name": stock.name,
                "width_mm": stock.width_mm,
                "length_mm": stock.length_mm,
            },
        },
        "endpoints": {
            "GET /api/getbadges": "Get all badges (local + external)",
            "GET /api/getbadges/local": "Get local badges only",
            "GET /api/getbadges/external": "Get external badges only",
            "GET /api/getbadges/:id": "Get badge by ID",
            "POST /api/badges": "Create new badge",
            "PUT /api/badges/:id": "Update badge",
            "DELETE /api/badges/:id": "Delete badge",
            "POST /print-label": "Print badge label",
            "POST /print-label-pdf": "Generate PDF badge",
            "POST /api/label/preview": "Render label preview as PNG",
            "POST /user_data": "Add user data",
            "GET /api/stats": "Get statistics",
            "POST /api/validate/:id": "Validate badge",
            "GET /api/search": "Search badges",
            "POST /api/sync-external": "Sync external badges to local DB",
            "GET /api/export-excel": "Export badges to Excel file"
        }
    }))
}
