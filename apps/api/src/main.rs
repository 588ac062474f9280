mod badges;
mod config;
mod db;
mod errors;
mod export;
mod label;
mod models;
mod printer;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::badges::external::ExternalBadgeClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::label::{default_label_settings, FsFontLoader};
use crate::printer::build_sink;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting badge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite
    let db = create_pool(&config.database_url).await?;

    // External badge service
    let external =
        ExternalBadgeClient::new(config.external_api_url.clone(), config.external_api_timeout)?;
    info!("External badge service: {}", external.base_url());

    // Printer sink
    let printer_config = config.printer_config();
    if let Err(e) = printer_config.check_model() {
        warn!("{e}");
    }
    let printer = build_sink(&printer_config)?;
    info!("Printer {} -> {}", printer_config.model, printer.describe());

    // Label layout settings
    let label_settings = Arc::new(default_label_settings(
        &config.label_stock,
        config.font_candidates.clone(),
    ));
    info!(
        "Label stock {} ({}x{}px), fonts: {}",
        label_settings.stock.name,
        label_settings.stock.canvas.width,
        label_settings.stock.canvas.height,
        label_settings.font_candidates.join(", ")
    );
    let font_loader = Arc::new(FsFontLoader::new(config.font_dirs.clone()));

    // Build app state
    let state = AppState {
        db,
        external,
        config: config.clone(),
        label_settings,
        font_loader,
        printer,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
