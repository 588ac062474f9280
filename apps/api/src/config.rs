use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::label::stock::{find_stock, stock_names, LabelStock};
use crate::printer::PrinterConfig;

const DEFAULT_FONT_CANDIDATES: &str =
    "arial.ttf,calibri.ttf,DejaVuSans.ttf,/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// Application configuration loaded from environment variables.
/// Every variable has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub external_api_url: String,
    pub external_api_timeout: Duration,
    pub printer_model: String,
    pub printer_uri: Option<String>,
    pub printer_timeout: Duration,
    pub label_stock: LabelStock,
    pub font_candidates: Vec<String>,
    pub font_dirs: Vec<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let stock_name = var("LABEL_STOCK", "29x90");
        let label_stock = *find_stock(&stock_name).ok_or_else(|| {
            anyhow!(
                "LABEL_STOCK '{stock_name}' is not supported (one of: {})",
                stock_names().join(", ")
            )
        })?;

        Ok(Config {
            database_url: var("DATABASE_URL", "sqlite://badges.db"),
            port: var("PORT", "5000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG", "info"),
            external_api_url: var("EXTERNAL_API_URL", "http://badges.eevent.ma/api/getbadges"),
            external_api_timeout: parse_secs(&var("EXTERNAL_API_TIMEOUT_SECS", "5"))
                .context("EXTERNAL_API_TIMEOUT_SECS must be a whole number of seconds")?,
            printer_model: var("PRINTER_MODEL", "QL-810W"),
            printer_uri: lookup("PRINTER_URI").filter(|uri| !uri.trim().is_empty()),
            printer_timeout: parse_secs(&var("PRINTER_TIMEOUT_SECS", "10"))
                .context("PRINTER_TIMEOUT_SECS must be a whole number of seconds")?,
            label_stock,
            font_candidates: split_list(&var("LABEL_FONTS", DEFAULT_FONT_CANDIDATES)),
            font_dirs: split_list(&var("FONT_DIRS", ""))
                .into_iter()
                .map(PathBuf::from)
                .collect(),
        })
    }

    pub fn printer_config(&self) -> PrinterConfig {
        PrinterConfig {
            model: self.printer_model.clone(),
            uri: self.printer_uri.clone(),
            timeout: self.printer_timeout,
        }
    }
}

fn parse_secs(value: &str) -> Result<Duration> {
    Ok(Duration::from_secs(value.trim().parse::<u64>()?))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
