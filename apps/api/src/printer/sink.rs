//! Print sinks: where packed label rasters go.
//!
//! The sink is opaque to the rest of the service: it receives a `PrintJob` and
//! reports success or a `PrinterError`. The printer's own command language is not
//! modelled; sinks forward the packed raster bytes as-is.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::label::{MonoRaster, RasterOptions};

/// Models accepted by `PRINTER_MODEL`.
pub const SUPPORTED_MODELS: &[&str] = &[
    "QL-500", "QL-550", "QL-560", "QL-570", "QL-580N", "QL-650TD", "QL-700", "QL-710W",
    "QL-720NW", "QL-800", "QL-810W", "QL-820NWB", "QL-1050", "QL-1060N", "QL-1100",
    "QL-1110NWB", "QL-1115NWB",
];

#[derive(Debug, Error)]
pub enum PrinterError {
    #[error("No printer configured (set PRINTER_URI)")]
    NotConfigured,

    #[error("Model '{model}' not recognized. Supported models: {supported}")]
    UnsupportedModel { model: String, supported: String },

    #[error("Invalid printer URI '{0}' (expected file://<path> or tcp://<host>:<port>)")]
    InvalidUri(String),

    #[error("Printer I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Printer did not accept the job within {0:?}")]
    Timeout(Duration),
}

/// Printer transport configuration, passed explicitly at startup.
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub model: String,
    pub uri: Option<String>,
    pub timeout: Duration,
}

impl PrinterConfig {
    pub fn check_model(&self) -> Result<(), PrinterError> {
        if SUPPORTED_MODELS.contains(&self.model.as_str()) {
            Ok(())
        } else {
            Err(PrinterError::UnsupportedModel {
                model: self.model.clone(),
                supported: SUPPORTED_MODELS.join(", "),
            })
        }
    }
}

/// A single label ready for the sink.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub model: String,
    /// Label stock name, e.g. "29x90".
    pub label: String,
    pub raster: MonoRaster,
    pub options: RasterOptions,
}

#[async_trait]
pub trait LabelSink: Send + Sync {
    async fn send(&self, job: &PrintJob) -> Result<(), PrinterError>;

    /// Human-readable destination, for logs.
    fn describe(&self) -> String;
}

/// Builds the sink named by `config.uri`.
pub fn build_sink(config: &PrinterConfig) -> Result<Arc<dyn LabelSink>, PrinterError> {
    let Some(uri) = config.uri.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(Arc::new(UnconfiguredSink));
    };

    if let Some(path) = uri.strip_prefix("file://") {
        if path.is_empty() {
            return Err(PrinterError::InvalidUri(uri.to_string()));
        }
        return Ok(Arc::new(DeviceSink {
            path: PathBuf::from(path),
            timeout: config.timeout,
        }));
    }

    if let Some(addr) = uri.strip_prefix("tcp://") {
        let valid = addr
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !valid {
            return Err(PrinterError::InvalidUri(uri.to_string()));
        }
        return Ok(Arc::new(NetworkSink {
            addr: addr.to_string(),
            timeout: config.timeout,
        }));
    }

    Err(PrinterError::InvalidUri(uri.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Sinks
// ────────────────────────────────────────────────────────────────────────────

/// Writes jobs to a local device node (e.g. `/dev/usb/lp0`) or spool file.
pub struct DeviceSink {
    path: PathBuf,
    timeout: Duration,
}

#[async_trait]
impl LabelSink for DeviceSink {
    async fn send(&self, job: &PrintJob) -> Result<(), PrinterError> {
        let write = async {
            let mut device = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            device.write_all(job.raster.as_bytes()).await?;
            device.flush().await?;
            Ok::<_, std::io::Error>(())
        };
        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| PrinterError::Timeout(self.timeout))??;

        info!(
            "Sent {} {} raster {}x{} ({} bytes) to {}",
            job.model,
            job.label,
            job.raster.width,
            job.raster.height,
            job.raster.as_bytes().len(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("device {}", self.path.display())
    }
}

/// Streams jobs to a network printer's raw port.
pub struct NetworkSink {
    addr: String,
    timeout: Duration,
}

#[async_trait]
impl LabelSink for NetworkSink {
    async fn send(&self, job: &PrintJob) -> Result<(), PrinterError> {
        let write = async {
            let mut stream = tokio::net::TcpStream::connect(&self.addr).await?;
            debug!(
                "Connected to {} at {} (cut={}, high_quality={}, compress={})",
                job.model, self.addr, job.options.cut, job.options.high_quality, job.options.compress
            );
            stream.write_all(job.raster.as_bytes()).await?;
            stream.shutdown().await?;
            Ok::<_, std::io::Error>(())
        };
        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| PrinterError::Timeout(self.timeout))??;

        info!("Sent {} label to {}", job.label, self.addr);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("tcp {}", self.addr)
    }
}

/// Used when no printer URI is configured; every job fails.
pub struct UnconfiguredSink;

#[async_trait]
impl LabelSink for UnconfiguredSink {
    async fn send(&self, _job: &PrintJob) -> Result<(), PrinterError> {
        Err(PrinterError::NotConfigured)
    }

    fn describe(&self) -> String {
        "no printer".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::to_mono_raster;
    use image::{GrayImage, Luma};

    fn make_config(uri: Option<&str>) -> PrinterConfig {
        PrinterConfig {
            model: "QL-810W".to_string(),
            uri: uri.map(str::to_string),
            timeout: Duration::from_secs(2),
        }
    }

    fn make_job() -> PrintJob {
        let mut image = GrayImage::from_pixel(16, 4, Luma([255]));
        image.put_pixel(0, 0, Luma([0]));
        let options = RasterOptions::default();
        PrintJob {
            model: "QL-810W".to_string(),
            label: "29x90".to_string(),
            raster: to_mono_raster(&image, &options),
            options,
        }
    }

    #[test]
    fn test_check_model() {
        assert!(make_config(None).check_model().is_ok());
        let mut config = make_config(None);
        config.model = "QL-9999".to_string();
        let err = config.check_model().unwrap_err();
        assert!(err.to_string().contains("QL-9999"));
        assert!(err.to_string().contains("QL-810W"));
    }

    #[test]
    fn test_build_sink_from_uri() {
        assert_eq!(build_sink(&make_config(None)).unwrap().describe(), "no printer");
        assert_eq!(build_sink(&make_config(Some("  "))).unwrap().describe(), "no printer");
        assert_eq!(
            build_sink(&make_config(Some("file:///dev/usb/lp0")))
                .unwrap()
                .describe(),
            "device /dev/usb/lp0"
        );
        assert_eq!(
            build_sink(&make_config(Some("tcp://192.168.1.20:9100")))
                .unwrap()
                .describe(),
            "tcp 192.168.1.20:9100"
        );
    }

    #[test]
    fn test_build_sink_rejects_bad_uris() {
        for uri in ["usb://0x04f9:0x209c", "tcp://printer", "tcp://:9100", "file://"] {
            assert!(
                matches!(
                    build_sink(&make_config(Some(uri))),
                    Err(PrinterError::InvalidUri(_))
                ),
                "{uri} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_device_sink_writes_raster_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lp0");
        let uri = format!("file://{}", path.display());
        let sink = build_sink(&make_config(Some(&uri))).unwrap();

        let job = make_job();
        sink.send(&job).await.unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, job.raster.as_bytes());
    }

    #[tokio::test]
    async fn test_unconfigured_sink_fails() {
        let err = UnconfiguredSink.send(&make_job()).await.unwrap_err();
        assert!(matches!(err, PrinterError::NotConfigured));
    }
}
