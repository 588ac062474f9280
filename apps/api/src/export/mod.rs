pub mod excel;
pub mod font_metrics;
pub mod pdf;
pub mod qr;

use thiserror::Error;

pub use excel::create_excel_export;
pub use pdf::{badge_pdf_filename, create_badge_pdf, BadgePdfData};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("QR encoding failed: {0}")]
    Qr(String),

    #[error("Spreadsheet generation failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}
