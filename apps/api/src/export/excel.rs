//! Spreadsheet export of the badge listing.

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

use super::ExportError;
use crate::models::badge::{BadgeEntry, BadgeSource};

const HEADERS: [&str; 7] = [
    "ID",
    "Prénom",
    "Nom",
    "Validé",
    "Date de création",
    "Dernière modification",
    "Source",
];
const COLUMN_WIDTHS: [f64; 7] = [8.0, 20.0, 20.0, 10.0, 20.0, 20.0, 12.0];

fn format_timestamp(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

pub fn create_excel_export(badges: &[BadgeEntry]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Badges")?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_font_size(12)
        .set_background_color(Color::RGB(0x366092))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let cell_format = Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, badge) in badges.iter().enumerate() {
        let row = i as u32 + 1;
        let source = match badge.source {
            BadgeSource::Local => "local",
            BadgeSource::External => "external",
        };
        sheet.write_number_with_format(row, 0, badge.id as f64, &cell_format)?;
        sheet.write_string_with_format(row, 1, badge.first_name.as_str(), &cell_format)?;
        sheet.write_string_with_format(row, 2, badge.last_name.as_str(), &cell_format)?;
        sheet.write_string_with_format(
            row,
            3,
            if badge.validated { "Oui" } else { "Non" },
            &cell_format,
        )?;
        sheet.write_string_with_format(row, 4, format_timestamp(badge.created_at), &cell_format)?;
        sheet.write_string_with_format(row, 5, format_timestamp(badge.updated_at), &cell_format)?;
        sheet.write_string_with_format(row, 6, source, &cell_format)?;
    }

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    Ok(workbook.save_to_buffer()?)
}
