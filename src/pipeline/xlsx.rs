//! Spreadsheet rendering: records → a styled single-sheet XLSX in memory.
//!
//! The layout is fixed by the downstream consumers of these exports
//! (case-filing paperwork built on them expects exactly this shape):
//! a five-column header, bank name first, deposit and withdraw dates in
//! separate columns, a thousands-formatted amount, and the free-text
//! reason last. The amount column stays numeric with a native `#,##0`
//! number format so spreadsheet software can still sum it.
//!
//! The workbook is produced as an in-memory byte buffer — the pipeline
//! owns no files; the caller decides whether bytes go to disk, an HTTP
//! response, or a download widget.

use crate::config::BankColumnLayout;
use crate::error::ExtractError;
use crate::model::TransactionRecord;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use tracing::debug;

/// Column headers, in export order.
const HEADERS: [&str; 5] = ["거래은행", "입금일", "출금일", "금액", "거래사유"];
/// Column widths matching the headers.
const COLUMN_WIDTHS: [f64; 5] = [15.0, 18.0, 18.0, 18.0, 45.0];
/// Header fill color.
const HEADER_FILL: u32 = 0x2F4F8F;
/// XLSX limit on sheet-name length.
const MAX_SHEET_NAME_CHARS: usize = 31;

const HEADER_ROW_HEIGHT: f64 = 30.0;
const DATA_ROW_HEIGHT: f64 = 20.0;

/// Render the record list into a complete XLSX file.
///
/// An empty record list still produces a valid, header-only workbook.
pub fn render_workbook(
    records: &[TransactionRecord],
    bank_label: &str,
    layout: BankColumnLayout,
) -> Result<Vec<u8>, ExtractError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name(bank_label))?;

    // ── Styles ───────────────────────────────────────────────────────────
    let header_format = Format::new()
        .set_bold()
        .set_font_size(11)
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);

    let center = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let left = Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let amount = Format::new()
        .set_num_format("#,##0")
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    // ── Header row ───────────────────────────────────────────────────────
    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &header_format)?;
        sheet.set_column_width(col, width)?;
    }
    sheet.set_row_height(0, HEADER_ROW_HEIGHT)?;

    // ── Data rows ────────────────────────────────────────────────────────
    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        if layout == BankColumnLayout::PerRow {
            sheet.write_string_with_format(row, 0, bank_label, &center)?;
        }
        sheet.write_string_with_format(row, 1, record.deposit_date(), &center)?;
        sheet.write_string_with_format(row, 2, record.withdraw_date(), &center)?;
        sheet.write_number_with_format(row, 3, record.amount as f64, &amount)?;
        sheet.write_string_with_format(row, 4, record.reason.as_str(), &left)?;
        sheet.set_row_height(row, DATA_ROW_HEIGHT)?;
    }

    // ── Bank column, merged variant ──────────────────────────────────────
    if layout == BankColumnLayout::Merged {
        match records.len() {
            0 => {}
            1 => {
                sheet.write_string_with_format(1, 0, bank_label, &center)?;
            }
            n => {
                sheet.merge_range(1, 0, n as u32, 0, bank_label, &center)?;
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(
        "Rendered workbook: {} rows, {} bytes",
        records.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Sheet title: the bank label truncated to the XLSX 31-character limit.
fn sheet_name(bank_label: &str) -> String {
    bank_label.chars().take(MAX_SHEET_NAME_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    fn record(date: &str, direction: Direction, amount: u64, reason: &str) -> TransactionRecord {
        TransactionRecord {
            bank_label: "케이뱅크".into(),
            date: date.into(),
            direction,
            amount,
            reason: reason.into(),
        }
    }

    #[test]
    fn sheet_name_truncates_to_limit() {
        assert_eq!(sheet_name("케이뱅크"), "케이뱅크");
        let long = "은".repeat(40);
        assert_eq!(sheet_name(&long).chars().count(), 31);
    }

    #[test]
    fn renders_rows_to_valid_zip_bytes() {
        let records = vec![
            record("2024-01-05 10:00:00", Direction::Deposit, 600_000, "salary"),
            record("2024-01-20", Direction::Withdrawal, 550_000, "rent"),
        ];
        let bytes = render_workbook(&records, "케이뱅크", BankColumnLayout::Merged).unwrap();
        // XLSX is a zip container; PK magic is the cheapest validity check
        // that doesn't pull in a reader dependency.
        assert_eq!(&bytes[..2], b"PK");
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn header_only_workbook_is_valid() {
        let bytes = render_workbook(&[], "기타", BankColumnLayout::Merged).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn single_row_merged_layout_does_not_merge() {
        // merge_range rejects a single-cell range; one data row must take
        // the plain-write path.
        let records = vec![record("2024-01-05", Direction::Deposit, 1_000_000, "x")];
        let bytes = render_workbook(&records, "신한은행", BankColumnLayout::Merged).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn per_row_layout_renders() {
        let records = vec![
            record("2024-01-05", Direction::Deposit, 1, "a"),
            record("2024-01-06", Direction::Withdrawal, 2, "b"),
        ];
        let bytes = render_workbook(&records, "우리은행", BankColumnLayout::PerRow).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn long_bank_label_still_renders() {
        let label = "은".repeat(40);
        let bytes = render_workbook(&[], &label, BankColumnLayout::Merged).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
