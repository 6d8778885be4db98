//! Core data types: transaction records, run statistics, output bundle.
//!
//! [`RawTransaction`] is the loosely-typed wire shape the vision model
//! returns inside its JSON array — every field optional, the amount
//! "number-like" (bare integer, float, or a string with thousands
//! separators). [`TransactionRecord`] is the strict, immutable form produced
//! by the normalizer; everything downstream (filter, renderer) works on it.
//! Keeping the two shapes separate means a malformed model response can
//! never leak half-parsed data into the export.

use serde::{Deserialize, Serialize};

/// Direction of a transaction: money in or money out.
///
/// The vision model labels directions in the statement's own language
/// (입금/출금 for Korean statements); [`Direction::parse_label`] accepts
/// those plus English synonyms so a model that answers in English still
/// produces usable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Deposit,
    Withdrawal,
}

impl Direction {
    /// Parse a model-supplied direction label. Returns `None` for anything
    /// unrecognised; the normalizer skips such records rather than guessing.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "입금" => Some(Direction::Deposit),
            "출금" => Some(Direction::Withdrawal),
            other => match other.to_ascii_lowercase().as_str() {
                "deposit" | "credit" => Some(Direction::Deposit),
                "withdrawal" | "withdraw" | "debit" => Some(Direction::Withdrawal),
                _ => None,
            },
        }
    }

    /// The label used in exported documents (Korean, matching the
    /// statement vocabulary the product ships for).
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Deposit => "입금",
            Direction::Withdrawal => "출금",
        }
    }
}

/// One transaction object as found in the model's JSON array.
///
/// All fields default so a partially-filled object still deserialises;
/// the normalizer decides what is salvageable.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub date: String,
    #[serde(default, rename = "type")]
    pub direction: String,
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub reason: String,
}

/// A normalized, immutable transaction record.
///
/// Created only by the normalizer; sorted chronologically and deduplicated
/// on `(date, direction, amount)` before any caller sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    /// Label of the issuing bank, stamped onto every record of a run.
    pub bank_label: String,
    /// Raw timestamp string as extracted: `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
    pub date: String,
    pub direction: Direction,
    /// Transaction amount in whole currency units (KRW has no sub-unit).
    pub amount: u64,
    /// Free-text transaction description from the statement.
    pub reason: String,
}

impl TransactionRecord {
    /// Date portion of the timestamp (`YYYY-MM-DD`).
    fn date_part(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }

    /// The deposit-date column value: the date for deposits, empty otherwise.
    pub fn deposit_date(&self) -> &str {
        match self.direction {
            Direction::Deposit => self.date_part(),
            Direction::Withdrawal => "",
        }
    }

    /// The withdraw-date column value: the date for withdrawals, empty otherwise.
    pub fn withdraw_date(&self) -> &str {
        match self.direction {
            Direction::Withdrawal => self.date_part(),
            Direction::Deposit => "",
        }
    }
}

/// Timing and volume statistics for one extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractStats {
    /// Pages in the source PDF.
    pub total_pages: usize,
    /// Image fragments submitted to the model (pages × split factor).
    pub fragments: usize,
    /// Records after normalization, before the amount filter.
    pub extracted_records: usize,
    /// Records surviving the amount filter (rows in the export).
    pub kept_records: usize,
    pub render_duration_ms: u64,
    pub model_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a caller gets back from one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOutput {
    /// Filtered, time-ordered, deduplicated records (the export rows).
    pub transactions: Vec<TransactionRecord>,
    /// The complete XLSX file, ready to write or transfer.
    pub workbook: Vec<u8>,
    /// Deterministic download name derived from bank label and threshold.
    pub filename: String,
    pub stats: ExtractStats,
}

/// Deterministic export filename: bank label plus the threshold expressed
/// in 만원 (10 000 KRW units), the way the original product named downloads.
pub fn export_filename(bank_label: &str, min_amount: u64) -> String {
    format!("{}_거래내역_{}만원이상.xlsx", bank_label, min_amount / 10_000)
}

/// Format an amount with thousands separators, e.g. `600000` → `"600,000"`.
///
/// Used for terminal summaries; the spreadsheet itself uses a native
/// `#,##0` number format so the cell stays numeric.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_labels() {
        assert_eq!(Direction::parse_label("입금"), Some(Direction::Deposit));
        assert_eq!(Direction::parse_label("출금"), Some(Direction::Withdrawal));
        assert_eq!(Direction::parse_label("Deposit"), Some(Direction::Deposit));
        assert_eq!(Direction::parse_label(" withdrawal "), Some(Direction::Withdrawal));
        assert_eq!(Direction::parse_label("transfer"), None);
        assert_eq!(Direction::parse_label(""), None);
    }

    #[test]
    fn derived_dates() {
        let deposit = TransactionRecord {
            bank_label: "케이뱅크".into(),
            date: "2024-01-05 10:00:00".into(),
            direction: Direction::Deposit,
            amount: 600_000,
            reason: "salary".into(),
        };
        assert_eq!(deposit.deposit_date(), "2024-01-05");
        assert_eq!(deposit.withdraw_date(), "");

        let withdrawal = TransactionRecord {
            direction: Direction::Withdrawal,
            date: "2024-02-01".into(),
            ..deposit
        };
        assert_eq!(withdrawal.deposit_date(), "");
        assert_eq!(withdrawal.withdraw_date(), "2024-02-01");
    }

    #[test]
    fn filename_is_deterministic() {
        assert_eq!(
            export_filename("케이뱅크", 500_000),
            "케이뱅크_거래내역_50만원이상.xlsx"
        );
        assert_eq!(export_filename("기타", 0), "기타_거래내역_0만원이상.xlsx");
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1_000), "1,000");
        assert_eq!(format_amount(600_000), "600,000");
        assert_eq!(format_amount(1_234_567_890), "1,234,567,890");
    }

    #[test]
    fn raw_transaction_tolerates_missing_fields() {
        let raw: RawTransaction = serde_json::from_str(r#"{"date":"2024-01-01"}"#).unwrap();
        assert_eq!(raw.date, "2024-01-01");
        assert!(raw.direction.is_empty());
        assert!(raw.amount.is_null());
    }
}
