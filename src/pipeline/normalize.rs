//! Normalization: raw model entries → ordered, deduplicated records.
//!
//! The model returns loosely-typed entries per page fragment; this stage
//! turns the full batch into the final record sequence:
//!
//! 1. type coercion — entries missing a parseable amount, date, or
//!    direction are skipped and logged, never fatal;
//! 2. chronological sort on the parsed timestamp, stable so ties keep
//!    their page order;
//! 3. dedupe on `(raw date string, direction, amount)`, keeping the first
//!    occurrence — overlapping split bands show the same row to two model
//!    calls, and this is where the duplicate dies.
//!
//! Timestamps that match neither accepted format sort with a minimum
//! sentinel: malformed-date records cluster at the front of the export
//! instead of crashing the sort or being dropped.

use crate::model::{Direction, RawTransaction, TransactionRecord};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use tracing::{debug, warn};

const FORMAT_DATETIME: &str = "%Y-%m-%d %H:%M:%S";
const FORMAT_DATE: &str = "%Y-%m-%d";

/// Convert per-fragment raw entries (in fragment order) into the final
/// ordered, deduplicated record list.
pub fn normalize(fragments: Vec<Vec<RawTransaction>>, bank_label: &str) -> Vec<TransactionRecord> {
    let mut records: Vec<TransactionRecord> = fragments
        .into_iter()
        .flatten()
        .filter_map(|raw| coerce(raw, bank_label))
        .collect();

    records.sort_by_cached_key(|r| parse_timestamp(&r.date));

    let mut seen: HashSet<(String, Direction, u64)> = HashSet::with_capacity(records.len());
    records.retain(|r| seen.insert((r.date.clone(), r.direction, r.amount)));

    debug!("Normalized {} records for {}", records.len(), bank_label);
    records
}

/// Retain records with `amount >= min_amount`, preserving order.
pub fn filter_by_amount(
    records: Vec<TransactionRecord>,
    min_amount: u64,
) -> Vec<TransactionRecord> {
    records
        .into_iter()
        .filter(|r| r.amount >= min_amount)
        .collect()
}

/// Coerce one raw entry into a typed record, or skip it.
fn coerce(raw: RawTransaction, bank_label: &str) -> Option<TransactionRecord> {
    let Some(direction) = Direction::parse_label(&raw.direction) else {
        warn!("Skipping entry with unknown direction {:?}", raw.direction);
        return None;
    };
    let Some(amount) = coerce_amount(&raw.amount) else {
        warn!("Skipping entry with unparseable amount {}", raw.amount);
        return None;
    };
    if raw.date.trim().is_empty() {
        warn!("Skipping entry with empty date");
        return None;
    }
    Some(TransactionRecord {
        bank_label: bank_label.to_string(),
        date: raw.date.trim().to_string(),
        direction,
        amount,
        reason: raw.reason.trim().to_string(),
    })
}

/// Coerce a number-like JSON value to a non-negative integer amount.
///
/// Accepts bare integers, integral floats, and strings with optional
/// thousands separators or a trailing 원 suffix.
fn coerce_amount(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
            n.as_f64().and_then(|f| {
                if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
                    Some(f as u64)
                } else {
                    None
                }
            })
        }
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_end_matches('원')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

/// Parse a record timestamp, falling back to the minimum sentinel so
/// malformed dates sort first instead of failing.
fn parse_timestamp(date: &str) -> NaiveDateTime {
    if let Ok(dt) = NaiveDateTime::parse_from_str(date, FORMAT_DATETIME) {
        return dt;
    }
    if let Ok(d) = NaiveDate::parse_from_str(date, FORMAT_DATE) {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return dt;
        }
    }
    NaiveDateTime::MIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(date: &str, direction: &str, amount: serde_json::Value, reason: &str) -> RawTransaction {
        serde_json::from_value(json!({
            "date": date, "type": direction, "amount": amount, "reason": reason,
        }))
        .unwrap()
    }

    #[test]
    fn amounts_coerce_from_common_shapes() {
        assert_eq!(coerce_amount(&json!(600000)), Some(600_000));
        assert_eq!(coerce_amount(&json!(600000.0)), Some(600_000));
        assert_eq!(coerce_amount(&json!("600000")), Some(600_000));
        assert_eq!(coerce_amount(&json!("600,000")), Some(600_000));
        assert_eq!(coerce_amount(&json!("600,000원")), Some(600_000));
        assert_eq!(coerce_amount(&json!(-5)), None);
        assert_eq!(coerce_amount(&json!("five")), None);
        assert_eq!(coerce_amount(&json!(null)), None);
        assert_eq!(coerce_amount(&json!(12.5)), None);
    }

    #[test]
    fn timestamps_parse_both_formats() {
        assert_eq!(
            parse_timestamp("2024-01-05 10:00:00"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
        assert_eq!(
            parse_timestamp("2024-01-05"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(parse_timestamp("05/01/2024"), NaiveDateTime::MIN);
        assert_eq!(parse_timestamp(""), NaiveDateTime::MIN);
    }

    #[test]
    fn output_is_time_ordered() {
        let fragments = vec![vec![
            raw("2024-03-01", "입금", json!(3), "c"),
            raw("2024-01-01", "출금", json!(1), "a"),
            raw("2024-02-01 09:30:00", "입금", json!(2), "b"),
        ]];
        let records = normalize(fragments, "기타");
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, ["2024-01-01", "2024-02-01 09:30:00", "2024-03-01"]);
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let fragments = vec![vec![
            raw("2024-01-01", "입금", json!(100), "first"),
            raw("2024-01-01", "입금", json!(200), "second"),
            raw("2024-01-01", "입금", json!(300), "third"),
        ]];
        let reasons: Vec<String> = normalize(fragments, "기타")
            .into_iter()
            .map(|r| r.reason)
            .collect();
        assert_eq!(reasons, ["first", "second", "third"]);
    }

    #[test]
    fn overlap_duplicates_are_removed() {
        // The same row seen by two adjacent split bands.
        let fragments = vec![
            vec![raw("2024-02-01", "출금", json!(100000), "rent")],
            vec![raw("2024-02-01", "출금", json!(100000), "rent")],
        ];
        let records = normalize(fragments, "케이뱅크");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn dedupe_key_excludes_reason() {
        // Same (date, direction, amount) with differing reason text still
        // counts as the same transaction; the first survives.
        let fragments = vec![vec![
            raw("2024-02-01", "출금", json!(100000), "rent"),
            raw("2024-02-01", "출금", json!(100000), "rent payment"),
        ]];
        let records = normalize(fragments, "기타");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reason, "rent");
    }

    #[test]
    fn same_amount_different_direction_both_kept() {
        let fragments = vec![vec![
            raw("2024-02-01", "입금", json!(100000), "in"),
            raw("2024-02-01", "출금", json!(100000), "out"),
        ]];
        assert_eq!(normalize(fragments, "기타").len(), 2);
    }

    #[test]
    fn malformed_entries_are_skipped_silently() {
        let fragments = vec![vec![
            raw("2024-01-01", "입금", json!(100), "good"),
            raw("2024-01-02", "transfer", json!(100), "bad direction"),
            raw("2024-01-03", "출금", json!("no"), "bad amount"),
            raw("", "입금", json!(100), "no date"),
        ]];
        let records = normalize(fragments, "기타");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reason, "good");
    }

    #[test]
    fn malformed_dates_sort_first() {
        let fragments = vec![vec![
            raw("2024-01-01", "입금", json!(1), "dated"),
            raw("garbled", "입금", json!(2), "undated"),
        ]];
        let records = normalize(fragments, "기타");
        assert_eq!(records[0].reason, "undated");
    }

    #[test]
    fn filter_keeps_threshold_and_above() {
        let fragments = vec![vec![
            raw("2024-01-01", "입금", json!(499_999), "below"),
            raw("2024-01-02", "입금", json!(500_000), "at"),
            raw("2024-01-03", "입금", json!(500_001), "above"),
        ]];
        let records = normalize(fragments, "기타");
        let kept = filter_by_amount(records, 500_000);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].reason, "at");
    }

    #[test]
    fn filter_is_idempotent() {
        let fragments = vec![vec![
            raw("2024-01-01", "입금", json!(700_000), "a"),
            raw("2024-01-02", "출금", json!(300_000), "b"),
        ]];
        let records = normalize(fragments, "기타");
        let once = filter_by_amount(records, 500_000);
        let twice = filter_by_amount(once.clone(), 500_000);
        assert_eq!(once, twice);
    }
}
