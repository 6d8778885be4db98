//! Fenced-JSON extraction: pull the transaction array out of model text.
//!
//! ## Why is this necessary?
//!
//! Even when prompted to answer with a bare JSON array, vision models
//! routinely wrap their output in ` ```json … ``` ` fences, preface it with
//! a sentence of commentary, or append a trailing remark. This module
//! applies a deterministic strip-and-locate pass rather than fighting the
//! model through prompt engineering:
//!
//! 1. remove code-fence markers;
//! 2. locate the first `[` … last `]` bracketed span;
//! 3. parse that span as JSON, taking each array element independently.
//!
//! Every failure mode degrades to an *empty* result, never an error: a page
//! whose response cannot be parsed contributes zero records, and a single
//! malformed array element is dropped without affecting its siblings.
//! Partial data beats an aborted run.

use crate::model::RawTransaction;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?").unwrap());
static RE_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// Extract the JSON transaction array from a raw model response.
///
/// Returns an empty vector when no array is found or the span does not
/// parse; individual elements that are not transaction objects are skipped.
pub fn extract_json_array(text: &str) -> Vec<RawTransaction> {
    let stripped = RE_FENCE.replace_all(text, "");
    let stripped = stripped.trim();

    let Some(span) = RE_ARRAY.find(stripped) else {
        warn!("No JSON array in model response: {}", preview(stripped));
        return Vec::new();
    };

    let value: serde_json::Value = match serde_json::from_str(span.as_str()) {
        Ok(v) => v,
        Err(e) => {
            warn!("JSON parse failed ({}): {}", e, preview(span.as_str()));
            return Vec::new();
        }
    };

    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!("Skipping malformed transaction entry ({}): {}", e, item);
                None
            }
        })
        .collect()
}

/// First 500 bytes of a response, for log lines.
fn preview(text: &str) -> &str {
    let mut end = text.len().min(500);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
