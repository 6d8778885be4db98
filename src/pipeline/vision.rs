//! Vision-model interaction: one extraction call per page fragment.
//!
//! This module converts a preprocessed fragment image into a model API call
//! and returns the raw transaction entries found on it. It is intentionally
//! thin — all prompt engineering lives in [`crate::bank`] so it can be tuned
//! per bank without touching retry or error-handling logic here.
//!
//! ## Retry Strategy
//!
//! Only HTTP 429 rate-limit responses are retried: they are the one failure
//! the caller can fix by waiting. The backoff doubles per attempt
//! (`retry_base_ms · 2^(attempt−1)`), giving 1 s → 2 s → 4 s → 8 s with the
//! defaults — enough to drain a per-minute rate window without stalling the
//! run for long. Every other error is fatal on first sight: a bad API key
//! or a 400 will not improve on retry, and silently skipping the fragment
//! would produce an export with missing transactions.

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::model::RawTransaction;
use crate::pipeline::parse;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Extract the raw transaction entries from one fragment image.
///
/// The request contains (in order):
/// 1. **System message** — the bank-specific extraction prompt
/// 2. **User message** — the fragment PNG as a base64 image attachment
///    (empty text; vision APIs require a user turn, the image carries the
///    actual content)
///
/// Returns the parsed entries, which may legitimately be empty — either the
/// page has no transactions or the response could not be parsed. A fatal
/// model failure (after retries) returns `Err` and aborts the batch.
pub async fn extract_fragment(
    provider: &Arc<dyn LLMProvider>,
    fragment_idx: usize,
    image: ImageData,
    config: &ExtractConfig,
) -> Result<Vec<RawTransaction>, ExtractError> {
    let messages = vec![
        ChatMessage::system(config.bank.prompt()),
        ChatMessage::user_with_images("", vec![image]),
    ];

    let options = CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    };

    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            let backoff = config.retry_base_ms * 2u64.pow(attempt - 2);
            warn!(
                "Fragment {}: rate-limited, retry {}/{} after {}ms",
                fragment_idx + 1,
                attempt,
                config.max_attempts,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                let entries = parse::extract_json_array(&response.content);
                debug!(
                    "Fragment {}: {} entries ({} in / {} out tokens)",
                    fragment_idx + 1,
                    entries.len(),
                    response.prompt_tokens,
                    response.completion_tokens
                );
                return Ok(entries);
            }
            Err(e) => {
                let detail = e.to_string();
                if is_rate_limit(&detail) && attempt < config.max_attempts {
                    continue;
                }
                return Err(ExtractError::PageFailed {
                    fragment: fragment_idx + 1,
                    attempts: attempt,
                    detail,
                });
            }
        }
    }

    Err(ExtractError::Internal(format!(
        "Fragment {} fell through the retry loop",
        fragment_idx + 1
    )))
}

/// Classify an error message as a retryable rate-limit failure.
///
/// Providers surface 429s with inconsistent wording; matching on the status
/// code plus the common phrasings covers the ones seen in practice.
fn is_rate_limit(detail: &str) -> bool {
    if detail.contains("429") {
        return true;
    }
    let lower = detail.to_ascii_lowercase();
    lower.contains("rate limit") || lower.contains("rate_limit") || lower.contains("too many requests")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_detection() {
        assert!(is_rate_limit("HTTP 429 Too Many Requests"));
        assert!(is_rate_limit("Rate limit exceeded, retry later"));
        assert!(is_rate_limit("rate_limit_exceeded"));
        assert!(!is_rate_limit("HTTP 401 Unauthorized"));
        assert!(!is_rate_limit("connection reset by peer"));
    }

    #[test]
    fn options_carry_deterministic_sampling() {
        let config = ExtractConfig::default();
        let options = CompletionOptions {
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
            ..Default::default()
        };
        assert_eq!(options.temperature, Some(0.0));
        assert_eq!(options.max_tokens, Some(16_000));
    }
}
