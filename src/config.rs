//! Configuration types for statement extraction.
//!
//! All run behaviour is controlled through [`ExtractConfig`], built via its
//! [`ExtractConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across threads and diff two runs to understand
//! why their outputs differ. Notably the vision client is an explicit field
//! here, not ambient global state — tests inject a stub provider the same
//! way production injects a real one.

use crate::bank::Bank;
use crate::error::ExtractError;
use crate::progress::ProgressSink;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for one bank-statement extraction run.
///
/// Built via [`ExtractConfig::builder()`] or [`ExtractConfig::default()`].
///
/// # Example
/// ```rust
/// use stmt2xlsx::{Bank, ExtractConfig};
///
/// let config = ExtractConfig::builder()
///     .bank(Bank::KBank)
///     .min_amount(500_000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractConfig {
    /// Bank whose prompt template and default split factor apply. Default: [`Bank::Other`].
    pub bank: Bank,

    /// Minimum transaction amount kept in the export. Default: 0 (keep all).
    pub min_amount: u64,

    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 300.
    ///
    /// Statement scans carry small print; 300 DPI keeps 8 pt text legible to
    /// the model. The preprocessor caps the final pixel dimensions anyway,
    /// so a high DPI cannot blow up memory.
    pub dpi: u32,

    /// Maximum preprocessed image dimension (width or height) in pixels. Default: 2048.
    ///
    /// Images larger than this are downscaled proportionally before
    /// submission; images already smaller are never upsized.
    pub max_image_px: u32,

    /// Vertical split factor override. Default: None (use the bank's default).
    ///
    /// N > 1 divides every page into N overlapping bands, each submitted as
    /// its own model call. Useful for statements with very dense rows.
    pub split_factor: Option<u32>,

    /// Number of concurrent vision-model calls. Default: 3.
    ///
    /// Deliberately small: vision endpoints rate-limit aggressively, and
    /// three in-flight requests stays under the per-minute budget of the
    /// default tier while still overlapping most of the network latency.
    pub concurrency: usize,

    /// Total attempts per fragment on rate-limit errors. Default: 5.
    ///
    /// Only HTTP 429 responses are retried; any other failure is fatal on
    /// the first occurrence. 5 attempts with doubling backoff waits at most
    /// 1 + 2 + 4 + 8 = 15 s per fragment.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds (doubles per attempt). Default: 1000.
    pub retry_base_ms: u64,

    /// Sampling temperature for the model call. Default: 0.0.
    ///
    /// Extraction is transcription, not generation; zero temperature makes
    /// repeated runs over the same statement produce identical output.
    pub temperature: f32,

    /// Maximum tokens the model may generate per fragment. Default: 16 000.
    ///
    /// A dense statement page can carry over a hundred rows; truncating the
    /// JSON array mid-object silently loses every row after the cut.
    pub max_tokens: usize,

    /// Model identifier, e.g. "gpt-4o". If None, uses the provider default.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic"). If None along with
    /// `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed vision provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// How the bank-name column is populated in the export. Default: [`BankColumnLayout::Merged`].
    pub bank_column: BankColumnLayout,

    /// Progress sink invoked after each fragment completes. Default: None.
    pub progress: Option<ProgressSink>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            bank: Bank::default(),
            min_amount: 0,
            dpi: 300,
            max_image_px: 2048,
            split_factor: None,
            concurrency: 3,
            max_attempts: 5,
            retry_base_ms: 1000,
            temperature: 0.0,
            max_tokens: 16_000,
            model: None,
            provider_name: None,
            provider: None,
            password: None,
            bank_column: BankColumnLayout::default(),
            progress: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractConfig")
            .field("bank", &self.bank)
            .field("min_amount", &self.min_amount)
            .field("dpi", &self.dpi)
            .field("max_image_px", &self.max_image_px)
            .field("split_factor", &self.split_factor)
            .field("concurrency", &self.concurrency)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_ms", &self.retry_base_ms)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("bank_column", &self.bank_column)
            .finish()
    }
}

impl ExtractConfig {
    /// Create a new builder for `ExtractConfig`.
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }

    /// The split factor in effect: the explicit override, else the bank default.
    pub fn effective_split_factor(&self) -> u32 {
        self.split_factor
            .unwrap_or_else(|| self.bank.default_split_factor())
            .max(1)
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn bank(mut self, bank: Bank) -> Self {
        self.config.bank = bank;
        self
    }

    pub fn min_amount(mut self, amount: u64) -> Self {
        self.config.min_amount = amount;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_image_px(mut self, px: u32) -> Self {
        self.config.max_image_px = px.max(256);
        self
    }

    pub fn split_factor(mut self, n: u32) -> Self {
        self.config.split_factor = Some(n.max(1));
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_base_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_ms = ms;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn bank_column(mut self, layout: BankColumnLayout) -> Self {
        self.config.bank_column = layout;
        self
    }

    pub fn progress(mut self, sink: ProgressSink) -> Self {
        self.config.progress = Some(sink);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if let Some(n) = c.split_factor {
            if n == 0 || n > 8 {
                return Err(ExtractError::InvalidConfig(format!(
                    "Split factor must be 1–8, got {}",
                    n
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the bank-name column of the export is populated.
///
/// Both layouts circulate among downstream consumers of these exports, so
/// the choice is a policy knob rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BankColumnLayout {
    /// One cell merged over all data rows, vertically centered. (default)
    #[default]
    Merged,
    /// The bank label repeated on every data row.
    PerRow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ExtractConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.max_image_px, 2048);
        assert_eq!(c.concurrency, 3);
        assert_eq!(c.max_attempts, 5);
        assert_eq!(c.retry_base_ms, 1000);
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.bank_column, BankColumnLayout::Merged);
    }

    #[test]
    fn builder_clamps_out_of_range() {
        let c = ExtractConfig::builder()
            .dpi(1000)
            .concurrency(0)
            .split_factor(0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.effective_split_factor(), 1);
    }

    #[test]
    fn effective_split_prefers_override() {
        let c = ExtractConfig::builder().bank(Bank::KBank).build().unwrap();
        assert_eq!(c.effective_split_factor(), 3);

        let c = ExtractConfig::builder()
            .bank(Bank::KBank)
            .split_factor(2)
            .build()
            .unwrap();
        assert_eq!(c.effective_split_factor(), 2);
    }
}
