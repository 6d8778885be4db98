//! Error taxonomy for statement extraction.
//!
//! One enum covers every way a run can end without producing an export.
//! Failures the pipeline absorbs internally never surface here: a model
//! response with no parseable JSON contributes zero records for that page,
//! and a single entry failing type coercion is skipped. Both are logged
//! instead, because an export missing one garbled row is still useful to
//! the operator while a crashed run is not. Every variant below, by
//! contrast, aborts the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the extraction pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input ─────────────────────────────────────────────────────────────
    #[error("no such file: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: permission denied")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a usable path nor an HTTP(S) URL.
    #[error("invalid input {input:?}: expected a PDF path or an http(s) URL")]
    InvalidInput { input: String },

    #[error("download from {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("download from {url} timed out after {secs}s (raise --download-timeout for slow links)")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes exist but do not start with the `%PDF` magic. The leading
    /// bytes are included so an HTML error page is recognisable at a glance.
    #[error("{path} is not a PDF (starts with {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document ──────────────────────────────────────────────────────────
    #[error("cannot open {path}: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    #[error("{path} is encrypted; supply the password with --password")]
    PasswordRequired { path: PathBuf },

    #[error("wrong password for {path}")]
    WrongPassword { path: PathBuf },

    #[error("{path} has no pages")]
    EmptyDocument { path: PathBuf },

    #[error("rasterising page {page} failed: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Model ─────────────────────────────────────────────────────────────
    /// No usable vision provider. Carries a hint naming the environment
    /// variables that would fix it.
    #[error("vision provider {provider:?} is not configured\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A fragment's model call failed for a non-retryable reason or ran out
    /// of rate-limit retries.
    #[error("extraction failed on page fragment {fragment} after {attempts} attempt(s): {detail}")]
    PageFailed {
        fragment: usize,
        attempts: u32,
        detail: String,
    },

    // ── Output ────────────────────────────────────────────────────────────
    #[error("building the workbook failed: {detail}")]
    WorkbookFailed { detail: String },

    #[error("writing {path} failed: {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config / internal ─────────────────────────────────────────────────
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rust_xlsxwriter::XlsxError> for ExtractError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ExtractError::WorkbookFailed {
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_failed_names_fragment_and_attempts() {
        let e = ExtractError::PageFailed {
            fragment: 4,
            attempts: 5,
            detail: "HTTP 429 rate limit".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("fragment 4"), "got: {msg}");
        assert!(msg.contains("5 attempt(s)"), "got: {msg}");
    }

    #[test]
    fn not_a_pdf_shows_leading_bytes() {
        let e = ExtractError::NotAPdf {
            path: PathBuf::from("scan.pdf"),
            magic: *b"<!DO",
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.pdf"), "got: {msg}");
        assert!(msg.contains("60"), "got: {msg}"); // b'<'
    }
}
