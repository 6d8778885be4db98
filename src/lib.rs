//! # stmt2xlsx
//!
//! Extract transaction records from scanned bank-statement PDFs using
//! Vision Language Models, filter them by amount, and export the result as
//! a styled XLSX workbook.
//!
//! ## Why this crate?
//!
//! Statement PDFs issued by banks are scans — there is no text layer to
//! parse and no machine-readable export to request after the fact.
//! Traditional OCR garbles dense tabular layouts and mixes up the deposit
//! and withdrawal columns. Instead this crate rasterises each page,
//! enhances the scan, and lets a vision model read it as a clerk would,
//! answering with structured JSON that is normalized, deduplicated, and
//! rendered into the fixed spreadsheet shape downstream paperwork expects.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       resolve local file or download from URL
//!  ├─ 2. Render      rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Preprocess  contrast/brightness/sharpen, cap size, split bands
//!  ├─ 4. Encode      PNG → base64 ImageData
//!  ├─ 5. Vision      3 concurrent model calls, retry-on-429 with backoff
//!  ├─ 6. Normalize   typed records, chronological order, dedupe
//!  ├─ 7. Filter      keep amounts at or above the threshold
//!  └─ 8. Export      styled single-sheet XLSX as an in-memory buffer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stmt2xlsx::{extract, Bank, ExtractConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractConfig::builder()
//!         .bank(Bank::KBank)
//!         .min_amount(500_000)
//!         .build()?;
//!     let output = extract("statement.pdf", &config).await?;
//!     std::fs::write(&output.filename, &output.workbook)?;
//!     println!(
//!         "{} of {} records exported",
//!         output.stats.kept_records, output.stats.extracted_records
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `stmt2xlsx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! stmt2xlsx = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bank;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bank::{Bank, ALL_BANKS};
pub use config::{BankColumnLayout, ExtractConfig, ExtractConfigBuilder};
pub use error::ExtractError;
pub use extract::{extract, extract_from_bytes, extract_to_file};
pub use model::{
    export_filename, format_amount, Direction, ExtractOutput, ExtractStats, RawTransaction,
    TransactionRecord,
};
pub use progress::{ExtractProgress, NoopProgress, ProgressSink};
