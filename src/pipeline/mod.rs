//! Pipeline stages for statement extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping the
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different rendering backend) without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ preprocess ──▶ encode ──▶ vision ──▶ normalize ──▶ xlsx
//! (path/URL) (pdfium)  (enhance/split) (base64)  (VLM+retry) (sort/dedupe)  (export)
//! ```
//!
//! 1. [`input`]      — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]     — rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`preprocess`] — enhance scan quality and optionally split pages into
//!    overlapping vertical bands
//! 4. [`encode`]     — PNG-encode and base64-wrap each fragment for the
//!    multimodal request body
//! 5. [`vision`]     — drive the model call with retry/backoff; the only
//!    stage with network I/O
//! 6. [`parse`]      — pull the JSON transaction array out of fenced model text
//! 7. [`normalize`]  — typed records, chronological order, dedupe, amount filter
//! 8. [`xlsx`]       — render the styled single-sheet workbook

pub mod encode;
pub mod input;
pub mod normalize;
pub mod parse;
pub mod preprocess;
pub mod render;
pub mod vision;
pub mod xlsx;
