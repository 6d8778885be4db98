//! Top-level extraction entry points.
//!
//! One call runs the whole pipeline: resolve input, rasterise, preprocess,
//! fan page fragments out to the vision model, normalize, filter, and render
//! the XLSX workbook. Everything a run needs — bank, threshold, provider —
//! arrives through [`ExtractConfig`]; there is no ambient client state.
//!
//! ## Failure policy
//!
//! The run aborts on the first unrecoverable fragment failure and returns
//! no export. A statement export silently missing pages is worse than a
//! clean error for the operator to act on; failures the pipeline *can*
//! safely absorb (an unparseable response, one garbled row) are absorbed at
//! the smallest scope inside the stages and logged.

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::model::{export_filename, ExtractOutput, ExtractStats, RawTransaction};
use crate::pipeline::{encode, input, normalize, preprocess, render, vision, xlsx};
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extract transactions from a PDF file or URL and render the export.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to a statement PDF
/// * `config`    — Run configuration
///
/// # Errors
/// Returns `Err(ExtractError)` for fatal errors only: bad input, missing
/// credentials, or an unrecoverable model failure on any page. Pages whose
/// responses cannot be parsed contribute zero records without failing the
/// run.
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractConfig,
) -> Result<ExtractOutput, ExtractError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {} ({})", input_str, config.bank);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Resolve provider (fail before any rendering work) ────────
    let provider = resolve_provider(config)?;

    // ── Step 3: Rasterise pages ──────────────────────────────────────────
    let render_start = Instant::now();
    let pages = render::render_pages(&pdf_path, config).await?;
    let total_pages = pages.len();

    // ── Step 4: Preprocess into fragments ────────────────────────────────
    let split = config.effective_split_factor();
    let max_px = config.max_image_px;
    let fragments: Vec<DynamicImage> = tokio::task::spawn_blocking(move || {
        pages
            .iter()
            .flat_map(|page| preprocess::preprocess_page(page, split, max_px))
            .collect()
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Preprocess task panicked: {}", e)))?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages into {} fragments in {}ms (split factor {})",
        total_pages,
        fragments.len(),
        render_duration_ms,
        split
    );

    // ── Step 5: Encode fragments ─────────────────────────────────────────
    let encoded: Vec<ImageData> = fragments
        .iter()
        .map(encode::encode_fragment)
        .collect::<Result<_, _>>()?;

    // ── Step 6: Fan out to the vision model ──────────────────────────────
    let model_start = Instant::now();
    let raw_fragments = run_batch(&provider, encoded, config).await?;
    let model_duration_ms = model_start.elapsed().as_millis() as u64;

    // ── Step 7: Normalize, filter ────────────────────────────────────────
    let bank_label = config.bank.label();
    let records = normalize::normalize(raw_fragments, bank_label);
    let extracted_records = records.len();
    let kept = normalize::filter_by_amount(records, config.min_amount);
    info!(
        "Extracted {} records, {} at or above {}",
        extracted_records,
        kept.len(),
        config.min_amount
    );

    // ── Step 8: Render the workbook ──────────────────────────────────────
    let workbook = xlsx::render_workbook(&kept, bank_label, config.bank_column)?;

    let stats = ExtractStats {
        total_pages,
        fragments: fragments.len(),
        extracted_records,
        kept_records: kept.len(),
        render_duration_ms,
        model_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Extraction complete: {} rows exported in {}ms",
        stats.kept_records, stats.total_duration_ms
    );

    Ok(ExtractOutput {
        transactions: kept,
        workbook,
        filename: export_filename(bank_label, config.min_amount),
        stats,
    })
}

/// Extract from raw PDF bytes in memory.
///
/// pdfium needs a file-system path, so the bytes go into a managed
/// [`tempfile`] that is cleaned up automatically on return or panic. This
/// is the API to use when the PDF arrives from an upload or a database
/// rather than a file on disk.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractConfig,
) -> Result<ExtractOutput, ExtractError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `extract` returns
    extract(&path, config).await
}

/// Extract and write the XLSX directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial exports.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<ExtractOutput, ExtractError> {
    let output = extract(input_str, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ExtractError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }
    }

    let tmp_path = path.with_extension("xlsx.tmp");
    tokio::fs::write(&tmp_path, &output.workbook)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Fan the encoded fragments out across the bounded worker pool and collect
/// results back into fragment order.
///
/// Completion order across workers is unconstrained; each result lands in a
/// slot indexed by its fragment number, so assembled output order is always
/// input order. Completions are observed on this single task, which is also
/// the only place the progress sink and completion counter are touched.
/// The first fatal fragment error propagates immediately and abandons the
/// remaining work.
async fn run_batch(
    provider: &Arc<dyn LLMProvider>,
    encoded: Vec<ImageData>,
    config: &ExtractConfig,
) -> Result<Vec<Vec<RawTransaction>>, ExtractError> {
    let total = encoded.len();
    if let Some(ref sink) = config.progress {
        sink.on_start(total);
    }

    let mut results = stream::iter(encoded.into_iter().enumerate().map(|(idx, image)| {
        let provider = Arc::clone(provider);
        let cfg = config.clone();
        async move {
            let entries = vision::extract_fragment(&provider, idx, image, &cfg).await?;
            Ok::<_, ExtractError>((idx, entries))
        }
    }))
    .buffer_unordered(config.concurrency);

    let mut slots: Vec<Option<Vec<RawTransaction>>> = (0..total).map(|_| None).collect();
    let mut completed = 0usize;

    while let Some(result) = results.next().await {
        let (idx, entries) = result?;
        debug!("Fragment {}/{} complete: {} entries", idx + 1, total, entries.len());
        slots[idx] = Some(entries);
        completed += 1;
        if let Some(ref sink) = config.progress {
            sink.on_fragment_done(completed, total);
        }
    }

    if let Some(ref sink) = config.progress {
        sink.on_finish(total);
    }

    Ok(slots.into_iter().map(Option::unwrap_or_default).collect())
}

/// Resolve the vision provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    and configured the provider entirely; used as-is. This is also the
///    test seam: tests inject a scripted stub here.
///
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    corresponding API key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** (`STMT2XLSX_LLM_PROVIDER` + `STMT2XLSX_MODEL`) —
///    a provider and model chosen at the execution-environment level
///    (Makefile, shell script, CI), honoured before full auto-detection.
///
/// 4. **Full auto-detection** — prefer OpenAI when `OPENAI_API_KEY` is set,
///    otherwise scan all known key variables and take the first provider
///    available.
fn resolve_provider(config: &ExtractConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("STMT2XLSX_LLM_PROVIDER"),
        std::env::var("STMT2XLSX_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Default model when the caller names a provider without a model.
const DEFAULT_MODEL: &str = "gpt-4o";

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
