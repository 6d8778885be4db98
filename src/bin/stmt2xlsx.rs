//! CLI binary for stmt2xlsx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractConfig`, renders a progress bar, and writes the export.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stmt2xlsx::{
    extract_to_file, format_amount, Bank, BankColumnLayout, ExtractConfig, ExtractProgress,
    ProgressSink, ALL_BANKS,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "stmt2xlsx",
    version,
    about = "Extract transactions from scanned bank-statement PDFs into styled XLSX",
    after_help = "EXAMPLES:\n    \
        stmt2xlsx statement.pdf --bank kbank\n    \
        stmt2xlsx statement.pdf --bank KB국민은행 --min-amount 1000000 -o out.xlsx\n    \
        stmt2xlsx https://example.com/statement.pdf --bank shinhan --per-row"
)]
struct Cli {
    /// Statement PDF: local path or HTTP(S) URL
    input: String,

    /// Issuing bank (Korean label or identifier: kookmin, shinhan, woori, hana, nonghyup, kbank, other)
    #[arg(short, long, default_value = "other")]
    bank: Bank,

    /// Keep only transactions at or above this amount (KRW)
    #[arg(short, long, default_value_t = 500_000)]
    min_amount: u64,

    /// Output path [default: derived from bank and threshold]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the bank's default page-split factor (1 = no split)
    #[arg(long)]
    split: Option<u32>,

    /// Concurrent model calls
    #[arg(long, default_value_t = 3)]
    concurrency: usize,

    /// Model identifier (e.g. gpt-4o)
    #[arg(long, env = "STMT2XLSX_MODEL")]
    model: Option<String>,

    /// Provider name (openai, anthropic, …)
    #[arg(long, env = "STMT2XLSX_LLM_PROVIDER")]
    provider: Option<String>,

    /// PDF password for encrypted statements
    #[arg(long)]
    password: Option<String>,

    /// Repeat the bank name on every row instead of one merged cell
    #[arg(long)]
    per_row: bool,

    /// Rendering DPI (72–400)
    #[arg(long, default_value_t = 300)]
    dpi: u32,

    /// Timeout for downloading URL inputs, in seconds
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// List supported banks and exit
    #[arg(long)]
    list_banks: bool,

    /// Verbose logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ── Terminal progress bar ────────────────────────────────────────────────────

/// Renders fragment completions as a progress bar. The pipeline invokes the
/// sink from its single orchestrating task, so no extra locking is needed
/// beyond what indicatif does internally.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len} fragments  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractProgress for CliProgress {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {total} page fragments…"))
        ));
    }

    fn on_fragment_done(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_finish(&self, _total: usize) {
        self.bar.finish_and_clear();
    }
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "stmt2xlsx=warn",
        1 => "stmt2xlsx=info",
        _ => "stmt2xlsx=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    if cli.list_banks {
        for bank in ALL_BANKS {
            println!(
                "{:<12} split factor {}",
                bank.label(),
                bank.default_split_factor()
            );
        }
        return Ok(());
    }

    let progress = CliProgress::new();

    let mut builder = ExtractConfig::builder()
        .bank(cli.bank)
        .min_amount(cli.min_amount)
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout)
        .bank_column(if cli.per_row {
            BankColumnLayout::PerRow
        } else {
            BankColumnLayout::Merged
        })
        .progress(Arc::clone(&progress) as ProgressSink);
    if let Some(n) = cli.split {
        builder = builder.split_factor(n);
    }
    if let Some(model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(password) = cli.password {
        builder = builder.password(password);
    }
    let config = builder.build()?;

    let output_path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(stmt2xlsx::export_filename(cli.bank.label(), cli.min_amount)));

    let output = extract_to_file(&cli.input, &output_path, &config)
        .await
        .context("extraction failed")?;

    // ── Summary ──────────────────────────────────────────────────────────
    let total_amount: u64 = output.transactions.iter().map(|t| t.amount).sum();
    eprintln!(
        "{} {} records extracted, {} at or above {}원",
        green("✔"),
        bold(&output.stats.extracted_records.to_string()),
        bold(&output.stats.kept_records.to_string()),
        format_amount(cli.min_amount),
    );
    eprintln!(
        "  filtered total {}원  {}",
        format_amount(total_amount),
        dim(&format!(
            "({} pages, {} fragments, {:.1}s)",
            output.stats.total_pages,
            output.stats.fragments,
            output.stats.total_duration_ms as f64 / 1000.0
        )),
    );
    if output.stats.kept_records == 0 {
        eprintln!(
            "  {} no transactions at or above {}원; export contains headers only",
            cyan("⚠"),
            format_amount(cli.min_amount)
        );
    }
    eprintln!("{} wrote {}", green("✔"), output_path.display());

    Ok(())
}
