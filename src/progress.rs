//! Progress-reporting trait for per-fragment extraction events.
//!
//! Inject an `Arc<dyn ExtractProgress>` via
//! [`crate::config::ExtractConfigBuilder::progress`] to receive a
//! `(completed, total)` pair each time a page fragment finishes its model
//! call. Callbacks are the least-invasive integration point: callers can
//! forward events to a terminal progress bar, a channel, or a web UI without
//! the library knowing how the host application communicates.
//!
//! # Thread safety
//!
//! Fragments are processed concurrently, but completions are observed on the
//! single orchestrating task, so `on_fragment_done` is never called from two
//! threads at once. Implementations still must be `Send + Sync` because the
//! orchestrating task may migrate between runtime worker threads.

use std::sync::Arc;

/// Called by the extraction pipeline as fragments complete.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractProgress: Send + Sync {
    /// Called once before any model call, with the total fragment count.
    fn on_start(&self, total: usize) {
        let _ = total;
    }

    /// Called after each fragment's model call completes successfully.
    ///
    /// `completed` counts finished fragments (1-based running total);
    /// `total` is the same value passed to [`ExtractProgress::on_start`].
    fn on_fragment_done(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }

    /// Called once after the last fragment, before normalization begins.
    fn on_finish(&self, total: usize) {
        let _ = total;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl ExtractProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::ExtractConfig`].
pub type ProgressSink = Arc<dyn ExtractProgress>;
