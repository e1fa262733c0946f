//! Progress-callback trait for ingestion events.
//!
//! Inject an `Arc<dyn IngestProgressCallback>` via
//! [`crate::config::IngestConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through each group of pages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a broadcast channel, a WebSocket, a database row,
//! or a terminal progress bar — without the library knowing anything about
//! how the host application communicates. The trait is `Send + Sync` so it
//! works correctly while a group's pages are analysed concurrently.

use std::sync::Arc;

/// Called by the ingestion pipeline as it processes pages.
///
/// Implementations must be `Send + Sync` (pages inside a group are
/// analysed concurrently). All methods have default no-op implementations
/// so callers only override what they care about.
///
/// # Thread safety
///
/// `on_page_complete` and `on_page_error` may fire concurrently from
/// different tasks within one group. Implementations must protect shared
/// mutable state with appropriate synchronisation (`Mutex`, atomics).
pub trait IngestProgressCallback: Send + Sync {
    /// Called once before any analysis is submitted.
    ///
    /// # Arguments
    /// * `analyzed_pages` — number of pages that will be submitted
    fn on_ingest_start(&self, analyzed_pages: usize) {
        let _ = analyzed_pages;
    }

    /// Called as each group begins, before its tasks are submitted.
    ///
    /// # Arguments
    /// * `group`       — 1-indexed group number
    /// * `group_count` — total number of groups
    fn on_group_start(&self, group: usize, group_count: usize) {
        let _ = (group, group_count);
    }

    /// Called when a page's analysis completes successfully.
    ///
    /// # Arguments
    /// * `ordinal`  — 1-indexed page number
    /// * `total`    — pages being analysed
    /// * `text_len` — byte length of the analysis text
    fn on_page_complete(&self, ordinal: usize, total: usize, text_len: usize) {
        let _ = (ordinal, total, text_len);
    }

    /// Called when a page degrades to an error placeholder.
    fn on_page_error(&self, ordinal: usize, total: usize, error: &str) {
        let _ = (ordinal, total, error);
    }

    /// Called once after every group has settled.
    ///
    /// # Arguments
    /// * `total`         — pages that were analysed
    /// * `success_count` — pages that produced analysis text
    fn on_ingest_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopIngestCallback;

impl IngestProgressCallback for NoopIngestCallback {}

/// Convenience alias matching the type stored in [`crate::config::IngestConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        groups: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        final_success: AtomicUsize,
    }

    impl IngestProgressCallback for TrackingCallback {
        fn on_group_start(&self, _group: usize, _group_count: usize) {
            self.groups.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _ordinal: usize, _total: usize, _text_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _ordinal: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_ingest_complete(&self, _total: usize, success_count: usize) {
            self.final_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopIngestCallback;
        cb.on_ingest_start(5);
        cb.on_group_start(1, 2);
        cb.on_page_complete(1, 5, 42);
        cb.on_page_error(2, 5, "some error");
        cb.on_ingest_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = TrackingCallback {
            groups: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            final_success: AtomicUsize::new(0),
        };

        t.on_ingest_start(3);
        t.on_group_start(1, 1);
        t.on_page_complete(1, 3, 100);
        t.on_page_complete(3, 3, 80);
        t.on_page_error(2, 3, "timed out");
        t.on_ingest_complete(3, 2);

        assert_eq!(t.groups.load(Ordering::SeqCst), 1);
        assert_eq!(t.completes.load(Ordering::SeqCst), 2);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.final_success.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProgressCallback>();

        let cb: ProgressCallback = Arc::new(NoopIngestCallback);
        cb.on_ingest_start(10);
    }
}
