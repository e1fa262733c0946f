//! Page counting with graceful degradation.
//!
//! The count query can fail for reasons that say nothing about the
//! document itself — the asset may still be processing, the store's
//! metadata API may hiccup. An approximate count only affects how many
//! render URLs get issued, never the correctness of results already
//! obtained, so this stage never fails hard: any error degrades to the
//! configured fallback estimate.

use crate::store::MediaStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of pages in a stored asset, or `fallback` when the query fails.
///
/// A store that reports zero pages is treated as a one-page asset — the
/// asset exists (the upload succeeded), so there is at least one page to
/// render.
pub async fn count_pages(store: &Arc<dyn MediaStore>, asset_id: &str, fallback: usize) -> usize {
    match store.page_count(asset_id).await {
        Ok(0) => {
            warn!("Store reported 0 pages for '{}'; assuming 1", asset_id);
            1
        }
        Ok(n) => {
            debug!("Asset '{}': {} pages", asset_id, n);
            n
        }
        Err(e) => {
            warn!(
                "Page-count query failed for '{}' ({}); assuming {} pages",
                asset_id, e, fallback
            );
            fallback
        }
    }
}
