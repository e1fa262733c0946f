//! Rasterisation: one document in, an ordered page-image list out.
//!
//! Nothing renders locally. The stage uploads the raw document to the
//! media store once (the only fatal failure point of the whole pipeline),
//! asks the store how many pages it holds, and constructs one rendering
//! URL per page up to the configured ceiling. The resulting [`Page`] list
//! has contiguous 1-based ordinals `{1..N}` by construction.

use crate::config::IngestConfig;
use crate::document::{Document, Page};
use crate::error::IngestError;
use crate::pipeline::count::count_pages;
use crate::store::MediaStore;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Rasterise a paginated document into per-page image references.
///
/// Returns the page list plus the store-reported (or estimated) total page
/// count, which may exceed the list length when the ceiling kicked in.
///
/// # Errors
/// [`IngestError::UploadFailed`] when the store rejects the document after
/// all retries — the caller keeps the raw bytes and decides about a later
/// retry. No partial asset is referenced on the failure path.
pub async fn rasterize(
    store: &Arc<dyn MediaStore>,
    document: &Document,
    config: &IngestConfig,
) -> Result<(Vec<Page>, usize), IngestError> {
    debug_assert!(document.is_paginated(), "caller routes non-paginated input");

    let target_id = format!(
        "{}/pdfs/{}-{}",
        config.folder,
        timestamp_millis(),
        document.clean_name()
    );

    // Upload is the one fatal network call; retried like every other
    // network boundary, then surfaced to the caller if it still fails.
    let asset_id = config
        .retry_policy()
        .run("upload", || {
            store.upload(&document.bytes, &target_id, "pdf")
        })
        .await
        .map_err(|e| IngestError::UploadFailed {
            name: document.name.clone(),
            detail: e.to_string(),
        })?;

    let page_count = count_pages(store, &asset_id, config.fallback_page_count).await;

    let rendered = page_count.min(config.page_ceiling);
    if rendered < page_count {
        warn!(
            "Document '{}' has {} pages; rasterising only the first {}",
            document.name, page_count, rendered
        );
    }

    let pages: Vec<Page> = (1..=rendered)
        .map(|ordinal| Page {
            ordinal,
            image_url: store.page_url(&asset_id, ordinal, &config.render),
            asset_id: Some(asset_id.clone()),
        })
        .collect();

    info!(
        "Rasterised '{}': {} page images (document reports {} pages)",
        document.name,
        pages.len(),
        page_count
    );

    Ok((pages, page_count))
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderOptions;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingStore {
        page_count: usize,
        reject_upload: bool,
        uploads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaStore for RecordingStore {
        async fn upload(
            &self,
            _bytes: &[u8],
            target_id: &str,
            _format: &str,
        ) -> Result<String, StoreError> {
            if self.reject_upload {
                return Err(StoreError::Api {
                    status: 400,
                    body: "invalid format".into(),
                });
            }
            self.uploads.lock().unwrap().push(target_id.to_string());
            Ok(target_id.to_string())
        }

        async fn page_count(&self, _asset_id: &str) -> Result<usize, StoreError> {
            Ok(self.page_count)
        }

        fn page_url(&self, asset_id: &str, page: usize, _render: &RenderOptions) -> String {
            format!("mock://{asset_id}/page-{page}.jpg")
        }
    }

    fn config() -> IngestConfig {
        IngestConfig::builder().max_retries(0).build().unwrap()
    }

    fn pdf(name: &str) -> Document {
        Document::new(name, "application/pdf", vec![b'%', b'P', b'D', b'F'])
    }

    #[tokio::test]
    async fn ordinals_are_contiguous_from_one() {
        let store: Arc<dyn MediaStore> = Arc::new(RecordingStore {
            page_count: 3,
            reject_upload: false,
            uploads: Mutex::new(Vec::new()),
        });

        let (pages, total) = rasterize(&store, &pdf("doc.pdf"), &config()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(
            pages.iter().map(|p| p.ordinal).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(pages[1].image_url.ends_with("page-2.jpg"));
    }

    #[tokio::test]
    async fn ceiling_caps_rendered_pages() {
        let store: Arc<dyn MediaStore> = Arc::new(RecordingStore {
            page_count: 50,
            reject_upload: false,
            uploads: Mutex::new(Vec::new()),
        });

        let (pages, total) = rasterize(&store, &pdf("big.pdf"), &config()).await.unwrap();
        assert_eq!(total, 50);
        assert_eq!(pages.len(), 20);
        assert_eq!(pages.last().unwrap().ordinal, 20);
    }

    #[tokio::test]
    async fn upload_rejection_is_fatal() {
        let store: Arc<dyn MediaStore> = Arc::new(RecordingStore {
            page_count: 3,
            reject_upload: true,
            uploads: Mutex::new(Vec::new()),
        });

        let err = rasterize(&store, &pdf("bad.pdf"), &config())
            .await
            .unwrap_err();
        match err {
            IngestError::UploadFailed { name, detail } => {
                assert_eq!(name, "bad.pdf");
                assert!(detail.contains("400"));
            }
            other => panic!("expected UploadFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn target_id_embeds_folder_and_clean_name() {
        let store = Arc::new(RecordingStore {
            page_count: 1,
            reject_upload: false,
            uploads: Mutex::new(Vec::new()),
        });
        let dyn_store: Arc<dyn MediaStore> = store.clone();

        rasterize(&dyn_store, &pdf("my report.pdf"), &config())
            .await
            .unwrap();

        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].starts_with("pagelens/pdfs/"));
        assert!(uploads[0].ends_with("-my_report.pdf"));
    }
}
