//! Media store collaborator: durable upload plus per-page image rendering.
//!
//! The pipeline never rasterises anything locally — it uploads the raw
//! document once and asks the store to expose each page as an image at a
//! bounded size and quality. [`MediaStore`] is the seam: the pipeline holds
//! an `Arc<dyn MediaStore>`, so tests inject a double and production wires
//! up [`CloudinaryStore`].
//!
//! The store must tolerate being asked for a page count on an asset that is
//! missing or still processing; callers treat any count error as degraded
//! (see [`crate::pipeline::count`]), never fatal.

use crate::config::RenderOptions;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// External media store consumed by the rasteriser.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload raw document bytes under `target_id`, returning the stored
    /// asset id.
    async fn upload(&self, bytes: &[u8], target_id: &str, format: &str)
        -> Result<String, StoreError>;

    /// Number of pages in a stored asset.
    async fn page_count(&self, asset_id: &str) -> Result<usize, StoreError>;

    /// Rendering URL for one page of a stored asset. Pure URL construction;
    /// the store renders lazily on first fetch.
    fn page_url(&self, asset_id: &str, page: usize, render: &RenderOptions) -> String;
}

/// Cloudinary-backed [`MediaStore`].
///
/// Uploads go through the unsigned-preset upload endpoint; the page-count
/// query uses the admin resource API with basic auth; page URLs are built
/// deterministically from the delivery host and a transformation string, so
/// no network round-trip is needed per page.
pub struct CloudinaryStore {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    upload_preset: String,
    api_base: String,
    delivery_base: String,
    client: reqwest::Client,
}

/// Subset of the upload response the pipeline needs.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: Option<String>,
}

/// Subset of the resource-info response the pipeline needs.
#[derive(Debug, Deserialize)]
struct ResourceResponse {
    pages: Option<u32>,
}

impl CloudinaryStore {
    /// Upload timeout; large PDFs over slow links need generous headroom.
    const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        upload_preset: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            upload_preset: upload_preset.into(),
            api_base: "https://api.cloudinary.com".to_string(),
            delivery_base: "https://res.cloudinary.com".to_string(),
            client: reqwest::Client::builder()
                .timeout(Self::UPLOAD_TIMEOUT)
                .build()
                .expect("reqwest client with static configuration"),
        }
    }

    /// Build from `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`,
    /// `CLOUDINARY_API_SECRET`, and optionally `CLOUDINARY_UPLOAD_PRESET`
    /// (default: `ml_default`).
    pub fn from_env() -> Result<Self, StoreError> {
        let cloud_name = std::env::var("CLOUDINARY_CLOUD_NAME")
            .map_err(|_| StoreError::MissingConfig("CLOUDINARY_CLOUD_NAME"))?;
        let api_key = std::env::var("CLOUDINARY_API_KEY")
            .map_err(|_| StoreError::MissingConfig("CLOUDINARY_API_KEY"))?;
        let api_secret = std::env::var("CLOUDINARY_API_SECRET")
            .map_err(|_| StoreError::MissingConfig("CLOUDINARY_API_SECRET"))?;
        let upload_preset =
            std::env::var("CLOUDINARY_UPLOAD_PRESET").unwrap_or_else(|_| "ml_default".to_string());

        Ok(Self::new(cloud_name, api_key, api_secret, upload_preset))
    }

    /// Override the API host (tests point this at a local mock server).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = trim_trailing_slash(base.into());
        self
    }

    /// Override the delivery host used for page URLs.
    pub fn with_delivery_base(mut self, base: impl Into<String>) -> Self {
        self.delivery_base = trim_trailing_slash(base.into());
        self
    }

    fn transformation(&self, page: usize, render: &RenderOptions) -> String {
        format!(
            "pg_{page},f_{},q_{},w_{},h_{},c_limit,dpr_{}",
            render.format, render.quality, render.width, render.height, render.dpr
        )
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(
        &self,
        bytes: &[u8],
        target_id: &str,
        format: &str,
    ) -> Result<String, StoreError> {
        let url = format!("{}/v1_1/{}/image/upload", self.api_base, self.cloud_name);
        info!(
            "Uploading {} bytes to media store as '{}'",
            bytes.len(),
            target_id
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes.to_vec())
                    .file_name(format!("upload.{format}")),
            )
            .text("upload_preset", self.upload_preset.clone())
            .text("public_id", target_id.to_string())
            .text("format", format.to_string());

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let parsed: UploadResponse = response.json().await?;
        let asset_id = parsed
            .public_id
            .ok_or(StoreError::MissingField("public_id"))?;
        info!("Upload complete: asset '{}'", asset_id);
        Ok(asset_id)
    }

    async fn page_count(&self, asset_id: &str) -> Result<usize, StoreError> {
        let url = format!(
            "{}/v1_1/{}/resources/image/upload/{}",
            self.api_base, self.cloud_name, asset_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[("pages", "true")])
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let parsed: ResourceResponse = response.json().await?;
        let pages = parsed.pages.unwrap_or(1) as usize;
        debug!("Asset '{}' has {} pages", asset_id, pages);
        Ok(pages)
    }

    fn page_url(&self, asset_id: &str, page: usize, render: &RenderOptions) -> String {
        format!(
            "{}/{}/image/upload/{}/{}",
            self.delivery_base,
            self.cloud_name,
            self.transformation(page, render),
            asset_id
        )
    }
}

fn trim_trailing_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CloudinaryStore {
        CloudinaryStore::new("democloud", "key", "secret", "ml_default")
    }

    #[test]
    fn page_url_embeds_transformation_and_ordinal() {
        let url = store().page_url("pagelens/pdfs/123-doc.pdf", 3, &RenderOptions::default());
        assert_eq!(
            url,
            "https://res.cloudinary.com/democloud/image/upload/\
             pg_3,f_jpg,q_auto:best,w_1200,h_1600,c_limit,dpr_2.0/pagelens/pdfs/123-doc.pdf"
        );
    }

    #[test]
    fn page_url_respects_custom_render_options() {
        let render = RenderOptions {
            format: "png".into(),
            width: 800,
            height: 800,
            quality: "auto".into(),
            dpr: "1.0".into(),
        };
        let url = store().page_url("asset", 1, &render);
        assert!(url.contains("pg_1,f_png,q_auto,w_800,h_800,c_limit,dpr_1.0"));
    }

    #[test]
    fn base_overrides_strip_trailing_slash() {
        let s = store().with_api_base("http://127.0.0.1:9999/");
        assert_eq!(s.api_base, "http://127.0.0.1:9999");
    }

    #[test]
    fn truncate_preserves_short_strings() {
        assert_eq!(truncate("short", 200), "short");
        assert_eq!(truncate(&"x".repeat(300), 10).chars().count(), 11);
    }
}
