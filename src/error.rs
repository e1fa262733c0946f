//! Error types for the pagelens library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IngestError`] — **Fatal**: the ingestion cannot proceed at all
//!   (unsupported media type, the media store rejected the upload, no
//!   collaborator configured). Returned as `Err(IngestError)` from the
//!   top-level `ingest*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (analysis error,
//!   timeout, a whole batch falling over) but the other pages are fine.
//!   Stored inside [`crate::report::PageResult::Failure`] so callers can
//!   inspect partial success rather than losing the whole document to one
//!   bad page.
//!
//! Once dispatching has begun nothing escalates back to [`IngestError`]:
//! every later failure degrades into a [`PageError`] placeholder.
//!
//! The collaborator clients carry their own small enums ([`StoreError`],
//! [`VisionError`]) which are mapped into the two tiers above at the
//! pipeline boundary.

use thiserror::Error;

/// All fatal errors returned by the pagelens library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::report::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The document has a media type the pipeline cannot route.
    #[error("Unsupported media type '{media_type}' for '{name}'\nSupported: application/pdf and image/* types.")]
    UnsupportedMediaType { name: String, media_type: String },

    /// The document payload was empty.
    #[error("Document '{name}' is empty (0 bytes)")]
    EmptyDocument { name: String },

    // ── Store errors ──────────────────────────────────────────────────────
    /// The media store rejected the upload. The raw bytes are still with
    /// the caller, who decides whether to retry later.
    #[error("Failed to upload '{name}' to the media store: {detail}")]
    UploadFailed { name: String, detail: String },

    /// No media store was injected and none could be built from the environment.
    #[error("Media store is not configured.\n{hint}")]
    StoreNotConfigured { hint: String },

    // ── Vision errors ─────────────────────────────────────────────────────
    /// No vision model was injected and none could be built from the environment.
    #[error("Vision model is not configured.\n{hint}")]
    VisionNotConfigured { hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored inside [`crate::report::PageResult::Failure`]. Its `Display`
/// rendering is the placeholder text embedded into the combined report, so
/// every variant names the page ordinal.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The analysis call failed after all retries.
    #[error("Error analyzing page {page}: {detail}")]
    Analysis { page: usize, detail: String },

    /// The analysis call exceeded its per-task timeout.
    #[error("Error analyzing page {page}: timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    /// The whole batch this page belonged to failed to submit.
    #[error("Error analyzing page {page}: batch submission failed: {detail}")]
    Batch { page: usize, detail: String },
}

impl PageError {
    /// The ordinal of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::Analysis { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::Batch { page, .. } => *page,
        }
    }
}

/// Errors returned by a [`crate::store::MediaStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The store's response was missing an expected field.
    #[error("store response missing field '{0}'")]
    MissingField(&'static str),

    /// Required configuration (credentials, cloud name) is absent.
    #[error("store configuration missing: {0}")]
    MissingConfig(&'static str),
}

/// Errors returned by a [`crate::vision::VisionModel`] implementation.
#[derive(Debug, Error)]
pub enum VisionError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("vision request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("vision API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider returned a completion with no content.
    #[error("vision API returned an empty completion")]
    EmptyResponse,

    /// Required configuration (API key) is absent.
    #[error("vision configuration missing: {0}")]
    MissingConfig(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_placeholder_embeds_ordinal() {
        let e = PageError::Analysis {
            page: 2,
            detail: "HTTP 500".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 2"), "got: {msg}");
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn timeout_placeholder_embeds_ordinal_and_secs() {
        let e = PageError::Timeout { page: 7, secs: 60 };
        let msg = e.to_string();
        assert!(msg.contains("page 7"));
        assert!(msg.contains("60s"));
    }

    #[test]
    fn batch_placeholder_embeds_ordinal() {
        let e = PageError::Batch {
            page: 4,
            detail: "task panicked".into(),
        };
        assert_eq!(e.page(), 4);
        assert!(e.to_string().contains("page 4"));
    }

    #[test]
    fn upload_failed_display() {
        let e = IngestError::UploadFailed {
            name: "report.pdf".into(),
            detail: "quota exceeded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("report.pdf"));
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn unsupported_media_type_display() {
        let e = IngestError::UnsupportedMediaType {
            name: "notes.docx".into(),
            media_type: "application/msword".into(),
        };
        assert!(e.to_string().contains("application/msword"));
    }
}
