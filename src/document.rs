//! Input types: the uploaded document and its derived pages.
//!
//! A [`Document`] is the raw payload one ingestion run owns exclusively.
//! It is consumed during rasterisation — once the media store holds the
//! asset and the per-page URLs exist, the raw bytes are dropped and only
//! derived [`Page`]s travel further down the pipeline.
//!
//! Media-type routing happens here so the orchestrator can branch before
//! any network call: paginated formats go through the rasteriser, static
//! images short-circuit to a single analysis task, everything else is
//! rejected up front.

/// An uploaded document: raw bytes plus the caller-declared identity.
#[derive(Debug, Clone)]
pub struct Document {
    /// Original filename as supplied by the caller.
    pub name: String,
    /// Declared media type, e.g. `application/pdf` or `image/png`.
    pub media_type: String,
    /// Raw payload.
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether this document is a paginated format the rasteriser handles.
    pub fn is_paginated(&self) -> bool {
        self.media_type == "application/pdf"
    }

    /// Whether this document is a static image (single-page short-circuit).
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Filename sanitised for use inside a store asset id: anything outside
    /// `[a-zA-Z0-9.-]` becomes an underscore.
    pub fn clean_name(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

/// One rasterised page of a document.
///
/// Ordinals are 1-based and contiguous: a successfully rasterised document
/// of N pages yields exactly the ordinals `{1..N}` — no gaps, no
/// duplicates. The URL is either a store rendering URL or, for the
/// single-image short-circuit, an inline data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based position in the source document.
    pub ordinal: usize,
    /// Where the vision model fetches this page's image.
    pub image_url: String,
    /// Store asset this page was derived from, if any.
    pub asset_id: Option<String>,
}
