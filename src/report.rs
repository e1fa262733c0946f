//! Output types: per-page outcomes and the combined batch report.
//!
//! [`PageResult`] is a tagged variant rather than a struct with a success
//! flag — the success/placeholder duality is explicit and exhaustively
//! handled at every match site. On the wire it flattens back to the
//! caller-facing `{page, content, success}` shape.
//!
//! [`BatchReport`] is constructed exactly once, after every group has
//! settled, and is immutable from then on.

use crate::config::AnalysisMode;
use crate::error::PageError;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::borrow::Cow;

/// The outcome of analysing one page.
///
/// For every submitted analysis task there is exactly one `PageResult`,
/// matched by ordinal. Failures carry a typed [`PageError`] whose rendering
/// is the placeholder text shown in the combined report.
#[derive(Debug, Clone)]
pub enum PageResult {
    /// The vision model returned analysis text for this page.
    Success { ordinal: usize, text: String },
    /// The page produced no analysis; the reason stands in for the text.
    Failure { ordinal: usize, reason: PageError },
}

impl PageResult {
    /// 1-based page ordinal this result belongs to.
    pub fn ordinal(&self) -> usize {
        match self {
            PageResult::Success { ordinal, .. } | PageResult::Failure { ordinal, .. } => *ordinal,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PageResult::Success { .. })
    }

    /// The text shown for this page: analysis output, or the rendered
    /// error placeholder.
    pub fn content(&self) -> Cow<'_, str> {
        match self {
            PageResult::Success { text, .. } => Cow::Borrowed(text.as_str()),
            PageResult::Failure { reason, .. } => Cow::Owned(reason.to_string()),
        }
    }
}

impl Serialize for PageResult {
    /// Flattens to the boundary shape `{page, content, success}`.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PageResult", 3)?;
        s.serialize_field("page", &self.ordinal())?;
        s.serialize_field("content", &self.content())?;
        s.serialize_field("success", &self.is_success())?;
        s.end()
    }
}

/// The combined outcome of one batched analysis run.
///
/// Pages are sorted ascending by ordinal regardless of completion order.
/// Serialises to the caller-facing JSON shape (camelCase keys).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Rendered combined text: header, per-page sections, trailing summary.
    pub description: String,
    /// Per-page outcomes, ascending by ordinal.
    pub pages: Vec<PageResult>,
    /// Number of rasterised pages in the document (post-ceiling).
    pub total_pages: usize,
    /// Number of pages actually submitted for analysis.
    pub analyzed_pages: usize,
    /// Pages that produced analysis text.
    pub success_count: usize,
    /// Pages that degraded to an error placeholder.
    pub error_count: usize,
    /// Effective analysis mode (`"complete"` or `"sampling"` on the wire).
    pub strategy: AnalysisMode,
}

/// Timing and size counters for one ingestion run.
///
/// Kept out of the boundary JSON; callers that want diagnostics read it
/// from [`IngestOutput::stats`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Page count reported by the store (or the fallback estimate).
    pub document_pages: usize,
    /// Pages rasterised after the ceiling was applied.
    pub total_pages: usize,
    /// Pages submitted for analysis.
    pub analyzed_pages: usize,
    /// Pages that degraded to an error placeholder.
    pub failed_pages: usize,
    /// End-to-end wall clock in milliseconds.
    pub total_duration_ms: u64,
    /// Time spent uploading and rasterising, in milliseconds.
    pub upload_duration_ms: u64,
    /// Time spent in the batch dispatcher, in milliseconds.
    pub dispatch_duration_ms: u64,
}

/// Everything the orchestrator returns: the report plus run diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutput {
    pub report: BatchReport,
    pub stats: IngestStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_accessors() {
        let r = PageResult::Success {
            ordinal: 3,
            text: "body text".into(),
        };
        assert_eq!(r.ordinal(), 3);
        assert!(r.is_success());
        assert_eq!(r.content(), "body text");
    }

    #[test]
    fn failure_content_is_placeholder() {
        let r = PageResult::Failure {
            ordinal: 2,
            reason: PageError::Analysis {
                page: 2,
                detail: "HTTP 429".into(),
            },
        };
        assert!(!r.is_success());
        assert_eq!(r.content(), "Error analyzing page 2: HTTP 429");
    }

    #[test]
    fn page_result_wire_shape() {
        let r = PageResult::Success {
            ordinal: 1,
            text: "hello".into(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["page"], 1);
        assert_eq!(v["content"], "hello");
        assert_eq!(v["success"], true);
    }

    #[test]
    fn report_wire_shape_is_camel_case() {
        let report = BatchReport {
            description: "combined".into(),
            pages: vec![PageResult::Success {
                ordinal: 1,
                text: "t".into(),
            }],
            total_pages: 1,
            analyzed_pages: 1,
            success_count: 1,
            error_count: 0,
            strategy: AnalysisMode::Complete,
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["totalPages"], 1);
        assert_eq!(v["analyzedPages"], 1);
        assert_eq!(v["successCount"], 1);
        assert_eq!(v["errorCount"], 0);
        assert_eq!(v["strategy"], "complete");
        assert_eq!(v["pages"][0]["success"], true);
    }
}
