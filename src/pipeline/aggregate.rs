//! Aggregation: restore page order and render the combined report.
//!
//! Concurrent tasks settle in arbitrary order, so ordering is re-imposed
//! here by sorting on the ordinal — deterministically, which makes
//! aggregation idempotent: the same multiset of results always renders the
//! same report.
//!
//! The combined text is what the chat caller shows the user: a bold header
//! naming the page count, one labelled section per page separated by a
//! visible divider, a `⚠` marker on pages that degraded to placeholders,
//! and a trailing line with the success/error tally.

use crate::config::AnalysisMode;
use crate::report::{BatchReport, PageResult};

/// Divider between page sections in the combined text.
const SECTION_DIVIDER: &str = "\n\n---\n\n";

/// Marker prefixed to the content of failed pages.
const WARNING_MARKER: &str = "⚠";

/// Note appended to sampling-mode reports.
const SAMPLING_NOTE: &str = "*Note: This is a smart analysis of key pages for quick overview. \
For complete analysis, use fewer pages at a time.*";

/// Build the final [`BatchReport`] from unordered per-page results.
pub fn aggregate(
    mut results: Vec<PageResult>,
    total_pages: usize,
    mode: AnalysisMode,
) -> BatchReport {
    results.sort_by_key(|r| r.ordinal());

    let analyzed_pages = results.len();
    let success_count = results.iter().filter(|r| r.is_success()).count();
    let error_count = analyzed_pages - success_count;

    let header = match mode {
        AnalysisMode::Complete => {
            format!("**Complete Document Analysis ({total_pages} pages):**")
        }
        AnalysisMode::Sampling => format!(
            "**Document Summary ({total_pages} pages, analyzed {analyzed_pages} key pages):**"
        ),
    };

    let body = results
        .iter()
        .map(render_section)
        .collect::<Vec<_>>()
        .join(SECTION_DIVIDER);

    let summary = format!(
        "*Analyzed {analyzed_pages} pages: {success_count} succeeded, {error_count} failed.*"
    );

    let mut description = if body.is_empty() {
        format!("{header}\n\n{summary}")
    } else {
        format!("{header}\n\n{body}\n\n{summary}")
    };
    if mode == AnalysisMode::Sampling {
        description.push_str("\n\n");
        description.push_str(SAMPLING_NOTE);
    }

    BatchReport {
        description,
        pages: results,
        total_pages,
        analyzed_pages,
        success_count,
        error_count,
        strategy: mode,
    }
}

fn render_section(result: &PageResult) -> String {
    match result {
        PageResult::Success { ordinal, text } => format!("**Page {ordinal}:**\n{text}"),
        PageResult::Failure { ordinal, reason } => {
            format!("**Page {ordinal}:**\n{WARNING_MARKER} {reason}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;

    fn success(ordinal: usize) -> PageResult {
        PageResult::Success {
            ordinal,
            text: format!("text of page {ordinal}"),
        }
    }

    fn failure(ordinal: usize) -> PageResult {
        PageResult::Failure {
            ordinal,
            reason: PageError::Analysis {
                page: ordinal,
                detail: "mock failure".into(),
            },
        }
    }

    #[test]
    fn restores_page_order() {
        let report = aggregate(
            vec![success(3), success(1), success(2)],
            3,
            AnalysisMode::Complete,
        );
        let ordinals: Vec<usize> = report.pages.iter().map(|p| p.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);

        let p1 = report.description.find("**Page 1:**").unwrap();
        let p2 = report.description.find("**Page 2:**").unwrap();
        let p3 = report.description.find("**Page 3:**").unwrap();
        assert!(p1 < p2 && p2 < p3);
    }

    #[test]
    fn counts_and_header() {
        let report = aggregate(
            vec![success(1), failure(2), success(3)],
            3,
            AnalysisMode::Complete,
        );
        assert_eq!(report.total_pages, 3);
        assert_eq!(report.analyzed_pages, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert!(report
            .description
            .starts_with("**Complete Document Analysis (3 pages):**"));
        assert!(report
            .description
            .contains("*Analyzed 3 pages: 2 succeeded, 1 failed.*"));
    }

    #[test]
    fn failed_pages_carry_warning_marker() {
        let report = aggregate(vec![failure(2)], 3, AnalysisMode::Complete);
        assert!(report.description.contains("⚠ Error analyzing page 2"));
    }

    #[test]
    fn sampling_header_and_note() {
        let report = aggregate(
            vec![success(1), success(15), success(30)],
            30,
            AnalysisMode::Sampling,
        );
        assert!(report
            .description
            .starts_with("**Document Summary (30 pages, analyzed 3 key pages):**"));
        assert!(report.description.contains("smart analysis of key pages"));
        assert_eq!(report.strategy, AnalysisMode::Sampling);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let unordered = vec![success(2), failure(3), success(1)];
        let a = aggregate(unordered.clone(), 3, AnalysisMode::Complete);
        let b = aggregate(
            vec![failure(3), success(1), success(2)],
            3,
            AnalysisMode::Complete,
        );
        assert_eq!(a.description, b.description);
        assert_eq!(a.success_count, b.success_count);
    }

    #[test]
    fn divider_separates_sections() {
        let report = aggregate(vec![success(1), success(2)], 2, AnalysisMode::Complete);
        assert_eq!(report.description.matches("\n\n---\n\n").count(), 1);
    }
}
