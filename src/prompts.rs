//! Prompt templates for per-page vision analysis.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how pages are described to the
//!    model requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the rendered prompts
//!    directly without spinning up a real vision model.
//!
//! Callers can extend the per-page instruction via
//! [`crate::config::IngestConfig::prompt`]; the templates here are used
//! when no override is provided.

use crate::config::AnalysisMode;

/// Default prompt for the single-image short-circuit path.
pub const DEFAULT_SINGLE_IMAGE_PROMPT: &str = "What is in this image?";

/// Output-token cap per page in complete mode.
///
/// Dense pages rarely exceed this; keeping it modest bounds per-document
/// cost when every page of a 20-page upload is analysed.
pub const COMPLETE_MAX_TOKENS: u32 = 800;

/// Output-token cap per page in sampling mode — tighter, since sampled
/// pages are asked for highlights rather than full transcription.
pub const SAMPLING_MAX_TOKENS: u32 = 600;

/// Output-token cap for a single standalone image.
pub const SINGLE_IMAGE_MAX_TOKENS: u32 = 1500;

/// Render the per-page analysis prompt.
///
/// * Complete mode asks for a comprehensive extraction of the page.
/// * Sampling mode situates the page within the document and asks for the
///   most important content only.
/// * A caller-supplied `extra` instruction, when present, replaces the
///   mode template with a page-anchored version of the caller's own words.
pub fn page_prompt(
    ordinal: usize,
    total_pages: usize,
    mode: AnalysisMode,
    extra: Option<&str>,
) -> String {
    if let Some(extra) = extra {
        return format!("Analyze page {ordinal}. {extra}");
    }

    match mode {
        AnalysisMode::Complete => format!(
            "Extract all text and key information from page {ordinal}. \
             Be comprehensive but concise."
        ),
        AnalysisMode::Sampling => format!(
            "This is page {ordinal} of a {total_pages}-page document. \
             Extract the most important text, headings, and key information. \
             Focus on main content."
        ),
    }
}

/// Output-token cap for the given mode.
pub fn max_tokens_for(mode: AnalysisMode) -> u32 {
    match mode {
        AnalysisMode::Complete => COMPLETE_MAX_TOKENS,
        AnalysisMode::Sampling => SAMPLING_MAX_TOKENS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_prompt_names_the_page() {
        let p = page_prompt(3, 10, AnalysisMode::Complete, None);
        assert!(p.contains("page 3"));
        assert!(p.contains("comprehensive"));
    }

    #[test]
    fn sampling_prompt_names_page_and_total() {
        let p = page_prompt(6, 30, AnalysisMode::Sampling, None);
        assert!(p.contains("page 6"));
        assert!(p.contains("30-page document"));
    }

    #[test]
    fn extra_prompt_overrides_template() {
        let p = page_prompt(2, 5, AnalysisMode::Complete, Some("List every date."));
        assert_eq!(p, "Analyze page 2. List every date.");
    }

    #[test]
    fn token_caps_per_mode() {
        assert_eq!(max_tokens_for(AnalysisMode::Complete), 800);
        assert_eq!(max_tokens_for(AnalysisMode::Sampling), 600);
    }
}
