//! Post-processing: deterministic cleanup of vision-model output.
//!
//! Even well-prompted vision models occasionally introduce artefacts that
//! are *semantically correct* but *structurally noisy* — wrapping the
//! answer in code fences, Windows line endings, runs of blank lines, or
//! invisible Unicode. Fixing these with cheap string rules here keeps the
//! prompts focused on *what to extract*, not on formatting edge-cases, and
//! keeps the combined report's section layout predictable.
//!
//! Rules run in a fixed order: fences are stripped before whitespace
//! handling so the fence detector sees the raw shape, and the final trim
//! runs last so sections butt cleanly against the report dividers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw analysis text.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence wrapping the whole answer
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 2+ consecutive blank lines down to 1
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Trim leading/trailing blank space so sections join cleanly
pub fn clean_analysis(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|text)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCE.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
