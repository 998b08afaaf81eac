//! Heuristic trimming of front and back matter from extracted book text

use regex::Regex;
use std::sync::OnceLock;

/// Markers of where the body of a book begins, in priority order
const START_PATTERNS: &[&str] = &[
    r"(?i)\b(introduction|prologue|preface|chapter\s*1)\b",
    r"(?i)\bchapter\s*one\b",
    r"(?i)\bpart\s*i\b",
    r"(?i)\bsection\s*1\b",
];

/// Markers of back matter, in priority order
const END_PATTERNS: &[&str] = &[
    r"(?i)\b(conclusion|epilogue|afterword|appendix|bibliography|references|index)\b",
    r"(?im)\bchapter\s*\d+\s*$",
    r"(?i)\bfinal\s*chapter\b",
];

struct Cleaner {
    pattern: Regex,
    replacement: &'static str,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("Invalid marker pattern {}: {}", p, e);
                None
            }
        })
        .collect()
}

fn start_markers() -> &'static [Regex] {
    static MARKERS: OnceLock<Vec<Regex>> = OnceLock::new();
    MARKERS.get_or_init(|| compile(START_PATTERNS))
}

fn end_markers() -> &'static [Regex] {
    static MARKERS: OnceLock<Vec<Regex>> = OnceLock::new();
    MARKERS.get_or_init(|| compile(END_PATTERNS))
}

fn cleaners() -> &'static [Cleaner] {
    static CLEANERS: OnceLock<Vec<Cleaner>> = OnceLock::new();
    CLEANERS.get_or_init(|| {
        [
            // standalone page numbers
            (r"\n\s*\d+\s*\n", "\n"),
            (r"(?i)\n\s*Page\s*\d+.*?\n", "\n"),
            (r"\n\s*\n\s*\n", "\n\n"),
            (r" +", " "),
            // copyright and website footers
            (r"\n\s*©.*?\n", "\n"),
            (r"\n\s*www\..*?\n", "\n"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern)
                .map(|pattern| Cleaner {
                    pattern,
                    replacement,
                })
                .map_err(|e| tracing::error!("Invalid cleanup pattern: {}", e))
                .ok()
        })
        .collect()
    })
}

/// Keep the text between the first start marker and the last end marker.
///
/// The start is the first match of the highest-priority start pattern that matches
/// at all; the end is the beginning of the last match of the highest-priority end
/// pattern that matches. Missing markers leave that side of the text untouched, and
/// an end marker that precedes the start is ignored.
pub fn extract_core_content(text: &str) -> String {
    let start = start_markers()
        .iter()
        .find_map(|re| re.find(text))
        .map_or(0, |m| m.start());

    let end = end_markers()
        .iter()
        .find_map(|re| re.find_iter(text).last())
        .map(|m| m.start())
        .filter(|&end| end > start)
        .unwrap_or(text.len());

    text[start..end].trim().to_string()
}

/// Strip page furniture and collapse whitespace
pub fn clean_text(text: &str) -> String {
    let mut text = text.to_string();
    for cleaner in cleaners() {
        text = cleaner
            .pattern
            .replace_all(&text, cleaner.replacement)
            .into_owned();
    }
    text.trim().to_string()
}
