//! Text cleanup for scraped line lists.
//!
//! Two flavours:
//! - lenient (`normalize_line`, `clean_lines`): keeps the human-readable text,
//!   only fixes whitespace and drops adjacent duplicates.
//! - strict (`normalize_for_identity`, `clean_lines_strict`): ASCII-folded,
//!   lower-cased and fully de-duplicated. Only used to build fingerprints.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Runs of horizontal whitespace (no newlines)
static HORIZONTAL_WS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\x0B\x0C]+").expect("Invalid whitespace regex"));

static MULTI_NEWLINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("Invalid newline regex"));

/// Collapse whitespace in a single scraped line while keeping its display text.
pub fn normalize_line(s: &str) -> String {
    let s = s.replace('\u{a0}', " ");
    let s = HORIZONTAL_WS_REGEX.replace_all(&s, " ");
    let s = MULTI_NEWLINE_REGEX.replace_all(&s, "\n");
    s.trim().to_string()
}

/// Normalize every line, drop empties and collapse consecutive duplicates.
///
/// Non-adjacent repeats are kept: a recipe can legitimately say "stir" twice.
pub fn clean_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for line in lines.into_iter().flatten() {
        let line = normalize_line(line.as_ref());
        if line.is_empty() {
            continue;
        }
        if out.last() == Some(&line) {
            continue;
        }
        out.push(line);
    }
    out
}

/// Same as [`clean_lines`] for lists that have no missing entries.
pub fn clean_line_list<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    clean_lines(lines.iter().map(|s| Some(s.as_ref())))
}

/// Fold a string into its comparable identity form: ASCII transliteration
/// (so "Phở Bò" and "pho bo" agree), lower case, single spaces.
pub fn normalize_for_identity(s: &str) -> String {
    let folded = deunicode::deunicode(s).to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identity-normalize every line, drop empties and remove all duplicates,
/// keeping the first occurrence.
pub fn clean_lines_strict<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .map(|s| normalize_for_identity(s.as_ref()))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
