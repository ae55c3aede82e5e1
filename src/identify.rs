//! Class label detection and storage slugs.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Label used when neither the text nor the file name gives anything usable.
pub const UNNAMED_CLASS: &str = "Unnamed class";

static LABEL_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:class|turma)\s*:\s*(.*)$").expect("valid regex"));

// Letter block plus digits, optionally followed by a cycle marker ("A12 CICLO 2").
static CYCLE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]{1,3}\d{2,4}\b(?:\s*-?\s*(?:CICLO|Ciclo|CYCLE|Cycle)\s*\d{1,2}\b)?")
        .expect("valid regex")
});

// Course offering code, e.g. "TURMA 2024.1-03".
static COURSE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bTURMA\s*\d+\.\d+-\d+\b").expect("valid regex"));

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Derives a human-readable class label from report text, falling back to
/// `fallback_name` without its extension.
///
/// Code patterns are only searched outside roster lines, so a discipline
/// code repeated on every student row does not become the class label.
pub fn identify(
    raw_text: &str,
    fallback_name: &str,
    is_roster_line: impl Fn(&str) -> bool,
) -> String {
    if let Some(label) = labelled_line(raw_text) {
        return label;
    }

    let header_lines: Vec<&str> = raw_text
        .lines()
        .filter(|&line| !is_roster_line(line))
        .collect();

    for pattern in [&*CYCLE_CODE_RE, &*COURSE_CODE_RE] {
        if let Some(code) = header_lines.iter().find_map(|line| pattern.find(line)) {
            return collapse_whitespace(code.as_str());
        }
    }

    let stem = strip_extension(fallback_name.trim());
    if stem.is_empty() {
        UNNAMED_CLASS.to_string()
    } else {
        stem.to_string()
    }
}

fn labelled_line(raw_text: &str) -> Option<String> {
    raw_text.lines().find_map(|line| {
        let caps = LABEL_LINE_RE.captures(line)?;
        let rest = caps.get(1)?.as_str().trim();
        (!rest.is_empty()).then(|| rest.to_string())
    })
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops a trailing file extension: letters and digits with at least one
/// letter, e.g. `.pdf`. Dots inside a label ("2024.1 final") are kept.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let extension = &name[dot + 1..];
            let is_extension = extension.chars().all(|c| c.is_ascii_alphanumeric())
                && extension.chars().any(|c| c.is_ascii_alphabetic());
            if is_extension {
                &name[..dot]
            } else {
                name
            }
        }
        _ => name,
    }
}

/// Storage key for a class label; labels without any usable characters
/// share the unnamed-class key.
pub fn class_key(label: &str) -> String {
    let slug = slugify(label);
    if slug.is_empty() {
        slugify(UNNAMED_CLASS)
    } else {
        slug
    }
}

/// Lowercase, accent-free, hyphen-separated key for storage.
pub fn slugify(label: &str) -> String {
    let folded: String = label
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    NON_ALNUM_RE
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}
