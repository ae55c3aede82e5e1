//! Attendance record extraction from PDF-derived text.
//!
//! Report layouts drift between exports, so recognition is driven by an
//! ordered list of [`RecordMatcher`]s. Each line carrying a status marker is
//! offered to the matchers in priority order and the first one that yields a
//! record wins. Lines that no matcher can turn into a record are dropped.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::IngestError;
use crate::models::AttendanceRecord;

/// Stem of "Matriculado"/"Matriculada", the enrolled status on the roster.
pub const DEFAULT_STATUS_MARKER: &str = "Matriculad";

/// Comma-decimal percentage with 1-3 integer digits and exactly 2 decimals.
pub const DEFAULT_PERCENT_PATTERN: &str = r"\d{1,3},\d{2}";

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_PERCENT_PATTERN).expect("valid regex"));

/// Recognizes one layout of roster line.
#[derive(Debug, Clone)]
pub struct RecordMatcher {
    label: String,
    marker: String,
    percent: Regex,
    lookahead: usize,
}

impl RecordMatcher {
    /// Builds a matcher with a custom percentage pattern.
    ///
    /// The first match of `percent_pattern` in a candidate segment is read
    /// as the attendance value, with its comma treated as the decimal point.
    pub fn new(
        label: impl Into<String>,
        marker: impl Into<String>,
        percent_pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.into(),
            marker: marker.into(),
            percent: Regex::new(percent_pattern)?,
            lookahead: 0,
        })
    }

    /// Marker and percentage on the same line.
    pub fn single_line(marker: impl Into<String>) -> Self {
        Self {
            label: "single-line".to_string(),
            marker: marker.into(),
            percent: PERCENT_RE.clone(),
            lookahead: 0,
        }
    }

    /// Allows the percentage to wrap onto up to `lines` following lines.
    /// A continuation line is either blank or holds nothing but the
    /// percentage.
    pub fn with_lookahead(mut self, lines: usize) -> Self {
        self.lookahead = lines;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn marks(&self, line: &str) -> bool {
        line.contains(&self.marker)
    }

    fn is_bare_percentage(&self, line: &str) -> bool {
        self.percent
            .find(line)
            .is_some_and(|m| m.start() == 0 && m.end() == line.len())
    }

    /// Tries to build a record starting at `lines[start]`. Returns the
    /// record and how many lines it consumed.
    fn capture(&self, lines: &[&str], start: usize) -> Option<(AttendanceRecord, usize)> {
        if !self.marks(lines[start]) {
            return None;
        }

        let mut segment = lines[start].to_string();
        let mut used = 1;
        while !self.percent.is_match(&segment) {
            let next = start + used;
            if used > self.lookahead || next >= lines.len() {
                return None;
            }
            let continuation = lines[next].trim();
            if !continuation.is_empty() && !self.is_bare_percentage(continuation) {
                return None;
            }
            segment.push(' ');
            segment.push_str(continuation);
            used += 1;
        }

        let token = self.percent.find(&segment)?.as_str();
        let attendance_percent = match token.replace(',', ".").parse::<f64>() {
            Ok(value) if (0.0..=100.0).contains(&value) => value,
            _ => {
                log::warn!(
                    "Dropping roster line {}: unusable percentage {token:?}",
                    start + 1
                );
                return None;
            }
        };

        let name = student_name(&segment);
        if name.is_empty() {
            log::warn!(
                "Dropping roster line {}: no student name before the registration number",
                start + 1
            );
            return None;
        }

        Some((AttendanceRecord::new(name, attendance_percent), used))
    }
}

/// Joins the tokens preceding the first purely numeric token (the
/// registration number) with single spaces.
fn student_name(segment: &str) -> String {
    segment
        .split_whitespace()
        .take_while(|token| !is_registration_number(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_registration_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Ordered matcher set applied line by line.
#[derive(Debug, Clone)]
pub struct Extractor {
    matchers: Vec<RecordMatcher>,
}

impl Extractor {
    pub fn new(matchers: Vec<RecordMatcher>) -> Self {
        Self { matchers }
    }

    /// Same-line rows first, then rows whose percentage wrapped onto the
    /// next two lines.
    pub fn standard(marker: &str) -> Self {
        Self::new(vec![
            RecordMatcher::single_line(marker),
            RecordMatcher::single_line(marker)
                .with_lookahead(2)
                .with_label("wrapped"),
        ])
    }

    /// Like [`Extractor::standard`] but with a caller-supplied percentage
    /// pattern.
    pub fn with_percent_pattern(marker: &str, percent_pattern: &str) -> Result<Self, IngestError> {
        let single = RecordMatcher::new("single-line", marker, percent_pattern)?;
        let wrapped = single.clone().with_lookahead(2).with_label("wrapped");
        Ok(Self::new(vec![single, wrapped]))
    }

    /// Extracts records in the order they appear in `raw_text`. Duplicates
    /// are kept.
    pub fn is_roster_line(&self, line: &str) -> bool {
        self.matchers.iter().any(|m| m.marks(line))
    }

    pub fn extract(&self, raw_text: &str) -> Vec<AttendanceRecord> {
        let lines: Vec<&str> = raw_text.lines().collect();
        let mut records = Vec::new();
        let mut idx = 0;

        while idx < lines.len() {
            if !self.is_roster_line(lines[idx]) {
                idx += 1;
                continue;
            }

            let hit = self.matchers.iter().find_map(|matcher| {
                matcher
                    .capture(&lines, idx)
                    .map(|(record, used)| (matcher.label(), record, used))
            });

            match hit {
                Some((label, record, used)) => {
                    log::debug!("Line {} matched by {label}: {}", idx + 1, record.name);
                    records.push(record);
                    idx += used;
                }
                None => {
                    log::debug!("Skipping line {}: status marker without attendance", idx + 1);
                    idx += 1;
                }
            }
        }

        records
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::standard(DEFAULT_STATUS_MARKER)
    }
}

/// Reads the text layer of an in-memory PDF.
pub fn pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyUpload);
    }

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| IngestError::Extraction(format!("failed to extract text from PDF: {e}")))?;

    log::debug!("Extracted {} characters of text from {} bytes", text.len(), bytes.len());

    Ok(text)
}

pub fn pdf_text_from_path(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path)?;
    pdf_text(&bytes)
}
