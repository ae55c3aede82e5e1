use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One student's attendance as read from a single class report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub name: String,
    pub attendance_percent: f64,
}

impl AttendanceRecord {
    pub fn new(name: impl Into<String>, attendance_percent: f64) -> Self {
        Self {
            name: name.into(),
            attendance_percent,
        }
    }
}

/// Stored result for one class, replaced wholesale on every upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReport {
    pub class_label: String,
    pub average: f64,
    pub records: Vec<AttendanceRecord>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub name: String,
    pub best_attendance_percent: f64,
}

/// Best attendance per student across every stored class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRanking {
    pub updated_at: DateTime<Utc>,
    pub ranking: Vec<RankingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub class_label: String,
    pub slug: String,
    pub average: f64,
    pub student_count: usize,
}

/// Per-class result computed from one upload, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedUpload {
    pub class_label: String,
    pub slug: String,
    pub average: f64,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub class_label: String,
    pub slug: String,
    pub average: f64,
    pub records: Vec<AttendanceRecord>,
    pub ranking: GlobalRanking,
}
