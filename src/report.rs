use std::fmt::Write;
use std::path::Path;

use anyhow::Context;

use crate::models::{ClassReport, GlobalRanking};
use crate::ranking;

pub fn build_report(reports: &[ClassReport], ranking: &GlobalRanking, limit: usize) -> String {
    let classes = ranking::rank_classes(reports);

    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Leaderboard");
    let _ = writeln!(
        output,
        "Generated {} from {} classes",
        ranking.updated_at.format("%Y-%m-%d %H:%M UTC"),
        classes.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Averages");

    if classes.is_empty() {
        let _ = writeln!(output, "No classes have been uploaded yet.");
    } else {
        for (position, class) in classes.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} ({}): {:.2}% across {} students",
                position + 1,
                class.class_label,
                class.slug,
                class.average,
                class.student_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Best Attendance");

    if ranking.ranking.is_empty() {
        let _ = writeln!(output, "No students recorded.");
    } else {
        for (position, entry) in ranking.ranking.iter().take(limit).enumerate() {
            let _ = writeln!(
                output,
                "{}. {} {:.2}%",
                position + 1,
                entry.name,
                entry.best_attendance_percent
            );
        }
    }

    output
}

/// Writes the `{ updatedAt, ranking }` document.
pub fn write_ranking_json(path: &Path, ranking: &GlobalRanking) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(ranking)?;
    std::fs::write(path, body)
        .with_context(|| format!("failed to write ranking to {}", path.display()))?;
    Ok(())
}

pub fn write_ranking_csv(path: &Path, ranking: &GlobalRanking) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for entry in &ranking.ranking {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}
