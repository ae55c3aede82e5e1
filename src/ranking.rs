use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::identify::class_key;
use crate::models::{AttendanceRecord, ClassReport, ClassSummary, GlobalRanking, RankingEntry};

/// Mean attendance rounded to two decimals; 0 for an empty roster.
pub fn class_average(records: &[AttendanceRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }

    let total: f64 = records.iter().map(|r| r.attendance_percent).sum();
    round_2(total / records.len() as f64)
}

pub fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Best attendance per student across all reports, highest first.
///
/// Names are compared exactly. Equal values are ordered by name.
pub fn aggregate(reports: &[ClassReport]) -> Vec<RankingEntry> {
    let best = reports
        .iter()
        .flat_map(|report| report.records.iter())
        .fold(HashMap::<&str, f64>::new(), |mut best, record| {
            best.entry(record.name.as_str())
                .and_modify(|value| {
                    if record.attendance_percent > *value {
                        *value = record.attendance_percent;
                    }
                })
                .or_insert(record.attendance_percent);
            best
        });

    let mut entries: Vec<RankingEntry> = best
        .into_iter()
        .map(|(name, best_attendance_percent)| RankingEntry {
            name: name.to_string(),
            best_attendance_percent,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.best_attendance_percent
            .total_cmp(&a.best_attendance_percent)
            .then_with(|| a.name.cmp(&b.name))
    });
    entries
}

pub fn build_ranking(reports: &[ClassReport], updated_at: DateTime<Utc>) -> GlobalRanking {
    GlobalRanking {
        updated_at,
        ranking: aggregate(reports),
    }
}

/// Classes ordered by average, highest first.
pub fn rank_classes(reports: &[ClassReport]) -> Vec<ClassSummary> {
    let mut summaries: Vec<ClassSummary> = reports
        .iter()
        .map(|report| ClassSummary {
            class_label: report.class_label.clone(),
            slug: class_key(&report.class_label),
            average: report.average,
            student_count: report.records.len(),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.average
            .total_cmp(&a.average)
            .then_with(|| a.class_label.cmp(&b.class_label))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(label: &str, rows: &[(&str, f64)]) -> ClassReport {
        let records: Vec<AttendanceRecord> = rows
            .iter()
            .map(|(name, value)| AttendanceRecord::new(*name, *value))
            .collect();
        ClassReport {
            class_label: label.to_string(),
            average: class_average(&records),
            records,
            updated_at: Utc::now(),
        }
    }

    fn pairs(entries: &[RankingEntry]) -> Vec<(&str, f64)> {
        entries
            .iter()
            .map(|e| (e.name.as_str(), e.best_attendance_percent))
            .collect()
    }

    #[test]
    fn average_of_empty_roster_is_zero() {
        assert_eq!(class_average(&[]), 0.0);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let records = vec![
            AttendanceRecord::new("A", 95.5),
            AttendanceRecord::new("B", 80.0),
            AttendanceRecord::new("C", 70.25),
        ];
        assert_eq!(class_average(&records), 81.92);
    }

    #[test]
    fn average_ignores_input_order() {
        let mut records = vec![
            AttendanceRecord::new("A", 33.33),
            AttendanceRecord::new("B", 66.67),
            AttendanceRecord::new("C", 12.5),
        ];
        let forward = class_average(&records);
        records.reverse();
        assert_eq!(class_average(&records), forward);
    }

    #[test]
    fn best_value_wins_across_classes() {
        let reports = vec![
            report("A", &[("JOAO", 80.0)]),
            report("B", &[("JOAO", 92.0), ("ANA", 77.0)]),
        ];
        assert_eq!(pairs(&aggregate(&reports)), vec![("JOAO", 92.0), ("ANA", 77.0)]);
    }

    #[test]
    fn duplicates_in_one_class_collapse_to_maximum() {
        let reports = vec![report("A", &[("ANA", 60.0), ("ANA", 75.5), ("ANA", 70.0)])];
        assert_eq!(pairs(&aggregate(&reports)), vec![("ANA", 75.5)]);
    }

    #[test]
    fn ties_are_ordered_by_name() {
        let reports = vec![report("A", &[("ZE", 90.0), ("BIA", 90.0), ("CAIO", 95.0)])];
        assert_eq!(
            pairs(&aggregate(&reports)),
            vec![("CAIO", 95.0), ("BIA", 90.0), ("ZE", 90.0)]
        );
    }

    #[test]
    fn ranking_is_non_increasing() {
        let reports = vec![
            report("A", &[("A1", 10.0), ("A2", 99.99), ("A3", 50.0)]),
            report("B", &[("A1", 55.5), ("B1", 0.0), ("B2", 100.0)]),
        ];
        let ranking = aggregate(&reports);
        assert_eq!(ranking.len(), 5);
        assert!(ranking
            .windows(2)
            .all(|w| w[0].best_attendance_percent >= w[1].best_attendance_percent));
    }

    #[test]
    fn empty_input_gives_empty_ranking() {
        assert!(aggregate(&[]).is_empty());
        assert!(build_ranking(&[], Utc::now()).ranking.is_empty());
    }

    #[test]
    fn unsluggable_class_uses_shared_key() {
        let summaries = rank_classes(&[report("???", &[("X", 70.0)])]);
        assert_eq!(summaries[0].slug, "unnamed-class");
    }

    #[test]
    fn equal_class_averages_ordered_by_label() {
        let reports = vec![
            report("Turma C", &[("X", 80.0)]),
            report("Turma A", &[("Y", 80.0)]),
        ];
        let labels: Vec<_> = rank_classes(&reports)
            .into_iter()
            .map(|s| s.class_label)
            .collect();
        assert_eq!(labels, vec!["Turma A", "Turma C"]);
    }

    #[test]
    fn classes_sorted_by_average() {
        let reports = vec![
            report("Turma B", &[("X", 70.0)]),
            report("Turma A", &[("Y", 90.0), ("Z", 80.0)]),
        ];
        let summaries = rank_classes(&reports);
        assert_eq!(summaries[0].class_label, "Turma A");
        assert_eq!(summaries[0].slug, "turma-a");
        assert_eq!(summaries[0].average, 85.0);
        assert_eq!(summaries[0].student_count, 2);
        assert_eq!(summaries[1].class_label, "Turma B");
    }
}
