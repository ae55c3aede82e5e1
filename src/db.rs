use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::config::Config;
use crate::error::IngestError;
use crate::models::{AttendanceRecord, ClassReport, GlobalRanking};

/// Keyed storage for class reports.
///
/// `put` replaces everything stored under `slug` in one step.
pub trait ReportStore {
    async fn put(&self, slug: &str, report: &ClassReport) -> Result<(), IngestError>;

    async fn list_all(&self) -> Result<Vec<ClassReport>, IngestError>;

    async fn save_ranking(&self, ranking: &GlobalRanking) -> Result<(), IngestError>;
}

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReportStore for PgReportStore {
    async fn put(&self, slug: &str, report: &ClassReport) -> Result<(), IngestError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO attendance_leaderboard.class_reports (slug, class_label, average, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE
            SET class_label = EXCLUDED.class_label,
                average = EXCLUDED.average,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(slug)
        .bind(&report.class_label)
        .bind(report.average)
        .bind(report.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM attendance_leaderboard.attendance_records WHERE class_slug = $1")
            .bind(slug)
            .execute(&mut *tx)
            .await?;

        for (position, record) in report.records.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| IngestError::Storage(format!("roster for {slug} is too large")))?;

            sqlx::query(
                r#"
                INSERT INTO attendance_leaderboard.attendance_records
                (class_slug, position, name, attendance_percent)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(slug)
            .bind(position)
            .bind(&record.name)
            .bind(record.attendance_percent)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        log::info!("Stored {} records for class {slug}", report.records.len());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ClassReport>, IngestError> {
        let report_rows = sqlx::query(
            "SELECT slug, class_label, average, updated_at \
             FROM attendance_leaderboard.class_reports \
             ORDER BY slug",
        )
        .fetch_all(&self.pool)
        .await?;

        let record_rows = sqlx::query(
            "SELECT class_slug, name, attendance_percent \
             FROM attendance_leaderboard.attendance_records \
             ORDER BY class_slug, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records: HashMap<String, Vec<AttendanceRecord>> = HashMap::new();
        for row in record_rows {
            records
                .entry(row.try_get("class_slug")?)
                .or_default()
                .push(AttendanceRecord {
                    name: row.try_get("name")?,
                    attendance_percent: row.try_get("attendance_percent")?,
                });
        }

        let mut reports = Vec::with_capacity(report_rows.len());
        for row in report_rows {
            let slug: String = row.try_get("slug")?;
            let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
            reports.push(ClassReport {
                class_label: row.try_get("class_label")?,
                average: row.try_get("average")?,
                records: records.remove(&slug).unwrap_or_default(),
                updated_at,
            });
        }

        log::debug!("Loaded {} class reports", reports.len());
        Ok(reports)
    }

    async fn save_ranking(&self, ranking: &GlobalRanking) -> Result<(), IngestError> {
        let payload = serde_json::to_value(ranking)
            .map_err(|e| IngestError::Storage(format!("failed to encode ranking: {e}")))?;

        sqlx::query(
            "INSERT INTO attendance_leaderboard.ranking_snapshots (updated_at, payload) \
             VALUES ($1, $2)",
        )
        .bind(ranking.updated_at)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// In-process store with switchable write failures.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        reports: Mutex<BTreeMap<String, ClassReport>>,
        pub snapshots: Mutex<Vec<GlobalRanking>>,
        pub fail_writes: bool,
        pub fail_reads: bool,
    }

    impl MemoryStore {
        pub fn failing_writes() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        pub fn failing_reads() -> Self {
            Self {
                fail_reads: true,
                ..Self::default()
            }
        }

        pub fn report(&self, slug: &str) -> Option<ClassReport> {
            self.reports.lock().unwrap().get(slug).cloned()
        }

        pub fn len(&self) -> usize {
            self.reports.lock().unwrap().len()
        }
    }

    impl ReportStore for MemoryStore {
        async fn put(&self, slug: &str, report: &ClassReport) -> Result<(), IngestError> {
            if self.fail_writes {
                return Err(IngestError::Storage("write refused".to_string()));
            }
            self.reports
                .lock()
                .unwrap()
                .insert(slug.to_string(), report.clone());
            Ok(())
        }

        async fn list_all(&self) -> Result<Vec<ClassReport>, IngestError> {
            if self.fail_reads {
                return Err(IngestError::Storage("listing failed".to_string()));
            }
            Ok(self.reports.lock().unwrap().values().cloned().collect())
        }

        async fn save_ranking(&self, ranking: &GlobalRanking) -> Result<(), IngestError> {
            if self.fail_writes {
                return Err(IngestError::Storage("write refused".to_string()));
            }
            self.snapshots.lock().unwrap().push(ranking.clone());
            Ok(())
        }
    }
}
