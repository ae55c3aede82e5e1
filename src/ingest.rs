use chrono::Utc;

use crate::db::ReportStore;
use crate::error::IngestError;
use crate::extract::Extractor;
use crate::identify::{class_key, identify};
use crate::models::{ClassReport, GlobalRanking, ProcessedUpload, UploadOutcome};
use crate::ranking::{build_ranking, class_average};

/// Turns report text into a per-class result.
///
/// A non-blank `label_override` takes precedence over any label found in
/// the text. Fails with [`IngestError::NoRecords`] when nothing could be
/// extracted.
pub fn process_upload(
    extractor: &Extractor,
    raw_text: &str,
    fallback_label: &str,
    label_override: Option<&str>,
) -> Result<ProcessedUpload, IngestError> {
    let records = extractor.extract(raw_text);
    if records.is_empty() {
        return Err(IngestError::NoRecords);
    }

    let class_label = match label_override.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => identify(raw_text, fallback_label, |line| extractor.is_roster_line(line)),
    };

    let slug = class_key(&class_label);

    let average = class_average(&records);
    log::info!(
        "Extracted {} records for {class_label} ({slug}), average {average:.2}",
        records.len()
    );

    Ok(ProcessedUpload {
        class_label,
        slug,
        average,
        records,
    })
}

/// Stores the class result, then rebuilds and snapshots the ranking from
/// every stored class.
///
/// The write must succeed before anything is returned. Other classes may
/// change between the write and the listing; the ranking reflects whatever
/// the listing returns.
pub async fn ingest_and_rank<S: ReportStore>(
    store: &S,
    upload: ProcessedUpload,
) -> Result<UploadOutcome, IngestError> {
    let now = Utc::now();
    let report = ClassReport {
        class_label: upload.class_label.clone(),
        average: upload.average,
        records: upload.records,
        updated_at: now,
    };

    store.put(&upload.slug, &report).await?;

    let reports = store.list_all().await?;
    let ranking = build_ranking(&reports, now);
    store.save_ranking(&ranking).await?;

    log::info!(
        "Ranking rebuilt from {} classes with {} students",
        reports.len(),
        ranking.ranking.len()
    );

    Ok(UploadOutcome {
        class_label: report.class_label,
        slug: upload.slug,
        average: report.average,
        records: report.records,
        ranking,
    })
}

/// Recomputes the ranking from the store without changing it.
pub async fn current_ranking<S: ReportStore>(store: &S) -> Result<GlobalRanking, IngestError> {
    let reports = store.list_all().await?;
    Ok(build_ranking(&reports, Utc::now()))
}
