use report_model::{ReportId, ReportRecord};
use text_normalizer::{Clock, DateNormalizer};

use crate::sqlite_repo::SqliteRepo;
use crate::{ReportPrimaryStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub total: usize,
    pub dated: usize,
    pub undated: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResyncReport {
    pub scanned: usize,
    pub changed: usize,
    pub batches: usize,
}

/// Ingest: recompute each record's cached event timestamp from its raw date, then upsert.
///
/// A raw date that no longer parses clears the cached value.
pub fn ingest_reports_orchestrated<C: Clock>(
    repo: &mut SqliteRepo,
    mut records: Vec<ReportRecord>,
    normalizer: &DateNormalizer<C>,
) -> Result<IngestReport, OrchestratorError> {
    let mut report = IngestReport { total: records.len(), ..Default::default() };
    if records.is_empty() {
        return Ok(report);
    }
    for rec in &mut records {
        rec.event_ts = normalizer.normalize(&rec.event_date_raw);
        if rec.event_ts.is_some() {
            report.dated += 1;
        } else {
            report.undated += 1;
            if !rec.event_date_raw.is_empty() {
                tracing::warn!(id = %rec.id, raw = ?rec.event_date_raw, "event date did not normalise");
            }
        }
    }
    repo.upsert_reports(records)?;
    tracing::info!(total = report.total, dated = report.dated, undated = report.undated, "ingested reports");
    Ok(report)
}

/// Fill in missing cached timestamps on freshly read rows and persist the ones found.
/// Returns how many rows were updated.
pub fn backfill_event_ts<C: Clock>(
    repo: &SqliteRepo,
    records: &mut [ReportRecord],
    normalizer: &DateNormalizer<C>,
) -> Result<usize, OrchestratorError> {
    let mut updated = 0usize;
    for rec in records.iter_mut().filter(|r| r.event_ts.is_none()) {
        if let Some(ts) = normalizer.normalize(&rec.event_date_raw) {
            repo.set_event_ts(&rec.id, Some(ts))?;
            rec.event_ts = Some(ts);
            updated += 1;
        }
    }
    if updated > 0 {
        tracing::info!(updated, "backfilled event timestamps");
    }
    Ok(updated)
}

/// Recompute every cached timestamp in batches (e.g. after changing the reference offset).
pub fn resync_event_ts_orchestrated<C: Clock>(
    repo: &SqliteRepo,
    normalizer: &DateNormalizer<C>,
    batch_size: usize,
) -> Result<ResyncReport, OrchestratorError> {
    use crate::ReportStoreRead;

    let mut report = ResyncReport::default();
    let batch = batch_size.max(1);
    let mut offset = 0usize;
    loop {
        let ids: Vec<ReportId> = repo.list_all_ids(batch, offset)?;
        if ids.is_empty() {
            break;
        }
        offset += ids.len();
        report.batches += 1;
        for rec in repo.get_reports_by_ids(&ids)? {
            report.scanned += 1;
            let ts = normalizer.normalize(&rec.event_date_raw);
            if ts != rec.event_ts {
                repo.set_event_ts(&rec.id, ts)?;
                report.changed += 1;
            }
        }
    }
    tracing::info!(scanned = report.scanned, changed = report.changed, "resynced event timestamps");
    Ok(report)
}
