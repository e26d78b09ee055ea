pub mod config;

use std::path::Path;
use std::sync::Mutex;

use chrono::FixedOffset;
use report_model::{Maker, RawDateValue, ReportId, ReportRecord};
use report_store::orchestrator::{
    backfill_event_ts, ingest_reports_orchestrated, resync_event_ts_orchestrated, IngestReport,
    OrchestratorError, ResyncReport,
};
use report_store::predicate::build_predicate;
use report_store::sqlite_repo::SqliteRepo;
use report_store::{parse_maker_slugs, ListQuery, ReportOrder, SortDir, SortKey, StoreError};
use serde::Deserialize;
use text_normalizer::format::{event_date_label, join_names};
use text_normalizer::{Clock, DateNormalizer, SystemClock};

pub use config::{ServiceConfig, REPORT_DEFAULTS};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
    #[error("config error: {0}")]
    Config(String),
    #[error("import error: {0}")]
    Import(String),
    #[error("repository lock poisoned")]
    Poisoned,
}

/// One listing request. Unset fields fall back to the service configuration.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Keyword phrase; blank means no keyword filter.
    pub phrase: Option<String>,
    /// Comma separated maker slugs.
    pub makers: Option<String>,
    pub sort: Option<SortKey>,
    pub dir: Option<SortDir>,
    /// 1-based page; 0 is treated as 1.
    pub page: usize,
    pub per_page: Option<usize>,
}

/// Display-ready listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub id: ReportId,
    pub event_ts: Option<i64>,
    /// `YYYY年MM月DD日` or `—`.
    pub event_date: String,
    pub makers: String,
    pub title: String,
    /// Acceptance-slip download URL; `None` renders as `—`.
    pub attachment_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPage {
    pub rows: Vec<ReportRow>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub max_pages: usize,
    pub sort: SortKey,
    pub dir: SortDir,
}

impl ReportPage {
    /// Direction a column-header click should request next.
    pub fn toggle_dir(&self) -> SortDir { self.dir.toggled() }
    pub fn has_next(&self) -> bool { self.page < self.max_pages }
}

/// Import shape: dates may be any JSON the field source produced.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportInput {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub makers: Vec<Maker>,
    #[serde(default)]
    pub event_date: serde_json::Value,
    #[serde(default)]
    pub published_at: serde_json::Value,
    /// File map with a `url` entry, or a plain URL string.
    #[serde(default)]
    pub attachment: serde_json::Value,
}

pub struct ReportService<C: Clock = SystemClock> {
    cfg: ServiceConfig,
    offset: FixedOffset,
    normalizer: DateNormalizer<C>,
    repo: Mutex<SqliteRepo>,
}

impl ReportService<SystemClock> {
    /// Open (or create) the configured database using the wall clock.
    pub fn new(cfg: ServiceConfig) -> Result<Self, ServiceError> {
        Self::with_clock(cfg, SystemClock)
    }
}

impl<C: Clock> ReportService<C> {
    pub fn with_clock(cfg: ServiceConfig, clock: C) -> Result<Self, ServiceError> {
        cfg.validate()?;
        let offset = cfg.offset()?;
        ensure_parent_dir(&cfg.db_path)?;
        let repo = SqliteRepo::open(&cfg.db_path)?;
        tracing::debug!(db = %cfg.db_path.display(), offset = %offset, "report service opened");
        Ok(Self { normalizer: DateNormalizer::with_clock(offset, clock), offset, cfg, repo: Mutex::new(repo) })
    }

    pub fn config(&self) -> &ServiceConfig { &self.cfg }

    pub fn normalizer(&self) -> &DateNormalizer<C> { &self.normalizer }

    /// Guarded access to the primary SQLite repo.
    pub fn with_repo<R, F>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut SqliteRepo) -> Result<R, ServiceError>,
    {
        let mut guard = self.repo.lock().map_err(|_| ServiceError::Poisoned)?;
        f(&mut guard)
    }

    /// Normalise a raw event date with this service's reference offset and clock.
    pub fn normalize_date(&self, raw: &RawDateValue) -> Option<i64> {
        self.normalizer.normalize(raw)
    }

    pub fn ingest(&self, records: Vec<ReportRecord>) -> Result<IngestReport, ServiceError> {
        self.with_repo(|repo| Ok(ingest_reports_orchestrated(repo, records, &self.normalizer)?))
    }

    /// Convert import rows to records. Unusable `published_at` values become "now".
    pub fn records_from_inputs(&self, inputs: Vec<ReportInput>) -> Vec<ReportRecord> {
        let now = self.normalizer_now();
        inputs
            .into_iter()
            .map(|inp| {
                let published_at = self
                    .normalizer
                    .normalize(&RawDateValue::from_json(&inp.published_at))
                    .unwrap_or(now);
                ReportRecord {
                    id: ReportId(inp.id),
                    title: inp.title,
                    content: inp.content,
                    excerpt: inp.excerpt,
                    makers: inp.makers,
                    event_date_raw: RawDateValue::from_json(&inp.event_date),
                    event_ts: None,
                    published_at,
                    attachment_raw: inp.attachment,
                }
            })
            .collect()
    }

    /// Import a JSON array of [`ReportInput`] objects.
    pub fn import_json_file<P: AsRef<Path>>(&self, path: P) -> Result<IngestReport, ServiceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Import(format!("read {}: {e}", path.display())))?;
        let inputs: Vec<ReportInput> = serde_json::from_str(&text)
            .map_err(|e| ServiceError::Import(format!("parse {}: {e}", path.display())))?;
        self.ingest(self.records_from_inputs(inputs))
    }

    /// Run one listing: keyword + maker filters, ordering, paging and row formatting.
    pub fn list(&self, req: &ListRequest) -> Result<ReportPage, ServiceError> {
        let sort = req.sort.unwrap_or(self.cfg.default_sort);
        let dir = req.dir.unwrap_or(self.cfg.default_dir);
        let per_page = req.per_page.filter(|n| *n > 0).unwrap_or(self.cfg.posts_per_page);
        let page = req.page.max(1);

        let query = ListQuery {
            predicate: req
                .phrase
                .as_deref()
                .and_then(|p| build_predicate(p, &self.cfg.search_fields)),
            maker_slugs: req.makers.as_deref().map(parse_maker_slugs).unwrap_or_default(),
        };

        let (total, mut records) = self.with_repo(|repo| {
            let total = repo.count_reports(&query)?;
            let records = repo.list_reports(
                &query,
                ReportOrder { key: sort, dir },
                per_page,
                (page - 1).saturating_mul(per_page),
            )?;
            Ok((total, records))
        })?;

        self.with_repo(|repo| Ok(backfill_event_ts(repo, &mut records, &self.normalizer)?))?;

        let rows = records.iter().map(|r| self.row_for(r)).collect();
        Ok(ReportPage { rows, page, per_page, total, max_pages: total.div_ceil(per_page), sort, dir })
    }

    /// Recompute all cached event timestamps with the current reference offset.
    pub fn resync(&self) -> Result<ResyncReport, ServiceError> {
        self.with_repo(|repo| Ok(resync_event_ts_orchestrated(repo, &self.normalizer, 200)?))
    }

    pub fn delete(&self, ids: &[ReportId]) -> Result<usize, ServiceError> {
        self.with_repo(|repo| Ok(repo.delete_by_ids(ids)?))
    }

    pub fn get(&self, id: &ReportId) -> Result<Option<ReportRecord>, ServiceError> {
        self.with_repo(|repo| Ok(repo.get_report(id)?))
    }

    fn row_for(&self, rec: &ReportRecord) -> ReportRow {
        let names: Vec<&str> = rec.makers.iter().map(|m| m.name.as_str()).collect();
        ReportRow {
            id: rec.id.clone(),
            event_ts: rec.event_ts,
            event_date: event_date_label(rec.event_ts, self.offset),
            makers: join_names(&names, self.cfg.jp_separator),
            title: rec.title.clone(),
            attachment_url: rec.attachment_url(),
        }
    }

    fn normalizer_now(&self) -> i64 {
        self.normalizer.clock().now().timestamp()
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ServiceError::Config(format!("create {}: {e}", parent.display())))?;
    }
    Ok(())
}
