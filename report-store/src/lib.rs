pub mod predicate;
pub mod sql_lowering;
pub mod sqlite_repo;
pub mod orchestrator;

use report_model::{ReportId, ReportRecord};
use serde::{Deserialize, Serialize};

use crate::predicate::SearchPredicate;

/// Thin abstraction for the primary storage engine (DB-agnostic).
pub trait ReportPrimaryStore {
    /// Upsert a batch of reports atomically within the store.
    fn upsert_reports(&mut self, reports: Vec<ReportRecord>) -> Result<(), StoreError>;
}

/// Read side: fetch full records for ids returned by a listing query.
pub trait ReportStoreRead {
    fn get_reports_by_ids(&self, ids: &[ReportId]) -> Result<Vec<ReportRecord>, StoreError>;
}

// ------------------------------
// Listing query and options
// ------------------------------

/// Which instant a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Normalised event date; undated reports go last, ties broken by newest post.
    #[default]
    Event,
    /// Publication instant.
    Post,
}

impl SortKey {
    /// Lenient parse: anything but `post` means `event`.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("post") { SortKey::Post } else { SortKey::Event }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    /// Lenient parse: anything but `asc` means `desc`.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") { SortDir::Asc } else { SortDir::Desc }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportOrder {
    pub key: SortKey,
    pub dir: SortDir,
}

impl ReportOrder {
    /// Newest post first; used when an event-ordered listing comes back empty.
    pub const FALLBACK: ReportOrder = ReportOrder { key: SortKey::Post, dir: SortDir::Desc };
}

/// Filters for a listing. All present filters are AND-combined.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Kana-insensitive keyword predicate; `None` leaves results unconstrained.
    pub predicate: Option<SearchPredicate>,
    /// Maker slugs; a report matches when it carries any of them.
    pub maker_slugs: Vec<String>,
}

impl ListQuery {
    pub fn is_unconstrained(&self) -> bool {
        self.predicate.is_none() && self.maker_slugs.is_empty()
    }
}

/// Parse a comma separated maker list (`sony, toshiba`) into trimmed slugs.
pub fn parse_maker_slugs(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("corrupt row {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self { StoreError::Backend(e.to_string()) }
}
