use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use report_model::SearchField;
use report_store::{SortDir, SortKey};
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Default settings for a report listing.
#[derive(Debug, Clone, Copy)]
pub struct ReportDefaults {
    pub db_path: &'static str,
    pub posts_per_page: usize,
    pub sort: SortKey,
    pub dir: SortDir,
    pub jp_separator: bool,
    /// Reference offset for anchoring calendar dates (seconds east of UTC).
    pub utc_offset_seconds: i32,
}

/// Shared defaults so CLI and tests stay in sync.
pub const REPORT_DEFAULTS: ReportDefaults = ReportDefaults {
    db_path: "target/demo/reports.db",
    posts_per_page: 10,
    sort: SortKey::Event,
    dir: SortDir::Desc,
    jp_separator: true,
    utc_offset_seconds: 0,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub db_path: PathBuf,
    pub posts_per_page: usize,
    pub default_sort: SortKey,
    pub default_dir: SortDir,
    /// Join maker names with `、` instead of `, `.
    pub jp_separator: bool,
    pub utc_offset_seconds: i32,
    /// Fields the keyword search looks at, in order.
    pub search_fields: Vec<SearchField>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(REPORT_DEFAULTS.db_path),
            posts_per_page: REPORT_DEFAULTS.posts_per_page,
            default_sort: REPORT_DEFAULTS.sort,
            default_dir: REPORT_DEFAULTS.dir,
            jp_separator: REPORT_DEFAULTS.jp_separator,
            utc_offset_seconds: REPORT_DEFAULTS.utc_offset_seconds,
            search_fields: SearchField::ALL.to_vec(),
        }
    }
}

impl ServiceConfig {
    /// Load a JSON config; absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("read {}: {e}", path.display())))?;
        let cfg: ServiceConfig = serde_json::from_str(&text)
            .map_err(|e| ServiceError::Config(format!("parse {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        self.offset()?;
        if self.posts_per_page == 0 {
            return Err(ServiceError::Config("posts_per_page must be at least 1".into()));
        }
        Ok(())
    }

    /// Timezone policy for midnight anchoring and date display.
    pub fn offset(&self) -> Result<FixedOffset, ServiceError> {
        FixedOffset::east_opt(self.utc_offset_seconds).ok_or_else(|| {
            ServiceError::Config(format!("utc_offset_seconds out of range: {}", self.utc_offset_seconds))
        })
    }
}
