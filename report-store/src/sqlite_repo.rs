use std::collections::HashMap;
use std::path::Path;

use report_model::{Maker, RawDateValue, ReportId, ReportRecord};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::sql_lowering::{lower_predicate, report_column};
use crate::{ListQuery, ReportOrder, ReportPrimaryStore, ReportStoreRead, SortKey, StoreError};

/// SQLite-backed primary store for reports and their makers.
pub struct SqliteRepo {
    conn: Connection,
}

impl SqliteRepo {
    /// Open an in-memory repository and initialize schema.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.init()?;
        Ok(repo)
    }

    /// Open a file-backed repository at `path` and initialize schema if absent.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.init()?;
        Ok(repo)
    }

    fn init(&self) -> rusqlite::Result<()> {
        let mode: String = self.conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            // in-memory databases report "memory"
            tracing::debug!(%mode, "journal mode kept");
        }
        self.conn.pragma_update(None, "synchronous", "FULL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                rowid INTEGER PRIMARY KEY,
                report_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                excerpt TEXT NOT NULL,
                event_date_raw_json TEXT NOT NULL,
                event_ts INTEGER,
                published_at INTEGER NOT NULL,
                attachment_raw_json TEXT NOT NULL DEFAULT 'null'
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_report_id ON reports(report_id);
            CREATE INDEX IF NOT EXISTS idx_reports_event_ts ON reports(event_ts);
            CREATE INDEX IF NOT EXISTS idx_reports_published_at ON reports(published_at);

            -- Maker terms attached to a report, in display order
            CREATE TABLE IF NOT EXISTS report_makers (
                report_id TEXT NOT NULL REFERENCES reports(report_id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                slug TEXT NOT NULL,
                name TEXT NOT NULL,
                PRIMARY KEY (report_id, slug)
            );
            CREATE INDEX IF NOT EXISTS idx_report_makers_slug ON report_makers(slug);
            "#,
        )?;

        // databases created before attachments were stored
        if !self.has_column("reports", "attachment_raw_json")? {
            self.conn.execute(
                "ALTER TABLE reports ADD COLUMN attachment_raw_json TEXT NOT NULL DEFAULT 'null'",
                [],
            )?;
        }
        Ok(())
    }

    fn has_column(&self, table: &str, column: &str) -> rusqlite::Result<bool> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let names = stmt.query_map([], |r| r.get::<_, String>(1))?;
        for name in names {
            if name? == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Fetch one report.
    pub fn get_report(&self, id: &ReportId) -> Result<Option<ReportRecord>, StoreError> {
        Ok(self.get_reports_by_ids(std::slice::from_ref(id))?.into_iter().next())
    }

    /// Cached event timestamp of one report (`None` if unknown or undated).
    pub fn event_ts_of(&self, id: &ReportId) -> Result<Option<i64>, StoreError> {
        let ts: Option<Option<i64>> = self
            .conn
            .query_row("SELECT event_ts FROM reports WHERE report_id = ?1", [id.as_str()], |r| r.get(0))
            .optional()?;
        Ok(ts.flatten())
    }

    /// Overwrite the cached event timestamp of one report. Returns false if it does not exist.
    pub fn set_event_ts(&self, id: &ReportId, ts: Option<i64>) -> Result<bool, StoreError> {
        let n = self.conn.execute(
            "UPDATE reports SET event_ts = ?1 WHERE report_id = ?2",
            params![ts, id.as_str()],
        )?;
        Ok(n > 0)
    }

    /// Delete reports (and their maker links). Returns the number of rows removed.
    pub fn delete_by_ids(&mut self, ids: &[ReportId]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut total = 0usize;
        {
            let mut stmt = tx.prepare("DELETE FROM reports WHERE report_id = ?1")?;
            for id in ids {
                total += stmt.execute([id.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(total)
    }

    /// Count of all stored reports.
    pub fn count_all(&self) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row("SELECT count(*) FROM reports", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    /// Page through all report ids in insertion order.
    pub fn list_all_ids(&self, limit: usize, offset: usize) -> Result<Vec<ReportId>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT report_id FROM reports ORDER BY rowid LIMIT ?1 OFFSET ?2")?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(ReportId(r?));
        }
        Ok(out)
    }

    /// Count reports matching `query`.
    pub fn count_reports(&self, query: &ListQuery) -> Result<usize, StoreError> {
        let (where_sql, params) = build_where(query);
        let sql = format!("SELECT count(*) FROM reports r {where_sql}");
        tracing::debug!(%sql, params = params.len(), "count reports");
        let n: i64 = self
            .conn
            .query_row(&sql, rusqlite::params_from_iter(params), |r| r.get(0))?;
        Ok(n as usize)
    }

    /// List report ids matching `query` in `order` with pagination.
    pub fn list_report_ids(
        &self,
        query: &ListQuery,
        order: ReportOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReportId>, StoreError> {
        let (where_sql, mut params) = build_where(query);
        let sql = format!(
            "SELECT r.report_id FROM reports r {where_sql} ORDER BY {} LIMIT ? OFFSET ?",
            order_by(order)
        );
        params.push(Value::from(limit as i64));
        params.push(Value::from(offset as i64));
        tracing::debug!(%sql, params = params.len(), "list reports");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(ReportId(r?));
        }
        Ok(out)
    }

    /// Convenience: ids then full records, order preserved.
    pub fn list_reports(
        &self,
        query: &ListQuery,
        order: ReportOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReportRecord>, StoreError> {
        let ids = self.list_report_ids(query, order, limit, offset)?;
        self.get_reports_by_ids(&ids)
    }

    fn makers_for(&self, ids: &[ReportId]) -> Result<HashMap<String, Vec<Maker>>, StoreError> {
        let mut out: HashMap<String, Vec<Maker>> = HashMap::new();
        if ids.is_empty() {
            return Ok(out);
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!(
            "SELECT report_id, slug, name FROM report_makers WHERE report_id IN ({placeholders}) ORDER BY report_id, position"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter().map(|i| i.as_str())), |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
        })?;
        for r in rows {
            let (id, slug, name) = r?;
            out.entry(id).or_default().push(Maker { slug, name });
        }
        Ok(out)
    }
}

impl ReportPrimaryStore for SqliteRepo {
    fn upsert_reports(&mut self, reports: Vec<ReportRecord>) -> Result<(), StoreError> {
        if reports.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut up = tx.prepare(
                r#"
                INSERT INTO reports (report_id, title, content, excerpt, event_date_raw_json, event_ts, published_at, attachment_raw_json)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(report_id) DO UPDATE SET
                    title=excluded.title,
                    content=excluded.content,
                    excerpt=excluded.excerpt,
                    event_date_raw_json=excluded.event_date_raw_json,
                    event_ts=excluded.event_ts,
                    published_at=excluded.published_at,
                    attachment_raw_json=excluded.attachment_raw_json
                "#,
            )?;
            let mut clear_makers = tx.prepare("DELETE FROM report_makers WHERE report_id = ?1")?;
            let mut add_maker = tx.prepare(
                "INSERT OR REPLACE INTO report_makers (report_id, position, slug, name) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for rec in &reports {
                let raw_json = serde_json::to_string(&rec.event_date_raw)
                    .map_err(|e| StoreError::Backend(format!("encode event date: {e}")))?;
                let attachment_json = serde_json::to_string(&rec.attachment_raw)
                    .map_err(|e| StoreError::Backend(format!("encode attachment: {e}")))?;
                up.execute(params![
                    rec.id.as_str(),
                    rec.title,
                    rec.content,
                    rec.excerpt,
                    raw_json,
                    rec.event_ts,
                    rec.published_at,
                    attachment_json,
                ])?;
                clear_makers.execute([rec.id.as_str()])?;
                for (pos, m) in rec.makers.iter().enumerate() {
                    add_maker.execute(params![rec.id.as_str(), pos as i64, m.slug, m.name])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl ReportStoreRead for SqliteRepo {
    /// Records come back in the order of `ids`; unknown ids are skipped.
    fn get_reports_by_ids(&self, ids: &[ReportId]) -> Result<Vec<ReportRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!(
            "SELECT report_id, title, content, excerpt, event_date_raw_json, event_ts, published_at, attachment_raw_json \
             FROM reports WHERE report_id IN ({placeholders})"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter().map(|i| i.as_str())), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, Option<i64>>(5)?,
                r.get::<_, i64>(6)?,
                r.get::<_, String>(7)?,
            ))
        })?;

        let mut by_id: HashMap<String, ReportRecord> = HashMap::new();
        for row in rows {
            let (id, title, content, excerpt, raw_json, event_ts, published_at, attachment_json) = row?;
            let event_date_raw: RawDateValue = serde_json::from_str(&raw_json)
                .map_err(|e| StoreError::Corrupt { id: id.clone(), reason: e.to_string() })?;
            let attachment_raw: serde_json::Value = serde_json::from_str(&attachment_json)
                .map_err(|e| StoreError::Corrupt { id: id.clone(), reason: e.to_string() })?;
            by_id.insert(
                id.clone(),
                ReportRecord {
                    id: ReportId(id),
                    title,
                    content,
                    excerpt,
                    makers: Vec::new(),
                    event_date_raw,
                    event_ts,
                    published_at,
                    attachment_raw,
                },
            );
        }

        let mut makers = self.makers_for(ids)?;
        let mut out = Vec::with_capacity(by_id.len());
        for id in ids {
            if let Some(mut rec) = by_id.remove(id.as_str()) {
                rec.makers = makers.remove(id.as_str()).unwrap_or_default();
                out.push(rec);
            }
        }
        Ok(out)
    }
}

fn build_where(query: &ListQuery) -> (String, Vec<Value>) {
    let mut where_sql = String::from("WHERE 1=1");
    let mut params: Vec<Value> = Vec::new();

    if let Some(pred) = &query.predicate {
        let frag = lower_predicate(pred, report_column);
        where_sql.push_str(" AND ");
        where_sql.push_str(&frag.sql);
        params.extend(frag.params.into_iter().map(Value::from));
    }

    if !query.maker_slugs.is_empty() {
        where_sql.push_str(" AND r.report_id IN (SELECT m.report_id FROM report_makers m WHERE m.slug IN (");
        for (i, slug) in query.maker_slugs.iter().enumerate() {
            if i > 0 {
                where_sql.push(',');
            }
            where_sql.push('?');
            params.push(Value::from(slug.clone()));
        }
        where_sql.push_str("))");
    }
    (where_sql, params)
}

fn order_by(order: ReportOrder) -> String {
    let dir = order.dir.as_sql();
    match order.key {
        // undated rows last in either direction; newest post breaks ties
        SortKey::Event => format!("(r.event_ts IS NULL) ASC, r.event_ts {dir}, r.published_at DESC, r.rowid DESC"),
        SortKey::Post => format!("r.published_at {dir}, r.rowid {dir}"),
    }
}
