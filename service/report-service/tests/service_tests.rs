use report_model::{Maker, RawDateValue, ReportId, ReportRecord};
use report_service::{ListRequest, ReportService, ServiceConfig, ServiceError, REPORT_DEFAULTS};
use report_store::{ReportPrimaryStore, SortDir, SortKey};
use text_normalizer::FixedClock;

const NOW: i64 = 1_760_704_200;
const JST: i32 = 9 * 3600;

fn service(dir: &tempfile::TempDir, per_page: usize) -> ReportService<FixedClock> {
    let cfg = ServiceConfig {
        db_path: dir.path().join("db/reports.db"),
        posts_per_page: per_page,
        utc_offset_seconds: JST,
        ..ServiceConfig::default()
    };
    ReportService::with_clock(cfg, FixedClock::at_timestamp(NOW)).expect("service")
}

fn report(id: &str, title: &str, raw: &str, published_at: i64, makers: &[(&str, &str)]) -> ReportRecord {
    let mut r = ReportRecord::new(id, title, published_at);
    r.event_date_raw = RawDateValue::from(raw);
    r.makers = makers.iter().map(|(s, n)| Maker::new(*s, *n)).collect();
    r
}

fn seed(svc: &ReportService<FixedClock>) {
    svc.ingest(vec![
        report("r1", "ｿﾆｰ製テレビが映らない", "20250801", 100, &[("sony", "ソニー")]),
        report("r2", "冷蔵庫の異音", "2025/03/05", 200, &[("toshiba", "東芝")]),
        report("r3", "洗濯機が停止", "", 300, &[("hitachi", "日立")]),
        report("r4", "ソニー ヘッドホン", "2024年2月29日", 400, &[("sony", "ソニー"), ("toshiba", "東芝")]),
    ])
    .expect("ingest");
}

fn row_ids(page: &report_service::ReportPage) -> Vec<&str> {
    page.rows.iter().map(|r| r.id.as_str()).collect()
}

#[test]
fn default_listing_orders_by_event_date_and_formats_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = service(&dir, 10);
    seed(&svc);

    let page = svc.list(&ListRequest::default()).expect("list");
    assert_eq!(page.sort, SortKey::Event);
    assert_eq!(page.dir, SortDir::Desc);
    assert_eq!(row_ids(&page), vec!["r1", "r2", "r4", "r3"]);
    assert_eq!(page.rows[0].event_date, "2025年08月01日");
    assert_eq!(page.rows[0].makers, "ソニー");
    assert_eq!(page.rows[2].makers, "ソニー、東芝");
    assert_eq!(page.rows[3].event_date, "—");
    assert_eq!(page.toggle_dir(), SortDir::Asc);
}

#[test]
fn keyword_makers_and_paging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = service(&dir, 1);
    seed(&svc);

    let req = ListRequest { phrase: Some("そにー".into()), ..Default::default() };
    let first = svc.list(&req).expect("page 1");
    assert_eq!(first.total, 2);
    assert_eq!(first.max_pages, 2);
    assert!(first.has_next());
    assert_eq!(row_ids(&first), vec!["r1"]);

    let second = svc.list(&ListRequest { page: 2, ..req.clone() }).expect("page 2");
    assert_eq!(row_ids(&second), vec!["r4"]);
    assert!(!second.has_next());

    let req = ListRequest {
        phrase: Some("ソニー".into()),
        makers: Some(" toshiba , ".into()),
        per_page: Some(10),
        ..Default::default()
    };
    assert_eq!(row_ids(&svc.list(&req).expect("filtered")), vec!["r4"]);

    let blank = ListRequest { phrase: Some("\u{3000} ".into()), per_page: Some(10), ..Default::default() };
    assert_eq!(svc.list(&blank).expect("blank").total, 4);

    let none = ListRequest { phrase: Some("パナソニック".into()), ..Default::default() };
    let empty = svc.list(&none).expect("no hits");
    assert_eq!(empty.total, 0);
    assert_eq!(empty.max_pages, 0);
    assert!(empty.rows.is_empty());
}

#[test]
fn post_sort_ascending() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = service(&dir, 10);
    seed(&svc);
    let req = ListRequest { sort: Some(SortKey::Post), dir: Some(SortDir::Asc), ..Default::default() };
    assert_eq!(row_ids(&svc.list(&req).expect("list")), vec!["r1", "r2", "r3", "r4"]);
}

#[test]
fn listing_backfills_missing_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = service(&dir, 10);
    svc.with_repo(|repo| Ok(repo.upsert_reports(vec![report("x", "X", "2025-08-01", 1, &[])])?))
        .expect("raw upsert");
    assert_eq!(svc.get(&ReportId::new("x")).expect("get").expect("exists").event_ts, None);

    let page = svc.list(&ListRequest::default()).expect("list");
    assert_eq!(page.rows[0].event_ts, Some(1_753_974_000));
    assert_eq!(page.rows[0].event_date, "2025年08月01日");
    assert_eq!(svc.get(&ReportId::new("x")).expect("get").expect("exists").event_ts, Some(1_753_974_000));
}

#[test]
fn import_accepts_loose_json_dates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = service(&dir, 10);
    let file = dir.path().join("reports.json");
    std::fs::write(
        &file,
        r#"[
            {"id": "a", "title": "A", "event_date": {"timestamp": 1754006400000}, "published_at": "2025-08-02"},
            {"id": "b", "title": "B", "event_date": {"date": "2025年8月1日"}, "published_at": 1754100000},
            {"id": "c", "title": "C", "event_date": null}
        ]"#,
    )
    .expect("write import");

    let out = svc.import_json_file(&file).expect("import");
    assert_eq!(out.total, 3);
    assert_eq!(out.dated, 2);

    let a = svc.get(&ReportId::new("a")).expect("get").expect("a");
    assert_eq!(a.event_ts, Some(1_754_006_400));
    assert_eq!(a.published_at, 1_754_060_400);
    let b = svc.get(&ReportId::new("b")).expect("get").expect("b");
    assert_eq!(b.event_ts, Some(1_753_974_000));
    assert_eq!(b.published_at, 1_754_100_000);
    let c = svc.get(&ReportId::new("c")).expect("get").expect("c");
    assert_eq!(c.event_ts, None);
    assert_eq!(c.published_at, NOW);
}

#[test]
fn delete_and_resync() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = service(&dir, 10);
    seed(&svc);
    assert_eq!(svc.delete(&[ReportId::new("r3")]).expect("delete"), 1);
    let out = svc.resync().expect("resync");
    assert_eq!(out.scanned, 3);
    assert_eq!(out.changed, 0);
}

#[test]
fn config_file_keeps_defaults_for_missing_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"posts_per_page": 25, "default_sort": "post", "utc_offset_seconds": 32400}"#)
        .expect("write config");
    let cfg = ServiceConfig::from_json_file(&path).expect("config");
    assert_eq!(cfg.posts_per_page, 25);
    assert_eq!(cfg.default_sort, SortKey::Post);
    assert_eq!(cfg.default_dir, REPORT_DEFAULTS.dir);
    assert_eq!(cfg.jp_separator, REPORT_DEFAULTS.jp_separator);

    std::fs::write(&path, r#"{"utc_offset_seconds": 999999}"#).expect("write config");
    assert!(matches!(ServiceConfig::from_json_file(&path), Err(ServiceError::Config(_))));
}

#[test]
fn backfilled_rows_move_on_the_next_listing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = service(&dir, 10);
    svc.ingest(vec![report("d", "D", "2025-03-05", 2, &[])]).expect("ingest");
    svc.with_repo(|repo| Ok(repo.upsert_reports(vec![report("x", "X", "2025-08-01", 1, &[])])?))
        .expect("raw upsert");

    // ordered while still undated, then filled in on the same page
    let first = svc.list(&ListRequest::default()).expect("first list");
    assert_eq!(row_ids(&first), vec!["d", "x"]);
    assert_eq!(first.rows[1].event_date, "2025年08月01日");

    let second = svc.list(&ListRequest::default()).expect("second list");
    assert_eq!(row_ids(&second), vec!["x", "d"]);
}

#[test]
fn attachment_column_takes_map_url_or_string() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = service(&dir, 10);
    let file = dir.path().join("reports.json");
    std::fs::write(
        &file,
        r#"[
            {"id": "map", "title": "M", "published_at": 1754100004, "attachment": {"url": "https://example.com/m.pdf", "filename": "m.pdf"}},
            {"id": "str", "title": "S", "published_at": 1754100003, "attachment": "https://example.com/s.pdf"},
            {"id": "blank", "title": "B", "published_at": 1754100002, "attachment": {"url": "", "filename": "b.pdf"}},
            {"id": "none", "title": "N", "published_at": 1754100001}
        ]"#,
    )
    .expect("write import");
    svc.import_json_file(&file).expect("import");

    let req = ListRequest { sort: Some(SortKey::Post), ..Default::default() };
    let page = svc.list(&req).expect("list");
    let urls: Vec<Option<&str>> = page.rows.iter().map(|r| r.attachment_url.as_deref()).collect();
    assert_eq!(row_ids(&page), vec!["map", "str", "blank", "none"]);
    assert_eq!(urls, vec![Some("https://example.com/m.pdf"), Some("https://example.com/s.pdf"), None, None]);
}
