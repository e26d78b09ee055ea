use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use report_model::{Maker, RawDateValue, ReportId, ReportRecord, SearchField};
use report_service::{ListRequest, ReportService, ServiceConfig};
use report_store::predicate::build_predicate;
use report_store::sql_lowering::{lower_predicate, report_column};
use report_store::{SortDir, SortKey};
use text_normalizer::format::NO_DATE;
use text_normalizer::{Clock, DateNormalizer, FixedClock, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "report-cli")]
#[command(about = "Normalise report dates, inspect kana-insensitive search, manage a report listing")]
struct Args {
    /// JSON config file (missing keys use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Reference UTC offset in seconds for calendar dates (overrides config)
    #[arg(long, global = true, allow_hyphen_values = true)]
    offset: Option<i32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the epoch seconds a raw date normalises to
    NormalizeDate {
        value: String,
        /// Freeze "now" at this epoch second for relative phrases
        #[arg(long)]
        now: Option<i64>,
    },
    /// Show terms, spelling variants and the SQL a phrase lowers to
    Variants { phrase: String },
    /// Import a JSON array of reports
    Import { file: PathBuf },
    /// Insert or replace one report
    Insert {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, default_value = "")]
        excerpt: String,
        #[arg(long)]
        event_date: Option<String>,
        /// Maker as `slug:name` (repeatable)
        #[arg(long = "maker")]
        makers: Vec<String>,
        /// Publication date (any accepted date form); defaults to now
        #[arg(long)]
        published_at: Option<String>,
        /// Acceptance-slip URL
        #[arg(long)]
        attachment: Option<String>,
    },
    /// List reports
    List {
        #[arg(short, long)]
        q: Option<String>,
        /// Comma separated maker slugs
        #[arg(long)]
        makers: Option<String>,
        /// event | post
        #[arg(long)]
        sort: Option<String>,
        /// asc | desc
        #[arg(long)]
        dir: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        per_page: Option<usize>,
    },
    /// Recompute every cached event timestamp
    Resync,
    /// Delete reports by id
    Delete { ids: Vec<String> },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<ServiceConfig, String> {
    let mut cfg = match &args.config {
        Some(path) => ServiceConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => ServiceConfig::default(),
    };
    if let Some(db) = &args.db {
        cfg.db_path = db.clone();
    }
    if let Some(off) = args.offset {
        cfg.utc_offset_seconds = off;
    }
    cfg.validate().map_err(|e| e.to_string())?;
    Ok(cfg)
}

fn run(args: Args) -> Result<(), String> {
    let cfg = load_config(&args)?;
    let offset = cfg.offset().map_err(|e| e.to_string())?;

    match args.command {
        Command::NormalizeDate { value, now } => {
            let raw = RawDateValue::from(value.as_str());
            let ts = match now {
                Some(n) => DateNormalizer::with_clock(offset, FixedClock::at_timestamp(n)).normalize(&raw),
                None => DateNormalizer::with_offset(offset).normalize(&raw),
            };
            match ts {
                Some(ts) => println!("{ts}"),
                None => println!("(none)"),
            }
            Ok(())
        }
        Command::Variants { phrase } => {
            print_variants(&phrase, &cfg.search_fields);
            Ok(())
        }
        Command::Import { file } => {
            let svc = ReportService::new(cfg).map_err(|e| e.to_string())?;
            let out = svc.import_json_file(&file).map_err(|e| e.to_string())?;
            println!("imported {} reports ({} dated, {} undated)", out.total, out.dated, out.undated);
            Ok(())
        }
        Command::Insert { id, title, content, excerpt, event_date, makers, published_at, attachment } => {
            let svc = ReportService::new(cfg).map_err(|e| e.to_string())?;
            let published_at = published_at
                .and_then(|p| svc.normalize_date(&RawDateValue::from(p)))
                .unwrap_or_else(|| SystemClock.now().timestamp());
            let mut rec = ReportRecord::new(id, title, published_at);
            rec.content = content;
            rec.excerpt = excerpt;
            rec.event_date_raw = event_date.map(RawDateValue::from).unwrap_or_default();
            rec.makers = makers.iter().map(|m| parse_maker_arg(m)).collect();
            rec.attachment_raw = attachment.map(serde_json::Value::String).unwrap_or_default();
            let out = svc.ingest(vec![rec]).map_err(|e| e.to_string())?;
            println!("stored ({})", if out.dated > 0 { "dated" } else { "undated" });
            Ok(())
        }
        Command::List { q, makers, sort, dir, page, per_page } => {
            let svc = ReportService::new(cfg).map_err(|e| e.to_string())?;
            let req = ListRequest {
                phrase: q,
                makers,
                sort: sort.as_deref().map(SortKey::parse_lenient),
                dir: dir.as_deref().map(SortDir::parse_lenient),
                page,
                per_page,
            };
            let result = svc.list(&req).map_err(|e| e.to_string())?;
            if result.rows.is_empty() {
                println!("表示する不具合報告はありません。");
            }
            for row in &result.rows {
                let attachment = row.attachment_url.as_deref().unwrap_or(NO_DATE);
                println!("{}\t{}\t{}\t{}\t{}", row.event_date, row.makers, row.title, attachment, row.id);
            }
            println!(
                "-- page {}/{} ({} total, sort {:?} {:?})",
                result.page,
                result.max_pages.max(1),
                result.total,
                result.sort,
                result.dir
            );
            Ok(())
        }
        Command::Resync => {
            let svc = ReportService::new(cfg).map_err(|e| e.to_string())?;
            let out = svc.resync().map_err(|e| e.to_string())?;
            println!("scanned {} reports, {} changed", out.scanned, out.changed);
            Ok(())
        }
        Command::Delete { ids } => {
            if ids.is_empty() {
                return Err("provide at least one id".into());
            }
            let svc = ReportService::new(cfg).map_err(|e| e.to_string())?;
            let ids: Vec<ReportId> = ids.into_iter().map(ReportId).collect();
            let n = svc.delete(&ids).map_err(|e| e.to_string())?;
            println!("deleted {n}");
            Ok(())
        }
    }
}

fn print_variants(phrase: &str, fields: &[SearchField]) {
    let Some(pred) = build_predicate(phrase, fields) else {
        println!("(no terms: results are not constrained)");
        return;
    };
    for term in pred.terms() {
        let variants: Vec<&str> = term.variants().collect();
        println!("{}\t{}", term.term, variants.join(" | "));
    }
    let frag = lower_predicate(&pred, report_column);
    println!("{}", frag.sql);
    println!("{}", serde_json::to_string(&frag.params).unwrap_or_default());
}

/// `slug:name`, or a bare value used for both.
fn parse_maker_arg(s: &str) -> Maker {
    match s.split_once(':') {
        Some((slug, name)) => Maker::new(slug.trim(), name.trim()),
        None => Maker::new(s.trim(), s.trim()),
    }
}
