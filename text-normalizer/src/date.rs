use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use report_model::RawDateValue;

use crate::freetext;

/// Source of the reference instant used for relative phrases ("tomorrow", "3 days ago").
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Frozen clock for reproducible runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Clock frozen at `secs` since the epoch. Out-of-range values freeze at the epoch.
    pub fn at_timestamp(secs: i64) -> Self {
        Self(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> { self.0 }
}

static SLASH_OR_DASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}[-/][0-9]{1,2}[-/][0-9]{1,2}$").expect("valid date regex"));
static KANJI_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}年[0-9]{1,2}月[0-9]{1,2}日$").expect("valid kanji date regex"));

/// Converts loosely typed event dates into epoch seconds.
///
/// Calendar dates without a time of day are anchored at midnight in `offset`.
#[derive(Debug, Clone)]
pub struct DateNormalizer<C = SystemClock> {
    offset: FixedOffset,
    clock: C,
}

impl DateNormalizer<SystemClock> {
    /// UTC midnight anchoring, wall clock for relative phrases.
    pub fn new() -> Self {
        Self { offset: utc_offset(), clock: SystemClock }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset, clock: SystemClock }
    }
}

impl Default for DateNormalizer<SystemClock> {
    fn default() -> Self { Self::new() }
}

impl<C: Clock> DateNormalizer<C> {
    pub fn with_clock(offset: FixedOffset, clock: C) -> Self {
        Self { offset, clock }
    }

    pub fn offset(&self) -> FixedOffset { self.offset }

    pub fn clock(&self) -> &C { &self.clock }

    /// Normalise `raw` to epoch seconds. Returns `None` when nothing usable is found.
    ///
    /// Rules are tried in order: 13-digit milliseconds, 10-digit seconds, 8-digit `YYYYMMDD`,
    /// `YYYY-M-D` / `YYYY/M/D`, `YYYY年M月D日`, then free text.
    pub fn normalize(&self, raw: &RawDateValue) -> Option<i64> {
        let scalar: &str = match raw {
            RawDateValue::Empty => return None,
            RawDateValue::DateTime(ts) => return (*ts >= 0).then_some(*ts),
            // fractional epochs keep their whole seconds
            RawDateValue::StructuredWithTimestamp(ts) => ts.split('.').next().unwrap_or(ts),
            RawDateValue::StructuredWithDate(d) => d,
            RawDateValue::StructuredOpaque(Some(v)) => v,
            RawDateValue::StructuredOpaque(None) => return None,
            RawDateValue::ScalarString(s) => s,
        };
        self.normalize_str(scalar)
    }

    /// Same as [`normalize`](Self::normalize) for an already-extracted scalar.
    pub fn normalize_str(&self, raw: &str) -> Option<i64> {
        let s = raw.trim();
        if s.is_empty() || s == "0" {
            return None;
        }

        if s.bytes().all(|b| b.is_ascii_digit()) {
            match s.len() {
                13 => return s.parse::<i64>().ok().map(|ms| ms.div_euclid(1000)),
                10 => return s.parse::<i64>().ok(),
                8 => {
                    let (y, m, d) = (&s[0..4], &s[4..6], &s[6..8]);
                    return self.calendar_midnight(y, m, d).filter(|ts| *ts >= 0);
                }
                _ => {}
            }
        }

        if SLASH_OR_DASH_DATE.is_match(s) {
            let dashed = s.replace('/', "-");
            if let Some(ts) = self.parse_dashed(&dashed) {
                return Some(ts);
            }
        }

        if KANJI_DATE.is_match(s) {
            let dashed = s.replace('年', "-").replace('月', "-").replace('日', "");
            if let Some(ts) = self.parse_dashed(&dashed) {
                return Some(ts);
            }
        }

        freetext::parse(s, self.clock.now(), self.offset).filter(|ts| *ts > 0)
    }

    fn parse_dashed(&self, s: &str) -> Option<i64> {
        let mut parts = s.splitn(3, '-');
        let (y, m, d) = (parts.next()?, parts.next()?, parts.next()?);
        self.calendar_midnight(y, m, d).filter(|ts| *ts > 0)
    }

    fn calendar_midnight(&self, y: &str, m: &str, d: &str) -> Option<i64> {
        let date = NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)?;
        local_midnight(date, self.offset)
    }
}

/// Normalise with UTC anchoring and the wall clock.
pub fn normalize(raw: &RawDateValue) -> Option<i64> {
    DateNormalizer::new().normalize(raw)
}

pub(crate) fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Option<i64> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    offset.from_local_datetime(&naive).single().map(|dt| dt.timestamp())
}

pub(crate) fn utc_offset() -> FixedOffset {
    Utc.fix()
}
