//! Best-effort parsing of free-form date phrases.

use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::date::local_midnight;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y.%m.%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d %B, %Y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    fn parse(word: &str) -> Option<Unit> {
        let w = word.strip_suffix('s').unwrap_or(word);
        Some(match w {
            "sec" | "second" => Unit::Second,
            "min" | "minute" => Unit::Minute,
            "hour" => Unit::Hour,
            "day" => Unit::Day,
            "week" => Unit::Week,
            "month" => Unit::Month,
            "year" => Unit::Year,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Anchor {
    Now,
    Midnight { day_shift: i64 },
}

/// Parse `s` relative to `now`. Dates without a time are anchored at midnight in `offset`.
pub(crate) fn parse(s: &str, now: DateTime<Utc>, offset: FixedOffset) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.timestamp());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return offset.from_local_datetime(&naive).single().map(|dt| dt.timestamp());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return local_midnight(date, offset);
        }
    }
    parse_relative(&s.to_lowercase(), now, offset)
}

/// Keywords (`now`, `today`, `midnight`, `yesterday`, `tomorrow`) combined with
/// signed offsets such as `+1 week 2 days` or `3 days ago`.
fn parse_relative(s: &str, now: DateTime<Utc>, offset: FixedOffset) -> Option<i64> {
    let tokens = tokenize(s)?;
    if tokens.is_empty() {
        return None;
    }

    let mut anchor = Anchor::Now;
    let mut offsets: Vec<(i64, Unit)> = Vec::new();
    let mut pending: Option<i64> = None;
    let mut negate = false;

    for tok in tokens {
        match tok {
            Token::Number(n) => {
                if pending.is_some() {
                    return None;
                }
                pending = Some(n);
            }
            Token::Word(w) => {
                if let Some(unit) = Unit::parse(&w) {
                    let n = pending.take()?;
                    offsets.push((n, unit));
                    continue;
                }
                if pending.is_some() {
                    return None;
                }
                match w.as_str() {
                    "now" => {}
                    "today" | "midnight" => anchor = midnight_with_shift(anchor, 0),
                    "yesterday" => anchor = midnight_with_shift(anchor, -1),
                    "tomorrow" => anchor = midnight_with_shift(anchor, 1),
                    "ago" => negate = true,
                    _ => return None,
                }
            }
        }
    }
    if pending.is_some() {
        return None;
    }

    let local_now = now.with_timezone(&offset).naive_local();
    let mut at = match anchor {
        Anchor::Now => local_now,
        Anchor::Midnight { day_shift } => {
            (local_now.date() + Duration::days(day_shift)).and_hms_opt(0, 0, 0)?
        }
    };
    for (n, unit) in offsets {
        let n = if negate { -n } else { n };
        at = shift(at, n, unit)?;
    }
    offset.from_local_datetime(&at).single().map(|dt| dt.timestamp())
}

fn midnight_with_shift(anchor: Anchor, shift: i64) -> Anchor {
    match anchor {
        Anchor::Now => Anchor::Midnight { day_shift: shift },
        Anchor::Midnight { day_shift } => Anchor::Midnight { day_shift: day_shift + shift },
    }
}

fn shift(at: NaiveDateTime, n: i64, unit: Unit) -> Option<NaiveDateTime> {
    match unit {
        Unit::Second => at.checked_add_signed(Duration::try_seconds(n)?),
        Unit::Minute => at.checked_add_signed(Duration::try_minutes(n)?),
        Unit::Hour => at.checked_add_signed(Duration::try_hours(n)?),
        Unit::Day => at.checked_add_signed(Duration::try_days(n)?),
        Unit::Week => at.checked_add_signed(Duration::try_weeks(n)?),
        Unit::Month => add_months(at, n),
        Unit::Year => add_months(at, n.checked_mul(12)?),
    }
}

fn add_months(at: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
    let months = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
    if n >= 0 { at.checked_add_months(months) } else { at.checked_sub_months(months) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(i64),
    Word(String),
}

/// Split into numbers (optionally signed) and alphabetic words; `+1day` yields two tokens.
/// Returns `None` on any other character.
fn tokenize(s: &str) -> Option<Vec<Token>> {
    let mut out = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
        } else if c == '+' || c == '-' || c.is_ascii_digit() {
            let mut num = String::new();
            num.push(c);
            chars.next();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                num.push(d);
                chars.next();
            }
            out.push(Token::Number(num.parse().ok()?));
        } else if c.is_ascii_alphabetic() {
            let mut word = String::new();
            while let Some(&w) = chars.peek() {
                if !w.is_ascii_alphabetic() {
                    break;
                }
                word.push(w);
                chars.next();
            }
            out.push(Token::Word(word));
        } else {
            return None;
        }
    }
    Some(out)
}
