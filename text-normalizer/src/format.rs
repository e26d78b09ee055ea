use chrono::{FixedOffset, TimeZone};

/// Placeholder shown when a report has no usable event date.
pub const NO_DATE: &str = "—";

/// `YYYY年MM月DD日` in `offset`, or `None` if `ts` is out of range.
pub fn format_event_date(ts: i64, offset: FixedOffset) -> Option<String> {
    let dt = offset.timestamp_opt(ts, 0).single()?;
    Some(dt.format("%Y年%m月%d日").to_string())
}

/// Display form of an optional event date.
pub fn event_date_label(ts: Option<i64>, offset: FixedOffset) -> String {
    ts.and_then(|t| format_event_date(t, offset)).unwrap_or_else(|| NO_DATE.to_string())
}

/// Join maker names with `、` (Japanese list separator) or `, `.
pub fn join_names<S: AsRef<str>>(names: &[S], jp_separator: bool) -> String {
    let sep = if jp_separator { "、" } else { ", " };
    names.iter().map(|n| n.as_ref()).collect::<Vec<&str>>().join(sep)
}
