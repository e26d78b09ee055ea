//! Shared models used across crates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable identifier of a report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportId(pub String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

/// Raw date value as handed over by a custom-field source.
///
/// Field sources are loosely typed: the same field may come back as a plain string,
/// a number, an already-resolved instant, or a small map carrying `timestamp` / `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawDateValue {
    /// No value stored.
    #[default]
    Empty,
    /// Instant already resolved by the source (epoch seconds).
    DateTime(i64),
    /// Map whose `timestamp` entry is numeric.
    StructuredWithTimestamp(String),
    /// Map carrying a `date` entry.
    StructuredWithDate(String),
    /// Map with neither key; holds its first value, if any.
    StructuredOpaque(Option<String>),
    /// Any scalar (string or number rendered as string).
    ScalarString(String),
}

impl RawDateValue {
    /// Classify a map-like value the way field sources hand them over.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        if let Some(ts) = map.get("timestamp") {
            if is_numeric(ts) {
                return RawDateValue::StructuredWithTimestamp(ts.clone());
            }
        }
        if let Some(d) = map.get("date") {
            return RawDateValue::StructuredWithDate(d.clone());
        }
        RawDateValue::StructuredOpaque(map.values().next().cloned())
    }

    /// Interpret an arbitrary JSON value (as stored in meta columns or import files).
    pub fn from_json(v: &serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => RawDateValue::Empty,
            Value::Bool(false) => RawDateValue::Empty,
            Value::Bool(true) => RawDateValue::ScalarString("1".into()),
            Value::Number(n) => RawDateValue::ScalarString(n.to_string()),
            Value::String(s) if s.is_empty() => RawDateValue::Empty,
            Value::String(s) => RawDateValue::ScalarString(s.clone()),
            Value::Array(items) => match items.first() {
                None => RawDateValue::Empty,
                Some(first) => RawDateValue::StructuredOpaque(scalar_string(first)),
            },
            Value::Object(obj) => {
                if obj.is_empty() { return RawDateValue::Empty; }
                if let Some(ts) = obj.get("timestamp").and_then(scalar_string) {
                    if is_numeric(&ts) { return RawDateValue::StructuredWithTimestamp(ts); }
                }
                if let Some(d) = obj.get("date") {
                    return RawDateValue::StructuredWithDate(scalar_string(d).unwrap_or_default());
                }
                RawDateValue::StructuredOpaque(obj.values().next().and_then(scalar_string))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawDateValue::Empty => true,
            RawDateValue::ScalarString(s) => s.is_empty() || s == "0",
            _ => false,
        }
    }
}

impl From<&str> for RawDateValue {
    fn from(s: &str) -> Self {
        if s.is_empty() { RawDateValue::Empty } else { RawDateValue::ScalarString(s.to_string()) }
    }
}

impl From<String> for RawDateValue {
    fn from(s: String) -> Self {
        if s.is_empty() { RawDateValue::Empty } else { RawDateValue::ScalarString(s) }
    }
}

impl From<i64> for RawDateValue {
    fn from(v: i64) -> Self { RawDateValue::ScalarString(v.to_string()) }
}

fn scalar_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_numeric(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t.parse::<f64>().map(|f| f.is_finite()).unwrap_or(false)
}

/// Searchable text field of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Content,
    Excerpt,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [SearchField::Title, SearchField::Content, SearchField::Excerpt];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Content => "content",
            SearchField::Excerpt => "excerpt",
        }
    }
}

/// Manufacturer term attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maker {
    pub slug: String,
    pub name: String,
}

impl Maker {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self { slug: slug.into(), name: name.into() }
    }
}

/// A single published report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: ReportId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub makers: Vec<Maker>,
    /// Event date exactly as the field source returned it.
    #[serde(default)]
    pub event_date_raw: RawDateValue,
    /// Cached normalised event date (epoch seconds). Maintained by the store.
    #[serde(default)]
    pub event_ts: Option<i64>,
    /// Publication instant (epoch seconds).
    pub published_at: i64,
    /// Acceptance-slip attachment as the field source returned it: a file map, a URL string, or null.
    #[serde(default)]
    pub attachment_raw: serde_json::Value,
}

impl ReportRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, published_at: i64) -> Self {
        Self {
            id: ReportId::new(id),
            title: title.into(),
            content: String::new(),
            excerpt: String::new(),
            makers: Vec::new(),
            event_date_raw: RawDateValue::Empty,
            event_ts: None,
            published_at,
            attachment_raw: serde_json::Value::Null,
        }
    }

    /// Download URL of the attachment, if any. See [`attachment_url`].
    pub fn attachment_url(&self) -> Option<String> { attachment_url(&self.attachment_raw) }

    /// Text of one searchable field.
    pub fn field(&self, field: SearchField) -> &str {
        match field {
            SearchField::Title => &self.title,
            SearchField::Content => &self.content,
            SearchField::Excerpt => &self.excerpt,
        }
    }
}

/// URL of an attachment field value: a map's non-empty `url` entry, or the value itself
/// when it is a non-empty string. Anything else has no URL.
pub fn attachment_url(v: &serde_json::Value) -> Option<String> {
    use serde_json::Value;
    let url = match v {
        Value::Object(obj) => obj.get("url").and_then(Value::as_str)?,
        Value::String(s) => s.as_str(),
        _ => return None,
    };
    let url = url.trim();
    if url.is_empty() { None } else { Some(url.to_string()) }
}
