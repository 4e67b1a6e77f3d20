//! Label Studio export data model.
//!
//! Raw JSON is turned into closed types at the deserialization boundary.
//! Annotator fallbacks and interval defaults are resolved here, so the
//! extractors only ever see fully-formed records. The item identifier is the
//! one required field: a record without it fails the whole parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::{ConcordError, Result};

/// Annotator recorded when a submission carries no usable identifier.
pub const UNKNOWN_ANNOTATOR: &str = "unknown";

/// Item or annotator identifier.
///
/// Exports use integers for most ids but strings show up as well. Integers
/// order numerically and before strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ident {
    Num(i64),
    Text(String),
}

impl Ident {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Num),
            Value::String(s) => Some(Self::Text(s.clone())),
            // Expanded user objects: {"id": 3, "email": "..."}
            Value::Object(map) => map
                .get("id")
                .or_else(|| map.get("email"))
                .and_then(Self::from_json),
            _ => None,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Ident {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One annotation task.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRecord {
    pub id: Ident,
    /// Task payload as uploaded to the annotation tool.
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub annotations: Vec<AnnotationRecord>,
}

impl ExportRecord {
    /// Number of paragraphs when the task text is a list of paragraphs.
    pub fn paragraph_count(&self) -> Option<usize> {
        self.data.get("text")?.as_array().map(Vec::len)
    }
}

/// One annotator's submission for one item.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawAnnotation")]
pub struct AnnotationRecord {
    pub annotator: Ident,
    pub results: Vec<ResultEntry>,
}

#[derive(Deserialize)]
struct RawAnnotation {
    #[serde(default)]
    completed_by: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
}

impl From<RawAnnotation> for AnnotationRecord {
    fn from(raw: RawAnnotation) -> Self {
        let annotator = raw
            .completed_by
            .as_ref()
            .and_then(Ident::from_json)
            .or_else(|| raw.id.as_ref().and_then(Ident::from_json))
            .unwrap_or_else(|| Ident::from(UNKNOWN_ANNOTATOR));
        let results = match raw.result {
            Some(Value::Array(entries)) => entries.into_iter().map(ResultEntry::from_json).collect(),
            _ => Vec::new(),
        };
        Self { annotator, results }
    }
}

/// A typed judgment inside an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEntry {
    /// `choices` or `taxonomy`.
    Choice { choices: Vec<String> },
    /// `labels`: a labeled half-open character interval.
    Span {
        start: i64,
        end: i64,
        labels: Vec<String>,
    },
    /// `paragraphlabels`: a labeled interval of paragraph indices.
    ParagraphLabel {
        start: i64,
        end: Option<i64>,
        labels: Vec<String>,
    },
    /// Any tag no extractor consumes (ratings, text areas, relations, ...).
    Other { tag: String },
}

impl ResultEntry {
    /// Read one result entry. Malformed fields fall back to their defaults,
    /// so this never fails.
    fn from_json(value: Value) -> Self {
        serde_json::from_value::<RawResult>(value)
            .unwrap_or_default()
            .into()
    }
}

#[derive(Default, Deserialize)]
struct RawResult {
    #[serde(default, rename = "type")]
    kind: Option<Value>,
    #[serde(default)]
    value: Option<Value>,
}

/// Every field is loosely typed so that a wrong JSON type only loses that
/// field, never the entry.
#[derive(Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    choices: Option<Value>,
    #[serde(default)]
    labels: Option<Value>,
    #[serde(default)]
    paragraphlabels: Option<Value>,
    #[serde(default)]
    start: Option<Value>,
    #[serde(default, rename = "startOffset")]
    start_offset: Option<Value>,
    #[serde(default)]
    end: Option<Value>,
    #[serde(default, rename = "endOffset")]
    end_offset: Option<Value>,
}

impl RawValue {
    fn start(&self) -> Option<i64> {
        first_offset(&self.start, &self.start_offset)
    }

    fn end(&self) -> Option<i64> {
        first_offset(&self.end, &self.end_offset)
    }
}

/// String members of a label array; `None` when the field is not an array.
fn string_labels(value: &Option<Value>) -> Option<Vec<String>> {
    match value {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect(),
        ),
        _ => None,
    }
}

fn first_offset(primary: &Option<Value>, fallback: &Option<Value>) -> Option<i64> {
    primary
        .as_ref()
        .and_then(offset)
        .or_else(|| fallback.as_ref().and_then(offset))
}

/// Offsets arrive as integers, or as numeric strings for paragraph results.
fn offset(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A taxonomy choice is a path of strings; it is flattened to `a/b/c`.
fn choice_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(path) => {
            let parts: Vec<&str> = path.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("/"))
        }
        _ => None,
    }
}

impl From<RawResult> for ResultEntry {
    fn from(raw: RawResult) -> Self {
        let tag = match raw.kind {
            Some(Value::String(tag)) => tag,
            _ => String::new(),
        };
        let value: RawValue = raw
            .value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        match tag.as_str() {
            "choices" | "taxonomy" => Self::Choice {
                choices: match &value.choices {
                    Some(Value::Array(choices)) => choices.iter().filter_map(choice_label).collect(),
                    _ => Vec::new(),
                },
            },
            "labels" => Self::Span {
                start: value.start().unwrap_or(0),
                end: value.end().unwrap_or(0),
                labels: string_labels(&value.labels)
                    .or_else(|| string_labels(&value.paragraphlabels))
                    .unwrap_or_default(),
            },
            "paragraphlabels" => Self::ParagraphLabel {
                start: value.start().unwrap_or(0),
                end: value.end(),
                labels: string_labels(&value.paragraphlabels).unwrap_or_default(),
            },
            _ => Self::Other { tag },
        }
    }
}

/// A fully parsed export: the array of tasks produced by the annotation tool.
#[derive(Debug, Clone, Default)]
pub struct Export {
    records: Vec<ExportRecord>,
}

impl Export {
    pub fn new(records: Vec<ExportRecord>) -> Self {
        Self { records }
    }

    /// Parse an export from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<ExportRecord> = serde_json::from_str(json)
            .map_err(|e| ConcordError::export(format!("malformed export: {e}")))?;
        tracing::debug!(tasks = records.len(), "parsed export");
        Ok(Self { records })
    }

    /// Read and parse an export file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let records: Vec<ExportRecord> = serde_json::from_str(&json)
            .map_err(|e| ConcordError::export(format!("{}: {e}", path.display())))?;
        tracing::debug!(tasks = records.len(), path = %path.display(), "parsed export");
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ExportRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Tasks with at least one annotation.
    pub fn annotated_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !r.annotations.is_empty())
            .count()
    }

    /// Annotations across all tasks.
    pub fn annotation_count(&self) -> usize {
        self.records.iter().map(|r| r.annotations.len()).sum()
    }
}
