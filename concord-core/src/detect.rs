//! Task type detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::export::{ExportRecord, ResultEntry};

/// The kind of judgment an export carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// One label per item (`choices`, `taxonomy`).
    Classification,
    /// Labeled character spans (`labels`).
    Span,
    /// Labels over paragraph/sentence indices (`paragraphlabels`).
    Paragraph,
    Unknown,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Span => "span",
            Self::Paragraph => "paragraph",
            Self::Unknown => "unknown",
        }
    }

    fn of_entry(entry: &ResultEntry) -> Option<Self> {
        match entry {
            ResultEntry::Choice { .. } => Some(Self::Classification),
            ResultEntry::Span { .. } => Some(Self::Span),
            ResultEntry::ParagraphLabel { .. } => Some(Self::Paragraph),
            ResultEntry::Other { .. } => None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classification" => Ok(Self::Classification),
            "span" => Ok(Self::Span),
            "paragraph" => Ok(Self::Paragraph),
            other => Err(format!(
                "unknown task type '{other}' (expected classification, span or paragraph)"
            )),
        }
    }
}

/// Detect the task type from the first recognized result entry, in export order.
pub fn detect_task_type(records: &[ExportRecord]) -> TaskType {
    records
        .iter()
        .flat_map(|record| &record.annotations)
        .flat_map(|annotation| &annotation.results)
        .find_map(TaskType::of_entry)
        .unwrap_or(TaskType::Unknown)
}

/// Use the explicit override when given, otherwise detect.
pub fn resolve_task_type(records: &[ExportRecord], forced: Option<TaskType>) -> TaskType {
    match forced {
        Some(task_type) => task_type,
        None => {
            let detected = detect_task_type(records);
            tracing::debug!(task_type = %detected, "detected task type");
            detected
        }
    }
}
