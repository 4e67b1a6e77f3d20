//! Judgment extraction.
//!
//! Turns export records into per-item, per-annotator judgment tables. There
//! is one extractor per task type; [`extract`] picks the right one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::detect::TaskType;
use crate::export::{ExportRecord, Ident, ResultEntry};

pub type Label = String;

/// item -> annotator -> judgment.
pub type JudgmentTable<V> = BTreeMap<Ident, BTreeMap<Ident, V>>;

/// A labeled half-open interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: i64,
    pub end: i64,
    pub label: Label,
}

impl Span {
    pub fn new(start: i64, end: i64, label: impl Into<Label>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }
}

/// A judgment table together with every annotator seen in the export.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<V> {
    pub table: JudgmentTable<V>,
    /// Includes annotators whose submissions yielded no usable judgment.
    pub annotators: BTreeSet<Ident>,
}

impl<V> Default for Extraction<V> {
    fn default() -> Self {
        Self {
            table: BTreeMap::new(),
            annotators: BTreeSet::new(),
        }
    }
}

impl<V> Extraction<V> {
    /// Number of items the annotator has a judgment for.
    pub fn items_judged_by(&self, annotator: &Ident) -> usize {
        self.table
            .values()
            .filter(|judgments| judgments.contains_key(annotator))
            .count()
    }

    fn record(&mut self, item: &Ident, annotator: &Ident) -> &mut V
    where
        V: Default,
    {
        self.table
            .entry(item.clone())
            .or_default()
            .entry(annotator.clone())
            .or_default()
    }
}

/// Paragraph judgments plus the paragraph count of each item, when known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphExtraction {
    pub judgments: Extraction<BTreeMap<i64, Label>>,
    pub paragraph_counts: BTreeMap<Ident, usize>,
}

/// Extracted judgments for one task type.
#[derive(Debug, Clone, PartialEq)]
pub enum Judgments {
    Classification(Extraction<Label>),
    Span(Extraction<BTreeSet<Span>>),
    Paragraph(ParagraphExtraction),
}

/// Extract the judgments for `task_type`; `None` for an unknown task type.
pub fn extract(records: &[ExportRecord], task_type: TaskType) -> Option<Judgments> {
    let unrecognized: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| &record.annotations)
        .flat_map(|annotation| &annotation.results)
        .filter_map(|entry| match entry {
            ResultEntry::Other { tag } => Some(tag.as_str()),
            _ => None,
        })
        .collect();
    if !unrecognized.is_empty() {
        tracing::warn!(tags = ?unrecognized, "skipping result entries with unsupported types");
    }

    match task_type {
        TaskType::Classification => Some(Judgments::Classification(extract_classification(
            records,
        ))),
        TaskType::Span => Some(Judgments::Span(extract_spans(records))),
        TaskType::Paragraph => Some(Judgments::Paragraph(extract_paragraphs(records))),
        TaskType::Unknown => None,
    }
}

/// First choice of every choice entry. A later entry overwrites an earlier one.
pub fn extract_classification(records: &[ExportRecord]) -> Extraction<Label> {
    let mut out = Extraction::default();

    for record in records {
        for annotation in &record.annotations {
            out.annotators.insert(annotation.annotator.clone());

            for entry in &annotation.results {
                if let ResultEntry::Choice { choices } = entry {
                    // Single-label assumption: extra selections are dropped.
                    if choices.len() > 1 {
                        tracing::debug!(
                            item = %record.id,
                            annotator = %annotation.annotator,
                            dropped = choices.len() - 1,
                            "multi-select choice reduced to its first label"
                        );
                    }
                    if let Some(first) = choices.first() {
                        *out.record(&record.id, &annotation.annotator) = first.clone();
                    }
                }
            }
        }
    }

    tracing::debug!(
        items = out.table.len(),
        annotators = out.annotators.len(),
        "extracted classification judgments"
    );
    out
}

/// One `(start, end, label)` tuple per span label; duplicates collapse.
///
/// Paragraph entries are read as spans too, with a missing end taken as 0.
pub fn extract_spans(records: &[ExportRecord]) -> Extraction<BTreeSet<Span>> {
    let mut out: Extraction<BTreeSet<Span>> = Extraction::default();

    for record in records {
        for annotation in &record.annotations {
            out.annotators.insert(annotation.annotator.clone());

            for entry in &annotation.results {
                let (start, end, labels) = match entry {
                    ResultEntry::Span { start, end, labels } => (*start, *end, labels),
                    ResultEntry::ParagraphLabel { start, end, labels } => {
                        (*start, end.unwrap_or(0), labels)
                    }
                    _ => continue,
                };
                for label in labels {
                    out.record(&record.id, &annotation.annotator)
                        .insert(Span::new(start, end, label.clone()));
                }
            }
        }
    }

    tracing::debug!(
        items = out.table.len(),
        annotators = out.annotators.len(),
        "extracted span judgments"
    );
    out
}

/// First label of every paragraph entry, spread over `[start, end)`.
pub fn extract_paragraphs(records: &[ExportRecord]) -> ParagraphExtraction {
    let mut out = ParagraphExtraction::default();

    for record in records {
        let count = record.paragraph_count();
        if let Some(count) = count {
            out.paragraph_counts.insert(record.id.clone(), count);
        }

        for annotation in &record.annotations {
            out.judgments.annotators.insert(annotation.annotator.clone());

            for entry in &annotation.results {
                let ResultEntry::ParagraphLabel { start, end, labels } = entry else {
                    continue;
                };
                let Some(label) = labels.first() else {
                    continue;
                };
                if labels.len() > 1 {
                    tracing::debug!(
                        item = %record.id,
                        annotator = %annotation.annotator,
                        dropped = labels.len() - 1,
                        "multi-label paragraph entry reduced to its first label"
                    );
                }
                for idx in paragraph_range(*start, *end, count) {
                    out.judgments
                        .record(&record.id, &annotation.annotator)
                        .insert(idx, label.clone());
                }
            }
        }
    }

    tracing::debug!(
        items = out.judgments.table.len(),
        annotators = out.judgments.annotators.len(),
        "extracted paragraph judgments"
    );
    out
}

/// Without a paragraph count, one entry covers at most this many sentences.
const MAX_UNBOUNDED_PARAGRAPHS: i64 = 10_000;

/// Sentence indices covered by a paragraph entry. A missing end covers one
/// sentence; the range never goes below 0 or past the task's paragraphs.
fn paragraph_range(start: i64, end: Option<i64>, count: Option<usize>) -> Range<i64> {
    let lo = start.max(0);
    let limit = match count {
        Some(count) => i64::try_from(count).unwrap_or(i64::MAX),
        None => lo.saturating_add(MAX_UNBOUNDED_PARAGRAPHS),
    };
    let hi = end.unwrap_or_else(|| start.saturating_add(1)).min(limit);
    lo..hi
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Export;
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<ExportRecord> {
        Export::from_json_str(&value.to_string())
            .unwrap()
            .records()
            .to_vec()
    }

    #[test]
    fn test_classification_extraction() {
        let data = records(json!([{
            "id": 1,
            "annotations": [
                {"completed_by": "alice", "result": [{"type": "choices", "value": {"choices": ["POS"]}}]},
                {"completed_by": "bob", "result": [{"type": "choices", "value": {"choices": ["NEG"]}}]}
            ]
        }]));
        let out = extract_classification(&data);

        let item = &out.table[&Ident::Num(1)];
        assert_eq!(item[&Ident::from("alice")], "POS");
        assert_eq!(item[&Ident::from("bob")], "NEG");
        assert_eq!(
            out.annotators,
            BTreeSet::from([Ident::from("alice"), Ident::from("bob")])
        );
    }

    #[test]
    fn test_classification_ignores_empty_choices_but_keeps_empty_label() {
        let data = records(json!([
            {"id": 1, "annotations": [
                {"completed_by": "a", "result": [{"type": "choices", "value": {"choices": []}}]}
            ]},
            {"id": 2, "annotations": [
                {"completed_by": "a", "result": [{"type": "choices", "value": {"choices": [""]}}]}
            ]}
        ]));
        let out = extract_classification(&data);

        assert!(!out.table.contains_key(&Ident::Num(1)));
        assert_eq!(out.table[&Ident::Num(2)][&Ident::from("a")], "");
        assert!(out.annotators.contains(&Ident::from("a")));
    }

    #[test]
    fn test_classification_last_entry_wins() {
        let data = records(json!([{"id": 1, "annotations": [{"completed_by": "a", "result": [
            {"type": "choices", "value": {"choices": ["X"]}},
            {"type": "choices", "value": {"choices": ["Y", "Z"]}}
        ]}]}]));
        let out = extract_classification(&data);
        assert_eq!(out.table[&Ident::Num(1)][&Ident::from("a")], "Y");
    }

    #[test]
    fn test_annotator_without_usable_result_is_still_counted() {
        let data = records(json!([{"id": 1, "annotations": [
            {"completed_by": "a", "result": [{"type": "choices", "value": {"choices": ["X"]}}]},
            {"completed_by": "b", "result": []}
        ]}]));
        let out = extract_classification(&data);
        assert_eq!(out.annotators.len(), 2);
        assert_eq!(out.items_judged_by(&Ident::from("a")), 1);
        assert_eq!(out.items_judged_by(&Ident::from("b")), 0);
    }

    #[test]
    fn test_span_extraction() {
        let data = records(json!([{"id": 1, "annotations": [{"completed_by": "alice", "result": [
            {"type": "labels", "value": {"start": 0, "end": 5, "labels": ["PER"]}},
            {"type": "labels", "value": {"start": 0, "end": 5, "labels": ["PER", "ORG"]}},
            {"type": "labels", "value": {"start": 9, "end": 12, "labels": []}}
        ]}]}]));
        let out = extract_spans(&data);

        let spans = &out.table[&Ident::Num(1)][&Ident::from("alice")];
        assert_eq!(
            spans,
            &BTreeSet::from([Span::new(0, 5, "ORG"), Span::new(0, 5, "PER")])
        );
    }

    #[test]
    fn test_span_without_labels_creates_no_item() {
        let data = records(json!([{"id": 1, "annotations": [{"completed_by": "a", "result": [
            {"type": "labels", "value": {"start": 1, "end": 2}}
        ]}]}]));
        let out = extract_spans(&data);
        assert!(out.table.is_empty());
        assert_eq!(out.annotators.len(), 1);
    }

    #[test]
    fn test_paragraph_extraction() {
        let data = records(json!([{
            "id": 7,
            "data": {"text": [{"text": "s0"}, {"text": "s1"}, {"text": "s2"}, {"text": "s3"}]},
            "annotations": [{"completed_by": 1, "result": [
                {"type": "paragraphlabels", "value": {"start": 0, "end": 2, "paragraphlabels": ["Q", "A"]}},
                {"type": "paragraphlabels", "value": {"start": "3", "paragraphlabels": ["A"]}},
                {"type": "paragraphlabels", "value": {"start": 1, "end": 2, "paragraphlabels": ["A"]}},
                {"type": "paragraphlabels", "value": {"start": 2, "paragraphlabels": []}}
            ]}]
        }]));
        let out = extract_paragraphs(&data);

        assert_eq!(out.paragraph_counts[&Ident::Num(7)], 4);
        let labels = &out.judgments.table[&Ident::Num(7)][&Ident::Num(1)];
        assert_eq!(
            labels,
            &BTreeMap::from([(0, "Q".to_string()), (1, "A".to_string()), (3, "A".to_string())])
        );
    }

    #[test]
    fn test_span_mode_reads_paragraph_entries() {
        let data = records(json!([{"id": 1, "annotations": [
            {"completed_by": "a", "result": [
                {"type": "paragraphlabels", "value": {"start": 0, "end": 2, "paragraphlabels": ["Q"]}},
                {"type": "paragraphlabels", "value": {"start": 3, "paragraphlabels": ["A"]}}
            ]},
            {"completed_by": "b", "result": [
                {"type": "paragraphlabels", "value": {"start": 0, "end": 2, "paragraphlabels": ["Q"]}}
            ]}
        ]}]));
        let out = extract_spans(&data);

        let item = &out.table[&Ident::Num(1)];
        assert_eq!(
            item[&Ident::from("a")],
            BTreeSet::from([Span::new(0, 2, "Q"), Span::new(3, 0, "A")])
        );
        assert_eq!(item[&Ident::from("b")], BTreeSet::from([Span::new(0, 2, "Q")]));
    }

    #[test]
    fn test_paragraph_offsets_at_integer_limits() {
        let data = records(json!([
            {"id": 1, "annotations": [{"completed_by": 1, "result": [
                {"type": "paragraphlabels", "value": {"start": "9223372036854775807", "paragraphlabels": ["Q"]}}
            ]}]},
            {"id": 2, "data": {"text": ["s0", "s1"]}, "annotations": [{"completed_by": 1, "result": [
                {"type": "paragraphlabels", "value": {"start": -3, "end": "1000000000000", "paragraphlabels": ["A"]}}
            ]}]}
        ]));
        let out = extract_paragraphs(&data);

        // No sentence fits after the largest index.
        assert!(!out.judgments.table.contains_key(&Ident::Num(1)));
        assert!(out.judgments.annotators.contains(&Ident::Num(1)));
        assert_eq!(
            out.judgments.table[&Ident::Num(2)][&Ident::Num(1)],
            BTreeMap::from([(0, "A".to_string()), (1, "A".to_string())])
        );
    }

    #[test]
    fn test_paragraph_range_clamping() {
        assert_eq!(paragraph_range(2, None, None), 2..3);
        assert_eq!(paragraph_range(i64::MAX, None, None), i64::MAX..i64::MAX);
        assert_eq!(paragraph_range(-5, Some(2), Some(10)), 0..2);
        assert_eq!(paragraph_range(1, Some(1_000_000_000_000), Some(4)), 1..4);
        assert_eq!(paragraph_range(0, Some(i64::MAX), None), 0..MAX_UNBOUNDED_PARAGRAPHS);
        assert!(paragraph_range(5, Some(2), None).is_empty());
    }

    #[test]
    fn test_dispatch() {
        let data = records(json!([{"id": 1, "annotations": [{"completed_by": "a", "result": [
            {"type": "labels", "value": {"start": 0, "end": 1, "labels": ["X"]}}
        ]}]}]));
        assert!(matches!(extract(&data, TaskType::Span), Some(Judgments::Span(_))));
        assert!(matches!(
            extract(&data, TaskType::Classification),
            Some(Judgments::Classification(e)) if e.table.is_empty()
        ));
        assert!(extract(&data, TaskType::Unknown).is_none());
    }
}
