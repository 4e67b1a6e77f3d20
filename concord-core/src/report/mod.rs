//! Agreement report assembly.
//!
//! [`assemble`] detects the task type, extracts judgments and scores every
//! annotator pair plus the whole panel. The resulting [`AgreementReport`] is
//! plain data; [`AgreementReport::render`] turns it into text, markdown or
//! JSON.

mod render;

pub use render::ReportFormat;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ReportConfig;
use crate::detect::{TaskType, resolve_task_type};
use crate::error::Result;
use crate::export::{Export, Ident};
use crate::extract::{self, Extraction, Judgments, Label, ParagraphExtraction, Span};
use crate::metrics::{
    Score, SpanScores, cohens_kappa, krippendorff_alpha, percent_agreement, shared_count,
    span_exact_match,
};

/// Export-level counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub tasks: usize,
    pub annotated_tasks: usize,
    pub annotations: usize,
    pub task_type: TaskType,
}

/// How much one annotator contributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatorCount {
    pub annotator: Ident,
    pub items: usize,
    /// Distinct spans, span tasks only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spans: Option<usize>,
}

/// Agreement between two annotators on single-label judgments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairAgreement {
    pub first: Ident,
    pub second: Ident,
    pub shared: usize,
    pub percent_agreement: Option<f64>,
    pub kappa: Score,
}

/// Pairwise and panel-wide agreement on single-label judgments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelAgreement {
    pub annotators: Vec<AnnotatorCount>,
    pub pairs: Vec<PairAgreement>,
    /// `None` when the overall section does not apply.
    pub alpha: Option<Score>,
}

/// Binary (is / is not this label) alpha for one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelBreakdown {
    pub label: Label,
    pub occurrences: usize,
    pub alpha: Option<f64>,
}

/// Sentence-level agreement for paragraph tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphAgreement {
    /// Sentences judged by at least two annotators.
    pub multi_annotated: usize,
    #[serde(flatten)]
    pub agreement: LabelAgreement,
    pub per_label: Vec<LabelBreakdown>,
}

/// Averaged exact-match scores between two annotators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanPairAgreement {
    pub first: Ident,
    pub second: Ident,
    pub shared: usize,
    pub scores: SpanScores,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanAgreement {
    pub annotators: Vec<AnnotatorCount>,
    pub pairs: Vec<SpanPairAgreement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportBody {
    Classification(LabelAgreement),
    Paragraph(ParagraphAgreement),
    Span(SpanAgreement),
    Undetected,
}

/// A complete agreement report, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementReport {
    pub summary: Summary,
    pub body: ReportBody,
}

/// Synthetic item key for one sentence of one task.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParagraphKey {
    pub item: Ident,
    pub paragraph: i64,
}

/// Build the report for an export. `forced` overrides task type detection.
pub fn assemble(export: &Export, forced: Option<TaskType>) -> AgreementReport {
    let task_type = resolve_task_type(export.records(), forced);
    let summary = Summary {
        tasks: export.len(),
        annotated_tasks: export.annotated_count(),
        annotations: export.annotation_count(),
        task_type,
    };
    tracing::info!(
        tasks = summary.tasks,
        annotations = summary.annotations,
        task_type = %task_type,
        "assembling agreement report"
    );

    let body = match extract::extract(export.records(), task_type) {
        Some(Judgments::Classification(extraction)) => {
            ReportBody::Classification(score_classification(&extraction))
        }
        Some(Judgments::Paragraph(extraction)) => {
            ReportBody::Paragraph(score_paragraphs(&extraction))
        }
        Some(Judgments::Span(extraction)) => ReportBody::Span(score_spans(&extraction)),
        None => {
            tracing::warn!("could not detect a task type from the export");
            ReportBody::Undetected
        }
    };

    AgreementReport { summary, body }
}

/// Assemble and render in one go.
pub fn generate_report(export: &Export, config: &ReportConfig) -> Result<String> {
    assemble(export, config.task_type).render(config.format, config.precision)
}

/// One annotator's judgments, keyed by item.
fn column<'a, K: Ord, V>(
    table: &'a BTreeMap<K, BTreeMap<Ident, V>>,
    annotator: &Ident,
) -> BTreeMap<&'a K, &'a V> {
    table
        .iter()
        .filter_map(|(key, judgments)| judgments.get(annotator).map(|v| (key, v)))
        .collect()
}

/// Unordered pairs in sorted order.
fn pairs(annotators: &BTreeSet<Ident>) -> Vec<(&Ident, &Ident)> {
    let list: Vec<&Ident> = annotators.iter().collect();
    let mut out = Vec::new();
    for (i, first) in list.iter().enumerate() {
        for second in &list[i + 1..] {
            out.push((*first, *second));
        }
    }
    out
}

fn annotator_counts<V>(extraction: &Extraction<V>) -> Vec<AnnotatorCount> {
    extraction
        .annotators
        .iter()
        .map(|annotator| AnnotatorCount {
            annotator: annotator.clone(),
            items: extraction.items_judged_by(annotator),
            spans: None,
        })
        .collect()
}

fn pairwise_labels<K: Ord, V: Ord>(
    table: &BTreeMap<K, BTreeMap<Ident, V>>,
    annotators: &BTreeSet<Ident>,
) -> Vec<PairAgreement> {
    pairs(annotators)
        .into_iter()
        .map(|(first, second)| {
            let a = column(table, first);
            let b = column(table, second);
            PairAgreement {
                first: first.clone(),
                second: second.clone(),
                shared: shared_count(&a, &b),
                percent_agreement: percent_agreement(&a, &b),
                kappa: Score::new(cohens_kappa(&a, &b)),
            }
        })
        .collect()
}

fn score_classification(extraction: &Extraction<Label>) -> LabelAgreement {
    let Extraction { table, annotators } = extraction;
    LabelAgreement {
        annotators: annotator_counts(extraction),
        pairs: pairwise_labels(table, annotators),
        alpha: Some(Score::new(krippendorff_alpha(table, annotators, None))),
    }
}

/// Flatten (task, sentence) into synthetic items. Sentences beyond a task's
/// known paragraph count are dropped; without a count every index is kept.
fn flatten_paragraphs(
    extraction: &ParagraphExtraction,
) -> BTreeMap<ParagraphKey, BTreeMap<Ident, Label>> {
    let mut flat: BTreeMap<ParagraphKey, BTreeMap<Ident, Label>> = BTreeMap::new();
    for (item, by_annotator) in &extraction.judgments.table {
        let limit = extraction.paragraph_counts.get(item).copied();
        for (annotator, sentences) in by_annotator {
            for (&paragraph, label) in sentences {
                let in_range = match limit {
                    Some(count) => usize::try_from(paragraph).is_ok_and(|p| p < count),
                    None => true,
                };
                if !in_range {
                    continue;
                }
                flat.entry(ParagraphKey {
                    item: item.clone(),
                    paragraph,
                })
                .or_default()
                .insert(annotator.clone(), label.clone());
            }
        }
    }
    flat
}

fn score_paragraphs(extraction: &ParagraphExtraction) -> ParagraphAgreement {
    let annotators = &extraction.judgments.annotators;

    let multi: BTreeMap<ParagraphKey, BTreeMap<Ident, Label>> = flatten_paragraphs(extraction)
        .into_iter()
        .filter(|(_, judgments)| judgments.len() >= 2)
        .collect();
    tracing::debug!(sentences = multi.len(), "sentences with two or more judgments");

    let mut agreement = LabelAgreement {
        annotators: annotator_counts(&extraction.judgments),
        pairs: Vec::new(),
        alpha: None,
    };
    let mut per_label = Vec::new();

    if annotators.len() >= 2 && !multi.is_empty() {
        agreement.pairs = pairwise_labels(&multi, annotators);
        agreement.alpha = Some(Score::new(krippendorff_alpha(&multi, annotators, None)));

        let labels: BTreeSet<&Label> = multi.values().flat_map(|j| j.values()).collect();
        for label in labels {
            let binary: BTreeMap<&ParagraphKey, BTreeMap<Ident, bool>> = multi
                .iter()
                .map(|(key, judgments)| {
                    let marks = judgments
                        .iter()
                        .map(|(annotator, l)| (annotator.clone(), l == label))
                        .collect();
                    (key, marks)
                })
                .collect();
            let occurrences = multi
                .values()
                .flat_map(|j| j.values())
                .filter(|l| *l == label)
                .count();
            per_label.push(LabelBreakdown {
                label: label.clone(),
                occurrences,
                alpha: krippendorff_alpha(&binary, annotators, None),
            });
        }
    }

    ParagraphAgreement {
        multi_annotated: multi.len(),
        agreement,
        per_label,
    }
}

fn score_spans(extraction: &Extraction<BTreeSet<Span>>) -> SpanAgreement {
    let table = &extraction.table;
    let annotators = extraction
        .annotators
        .iter()
        .map(|annotator| AnnotatorCount {
            annotator: annotator.clone(),
            items: extraction.items_judged_by(annotator),
            spans: Some(
                table
                    .values()
                    .filter_map(|judgments| judgments.get(annotator))
                    .map(BTreeSet::len)
                    .sum(),
            ),
        })
        .collect();

    let mut scored = Vec::new();
    for (first, second) in pairs(&extraction.annotators) {
        let per_item: Vec<SpanScores> = table
            .values()
            .filter_map(|judgments| Some((judgments.get(first)?, judgments.get(second)?)))
            .map(|(a, b)| span_exact_match(a, b))
            .collect();
        // Pairs without a shared task are left out.
        let Some(scores) = SpanScores::mean(&per_item) else {
            continue;
        };
        scored.push(SpanPairAgreement {
            first: first.clone(),
            second: second.clone(),
            shared: per_item.len(),
            scores,
        });
    }

    SpanAgreement {
        annotators,
        pairs: scored,
    }
}
