//! Report rendering in plain text, markdown or JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{
    AgreementReport, AnnotatorCount, LabelAgreement, ParagraphAgreement, ReportBody,
    SpanAgreement,
};
use crate::error::Result;
use crate::metrics::{AgreementBand, Score};

/// Output layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Indented text with ruled section headers.
    #[default]
    Text,
    /// Heading-based markdown.
    Markdown,
    /// The report structure as pretty-printed JSON.
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown report format '{other}' (expected text, markdown or json)"
            )),
        }
    }
}

const TITLE: &str = "Inter-Annotator Agreement Report";
const RULE_WIDTH: usize = 50;
const NOT_AVAILABLE: &str = "N/A (insufficient data)";

impl AgreementReport {
    /// Render the report. `precision` is the number of decimals for scores
    /// and is ignored by the JSON layout.
    pub fn render(&self, format: ReportFormat, precision: usize) -> Result<String> {
        let markdown = match format {
            ReportFormat::Json => return Ok(serde_json::to_string_pretty(self)?),
            ReportFormat::Text => false,
            ReportFormat::Markdown => true,
        };

        let mut out = Layout {
            markdown,
            precision,
            lines: Vec::new(),
        };
        out.title();

        let summary = &self.summary;
        out.heading("Summary");
        out.line(&format!(
            "Tasks: {} ({} annotated)",
            summary.tasks, summary.annotated_tasks
        ));
        out.line(&format!("Total annotations: {}", summary.annotations));
        out.line(&format!("Detected task type: {}", summary.task_type));

        match &self.body {
            ReportBody::Classification(body) => out.classification(body),
            ReportBody::Paragraph(body) => out.paragraph(body),
            ReportBody::Span(body) => out.span(body),
            ReportBody::Undetected => {
                out.blank();
                out.line("Could not detect task type from annotations.");
                out.line("Make sure the export contains completed annotations.");
            }
        }

        out.legend();
        Ok(out.finish())
    }
}

struct Layout {
    markdown: bool,
    precision: usize,
    lines: Vec<String>,
}

impl Layout {
    fn title(&mut self) {
        if self.markdown {
            self.lines.push(format!("# {TITLE}"));
        } else {
            self.lines.push(format!("  {TITLE}"));
        }
    }

    fn heading(&mut self, text: &str) {
        self.lines.push(String::new());
        if self.markdown {
            self.lines.push(format!("## {text}"));
            self.lines.push(String::new());
        } else {
            let rule = "─".repeat(RULE_WIDTH);
            self.lines.push(rule.clone());
            self.lines.push(format!("  {text}"));
            self.lines.push(rule);
        }
    }

    fn subheading(&mut self, text: &str) {
        self.lines.push(String::new());
        if self.markdown {
            self.lines.push(format!("### {text}"));
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("  {text}:"));
        }
    }

    fn line(&mut self, text: &str) {
        if self.markdown {
            self.lines.push(format!("- {text}"));
        } else {
            self.lines.push(format!("  {text}"));
        }
    }

    fn nested(&mut self, text: &str) {
        if self.markdown {
            self.lines.push(format!("  - {text}"));
        } else {
            self.lines.push(format!("    {text}"));
        }
    }

    /// Annotator or label text. Markdown metacharacters are escaped so that a
    /// name cannot change the document structure.
    fn name(&self, text: impl fmt::Display) -> String {
        let text = text.to_string();
        if !self.markdown {
            return text;
        }
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(
                c,
                '\\' | '`' | '*' | '_' | '#' | '[' | ']' | '<' | '>' | '|' | '~'
            ) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn value(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{:.*}", self.precision, v),
            None => NOT_AVAILABLE.to_string(),
        }
    }

    fn score(&self, name: &str, score: &Score) -> String {
        match (score.value, score.band) {
            (Some(_), Some(band)) => format!("{name}: {} ({band})", self.value(score.value)),
            _ => format!("{name}: {}", self.value(score.value)),
        }
    }

    fn annotators(&mut self, counts: &[AnnotatorCount], unit: &str) {
        self.heading("Annotators");
        for count in counts {
            let text = match count.spans {
                Some(spans) => format!(
                    "Annotator {}: {} tasks, {spans} spans",
                    self.name(&count.annotator),
                    count.items
                ),
                None => format!(
                    "Annotator {}: {} {unit} annotated",
                    self.name(&count.annotator),
                    count.items
                ),
            };
            self.line(&text);
        }
    }

    fn label_pairs(&mut self, body: &LabelAgreement, shared_unit: &str) {
        for pair in &body.pairs {
            self.subheading(&format!(
                "Annotators {} vs {} ({} shared {shared_unit})",
                self.name(&pair.first),
                self.name(&pair.second),
                pair.shared
            ));
            let percent = format!("Percent agreement: {}", self.value(pair.percent_agreement));
            self.nested(&percent);
            let kappa = self.score("Cohen's kappa", &pair.kappa);
            self.nested(&kappa);
        }
    }

    fn classification(&mut self, body: &LabelAgreement) {
        self.annotators(&body.annotators, "items");

        if !body.pairs.is_empty() {
            self.heading("Pairwise Agreement");
            self.label_pairs(body, "items");
        }

        if let Some(alpha) = &body.alpha {
            self.heading("Overall Agreement");
            let text = self.score("Krippendorff's alpha", alpha);
            self.line(&text);
        }
    }

    fn paragraph(&mut self, body: &ParagraphAgreement) {
        self.annotators(&body.agreement.annotators, "tasks");
        self.blank();
        self.line(&format!(
            "Sentences with 2+ annotations: {}",
            body.multi_annotated
        ));

        // Only scored once two annotators overlap on some sentence.
        let Some(alpha) = &body.agreement.alpha else {
            return;
        };

        self.heading("Pairwise Agreement (sentence-level)");
        self.label_pairs(&body.agreement, "sentences");

        self.heading("Overall Agreement (sentence-level)");
        let text = self.score("Krippendorff's alpha", alpha);
        self.line(&text);

        self.heading("Per-Label Agreement");
        for breakdown in &body.per_label {
            let text = format!(
                "{} (n={}): alpha={}",
                self.name(&breakdown.label),
                breakdown.occurrences,
                self.value(breakdown.alpha)
            );
            self.line(&text);
        }
    }

    fn span(&mut self, body: &SpanAgreement) {
        self.annotators(&body.annotators, "tasks");

        if body.annotators.len() < 2 {
            return;
        }
        self.heading("Pairwise Span Agreement (Exact Match)");
        for pair in &body.pairs {
            self.subheading(&format!(
                "Annotators {} vs {} ({} shared tasks)",
                self.name(&pair.first),
                self.name(&pair.second),
                pair.shared
            ));
            let scores = &pair.scores;
            let lines = [
                format!("Avg precision: {}", self.value(Some(scores.precision))),
                format!("Avg recall: {}", self.value(Some(scores.recall))),
                format!("Avg F1 (exact match): {}", self.value(Some(scores.f1))),
            ];
            for line in &lines {
                self.nested(line);
            }
        }
    }

    fn legend(&mut self) {
        self.heading("Interpretation Guide");
        self.line("Kappa / Alpha scale (Landis & Koch 1977):");
        for band in AgreementBand::ALL {
            let name = band.as_str();
            let mut chars = name.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            };
            self.nested(&format!("{:<10} {capitalized}", band.range()));
        }
    }

    fn finish(mut self) -> String {
        self.lines.push(String::new());
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::TaskType;
    use crate::export::Ident;
    use crate::metrics::SpanScores;
    use crate::report::{LabelBreakdown, PairAgreement, SpanPairAgreement, Summary};
    use pretty_assertions::assert_eq;

    fn summary(task_type: TaskType) -> Summary {
        Summary {
            tasks: 2,
            annotated_tasks: 2,
            annotations: 4,
            task_type,
        }
    }

    fn classification_report() -> AgreementReport {
        AgreementReport {
            summary: summary(TaskType::Classification),
            body: ReportBody::Classification(LabelAgreement {
                annotators: vec![
                    AnnotatorCount {
                        annotator: Ident::from("a"),
                        items: 2,
                        spans: None,
                    },
                    AnnotatorCount {
                        annotator: Ident::from("b"),
                        items: 2,
                        spans: None,
                    },
                ],
                pairs: vec![PairAgreement {
                    first: Ident::from("a"),
                    second: Ident::from("b"),
                    shared: 2,
                    percent_agreement: Some(0.5),
                    kappa: Score::new(None),
                }],
                alpha: Some(Score::new(Some(0.6543))),
            }),
        }
    }

    #[test]
    fn test_text_layout() {
        let text = classification_report().render(ReportFormat::Text, 3).unwrap();
        let rule = "─".repeat(50);
        let expected = [
            "  Inter-Annotator Agreement Report",
            "",
            &rule,
            "  Summary",
            &rule,
            "  Tasks: 2 (2 annotated)",
            "  Total annotations: 4",
            "  Detected task type: classification",
            "",
            &rule,
            "  Annotators",
            &rule,
            "  Annotator a: 2 items annotated",
            "  Annotator b: 2 items annotated",
            "",
            &rule,
            "  Pairwise Agreement",
            &rule,
            "",
            "  Annotators a vs b (2 shared items):",
            "    Percent agreement: 0.500",
            "    Cohen's kappa: N/A (insufficient data)",
            "",
            &rule,
            "  Overall Agreement",
            &rule,
            "  Krippendorff's alpha: 0.654 (substantial)",
        ]
        .join("\n");
        assert!(text.starts_with(&expected), "{text}");
        assert!(text.contains("    0.80-1.00  Almost perfect"));
        assert!(text.contains("    < 0.00     Poor"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_markdown_layout() {
        let md = classification_report().render(ReportFormat::Markdown, 2).unwrap();
        assert!(md.starts_with("# Inter-Annotator Agreement Report\n"));
        assert!(md.contains("\n## Summary\n"));
        assert!(md.contains("\n## Interpretation Guide\n"));
        assert!(md.contains("### Annotators a vs b (2 shared items)"));
        assert!(md.contains("  - Percent agreement: 0.50"));
        assert!(md.contains("- Krippendorff's alpha: 0.65 (substantial)"));
        assert!(!md.contains('─'));
    }

    #[test]
    fn test_layouts_carry_the_same_values() {
        let report = classification_report();
        let text = report.render(ReportFormat::Text, 3).unwrap();
        let md = report.render(ReportFormat::Markdown, 3).unwrap();
        for needle in [
            "Tasks: 2 (2 annotated)",
            "Annotator b: 2 items annotated",
            "Percent agreement: 0.500",
            "Cohen's kappa: N/A (insufficient data)",
            "Krippendorff's alpha: 0.654 (substantial)",
        ] {
            assert!(text.contains(needle), "text missing {needle}");
            assert!(md.contains(needle), "markdown missing {needle}");
        }
    }

    #[test]
    fn test_json_layout() {
        let json = classification_report().render(ReportFormat::Json, 3).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["task_type"], "classification");
        assert_eq!(value["body"]["kind"], "classification");
        assert_eq!(value["body"]["pairs"][0]["percent_agreement"], 0.5);
        assert!(value["body"]["pairs"][0]["kappa"]["value"].is_null());
    }

    #[test]
    fn test_span_layout() {
        let report = AgreementReport {
            summary: summary(TaskType::Span),
            body: ReportBody::Span(SpanAgreement {
                annotators: vec![
                    AnnotatorCount {
                        annotator: Ident::Num(1),
                        items: 2,
                        spans: Some(5),
                    },
                    AnnotatorCount {
                        annotator: Ident::Num(2),
                        items: 1,
                        spans: Some(1),
                    },
                ],
                pairs: vec![SpanPairAgreement {
                    first: Ident::Num(1),
                    second: Ident::Num(2),
                    shared: 1,
                    scores: SpanScores::PERFECT,
                }],
            }),
        };
        let text = report.render(ReportFormat::Text, 3).unwrap();
        assert!(text.contains("  Annotator 1: 2 tasks, 5 spans"));
        assert!(text.contains("  Pairwise Span Agreement (Exact Match)"));
        assert!(text.contains("  Annotators 1 vs 2 (1 shared tasks):"));
        assert!(text.contains("    Avg F1 (exact match): 1.000"));
    }

    #[test]
    fn test_markdown_escapes_names_and_labels() {
        let report = AgreementReport {
            summary: summary(TaskType::Paragraph),
            body: ReportBody::Paragraph(ParagraphAgreement {
                multi_annotated: 2,
                agreement: LabelAgreement {
                    annotators: vec![AnnotatorCount {
                        annotator: Ident::from("*ann*"),
                        items: 1,
                        spans: None,
                    }],
                    pairs: vec![PairAgreement {
                        first: Ident::from("*ann*"),
                        second: Ident::from("b_1"),
                        shared: 2,
                        percent_agreement: Some(1.0),
                        kappa: Score::new(Some(1.0)),
                    }],
                    alpha: Some(Score::new(None)),
                },
                per_label: vec![LabelBreakdown {
                    label: "# CLAIM".to_string(),
                    occurrences: 2,
                    alpha: None,
                }],
            }),
        };

        let md = report.render(ReportFormat::Markdown, 3).unwrap();
        assert!(md.contains("- Annotator \\*ann\\*: 1 tasks annotated"));
        assert!(md.contains("### Annotators \\*ann\\* vs b\\_1 (2 shared sentences)"));
        assert!(md.contains("- \\# CLAIM (n=2): alpha=N/A (insufficient data)"));
        assert!(!md.lines().any(|line| line.starts_with("# CLAIM")));

        let text = report.render(ReportFormat::Text, 3).unwrap();
        assert!(text.contains("  Annotator *ann*: 1 tasks annotated"));
        assert!(text.contains("  # CLAIM (n=2): alpha=N/A (insufficient data)"));
    }

    #[test]
    fn test_undetected_layout() {
        let report = AgreementReport {
            summary: summary(TaskType::Unknown),
            body: ReportBody::Undetected,
        };
        let text = report.render(ReportFormat::Text, 3).unwrap();
        assert!(text.contains("Detected task type: unknown"));
        assert!(text.contains("Could not detect task type from annotations."));
        assert!(text.contains("Interpretation Guide"));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("markdown".parse::<ReportFormat>(), Ok(ReportFormat::Markdown));
        assert_eq!("MD".parse::<ReportFormat>(), Ok(ReportFormat::Markdown));
        assert!("pdf".parse::<ReportFormat>().is_err());
    }
}
