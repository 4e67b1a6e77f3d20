//! Krippendorff's alpha for nominal data.
//!
//! Works on a reliability matrix (annotators x items) with missing cells, so
//! annotators do not need to judge the same items. Computed through the
//! coincidence matrix:
//!
//! ```text
//! o_ck  = sum over items u of pairs(c, k in u) / (m_u - 1)
//! n_c   = sum_k o_ck,   n = sum_c n_c
//! alpha = 1 - (n - 1) * sum_{c != k} o_ck / sum_{c != k} n_c * n_k
//! ```
//!
//! Items judged by fewer than two annotators are unpairable and drop out.

use std::collections::{BTreeMap, BTreeSet};

use crate::export::Ident;

/// Annotators x items matrix of dense label codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReliabilityMatrix {
    rows: Vec<Vec<Option<usize>>>,
    vocabulary_size: usize,
}

impl ReliabilityMatrix {
    /// Build the matrix from a judgment table.
    ///
    /// Annotators and items are taken in sorted order. Labels are coded by
    /// their position in the sorted vocabulary, which defaults to every label
    /// in the table. Judgments outside the vocabulary are left missing.
    pub fn from_table<K: Ord, V: Ord>(
        table: &BTreeMap<K, BTreeMap<Ident, V>>,
        annotators: &BTreeSet<Ident>,
        label_set: Option<&BTreeSet<V>>,
    ) -> Self {
        let vocabulary: Vec<&V> = match label_set {
            Some(labels) => labels.iter().collect(),
            None => table
                .values()
                .flat_map(|judgments| judgments.values())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };
        let codes: BTreeMap<&V, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(code, label)| (*label, code))
            .collect();

        let rows = annotators
            .iter()
            .map(|annotator| {
                table
                    .values()
                    .map(|judgments| {
                        judgments
                            .get(annotator)
                            .and_then(|label| codes.get(label).copied())
                    })
                    .collect()
            })
            .collect();

        Self {
            rows,
            vocabulary_size: vocabulary.len(),
        }
    }

    pub fn annotators(&self) -> usize {
        self.rows.len()
    }

    pub fn items(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Code in cell `(annotator, item)`, `None` when missing.
    pub fn get(&self, annotator: usize, item: usize) -> Option<usize> {
        self.rows.get(annotator)?.get(item).copied().flatten()
    }

    /// Nominal alpha, or `None` when the data leaves it undefined: fewer than
    /// two distinct values, nothing pairable, or zero expected disagreement.
    pub fn nominal_alpha(&self) -> Option<f64> {
        let k = self.vocabulary_size;
        let distinct: BTreeSet<usize> = self.rows.iter().flatten().flatten().copied().collect();
        if distinct.len() < 2 {
            return None;
        }

        let mut coincidences = vec![vec![0.0_f64; k]; k];
        for item in 0..self.items() {
            let mut counts = vec![0_usize; k];
            for row in &self.rows {
                if let Some(code) = row[item] {
                    counts[code] += 1;
                }
            }
            let pairable: usize = counts.iter().sum();
            if pairable < 2 {
                continue;
            }
            let weight = (pairable - 1) as f64;
            for c in 0..k {
                if counts[c] == 0 {
                    continue;
                }
                for d in 0..k {
                    let pairs = if c == d {
                        counts[c] * (counts[c] - 1)
                    } else {
                        counts[c] * counts[d]
                    };
                    coincidences[c][d] += pairs as f64 / weight;
                }
            }
        }

        let marginals: Vec<f64> = coincidences.iter().map(|row| row.iter().sum()).collect();
        let n: f64 = marginals.iter().sum();
        if n < 2.0 {
            return None;
        }

        let mut observed = 0.0;
        let mut expected = 0.0;
        for c in 0..k {
            for d in 0..k {
                if c != d {
                    observed += coincidences[c][d];
                    expected += marginals[c] * marginals[d];
                }
            }
        }
        if expected <= 0.0 {
            return None;
        }

        Some(1.0 - (n - 1.0) * observed / expected)
    }
}

/// Krippendorff's alpha (nominal) across all annotators and items.
///
/// `None` with fewer than two annotators, no items, or degenerate data.
pub fn krippendorff_alpha<K: Ord, V: Ord>(
    table: &BTreeMap<K, BTreeMap<Ident, V>>,
    annotators: &BTreeSet<Ident>,
    label_set: Option<&BTreeSet<V>>,
) -> Option<f64> {
    if annotators.len() < 2 || table.is_empty() {
        return None;
    }
    let matrix = ReliabilityMatrix::from_table(table, annotators, label_set);
    let alpha = matrix.nominal_alpha();
    tracing::debug!(
        annotators = matrix.annotators(),
        items = matrix.items(),
        ?alpha,
        "computed krippendorff's alpha"
    );
    alpha
}
