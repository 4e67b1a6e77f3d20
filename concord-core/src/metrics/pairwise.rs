//! Two-annotator agreement: percent agreement, Cohen's kappa, span exact match.
//!
//! Each annotator is given as a map from item key to judgment. Only keys
//! present in both maps ("shared items") are compared.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::extract::Span;

/// Number of keys present in both maps.
pub fn shared_count<K: Ord, A, B>(a: &BTreeMap<K, A>, b: &BTreeMap<K, B>) -> usize {
    a.keys().filter(|key| b.contains_key(key)).count()
}

fn shared_pairs<'a, K: Ord, V>(
    a: &'a BTreeMap<K, V>,
    b: &'a BTreeMap<K, V>,
) -> Vec<(&'a V, &'a V)> {
    a.iter()
        .filter_map(|(key, va)| b.get(key).map(|vb| (va, vb)))
        .collect()
}

/// Fraction of shared items with identical judgments.
pub fn percent_agreement<K: Ord, V: PartialEq>(
    a: &BTreeMap<K, V>,
    b: &BTreeMap<K, V>,
) -> Option<f64> {
    let pairs = shared_pairs(a, b);
    if pairs.is_empty() {
        return None;
    }
    let agree = pairs.iter().filter(|(x, y)| x == y).count();
    Some(agree as f64 / pairs.len() as f64)
}

/// Cohen's kappa over the shared items. Needs at least two of them.
///
/// Not clamped: strongly anti-correlated raters can go below -1.
pub fn cohens_kappa<K: Ord, V: Ord>(a: &BTreeMap<K, V>, b: &BTreeMap<K, V>) -> Option<f64> {
    let pairs = shared_pairs(a, b);
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;

    let agree = pairs.iter().filter(|(x, y)| x == y).count() as f64;
    let po = agree / n;

    // Expected agreement
    let mut counts_a: BTreeMap<&V, usize> = BTreeMap::new();
    let mut counts_b: BTreeMap<&V, usize> = BTreeMap::new();
    for (x, y) in &pairs {
        *counts_a.entry(*x).or_insert(0) += 1;
        *counts_b.entry(*y).or_insert(0) += 1;
    }
    let categories: BTreeSet<&V> = counts_a.keys().chain(counts_b.keys()).copied().collect();
    let mut pe = 0.0;
    for cat in &categories {
        let pa = counts_a.get(cat).copied().unwrap_or(0) as f64 / n;
        let pb = counts_b.get(cat).copied().unwrap_or(0) as f64 / n;
        pe += pa * pb;
    }

    if (1.0 - pe).abs() < f64::EPSILON {
        return Some(1.0);
    }
    Some((po - pe) / (1.0 - pe))
}

/// Exact-match precision, recall and F1 between two span sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpanScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl SpanScores {
    pub const PERFECT: Self = Self {
        precision: 1.0,
        recall: 1.0,
        f1: 1.0,
    };

    /// Arithmetic mean of each component; `None` for an empty slice.
    pub fn mean(scores: &[SpanScores]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let n = scores.len() as f64;
        Some(Self {
            precision: scores.iter().map(|s| s.precision).sum::<f64>() / n,
            recall: scores.iter().map(|s| s.recall).sum::<f64>() / n,
            f1: scores.iter().map(|s| s.f1).sum::<f64>() / n,
        })
    }
}

/// Compare two span collections as sets of `(start, end, label)`.
///
/// `a` is treated as the reference: precision is measured against `b`,
/// recall against `a`. Two empty sets agree perfectly.
pub fn span_exact_match<'a, A, B>(a: A, b: B) -> SpanScores
where
    A: IntoIterator<Item = &'a Span>,
    B: IntoIterator<Item = &'a Span>,
{
    let set_a: BTreeSet<&Span> = a.into_iter().collect();
    let set_b: BTreeSet<&Span> = b.into_iter().collect();

    if set_a.is_empty() && set_b.is_empty() {
        return SpanScores::PERFECT;
    }

    let tp = set_a.intersection(&set_b).count() as f64;
    let precision = if set_b.is_empty() {
        0.0
    } else {
        tp / set_b.len() as f64
    };
    let recall = if set_a.is_empty() {
        0.0
    } else {
        tp / set_a.len() as f64
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    SpanScores {
        precision,
        recall,
        f1,
    }
}
