//! Agreement metrics.
//!
//! Every metric returns `Option<f64>`: `None` means the preconditions were
//! not met (too few shared items, too few annotators, no variation), which
//! is reported as "not computable" rather than treated as an error.

pub mod krippendorff;
pub mod pairwise;

pub use krippendorff::{ReliabilityMatrix, krippendorff_alpha};
pub use pairwise::{SpanScores, cohens_kappa, percent_agreement, shared_count, span_exact_match};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Landis & Koch (1977) interpretation of a kappa or alpha value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementBand {
    Poor,
    Slight,
    Fair,
    Moderate,
    Substantial,
    AlmostPerfect,
}

impl AgreementBand {
    pub const ALL: [Self; 6] = [
        Self::Poor,
        Self::Slight,
        Self::Fair,
        Self::Moderate,
        Self::Substantial,
        Self::AlmostPerfect,
    ];

    /// Score range covered by the band, as printed in the legend.
    pub fn range(&self) -> &'static str {
        match self {
            Self::Poor => "< 0.00",
            Self::Slight => "0.00-0.20",
            Self::Fair => "0.20-0.40",
            Self::Moderate => "0.40-0.60",
            Self::Substantial => "0.60-0.80",
            Self::AlmostPerfect => "0.80-1.00",
        }
    }

    /// Band for a score. Bands are half-open, `[0.80, 1.00]` is closed.
    pub fn from_score(score: f64) -> Self {
        if score < 0.0 {
            Self::Poor
        } else if score < 0.20 {
            Self::Slight
        } else if score < 0.40 {
            Self::Fair
        } else if score < 0.60 {
            Self::Moderate
        } else if score < 0.80 {
            Self::Substantial
        } else {
            Self::AlmostPerfect
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Slight => "slight",
            Self::Fair => "fair",
            Self::Moderate => "moderate",
            Self::Substantial => "substantial",
            Self::AlmostPerfect => "almost perfect",
        }
    }
}

impl fmt::Display for AgreementBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chance-corrected score and its interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: Option<f64>,
    pub band: Option<AgreementBand>,
}

impl Score {
    pub fn new(value: Option<f64>) -> Self {
        Self {
            value,
            band: value.map(AgreementBand::from_score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(AgreementBand::from_score(-0.01), AgreementBand::Poor);
        assert_eq!(AgreementBand::from_score(0.0), AgreementBand::Slight);
        assert_eq!(AgreementBand::from_score(0.19), AgreementBand::Slight);
        assert_eq!(AgreementBand::from_score(0.20), AgreementBand::Fair);
        assert_eq!(AgreementBand::from_score(0.45), AgreementBand::Moderate);
        assert_eq!(AgreementBand::from_score(0.60), AgreementBand::Substantial);
        assert_eq!(AgreementBand::from_score(0.80), AgreementBand::AlmostPerfect);
        assert_eq!(AgreementBand::from_score(1.0), AgreementBand::AlmostPerfect);
    }

    #[test]
    fn test_score_without_value_has_no_band() {
        assert_eq!(Score::new(None).band, None);
        assert_eq!(Score::new(Some(0.85)).band, Some(AgreementBand::AlmostPerfect));
        assert_eq!(AgreementBand::AlmostPerfect.to_string(), "almost perfect");
    }
}
