//! Pairwise comparison between labels.

use serde::{Deserialize, Serialize};

use crate::config::CurveConfig;
use crate::curve::{CurveSlot, LabelCurves};
use crate::error::Result;
use crate::stats::{Delta, Representative};

/// Deltas between every pair of labels for one curve slot.
///
/// `deltas[i][j]` is label `j` measured against reference label `i`. Labels
/// without a curve for the slot get `None` rows and columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMatrix {
    /// Slot that was compared.
    pub slot: CurveSlot,
    /// Lower bound of the score interval.
    pub lo: f64,
    /// Upper bound of the score interval.
    pub hi: f64,
    /// Labels, in row/column order.
    pub labels: Vec<String>,
    /// Representative point per label.
    pub representatives: Vec<Option<Representative>>,
    /// Pairwise deltas, reference-major.
    pub deltas: Vec<Vec<Option<Delta>>>,
}

impl ComparisonMatrix {
    /// Compare `labels` on `slot` over `[lo, hi]`.
    pub fn build(
        labels: &[LabelCurves],
        slot: CurveSlot,
        lo: f64,
        hi: f64,
        config: &CurveConfig,
    ) -> Result<Self> {
        let representatives = labels
            .iter()
            .map(|l| {
                l.get(slot)
                    .map(|curve| Representative::compute(curve, lo, hi, config))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;

        let deltas = representatives
            .iter()
            .map(|reference| {
                representatives
                    .iter()
                    .map(|comparison| match (reference, comparison) {
                        (Some(r), Some(c)) => Some(Delta::between(r, c)),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            slot,
            lo,
            hi,
            labels: labels.iter().map(|l| l.label.clone()).collect(),
            representatives,
            deltas,
        })
    }

    /// Delta of `comparison` against `reference`, by label name.
    #[must_use]
    pub fn get(&self, reference: &str, comparison: &str) -> Option<&Delta> {
        let i = self.labels.iter().position(|l| l == reference)?;
        let j = self.labels.iter().position(|l| l == comparison)?;
        self.deltas[i][j].as_ref()
    }
}
