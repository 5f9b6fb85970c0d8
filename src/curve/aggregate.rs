//! Cross-source mean curves.
//!
//! The mean is taken in log space, which makes the exponentiated result a
//! geometric mean of bpp and nspp across sources.

use std::collections::BTreeSet;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::curve::{Curve, CurveBuilder, SourceCurves};
use crate::error::{Error, Result};
use crate::interpolation::Interpolator;
use crate::measurement::{MeasurementProvider, ResolutionCatalog};

/// Elementwise mean of curves sharing one grid.
///
/// A single curve aggregates to itself exactly.
pub fn aggregate<'a, T>(curves: T) -> Result<Curve>
where
    T: IntoIterator<Item = &'a Curve>,
{
    let mut iter = curves.into_iter();
    let first = iter.next().ok_or(Error::EmptyAggregate)?;

    let mut log_bpp = first.log_bpp.clone();
    let mut log_nspp = first.log_nspp.clone();
    let mut count = 1usize;

    for curve in iter {
        first.ensure_same_grid(curve)?;
        for (acc, v) in log_bpp.iter_mut().zip(&curve.log_bpp) {
            *acc += v;
        }
        for (acc, v) in log_nspp.iter_mut().zip(&curve.log_nspp) {
            *acc += v;
        }
        count += 1;
    }

    if count > 1 {
        let n = count as f64;
        log_bpp.iter_mut().for_each(|v| *v /= n);
        log_nspp.iter_mut().for_each(|v| *v /= n);
    }

    Ok(Curve {
        scores: first.scores.clone(),
        log_bpp,
        log_nspp,
    })
}

/// Which curve of a source is being aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveSlot {
    /// The same-res curve at one resolution index.
    Resolution(u32),
    /// The best-of-resolutions curve.
    Multires,
}

impl fmt::Display for CurveSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution(i) => write!(f, "res{i}"),
            Self::Multires => write!(f, "multires"),
        }
    }
}

impl std::str::FromStr for CurveSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        if lower == "multires" {
            return Ok(Self::Multires);
        }
        lower
            .strip_prefix("res")
            .unwrap_or(&lower)
            .parse::<u32>()
            .map(Self::Resolution)
            .map_err(|_| Error::InvalidConfig(format!("unknown curve slot: {s}")))
    }
}

/// One aggregated curve and the slot it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCurve {
    /// Slot this curve aggregates.
    pub slot: CurveSlot,
    /// Mean curve across sources.
    pub curve: Curve,
}

/// Aggregated curves of one label across a set of sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCurves {
    /// Encode set label.
    pub label: String,
    /// Sources that were averaged.
    pub sources: Vec<String>,
    /// One mean curve per slot, resolutions first then multires.
    pub curves: Vec<SlotCurve>,
}

impl LabelCurves {
    /// Build and aggregate the curves of `label` over `sources`.
    ///
    /// Sources are processed in parallel. A resolution slot is aggregated
    /// only if every source has that resolution; the multires slot always
    /// is. Any failing source fails the whole label.
    pub fn build<P, C, I>(
        provider: &P,
        catalog: &C,
        builder: &CurveBuilder<I>,
        label: &str,
        sources: &[String],
    ) -> Result<Self>
    where
        P: MeasurementProvider + Sync + ?Sized,
        C: ResolutionCatalog + Sync + ?Sized,
        I: Interpolator + Sync,
    {
        if sources.is_empty() {
            return Err(Error::EmptyAggregate);
        }

        let per_source: Vec<SourceCurves> = sources
            .par_iter()
            .map(|source| SourceCurves::build(provider, catalog, builder, label, source))
            .collect::<Result<Vec<_>>>()?;

        let all_indices: BTreeSet<u32> = per_source
            .iter()
            .flat_map(|s| s.resolutions.iter().map(|c| c.resolution.resolution_index))
            .collect();

        let mut curves = Vec::with_capacity(all_indices.len() + 1);
        for index in all_indices {
            let same_res: Option<Vec<&Curve>> = per_source
                .iter()
                .map(|s| s.resolution(index).map(|c| &c.same_res))
                .collect();

            match same_res {
                Some(found) => curves.push(SlotCurve {
                    slot: CurveSlot::Resolution(index),
                    curve: aggregate(found)?,
                }),
                None => warn!(
                    label,
                    resolution = index,
                    "resolution missing from some sources, not aggregated"
                ),
            }
        }

        curves.push(SlotCurve {
            slot: CurveSlot::Multires,
            curve: aggregate(per_source.iter().map(|s| &s.multires.curve))?,
        });

        debug!(label, sources = sources.len(), slots = curves.len(), "aggregated label curves");

        Ok(Self {
            label: label.to_string(),
            sources: sources.to_vec(),
            curves,
        })
    }

    /// The aggregated curve for `slot`, if it was built.
    #[must_use]
    pub fn get(&self, slot: CurveSlot) -> Option<&Curve> {
        self.curves.iter().find(|c| c.slot == slot).map(|c| &c.curve)
    }

    /// Slots that were aggregated.
    pub fn slots(&self) -> impl Iterator<Item = CurveSlot> + '_ {
        self.curves.iter().map(|c| c.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityGrid;
    use crate::curve::tests::measurement_at;
    use crate::measurement::{MeasurementStore, ResolutionDescriptor};

    fn curve(log_bpp: Vec<f64>, log_nspp: Vec<f64>) -> Curve {
        Curve::new(vec![30.0, 60.0, 90.0], log_bpp, log_nspp).unwrap()
    }

    #[test]
    fn test_single_curve_aggregates_to_itself() {
        let c = curve(vec![0.123_456_789, -1.7, -3.3], vec![5.1, 5.2, 5.3]);
        let agg = aggregate([&c]).unwrap();
        assert_eq!(agg, c);
    }

    #[test]
    fn test_mean_is_geometric_in_linear_space() {
        let a = curve(vec![2.0_f64.ln(); 3], vec![0.0; 3]);
        let b = curve(vec![8.0_f64.ln(); 3], vec![2.0; 3]);
        let agg = aggregate([&a, &b]).unwrap();

        for bpp in agg.bpp() {
            assert!((bpp - 4.0).abs() < 1e-12);
        }
        assert_eq!(agg.log_nspp, vec![1.0; 3]);
    }

    #[test]
    fn test_grid_mismatch() {
        let a = curve(vec![0.0; 3], vec![0.0; 3]);
        let b = Curve::new(vec![30.0, 50.0, 90.0], vec![0.0; 3], vec![0.0; 3]).unwrap();
        assert!(matches!(aggregate([&a, &b]), Err(Error::GridMismatch { .. })));
        assert!(matches!(aggregate(Vec::<&Curve>::new()), Err(Error::EmptyAggregate)));
    }

    #[test]
    fn test_slot_parse_and_display() {
        assert_eq!("multires".parse::<CurveSlot>().unwrap(), CurveSlot::Multires);
        assert_eq!("res2".parse::<CurveSlot>().unwrap(), CurveSlot::Resolution(2));
        assert_eq!("0".parse::<CurveSlot>().unwrap(), CurveSlot::Resolution(0));
        assert!("best".parse::<CurveSlot>().is_err());
        assert_eq!(CurveSlot::Resolution(3).to_string(), "res3");
    }

    #[test]
    fn test_label_curves_skip_partial_slots() {
        let grid = QualityGrid::from_points(vec![30.0, 50.0, 70.0, 90.0]).unwrap();
        let full = ResolutionDescriptor::new(0, 40, 40);
        let half = ResolutionDescriptor::new(1, 20, 20);

        let mut store = MeasurementStore::new();
        store.insert_resolutions("a", vec![full, half]).unwrap();
        store.insert_resolutions("b", vec![full]).unwrap();
        for source in ["a", "b"] {
            for (s, bpp) in [(30.0, 0.5), (50.0, 0.2), (70.0, 0.1), (90.0, 0.05)] {
                store.insert("aom", source, measurement_at(&full, s, s, bpp)).unwrap();
            }
        }
        for (s, fs, bpp) in [(28.0, 26.0, 0.9), (92.0, 60.0, 0.3)] {
            store.insert("aom", "a", measurement_at(&half, s, fs, bpp)).unwrap();
        }

        let builder = CurveBuilder::new(grid);
        let sources = vec!["a".to_string(), "b".to_string()];
        let curves = LabelCurves::build(&store, &store, &builder, "aom", &sources).unwrap();

        assert_eq!(
            curves.slots().collect::<Vec<_>>(),
            vec![CurveSlot::Resolution(0), CurveSlot::Multires]
        );
        let res0 = curves.get(CurveSlot::Resolution(0)).unwrap();
        assert!((res0.bpp()[1] - 0.2).abs() < 1e-12);
        assert!(curves.get(CurveSlot::Resolution(1)).is_none());
    }
}
