//! Best-of-resolutions envelope.
//!
//! Encoding a downscaled copy and upscaling on decode is sometimes cheaper
//! than encoding at full resolution for the same full-res score. The multires
//! curve picks, at each grid point, whichever resolution reaches that score
//! with the fewest bits per full-resolution pixel.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::QualityGrid;
use crate::curve::{Curve, ResolutionCurves};
use crate::error::{Error, Result};
use crate::measurement::SourceKey;

/// Envelope curve with the winning resolution at each grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiresCurve {
    /// The merged curve, on the full grid.
    pub curve: Curve,
    /// Resolution index chosen at each grid point.
    pub chosen_resolution: Vec<u32>,
}

/// Merge the full-res partial curves of every resolution of one source.
///
/// At each grid index the resolution with the strictly lowest log-bpp wins,
/// carrying its log-nspp along. Ties go to the lower resolution index, since
/// `per_resolution` is processed in ascending index order.
///
/// Fails with [`Error::IncompleteMultiresCoverage`] if any grid point is
/// left uncovered.
pub fn merge_multires(
    key: &SourceKey,
    grid: &QualityGrid,
    per_resolution: &[ResolutionCurves],
) -> Result<MultiresCurve> {
    let n = grid.len();
    let mut log_bpp = vec![f64::INFINITY; n];
    let mut log_nspp = vec![f64::INFINITY; n];
    let mut chosen_resolution = vec![0u32; n];

    let mut ordered: Vec<&ResolutionCurves> = per_resolution.iter().collect();
    ordered.sort_by_key(|c| c.resolution.resolution_index);

    for curves in ordered {
        let partial = &curves.full_res;
        for (j, &idx) in partial.grid_indices.iter().enumerate() {
            if idx >= n {
                return Err(Error::GridMismatch {
                    expected: n,
                    expected_lo: grid.lo(),
                    expected_hi: grid.hi(),
                    actual: idx + 1,
                });
            }
            if partial.log_bpp[j] < log_bpp[idx] {
                log_bpp[idx] = partial.log_bpp[j];
                log_nspp[idx] = partial.log_nspp[j];
                chosen_resolution[idx] = curves.resolution.resolution_index;
            }
        }
    }

    let uncovered: Vec<usize> = (0..n).filter(|&i| !log_bpp[i].is_finite()).collect();
    if let Some(&first) = uncovered.first() {
        return Err(Error::IncompleteMultiresCoverage {
            label: key.label.clone(),
            source_name: key.source.clone(),
            missing: uncovered.len(),
            first_missing_score: grid.points()[first],
        });
    }

    debug!(
        key = %key,
        resolutions = per_resolution.len(),
        downscaled_points = chosen_resolution.iter().filter(|&&r| r != 0).count(),
        "merged multires curve"
    );

    Ok(MultiresCurve {
        curve: Curve {
            scores: grid.points().to_vec(),
            log_bpp,
            log_nspp,
        },
        chosen_resolution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::PartialCurve;
    use crate::measurement::ResolutionDescriptor;

    fn grid() -> QualityGrid {
        QualityGrid::from_points(vec![30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0]).unwrap()
    }

    fn resolution_curves(index: u32, indices: Vec<usize>, log_bpp: Vec<f64>) -> ResolutionCurves {
        let g = grid();
        let scores: Vec<f64> = indices.iter().map(|&i| g.points()[i]).collect();
        let log_nspp = log_bpp.iter().map(|v| v + 10.0 + f64::from(index)).collect();
        ResolutionCurves {
            resolution: ResolutionDescriptor::new(index, 40 >> index, 40 >> index),
            same_res: Curve {
                scores: g.points().to_vec(),
                log_bpp: vec![0.0; g.len()],
                log_nspp: vec![0.0; g.len()],
            },
            full_res: PartialCurve {
                grid_indices: indices,
                scores,
                log_bpp,
                log_nspp,
            },
        }
    }

    #[test]
    fn test_switches_resolution_where_cheaper() {
        let key = SourceKey::new("aom", "frame");
        let full = resolution_curves(0, (0..7).collect(), vec![0.0, -0.5, -1.0, -1.5, -2.0, -2.5, -3.0]);
        // Resolution 1 beats resolution 0 only at scores 60 and 70
        let scaled = resolution_curves(1, vec![0, 1, 2, 3, 4], vec![0.2, -0.3, -0.9, -1.6, -2.1]);

        let merged = merge_multires(&key, &grid(), &[full.clone(), scaled.clone()]).unwrap();

        assert_eq!(merged.chosen_resolution, vec![0, 0, 0, 1, 1, 0, 0]);
        for i in 0..7 {
            let from = if (3..=4).contains(&i) { &scaled } else { &full };
            let j = from.full_res.grid_indices.iter().position(|&g| g == i).unwrap();
            assert_eq!(merged.curve.log_bpp[i], from.full_res.log_bpp[j]);
            assert_eq!(merged.curve.log_nspp[i], from.full_res.log_nspp[j]);
        }
    }

    #[test]
    fn test_merge_is_pointwise_minimum() {
        let key = SourceKey::new("aom", "frame");
        let a = resolution_curves(0, (0..7).collect(), vec![1.0, 0.4, -0.2, -0.1, -0.9, -1.2, -2.0]);
        let b = resolution_curves(1, (0..7).collect(), vec![0.9, 0.5, -0.3, -0.2, -0.8, -1.3, -1.9]);
        let c = resolution_curves(2, (0..7).collect(), vec![1.1, 0.3, -0.1, -0.15, -1.0, -1.1, -2.1]);

        // Input order does not matter
        let merged = merge_multires(&key, &grid(), &[c.clone(), a.clone(), b.clone()]).unwrap();
        for i in 0..7 {
            let want = a.full_res.log_bpp[i]
                .min(b.full_res.log_bpp[i])
                .min(c.full_res.log_bpp[i]);
            assert_eq!(merged.curve.log_bpp[i], want);
        }
    }

    #[test]
    fn test_tie_keeps_lower_resolution() {
        let key = SourceKey::new("aom", "frame");
        let a = resolution_curves(0, (0..7).collect(), vec![-1.0; 7]);
        let b = resolution_curves(1, (0..7).collect(), vec![-1.0; 7]);
        let merged = merge_multires(&key, &grid(), &[b, a]).unwrap();
        assert!(merged.chosen_resolution.iter().all(|&r| r == 0));
    }

    #[test]
    fn test_uncovered_point_is_error() {
        let key = SourceKey::new("aom", "frame");
        let partial = resolution_curves(0, vec![0, 1, 2, 3, 4, 5], vec![0.0; 6]);
        let err = merge_multires(&key, &grid(), &[partial]).unwrap_err();
        match err {
            Error::IncompleteMultiresCoverage {
                missing,
                first_missing_score,
                ..
            } => {
                assert_eq!(missing, 1);
                assert_eq!(first_missing_score, 90.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_input_is_error() {
        let key = SourceKey::new("aom", "frame");
        assert!(matches!(
            merge_multires(&key, &grid(), &[]),
            Err(Error::IncompleteMultiresCoverage { missing: 7, .. })
        ));
    }
}
