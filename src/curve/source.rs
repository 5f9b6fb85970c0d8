//! All curves for one (label, source) pair.

use serde::{Deserialize, Serialize};

use crate::curve::{CurveBuilder, MultiresCurve, ResolutionCurves, merge_multires};
use crate::error::Result;
use crate::interpolation::Interpolator;
use crate::measurement::{MeasurementProvider, ResolutionCatalog, SourceKey, validate_resolutions};

/// Per-resolution curves of one source plus their multires envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCurves {
    /// Label and source these curves were built for.
    pub key: SourceKey,
    /// One entry per resolution, ascending by resolution index.
    pub resolutions: Vec<ResolutionCurves>,
    /// Best-of-resolutions curve.
    pub multires: MultiresCurve,
}

impl SourceCurves {
    /// Build every curve for `source` under `label`.
    ///
    /// Every resolution in the catalog must have measurements; a missing
    /// resolution aborts the build with [`crate::Error::NoDataForKey`].
    pub fn build<P, C, I>(
        provider: &P,
        catalog: &C,
        builder: &CurveBuilder<I>,
        label: &str,
        source: &str,
    ) -> Result<Self>
    where
        P: MeasurementProvider + ?Sized,
        C: ResolutionCatalog + ?Sized,
        I: Interpolator,
    {
        let key = SourceKey::new(label, source);

        let descriptors = catalog.fetch_resolutions(source)?;
        validate_resolutions(source, &descriptors)?;
        let full = descriptors[0];

        let resolutions = descriptors
            .iter()
            .map(|resolution| {
                let measurements =
                    provider.fetch_measurements(label, source, resolution.resolution_index)?;
                builder.build(&key, resolution, &full, &measurements)
            })
            .collect::<Result<Vec<_>>>()?;

        let multires = merge_multires(&key, builder.grid(), &resolutions)?;

        Ok(Self {
            key,
            resolutions,
            multires,
        })
    }

    /// Curves for one resolution index, if the source has it.
    #[must_use]
    pub fn resolution(&self, resolution_index: u32) -> Option<&ResolutionCurves> {
        self.resolutions
            .iter()
            .find(|c| c.resolution.resolution_index == resolution_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityGrid;
    use crate::curve::tests::measurement_at;
    use crate::error::Error;
    use crate::measurement::{MeasurementStore, ResolutionDescriptor};

    fn grid() -> QualityGrid {
        QualityGrid::from_points(vec![30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0]).unwrap()
    }

    fn store() -> MeasurementStore {
        let full = ResolutionDescriptor::new(0, 40, 40);
        let half = ResolutionDescriptor::new(1, 20, 20);

        let mut store = MeasurementStore::new();
        store.insert_resolutions("frame", vec![full, half]).unwrap();
        for (s, bpp) in [(25.0, 0.6), (50.0, 0.2), (70.0, 0.1), (95.0, 0.04)] {
            store.insert("aom", "frame", measurement_at(&full, s, s, bpp)).unwrap();
        }
        // Quarter the pixels: 0.2 bpp here is 0.05 bpp at full resolution
        for (s, fs, bpp) in [(20.0, 18.0, 0.8), (55.0, 45.0, 0.4), (96.0, 66.0, 0.2)] {
            store.insert("aom", "frame", measurement_at(&half, s, fs, bpp)).unwrap();
        }
        store
    }

    #[test]
    fn test_builds_every_resolution_and_multires() {
        let store = store();
        let builder = CurveBuilder::new(grid());
        let curves = SourceCurves::build(&store, &store, &builder, "aom", "frame").unwrap();

        assert_eq!(curves.resolutions.len(), 2);
        assert_eq!(curves.resolution(1).unwrap().full_res.grid_indices, vec![0, 1, 2, 3]);
        assert!(curves.resolution(2).is_none());

        let merged = &curves.multires;
        assert_eq!(merged.curve.len(), 7);
        assert!(merged.curve.log_bpp.iter().all(|v| v.is_finite()));
        // Scores above the downscaled encode's reach come from full resolution
        assert_eq!(&merged.chosen_resolution[4..], &[0, 0, 0]);
    }

    #[test]
    fn test_multires_picks_downscaled_encodes_where_smaller() {
        let full = ResolutionDescriptor::new(0, 40, 40);
        let half = ResolutionDescriptor::new(1, 20, 20);

        let mut store = MeasurementStore::new();
        store.insert_resolutions("frame", vec![full, half]).unwrap();
        // 200 pixels per byte of bpp at full resolution, 50 at half
        for (s, bytes) in [(30.0, 100.0), (40.0, 80.0), (50.0, 60.0), (60.0, 40.0), (70.0, 30.0), (80.0, 20.0), (90.0, 10.0)] {
            store.insert("aom", "frame", measurement_at(&full, s, s, bytes / 200.0)).unwrap();
        }
        for (s, fs, bytes) in [(30.0, 30.0, 110.0), (45.0, 40.0, 90.0), (60.0, 50.0, 70.0), (75.0, 60.0, 35.0), (90.0, 70.0, 25.0)] {
            store.insert("aom", "frame", measurement_at(&half, s, fs, bytes / 50.0)).unwrap();
        }

        let builder = CurveBuilder::new(grid());
        let curves = SourceCurves::build(&store, &store, &builder, "aom", "frame").unwrap();
        let merged = &curves.multires;

        assert_eq!(merged.chosen_resolution, vec![0, 0, 0, 1, 1, 0, 0]);
        let full_pixels = full.num_pixels() as f64;
        for (i, bytes) in [100.0, 80.0, 60.0, 35.0, 25.0, 20.0, 10.0_f64].into_iter().enumerate() {
            assert_eq!(merged.curve.log_bpp[i], (bytes * 8.0 / full_pixels).ln());
        }
    }

    #[test]
    fn test_missing_resolution_data_aborts() {
        let mut store = store();
        store
            .insert_resolutions("other", ResolutionDescriptor::ladder(40, 40, &[20]))
            .unwrap();
        let full = ResolutionDescriptor::new(0, 40, 40);
        for (s, bpp) in [(25.0, 0.6), (95.0, 0.04)] {
            store.insert("aom", "other", measurement_at(&full, s, s, bpp)).unwrap();
        }

        let builder = CurveBuilder::new(grid());
        let err = SourceCurves::build(&store, &store, &builder, "aom", "other").unwrap_err();
        assert!(matches!(err, Error::NoDataForKey { resolution_index: 1, .. }));
    }

    #[test]
    fn test_unknown_source() {
        let store = store();
        let builder = CurveBuilder::new(grid());
        assert!(SourceCurves::build(&store, &store, &builder, "aom", "missing").is_err());
    }
}
