//! Measurement provider interfaces and an in-memory store.
//!
//! The curve engine reads measurements through two narrow traits so that the
//! backing store (a database, a CSV import, a test fixture) stays outside the
//! core. [`MeasurementStore`] is the in-memory implementation used by the CSV
//! importer and by tests.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::measurement::{Measurement, ResolutionDescriptor, validate_resolutions};

/// Source of raw measurements.
pub trait MeasurementProvider {
    /// All measurements for one (label, source, resolution) key.
    ///
    /// Returns an empty list when nothing was recorded for the key.
    fn fetch_measurements(
        &self,
        label: &str,
        source: &str,
        resolution_index: u32,
    ) -> Result<Vec<Measurement>>;
}

/// Source of per-source resolution lists.
pub trait ResolutionCatalog {
    /// Resolutions of `source`, sorted by resolution index.
    fn fetch_resolutions(&self, source: &str) -> Result<Vec<ResolutionDescriptor>>;
}

/// An encode that has not been measured yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedEncode {
    /// Resolution to encode at.
    pub resolution: ResolutionDescriptor,
    /// Quality setting to encode with.
    pub quality_setting: i32,
}

type ResultKey = (String, String);

/// In-memory measurement and resolution store.
///
/// Measurements are unique per (label, source, resolution, quality); inserting
/// the same key twice is rejected.
#[derive(Debug, Clone, Default)]
pub struct MeasurementStore {
    resolutions: BTreeMap<String, Vec<ResolutionDescriptor>>,
    results: BTreeMap<ResultKey, BTreeMap<(u32, i32), Measurement>>,
}

impl MeasurementStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the resolution list of a source.
    ///
    /// Re-recording an identical list is a no-op; a different list for a known
    /// source is rejected, since descriptors are fixed once computed.
    pub fn insert_resolutions(
        &mut self,
        source: &str,
        mut resolutions: Vec<ResolutionDescriptor>,
    ) -> Result<()> {
        resolutions.sort_by_key(|r| r.resolution_index);
        validate_resolutions(source, &resolutions)?;

        if let Some(existing) = self.resolutions.get(source) {
            if *existing != resolutions {
                return Err(Error::InvalidResolutions {
                    source_name: source.to_string(),
                    reason: "already recorded with different resolutions".to_string(),
                });
            }
            return Ok(());
        }

        self.resolutions.insert(source.to_string(), resolutions);
        Ok(())
    }

    /// Record one measurement.
    pub fn insert(&mut self, label: &str, source: &str, measurement: Measurement) -> Result<()> {
        let by_key = self
            .results
            .entry((label.to_string(), source.to_string()))
            .or_default();

        let key = (measurement.resolution_index, measurement.quality_setting);
        if by_key.contains_key(&key) {
            return Err(Error::DuplicateMeasurement {
                label: label.to_string(),
                source_name: source.to_string(),
                resolution_index: key.0,
                quality_setting: key.1,
            });
        }

        by_key.insert(key, measurement);
        Ok(())
    }

    /// Total number of measurements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.values().map(BTreeMap::len).sum()
    }

    /// Check if the store holds no measurements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All labels with at least one measurement, sorted.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        let labels: BTreeSet<&str> = self.results.keys().map(|(l, _)| l.as_str()).collect();
        labels.into_iter().map(String::from).collect()
    }

    /// All sources measured under `label`.
    #[must_use]
    pub fn sources(&self, label: &str) -> BTreeSet<String> {
        self.results
            .keys()
            .filter(|(l, _)| l == label)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Sources measured under every one of `labels`.
    ///
    /// # Example
    ///
    /// ```
    /// use codec_rd::measurement::{Measurement, MeasurementStore};
    ///
    /// let m = Measurement {
    ///     resolution_index: 0, width: 64, height: 64, quality_setting: 50,
    ///     size_bytes: 512, runtime_seconds: 0.01,
    ///     same_res_score: 60.0, full_res_score: 60.0,
    /// };
    /// let mut store = MeasurementStore::new();
    /// store.insert("aom", "a", m.clone()).unwrap();
    /// store.insert("aom", "b", m.clone()).unwrap();
    /// store.insert("svt", "b", m).unwrap();
    ///
    /// let shared = store.shared_sources(&["aom", "svt"]).unwrap();
    /// assert_eq!(shared.into_iter().collect::<Vec<_>>(), vec!["b".to_string()]);
    /// ```
    pub fn shared_sources<S: AsRef<str>>(&self, labels: &[S]) -> Result<BTreeSet<String>> {
        let mut shared: Option<BTreeSet<String>> = None;

        for label in labels {
            let these = self.sources(label.as_ref());
            shared = Some(match shared {
                None => these,
                Some(prev) => prev.intersection(&these).cloned().collect(),
            });
        }

        match shared {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(Error::NoSharedSources {
                labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
            }),
        }
    }

    /// Encodes of `source` under `label` that still need to be run.
    ///
    /// Ordered by ascending resolution index then descending quality, so the
    /// most expensive encodes come first.
    pub fn plan_encodes(
        &self,
        label: &str,
        source: &str,
        qualities: &[i32],
    ) -> Result<Vec<PlannedEncode>> {
        let resolutions = self.fetch_resolutions(source)?;
        let done = self.results.get(&(label.to_string(), source.to_string()));

        let mut plan: Vec<PlannedEncode> = resolutions
            .iter()
            .flat_map(|&resolution| {
                qualities.iter().map(move |&quality_setting| PlannedEncode {
                    resolution,
                    quality_setting,
                })
            })
            .filter(|p| {
                done.is_none_or(|d| {
                    !d.contains_key(&(p.resolution.resolution_index, p.quality_setting))
                })
            })
            .collect();

        plan.sort_by_key(|p| (p.resolution.resolution_index, Reverse(p.quality_setting)));
        plan.dedup();
        Ok(plan)
    }
}

impl MeasurementProvider for MeasurementStore {
    fn fetch_measurements(
        &self,
        label: &str,
        source: &str,
        resolution_index: u32,
    ) -> Result<Vec<Measurement>> {
        Ok(self
            .results
            .get(&(label.to_string(), source.to_string()))
            .map(|by_key| {
                by_key
                    .range((resolution_index, i32::MIN)..=(resolution_index, i32::MAX))
                    .map(|(_, m)| m.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl ResolutionCatalog for MeasurementStore {
    fn fetch_resolutions(&self, source: &str) -> Result<Vec<ResolutionDescriptor>> {
        self.resolutions
            .get(source)
            .cloned()
            .ok_or_else(|| Error::InvalidResolutions {
                source_name: source.to_string(),
                reason: "no resolutions recorded".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(resolution_index: u32, quality_setting: i32) -> Measurement {
        Measurement {
            resolution_index,
            width: 64,
            height: 36,
            quality_setting,
            size_bytes: 1000,
            runtime_seconds: 0.05,
            same_res_score: 70.0,
            full_res_score: 70.0,
        }
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut store = MeasurementStore::new();
        store.insert("aom", "frame", measurement(0, 50)).unwrap();
        store.insert("aom", "frame", measurement(1, 50)).unwrap();
        store.insert("svt", "frame", measurement(0, 50)).unwrap();

        let err = store.insert("aom", "frame", measurement(0, 50)).unwrap_err();
        assert!(matches!(err, Error::DuplicateMeasurement { quality_setting: 50, .. }));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_fetch_filters_by_resolution() {
        let mut store = MeasurementStore::new();
        for q in [20, 50, 80] {
            store.insert("aom", "frame", measurement(0, q)).unwrap();
        }
        store.insert("aom", "frame", measurement(1, 50)).unwrap();

        let res0 = store.fetch_measurements("aom", "frame", 0).unwrap();
        assert_eq!(res0.len(), 3);
        assert!(res0.iter().all(|m| m.resolution_index == 0));

        assert_eq!(store.fetch_measurements("aom", "frame", 1).unwrap().len(), 1);
        assert!(store.fetch_measurements("aom", "frame", 2).unwrap().is_empty());
        assert!(store.fetch_measurements("svt", "frame", 0).unwrap().is_empty());
    }

    #[test]
    fn test_resolutions_are_fixed_once_recorded() {
        let mut store = MeasurementStore::new();
        let ladder = ResolutionDescriptor::ladder(1920, 1080, &[1280]);
        store.insert_resolutions("frame", ladder.clone()).unwrap();
        store.insert_resolutions("frame", ladder).unwrap();

        let other = ResolutionDescriptor::ladder(1920, 1080, &[640]);
        assert!(store.insert_resolutions("frame", other).is_err());
        assert!(store.fetch_resolutions("missing").is_err());
    }

    #[test]
    fn test_shared_sources_empty_is_error() {
        let mut store = MeasurementStore::new();
        store.insert("aom", "a", measurement(0, 50)).unwrap();
        store.insert("svt", "b", measurement(0, 50)).unwrap();

        assert!(matches!(
            store.shared_sources(&["aom", "svt"]),
            Err(Error::NoSharedSources { .. })
        ));
        assert_eq!(store.labels(), vec!["aom".to_string(), "svt".to_string()]);
    }

    #[test]
    fn test_plan_encodes_order_and_skips_done() {
        let mut store = MeasurementStore::new();
        store
            .insert_resolutions("frame", ResolutionDescriptor::ladder(1920, 1080, &[1280]))
            .unwrap();
        store.insert("aom", "frame", measurement(0, 85)).unwrap();

        let plan = store.plan_encodes("aom", "frame", &[45, 85, 65]).unwrap();
        let keys: Vec<(u32, i32)> = plan
            .iter()
            .map(|p| (p.resolution.resolution_index, p.quality_setting))
            .collect();
        assert_eq!(keys, vec![(0, 65), (0, 45), (1, 85), (1, 65), (1, 45)]);
    }
}
