//! Serializable curve reports.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::CurveConfig;
use crate::curve::LabelCurves;
use crate::error::Result;
use crate::stats::ComparisonMatrix;

/// Aggregated curves and comparisons from one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveReport {
    /// Report name.
    pub name: String,

    /// When the report was generated.
    #[serde(with = "chrono_serde")]
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Configuration the curves were built with.
    pub config: CurveConfig,

    /// Aggregated curves per label.
    pub labels: Vec<LabelCurves>,

    /// Pairwise comparisons, if any were computed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comparisons: Vec<ComparisonMatrix>,
}

impl CurveReport {
    /// Create an empty report.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CurveConfig) -> Self {
        Self {
            name: name.into(),
            timestamp: chrono::Utc::now(),
            config,
            labels: Vec::new(),
            comparisons: Vec::new(),
        }
    }

    /// Get the curves of one label.
    #[must_use]
    pub fn label(&self, label: &str) -> Option<&LabelCurves> {
        self.labels.iter().find(|l| l.label == label)
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a report written by [`CurveReport::write_json`].
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

mod chrono_serde {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        dt.to_rfc3339().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Curve, CurveSlot, SlotCurve};

    fn report() -> CurveReport {
        let mut report = CurveReport::new("av1-shootout", CurveConfig::default());
        report.labels.push(LabelCurves {
            label: "aom".to_string(),
            sources: vec!["frame".to_string()],
            curves: vec![SlotCurve {
                slot: CurveSlot::Multires,
                curve: Curve::new(vec![30.0, 90.0], vec![-0.5, -2.5], vec![6.0, 6.5]).unwrap(),
            }],
        });
        report
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let json = serde_json::to_value(report()).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
        assert!(json.get("comparisons").is_none());
        assert_eq!(json["labels"][0]["curves"][0]["slot"], "multires");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let original = report();
        original.write_json(&path).unwrap();
        let loaded = CurveReport::read_json(&path).unwrap();

        assert_eq!(loaded.name, "av1-shootout");
        assert_eq!(loaded.config, original.config);
        assert_eq!(loaded.label("aom"), original.label("aom"));
        assert_eq!(loaded.timestamp.timestamp(), original.timestamp.timestamp());
    }
}
