//! CSV import of encode results.
//!
//! Measurements are recorded by an external encode/score pipeline as two
//! tables, which this module loads into a [`MeasurementStore`]:
//!
//! - a **sources** table: `basename, resolution_index, width, height`, one row
//!   per resolution of each source
//! - a **results** table: `label, source, resolution_index, quality, size,
//!   runtime, ssimu2, fullres_ssimu2`, one row per encode
//!
//! Column names are matched case-insensitively and common aliases are
//! accepted. Measurement dimensions are taken from the sources table, so the
//! sources must be imported first.
//!
//! ## Example
//!
//! ```rust,ignore
//! use codec_rd::import::CsvImporter;
//!
//! let store = CsvImporter::auto_detect().load("sources.csv", "results.csv")?;
//! ```

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};
use crate::measurement::{Measurement, MeasurementStore, ResolutionCatalog, ResolutionDescriptor};

/// Column names for the results table.
///
/// Unset columns are auto-detected from common names.
#[derive(Debug, Clone, Default)]
pub struct CsvSchema {
    /// Column name for the encode set label.
    pub label_column: Option<String>,
    /// Column name for the source name.
    pub source_column: Option<String>,
    /// Column name for the resolution index.
    pub resolution_column: Option<String>,
    /// Column name for the quality setting.
    pub quality_column: Option<String>,
    /// Column name for the encoded size in bytes.
    pub size_column: Option<String>,
    /// Column name for the runtime in seconds.
    pub runtime_column: Option<String>,
    /// Column name for the same-resolution score.
    pub score_column: Option<String>,
    /// Column name for the full-resolution score.
    pub full_res_score_column: Option<String>,
}

impl CsvSchema {
    /// Create a schema builder.
    #[must_use]
    pub fn builder() -> CsvSchemaBuilder {
        CsvSchemaBuilder::default()
    }

    /// Create a schema that auto-detects columns from common names.
    #[must_use]
    pub fn auto_detect() -> Self {
        Self::default()
    }

    /// Try to find a column index by name (case-insensitive, with aliases).
    fn find_column(headers: &[&str], primary: Option<&str>, aliases: &[&str]) -> Option<usize> {
        if let Some(name) = primary {
            if let Some(idx) = find_header_index(headers, name) {
                return Some(idx);
            }
        }

        aliases.iter().find_map(|alias| find_header_index(headers, alias))
    }
}

/// Builder for [`CsvSchema`].
#[derive(Debug, Default)]
pub struct CsvSchemaBuilder {
    schema: CsvSchema,
}

impl CsvSchemaBuilder {
    /// Set the label column name.
    #[must_use]
    pub fn label_column(mut self, name: impl Into<String>) -> Self {
        self.schema.label_column = Some(name.into());
        self
    }

    /// Set the source column name.
    #[must_use]
    pub fn source_column(mut self, name: impl Into<String>) -> Self {
        self.schema.source_column = Some(name.into());
        self
    }

    /// Set the resolution index column name.
    #[must_use]
    pub fn resolution_column(mut self, name: impl Into<String>) -> Self {
        self.schema.resolution_column = Some(name.into());
        self
    }

    /// Set the quality column name.
    #[must_use]
    pub fn quality_column(mut self, name: impl Into<String>) -> Self {
        self.schema.quality_column = Some(name.into());
        self
    }

    /// Set the size column name.
    #[must_use]
    pub fn size_column(mut self, name: impl Into<String>) -> Self {
        self.schema.size_column = Some(name.into());
        self
    }

    /// Set the runtime column name.
    #[must_use]
    pub fn runtime_column(mut self, name: impl Into<String>) -> Self {
        self.schema.runtime_column = Some(name.into());
        self
    }

    /// Set the same-resolution score column name.
    #[must_use]
    pub fn score_column(mut self, name: impl Into<String>) -> Self {
        self.schema.score_column = Some(name.into());
        self
    }

    /// Set the full-resolution score column name.
    #[must_use]
    pub fn full_res_score_column(mut self, name: impl Into<String>) -> Self {
        self.schema.full_res_score_column = Some(name.into());
        self
    }

    /// Build the schema.
    #[must_use]
    pub fn build(self) -> CsvSchema {
        self.schema
    }
}

/// Loads sources and results tables into a [`MeasurementStore`].
pub struct CsvImporter {
    schema: CsvSchema,
}

impl CsvImporter {
    /// Create a new importer with the given results schema.
    #[must_use]
    pub fn new(schema: CsvSchema) -> Self {
        Self { schema }
    }

    /// Create an importer that auto-detects columns.
    #[must_use]
    pub fn auto_detect() -> Self {
        Self::new(CsvSchema::auto_detect())
    }

    /// Load a sources table and a results table into a new store.
    pub fn load(
        &self,
        sources: impl AsRef<Path>,
        results: impl AsRef<Path>,
    ) -> Result<MeasurementStore> {
        let mut store = MeasurementStore::new();
        self.import_sources(sources, &mut store)?;
        self.import_results(results, &mut store)?;
        Ok(store)
    }

    /// Import a sources table. Returns the number of sources recorded.
    pub fn import_sources(&self, path: impl AsRef<Path>, store: &mut MeasurementStore) -> Result<usize> {
        let reader = csv::Reader::from_path(path.as_ref())?;
        self.read_sources(reader, store)
    }

    /// Import a results table. Returns the number of measurements recorded.
    pub fn import_results(&self, path: impl AsRef<Path>, store: &mut MeasurementStore) -> Result<usize> {
        let reader = csv::Reader::from_path(path.as_ref())?;
        self.read_results(reader, store)
    }

    /// Import a sources table from any reader.
    pub fn read_sources<R: Read>(
        &self,
        mut reader: csv::Reader<R>,
        store: &mut MeasurementStore,
    ) -> Result<usize> {
        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

        let source_idx = required(
            CsvSchema::find_column(&header_refs, None, &["basename", "source", "name", "image"]),
            "basename/source",
        )?;
        let resolution_idx = required(
            CsvSchema::find_column(&header_refs, None, &["resolution_index", "resolution", "res"]),
            "resolution_index",
        )?;
        let width_idx = required(CsvSchema::find_column(&header_refs, None, &["width", "w"]), "width")?;
        let height_idx = required(CsvSchema::find_column(&header_refs, None, &["height", "h"]), "height")?;

        let mut by_source: BTreeMap<String, Vec<ResolutionDescriptor>> = BTreeMap::new();

        for (line_num, record) in reader.records().enumerate() {
            let line = line_num + 2; // +2 for 1-based and header
            let record = record.map_err(|e| Error::CsvImport {
                line,
                reason: e.to_string(),
            })?;

            let source = record.get(source_idx).unwrap_or("").trim();
            if source.is_empty() {
                continue;
            }

            let descriptor = ResolutionDescriptor::new(
                parse_field(&record, resolution_idx, "resolution_index", line)?,
                parse_field(&record, width_idx, "width", line)?,
                parse_field(&record, height_idx, "height", line)?,
            );
            by_source.entry(source.to_string()).or_default().push(descriptor);
        }

        let count = by_source.len();
        for (source, resolutions) in by_source {
            store.insert_resolutions(&source, resolutions)?;
        }

        debug!(sources = count, "imported sources table");
        Ok(count)
    }

    /// Import a results table from any reader.
    pub fn read_results<R: Read>(
        &self,
        mut reader: csv::Reader<R>,
        store: &mut MeasurementStore,
    ) -> Result<usize> {
        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let s = &self.schema;

        let label_idx = required(
            CsvSchema::find_column(&header_refs, s.label_column.as_deref(), &["label", "encoder", "codec"]),
            "label",
        )?;
        let source_idx = required(
            CsvSchema::find_column(&header_refs, s.source_column.as_deref(), &["source", "basename", "image"]),
            "source",
        )?;
        let resolution_idx = required(
            CsvSchema::find_column(
                &header_refs,
                s.resolution_column.as_deref(),
                &["resolution_index", "resolution", "res"],
            ),
            "resolution_index",
        )?;
        let quality_idx = required(
            CsvSchema::find_column(&header_refs, s.quality_column.as_deref(), &["quality", "q"]),
            "quality",
        )?;
        let size_idx = required(
            CsvSchema::find_column(&header_refs, s.size_column.as_deref(), &["size", "bytes", "file_size"]),
            "size",
        )?;
        let runtime_idx = required(
            CsvSchema::find_column(
                &header_refs,
                s.runtime_column.as_deref(),
                &["runtime", "time", "encode_time", "seconds"],
            ),
            "runtime",
        )?;
        let score_idx = required(
            CsvSchema::find_column(
                &header_refs,
                s.score_column.as_deref(),
                &["ssimu2", "ssimulacra2", "score"],
            ),
            "ssimu2/score",
        )?;
        let full_res_idx = CsvSchema::find_column(
            &header_refs,
            s.full_res_score_column.as_deref(),
            &["fullres_ssimu2", "full_res_score", "fullres_score"],
        );

        let mut count = 0;

        for (line_num, record) in reader.records().enumerate() {
            let line = line_num + 2; // +2 for 1-based and header
            let record = record.map_err(|e| Error::CsvImport {
                line,
                reason: e.to_string(),
            })?;

            let label = record.get(label_idx).unwrap_or("").trim();
            let source = record.get(source_idx).unwrap_or("").trim();
            if label.is_empty() || source.is_empty() {
                continue;
            }

            let resolution_index: u32 = parse_field(&record, resolution_idx, "resolution_index", line)?;
            let same_res_score: f64 = parse_field(&record, score_idx, "ssimu2", line)?;
            let full_res_score = match full_res_idx.and_then(|i| record.get(i)).map(str::trim) {
                Some(cell) if !cell.is_empty() => parse_cell(cell, "fullres_ssimu2", line)?,
                _ if resolution_index == 0 => same_res_score,
                _ => {
                    return Err(Error::CsvImport {
                        line,
                        reason: "missing fullres_ssimu2 for a downscaled encode".to_string(),
                    });
                }
            };

            let resolution = store
                .fetch_resolutions(source)
                .ok()
                .and_then(|rs| rs.into_iter().find(|r| r.resolution_index == resolution_index))
                .ok_or_else(|| Error::CsvImport {
                    line,
                    reason: format!("source {source} has no resolution {resolution_index} in the sources table"),
                })?;

            let measurement = Measurement {
                resolution_index,
                width: resolution.width,
                height: resolution.height,
                quality_setting: parse_field(&record, quality_idx, "quality", line)?,
                size_bytes: parse_field(&record, size_idx, "size", line)?,
                runtime_seconds: parse_field(&record, runtime_idx, "runtime", line)?,
                same_res_score,
                full_res_score,
            };

            store.insert(label, source, measurement)?;
            count += 1;
        }

        debug!(measurements = count, "imported results table");
        Ok(count)
    }
}

/// Require a detected column.
fn required(idx: Option<usize>, name: &str) -> Result<usize> {
    idx.ok_or_else(|| Error::CsvImport {
        line: 0,
        reason: format!("Could not find {name} column"),
    })
}

/// Parse one field of a record.
fn parse_field<T: FromStr>(record: &csv::StringRecord, idx: usize, name: &str, line: usize) -> Result<T> {
    parse_cell(record.get(idx).unwrap_or("").trim(), name, line)
}

fn parse_cell<T: FromStr>(cell: &str, name: &str, line: usize) -> Result<T> {
    cell.parse().map_err(|_| Error::CsvImport {
        line,
        reason: format!("invalid {name} value {cell:?}"),
    })
}

/// Find a header index by name (case-insensitive).
fn find_header_index(headers: &[&str], name: &str) -> Option<usize> {
    let name_lower = name.to_lowercase();
    headers.iter().position(|h| h.trim().to_lowercase() == name_lower)
}
