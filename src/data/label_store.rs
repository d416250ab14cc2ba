// ============================================================
// Layer 4 — Label Store
// ============================================================
// Parses the simulator's record file into an ordered list of
// LabelRecords.
//
// Expected layout (header row required, extra columns ignored):
//
//   image,steer_rad,steer_norm
//   images/img_000000.png,0.000000,0.000000
//   images/img_000001.png,-0.020000,-0.033333
//
// Image paths are resolved against the directory that CONTAINS
// the record file, not the process working directory, so a
// dataset folder can be moved around as a unit.
//
// Reference: csv crate documentation
//            Rust Book §8 (Collections)

use std::path::{Path, PathBuf};

use crate::data::error::{DataError, DataResult};
use crate::domain::label_record::LabelRecord;

/// Column holding the relative image path
pub const IMAGE_COLUMN: &str = "image";

/// Column holding the steering angle in radians
pub const STEER_COLUMN: &str = "steer_rad";

/// The parsed record file plus the root its paths are relative to.
#[derive(Debug, Clone)]
pub struct LabelStore {
    root:    PathBuf,
    records: Vec<LabelRecord>,
}

impl LabelStore {
    /// Parse the record file at `csv_path`.
    ///
    /// Fails with `MalformedRecord` when the header has no `image`
    /// column or a steering value is not a number. A missing
    /// `steer_rad` column, or an empty cell in it, reads as 0.0.
    pub fn load(csv_path: impl AsRef<Path>) -> DataResult<Self> {
        let csv_path = csv_path.as_ref();
        let root     = record_root(csv_path);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(csv_path)
            .map_err(|source| DataError::RecordRead {
                path: csv_path.to_path_buf(),
                source,
            })?;

        let headers = reader
            .headers()
            .map_err(|source| DataError::RecordRead {
                path: csv_path.to_path_buf(),
                source,
            })?
            .clone();

        let image_col = headers
            .iter()
            .position(|h| h == IMAGE_COLUMN)
            .ok_or_else(|| DataError::MalformedRecord {
                path: csv_path.to_path_buf(),
                msg:  format!("header has no '{IMAGE_COLUMN}' column"),
            })?;
        let steer_col = headers.iter().position(|h| h == STEER_COLUMN);
        if steer_col.is_none() {
            tracing::warn!(
                "'{}' has no '{}' column; every angle defaults to 0.0",
                csv_path.display(),
                STEER_COLUMN
            );
        }

        let mut records = Vec::new();
        for (row_idx, row) in reader.records().enumerate() {
            let row = row.map_err(|source| DataError::RecordRead {
                path: csv_path.to_path_buf(),
                source,
            })?;
            // Header is line 1, so data row 0 is line 2
            let line = row_idx + 2;

            let image = row.get(image_col).unwrap_or("");
            if image.is_empty() {
                return Err(DataError::MalformedRecord {
                    path: csv_path.to_path_buf(),
                    msg:  format!("line {line}: empty '{IMAGE_COLUMN}' field"),
                });
            }

            let raw   = steer_col.and_then(|c| row.get(c)).unwrap_or("");
            let angle = if raw.is_empty() {
                0.0
            } else {
                raw.parse::<f64>().map_err(|e| DataError::MalformedRecord {
                    path: csv_path.to_path_buf(),
                    msg:  format!("line {line}: '{raw}' is not a steering angle ({e})"),
                })?
            };

            records.push(LabelRecord::new(image, angle));
        }

        tracing::info!(
            "Loaded {} label records from '{}' (root '{}')",
            records.len(),
            csv_path.display(),
            root.display()
        );
        Ok(Self { root, records })
    }

    /// Directory the record paths are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, index: usize) -> Option<&LabelRecord> {
        self.records.get(index)
    }

    /// Absolute (root-joined) path of a record's image
    pub fn resolve(&self, record: &LabelRecord) -> PathBuf {
        self.root.join(&record.image_path)
    }

    /// Count rows, summarize the steering distribution and check
    /// which referenced images are missing on disk.
    pub fn summarize(&self) -> LabelSummary {
        let mut summary = LabelSummary {
            rows: self.records.len(),
            ..LabelSummary::default()
        };
        if self.records.is_empty() {
            return summary;
        }

        let mut sum = 0.0;
        summary.min_angle = f64::INFINITY;
        summary.max_angle = f64::NEG_INFINITY;
        for record in &self.records {
            let a = record.steer_angle_raw;
            summary.min_angle = summary.min_angle.min(a);
            summary.max_angle = summary.max_angle.max(a);
            sum += a;
            if a == 0.0 {
                summary.zero_angle += 1;
            }
            let path = self.resolve(record);
            if !path.is_file() {
                tracing::debug!("Missing image: {}", path.display());
                summary.missing_images.push(record.image_path.clone());
            }
        }
        summary.mean_angle = sum / self.records.len() as f64;
        summary
    }
}

/// Row count, steering statistics and missing-image report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSummary {
    pub rows:           usize,
    pub min_angle:      f64,
    pub max_angle:      f64,
    pub mean_angle:     f64,
    pub zero_angle:     usize,
    pub missing_images: Vec<String>,
}

/// Directory containing the record file ("." for a bare filename)
fn record_root(csv_path: &Path) -> PathBuf {
    match csv_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
