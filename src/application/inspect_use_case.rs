// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Loads a label file without training and reports what the
// training run would see: row count, steering range and which
// referenced frames are missing on disk.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::label_store::{LabelStore, LabelSummary};

pub struct InspectUseCase {
    labels_csv: PathBuf,
}

impl InspectUseCase {
    pub fn new(labels_csv: impl Into<PathBuf>) -> Self {
        Self { labels_csv: labels_csv.into() }
    }

    pub fn execute(&self) -> Result<LabelSummary> {
        let store = LabelStore::load(&self.labels_csv)
            .with_context(|| format!("Cannot load labels from '{}'", self.labels_csv.display()))?;
        let summary = store.summarize();
        if !summary.missing_images.is_empty() {
            tracing::warn!(
                "{} of {} referenced images are missing",
                summary.missing_images.len(),
                summary.rows
            );
        }
        Ok(summary)
    }
}
