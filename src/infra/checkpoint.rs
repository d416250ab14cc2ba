// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists the model with the lowest validation loss seen so far.
//
// What lives in the checkpoint directory:
//
//   checkpoints/
//     model_best.mpk.gz      ← weights of the best epoch so far
//     train_config.json      ← TrainConfig that produced those weights
//     best_checkpoint.json   ← { epoch, train_loss, val_loss }
//     metrics.csv            ← written by MetricsLogger
//
// The three checkpoint files form one set: they are only replaced
// together, when a new best model is persisted. A run that starts
// in a directory holding an older checkpoint and aborts before its
// first improvement leaves the older set untouched, so `predict`
// always rebuilds the pipeline that matches the weights.
//
// Every file of the set is fully written under a temporary name
// before the first rename, so a failed write never touches the
// previous set. Renames happen record → config → metadata.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Compresses with gzip, stores floats at half precision
//   - Type-safe: loading fails if the architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;

/// File stem of the best model record
pub const MODEL_STEM: &str = "model_best";

/// Extension CompactRecorder appends to the stem
pub const RECORD_EXTENSION: &str = "mpk.gz";

const PARTIAL_STEM: &str = "model_best_partial";
const BEST_META_FILE: &str = "best_checkpoint.json";
const CONFIG_FILE: &str = "train_config.json";

/// Which epoch produced the saved weights, and how good it was.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch:      usize,
    pub train_loss: f64,
    pub val_loss:   f64,
}

/// Destination for "new best model" events raised by the training loop.
///
/// Implementations:
///   - CheckpointManager → writes the record, config and metadata to disk
pub trait BestModelSink<B: Backend, M: Module<B>> {
    fn persist(&mut self, model: &M, best: &BestCheckpoint) -> Result<()>;
}

/// Manages the files in one checkpoint directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir:    PathBuf,
    /// Config written next to every new best record
    config: Option<TrainConfig>,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir, config: None })
    }

    /// Attach the config of the current run. Nothing is written until
    /// the run persists its first best model.
    pub fn with_config(mut self, cfg: TrainConfig) -> Self {
        self.config = Some(cfg);
        self
    }

    /// Full path of the best model record
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{MODEL_STEM}.{RECORD_EXTENSION}"))
    }

    /// Replace the best model with `model`, together with the attached
    /// config and the metadata in `best`.
    pub fn save_best<B: Backend, M: Module<B>>(
        &self,
        model: &M,
        best:  &BestCheckpoint,
    ) -> Result<()> {
        // ── Stage every file under a temporary name ───────────────────────────
        // The recorder appends its own extension to the stem
        let partial_stem   = self.dir.join(PARTIAL_STEM);
        let partial_record = self.dir.join(format!("{PARTIAL_STEM}.{RECORD_EXTENSION}"));

        Recorder::<B>::record(&CompactRecorder::new(), model.clone().into_record(), partial_stem)
            .with_context(|| {
                format!("Failed to write checkpoint to '{}'", partial_record.display())
            })?;

        let mut staged = vec![(partial_record, self.model_path())];
        if let Some(cfg) = &self.config {
            let path = self.dir.join(CONFIG_FILE);
            staged.push((stage_json(&path, cfg)?, path));
        }
        let meta_path = self.dir.join(BEST_META_FILE);
        staged.push((stage_json(&meta_path, best)?, meta_path));

        // ── Swap the set into place ───────────────────────────────────────────
        for (tmp, path) in &staged {
            fs::rename(tmp, path).with_context(|| {
                format!("Failed to move '{}' to '{}'", tmp.display(), path.display())
            })?;
        }

        tracing::debug!(
            "Saved best checkpoint: epoch {} val_loss={:.5}",
            best.epoch,
            best.val_loss
        );
        Ok(())
    }

    /// Load the best weights into `model`.
    ///
    /// The model must have the same architecture as the one that
    /// was saved or loading will fail.
    pub fn load_best<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let stem = self.dir.join(MODEL_STEM);
        let record = Recorder::<B>::load(&CompactRecorder::new(), stem, device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    self.model_path().display()
                )
            })?;
        Ok(model.load_record(record))
    }

    /// Metadata of the current best checkpoint
    pub fn load_best_meta(&self) -> Result<BestCheckpoint> {
        read_json(&self.dir.join(BEST_META_FILE))
    }

    /// Load the configuration that produced the current best checkpoint.
    pub fn load_config(&self) -> Result<TrainConfig> {
        read_json(&self.dir.join(CONFIG_FILE)).with_context(|| {
            format!(
                "Make sure you have run 'train' with --checkpoint-dir '{}' first",
                self.dir.display()
            )
        })
    }
}

impl<B: Backend, M: Module<B>> BestModelSink<B, M> for CheckpointManager {
    fn persist(&mut self, model: &M, best: &BestCheckpoint) -> Result<()> {
        self.save_best::<B, M>(model, best)
    }
}

/// Write `value` next to `path` under a temporary name and return that name.
fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp  = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Cannot write '{}'", tmp.display()))?;
    Ok(tmp)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Cannot parse '{}'", path.display()))
}
