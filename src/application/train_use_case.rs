// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the label file          (Layer 4 - data)
//   Step 2: Build the transform pipeline (Layer 4 - data)
//   Step 3: Build train / val views      (Layer 4 - data)
//   Step 4: Split train/validation       (Layer 4 - data)
//   Step 5: Build the batch scheduler    (Layer 4 - data)
//   Step 6: Open checkpoints and metrics (Layer 6 - infra)
//   Step 7: Run training loop            (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::SteeringDataset,
    error::DataResult,
    label_store::LabelStore,
    scheduler::BatchScheduler,
    splitter::split_indices,
    transform::{AugmentConfig, TransformPipeline},
};
use crate::domain::geometry::{CropSpec, ResizeSpec};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::trainer::{run_training, FitReport, TrainBackend, TrainingData};

// ─── Training Configuration ──────────────────────────────────────────────────
// All options for a training run.
// Serialisable so it can be saved next to the checkpoint and
// reloaded for inference, which needs the same crop, resize and
// max_angle to rebuild the pipeline and the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Record file; image paths are relative to its directory
    pub labels_csv:       String,
    pub checkpoint_dir:   String,
    /// Normalization scale in radians; None trains on raw angles
    pub max_angle:        Option<f64>,
    pub crop:             CropSpec,
    pub resize:           ResizeSpec,
    /// Apply augmentation to the training view
    pub augment:          bool,
    pub augmentation:     AugmentConfig,
    pub batch_size:       usize,
    pub epochs:           usize,
    pub learning_rate:    f64,
    pub weight_decay:     f64,
    pub huber_delta:      f32,
    pub dropout:          f64,
    /// None → max(1000, ⌈N/10⌉)
    pub validation_count: Option<usize>,
    /// None → entropy-seeded split, shuffle and augmentation
    pub seed:             Option<u64>,
    /// Values above 1 fetch batches on a thread pool of that size
    pub num_workers:      usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            labels_csv:       "dataset/labels.csv".to_string(),
            checkpoint_dir:   "checkpoints".to_string(),
            max_angle:        Some(0.6),
            crop:             CropSpec::default(),
            resize:           ResizeSpec::default(),
            augment:          true,
            augmentation:     AugmentConfig::default(),
            batch_size:       128,
            epochs:           10,
            learning_rate:    1e-3,
            weight_decay:     1e-4,
            huber_delta:      1.0,
            dropout:          0.0,
            validation_count: None,
            seed:             None,
            num_workers:      0,
        }
    }
}

impl TrainConfig {
    /// The transform pipeline these settings describe.
    pub fn pipeline(&self) -> DataResult<TransformPipeline> {
        TransformPipeline::new(self.crop, self.resize, self.max_angle, self.augmentation)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute the full training pipeline end to end on the WGPU backend
    pub fn execute(&self) -> Result<FitReport> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<TrainBackend>(&device)
    }

    /// Execute the full training pipeline on any autodiff backend
    pub fn execute_on<B: AutodiffBackend>(&self, device: &B::Device) -> Result<FitReport> {
        let cfg = &self.config;

        // ── Step 1: Load the label file ───────────────────────────────────────
        tracing::info!("Loading labels from '{}'", cfg.labels_csv);
        let store = LabelStore::load(&cfg.labels_csv)
            .with_context(|| format!("Cannot load labels from '{}'", cfg.labels_csv))?;
        tracing::info!("Loaded {} records (root '{}')", store.len(), store.root().display());

        // ── Step 2: Transform pipeline ────────────────────────────────────────
        // Rejects zero resize, non-positive max_angle and bad probabilities
        // before any image is touched.
        let pipeline = cfg.pipeline()?;
        tracing::info!("Pipeline: {}", pipeline.describe());

        // ── Step 3: Training and validation views ─────────────────────────────
        // Both share the same records; only the training view augments.
        let train_view = SteeringDataset::new(store, pipeline, cfg.augment);
        let val_view   = train_view.with_augment(false);

        // ── Step 4: Train / validation split ──────────────────────────────────
        let plan = split_indices(train_view.len(), cfg.validation_count, cfg.seed)?;
        tracing::info!(
            "Split: {} train, {} validation",
            plan.train.len(),
            plan.validation.len()
        );

        // ── Step 5: Batch scheduler ───────────────────────────────────────────
        let scheduler = BatchScheduler::new(cfg.batch_size, cfg.seed, cfg.num_workers)?;

        // ── Step 6: Checkpoint directory and metrics log ──────────────────────
        // The config is written alongside each new best model, so an
        // existing checkpoint keeps its own config until this run beats it.
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?.with_config(cfg.clone());
        let metrics      = MetricsLogger::new(&cfg.checkpoint_dir)?;
        tracing::info!("Logging epoch metrics to '{}'", metrics.csv_path().display());

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        let data = TrainingData {
            train:      &train_view,
            validation: &val_view,
            plan:       &plan,
            scheduler:  &scheduler,
        };
        run_training::<B>(cfg, data, ckpt_manager, metrics, device)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::checkpoint::BestCheckpoint;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::LinearConfig;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_defaults_follow_reference_trainer() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.max_angle, Some(0.6));
        assert_eq!(cfg.resize, ResizeSpec::new(66, 200));
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.epochs, 10);
        assert_eq!(cfg.learning_rate, 1e-3);
        assert_eq!(cfg.weight_decay, 1e-4);
        assert_eq!(cfg.huber_delta, 1.0);
        assert!(cfg.augment);
        assert!(cfg.pipeline().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: TrainConfig =
            serde_json::from_str(r#"{ "epochs": 2, "max_angle": null }"#).unwrap();
        assert_eq!(cfg.epochs, 2);
        assert_eq!(cfg.max_angle, None);
        assert_eq!(cfg.batch_size, 128);
    }

    #[test]
    fn test_invalid_settings_fail_before_training() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = tmp.path().join("labels.csv");
        std::fs::write(&csv, "image,steer_rad\na.png,0.1\nb.png,0.2\n").unwrap();

        let cfg = TrainConfig {
            labels_csv:     csv.display().to_string(),
            checkpoint_dir: tmp.path().join("ckpt").display().to_string(),
            resize:         ResizeSpec::new(0, 200),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg).execute_on::<TestBackend>(&Default::default()).unwrap_err();
        assert!(format!("{err:#}").contains("non-zero"), "{err:#}");
        assert!(!tmp.path().join("ckpt").exists());
    }

    #[test]
    fn test_default_validation_size_needs_enough_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = tmp.path().join("labels.csv");
        std::fs::write(&csv, "image,steer_rad\na.png,0.1\nb.png,0.2\n").unwrap();

        let cfg = TrainConfig {
            labels_csv:     csv.display().to_string(),
            checkpoint_dir: tmp.path().join("ckpt").display().to_string(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute_on::<TestBackend>(&Default::default()).is_err());
    }

    #[test]
    fn test_failed_run_keeps_previous_checkpoint_config() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = tmp.path().join("ckpt");

        // A finished earlier run left a best model and its config
        let first = TrainConfig {
            checkpoint_dir: ckpt.display().to_string(),
            max_angle:      Some(0.6),
            crop:           CropSpec::new(20, 8, 0, 0),
            ..TrainConfig::default()
        };
        let meta  = BestCheckpoint { epoch: 7, train_loss: 0.02, val_loss: 0.03 };
        let model = LinearConfig::new(2, 1).init::<NdArray>(&Default::default());
        CheckpointManager::new(&ckpt)
            .unwrap()
            .with_config(first.clone())
            .save_best::<NdArray, _>(&model, &meta)
            .unwrap();

        // A new run with different settings whose images do not exist
        let csv = tmp.path().join("labels.csv");
        std::fs::write(&csv, "image,steer_rad
a.png,0.1
b.png,0.2
c.png,0.3
").unwrap();
        let second = TrainConfig {
            labels_csv:       csv.display().to_string(),
            checkpoint_dir:   ckpt.display().to_string(),
            max_angle:        None,
            crop:             CropSpec::default(),
            augment:          false,
            batch_size:       2,
            epochs:           1,
            validation_count: Some(1),
            seed:             Some(3),
            ..TrainConfig::default()
        };
        let result = TrainUseCase::new(second).execute_on::<TestBackend>(&Default::default());
        assert!(result.is_err());

        let manager = CheckpointManager::new(&ckpt).unwrap();
        assert_eq!(manager.load_config().unwrap(), first);
        assert_eq!(manager.load_best_meta().unwrap(), meta);
    }
}
