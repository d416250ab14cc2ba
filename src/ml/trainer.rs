// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop with best-validation checkpointing.
//
// Per epoch:
//   1. train   — reshuffled training batches, forward, Huber loss,
//                backward, one AdamW step per batch
//   2. validate — fixed-order validation batches through
//                model.valid(), no parameter updates
//   3. decide  — if val_loss < best so far, hand the model to the
//                checkpoint sink (strictly less, starting from +∞)
//
// Both reported losses are sample-weighted means:
//   Σ(batch_mean_loss × batch_len) / split_len
// so a short final batch carries only its own weight.
//
// Backends:
//   - The CLI trains on TrainBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on the inner backend (Wgpu)
//   - The validation batcher therefore uses the inner backend too
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::{HuberLoss, HuberLossConfig, Reduction},
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::SteeringBatcher,
    dataset::SteeringDataset,
    scheduler::BatchScheduler,
    splitter::SplitPlan,
};
use crate::infra::{
    checkpoint::{BestCheckpoint, BestModelSink, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{PilotNet, PilotNetConfig, SteeringModel};

/// Backend the CLI trains on
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Everything the loop reads data from.
#[derive(Clone, Copy)]
pub struct TrainingData<'a> {
    /// Augmenting view used for training batches
    pub train:      &'a SteeringDataset,
    /// Non-augmenting view used for validation batches
    pub validation: &'a SteeringDataset,
    pub plan:       &'a SplitPlan,
    pub scheduler:  &'a BatchScheduler,
}

#[derive(Debug, Clone, Copy)]
pub struct FitSettings {
    pub epochs:        usize,
    pub learning_rate: f64,
    pub huber_delta:   f32,
}

impl From<&TrainConfig> for FitSettings {
    fn from(cfg: &TrainConfig) -> Self {
        Self {
            epochs:        cfg.epochs,
            learning_rate: cfg.learning_rate,
            huber_delta:   cfg.huber_delta,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FitReport {
    pub history: Vec<EpochMetrics>,
    pub best:    Option<BestCheckpoint>,
}

/// Tracks the lowest validation loss seen so far.
#[derive(Debug, Clone, Copy)]
pub struct BestTracker {
    best: f64,
}

impl Default for BestTracker {
    fn default() -> Self {
        Self { best: f64::INFINITY }
    }
}

impl BestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `val_loss`; true if it is strictly below every earlier value.
    /// NaN never counts as an improvement.
    pub fn observe(&mut self, val_loss: f64) -> bool {
        if val_loss < self.best {
            self.best = val_loss;
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

/// Train a PilotNet sized for `cfg` on `device`.
pub fn run_training<B: AutodiffBackend>(
    cfg:      &TrainConfig,
    data:     TrainingData<'_>,
    mut ckpt: CheckpointManager,
    metrics:  MetricsLogger,
    device:   &B::Device,
) -> Result<FitReport> {
    // ── Build model ───────────────────────────────────────────────────────────
    let model: PilotNet<B> = model_config(cfg).init(device)?;
    tracing::info!(
        "Model ready: PilotNet on {}x{} input, {} parameters",
        cfg.resize.height,
        cfg.resize.width,
        model.num_params()
    );

    // ── AdamW optimiser ───────────────────────────────────────────────────────
    // Adam update with weight decay applied directly to the parameters
    // instead of being folded into the gradient.
    let optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay as f32)
        .init::<B, PilotNet<B>>();

    let settings = FitSettings::from(cfg);
    let (_, report) = fit::<B, _, _, _>(
        model, optim, data, &settings, device, &mut ckpt, Some(&metrics),
    )?;
    Ok(report)
}

/// PilotNet sized for the configured resize target.
pub fn model_config(cfg: &TrainConfig) -> PilotNetConfig {
    PilotNetConfig::new(cfg.resize.height as usize, cfg.resize.width as usize)
        .with_dropout(cfg.dropout)
}

/// Run `settings.epochs` epochs of train → validate → checkpoint decision.
///
/// Any sample that fails to load aborts the run with the underlying
/// error; nothing is skipped silently.
pub fn fit<B, M, O, S>(
    mut model: M,
    mut optim: O,
    data:      TrainingData<'_>,
    settings:  &FitSettings,
    device:    &B::Device,
    sink:      &mut S,
    metrics:   Option<&MetricsLogger>,
) -> Result<(M, FitReport)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SteeringModel<B>,
    M::InnerModule: SteeringModel<B::InnerBackend>,
    O: Optimizer<M, B>,
    S: BestModelSink<B, M>,
{
    let loss_fn       = HuberLossConfig::new(settings.huber_delta).init();
    let train_batcher = SteeringBatcher::<B>::new(device.clone());
    let val_batcher   = SteeringBatcher::<B::InnerBackend>::new(device.clone());

    tracing::info!(
        "Training on {} samples, validating on {} ({} epochs, batch {}, {} workers)",
        data.plan.train.len(),
        data.plan.validation.len(),
        settings.epochs,
        data.scheduler.batch_size(),
        data.scheduler.num_workers()
    );

    let mut tracker = BestTracker::new();
    let mut report  = FitReport::default();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=settings.epochs {
        let (trained, train_loss) =
            train_epoch(model, &mut optim, data, &train_batcher, &loss_fn, settings, epoch)?;
        model = trained;

        // model.valid() → inner backend, dropout disabled
        let val_loss = validate_epoch(&model.valid(), data, &val_batcher, &loss_fn, epoch)?;

        println!(
            "Epoch {:02}/{} | train {:.5} | val {:.5}",
            epoch, settings.epochs, train_loss, val_loss
        );

        let saved = checkpoint_decision::<B, M, S>(
            &mut tracker, sink, &model, epoch, train_loss, val_loss,
        )?;
        if let Some(best) = saved {
            report.best = Some(best);
        }

        let row = EpochMetrics::new(epoch, train_loss, val_loss, saved.is_some());
        if let Some(logger) = metrics {
            logger.log(&row)?;
        }
        report.history.push(row);
    }

    tracing::info!("Training complete! Best val_loss={:.5}", tracker.best());
    Ok((model, report))
}

/// Persist the model through `sink` when `val_loss` beats the tracker.
pub fn checkpoint_decision<B, M, S>(
    tracker:    &mut BestTracker,
    sink:       &mut S,
    model:      &M,
    epoch:      usize,
    train_loss: f64,
    val_loss:   f64,
) -> Result<Option<BestCheckpoint>>
where
    B: Backend,
    M: Module<B>,
    S: BestModelSink<B, M>,
{
    if val_loss.is_nan() {
        tracing::warn!("Epoch {epoch}: validation loss is NaN, keeping previous checkpoint");
    }
    if !tracker.observe(val_loss) {
        return Ok(None);
    }

    let best = BestCheckpoint { epoch, train_loss, val_loss };
    sink.persist(model, &best)
        .with_context(|| format!("Failed to save best model for epoch {epoch}"))?;
    tracing::info!("New best model at epoch {epoch} (val_loss={val_loss:.5})");
    Ok(Some(best))
}

fn train_epoch<B, M, O>(
    mut model: M,
    optim:     &mut O,
    data:      TrainingData<'_>,
    batcher:   &SteeringBatcher<B>,
    loss_fn:   &HuberLoss,
    settings:  &FitSettings,
    epoch:     usize,
) -> Result<(M, f64)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SteeringModel<B>,
    O: Optimizer<M, B>,
{
    let mut loss_sum = 0.0f64;
    let mut seen     = 0usize;

    for indices in data.scheduler.train_batches(data.plan, epoch) {
        let samples = data
            .scheduler
            .fetch(data.train, &indices, epoch)
            .with_context(|| format!("Epoch {epoch}: failed to load a training batch"))?;
        let batch = batcher.batch(samples);
        let n     = batch.len();

        let output = model.forward(batch.images);
        let loss   = loss_fn.forward(output, batch.targets, Reduction::Mean);

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
        loss_sum += loss_val * n as f64;
        seen     += n;

        // Backward pass + AdamW update
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(settings.learning_rate, model, grads);
    }

    tracing::debug!("Epoch {epoch}: trained on {seen} samples");
    Ok((model, mean_or_nan(loss_sum, seen)))
}

fn validate_epoch<B, M>(
    model:   &M,
    data:    TrainingData<'_>,
    batcher: &SteeringBatcher<B>,
    loss_fn: &HuberLoss,
    epoch:   usize,
) -> Result<f64>
where
    B: Backend,
    M: SteeringModel<B>,
{
    let mut loss_sum = 0.0f64;
    let mut seen     = 0usize;

    for indices in data.scheduler.validation_batches(data.plan) {
        let samples = data
            .scheduler
            .fetch(data.validation, &indices, epoch)
            .with_context(|| format!("Epoch {epoch}: failed to load a validation batch"))?;
        let batch = batcher.batch(samples);
        let n     = batch.len();

        let output = model.forward(batch.images);
        let loss: f64 = loss_fn
            .forward(output, batch.targets, Reduction::Mean)
            .into_scalar()
            .elem::<f64>();
        loss_sum += loss * n as f64;
        seen     += n;
    }

    Ok(mean_or_nan(loss_sum, seen))
}

fn mean_or_nan(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        label_store::LabelStore,
        splitter::split_indices,
        transform::{AugmentConfig, TransformPipeline},
    };
    use crate::domain::geometry::{CropSpec, ResizeSpec};
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};
    use image::{Rgb, RgbImage};
    use std::{fs, path::Path};

    type TestBackend = Autodiff<NdArray>;

    const HEIGHT: usize = 6;
    const WIDTH:  usize = 8;

    /// Flattens the frame into a single linear layer.
    #[derive(Module, Debug)]
    struct FlatLinear<B: Backend> {
        linear: Linear<B>,
    }

    impl<B: Backend> FlatLinear<B> {
        fn new(device: &B::Device) -> Self {
            Self { linear: LinearConfig::new(3 * HEIGHT * WIDTH, 1).init(device) }
        }
    }

    impl<B: Backend> SteeringModel<B> for FlatLinear<B> {
        fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
            self.linear.forward(images.flatten::<2>(1, 3))
        }
    }

    #[derive(Default)]
    struct CountingSink {
        epochs: Vec<usize>,
    }

    impl<B: Backend, M: Module<B>> BestModelSink<B, M> for CountingSink {
        fn persist(&mut self, _model: &M, best: &BestCheckpoint) -> Result<()> {
            self.epochs.push(best.epoch);
            Ok(())
        }
    }

    /// Ten 16×12 frames with steering proportional to brightness.
    fn write_dataset(dir: &Path) -> std::path::PathBuf {
        let images = dir.join("images");
        fs::create_dir_all(&images).unwrap();
        let mut body = String::from("image,steer_rad\n");
        for i in 0..10u8 {
            let level = i * 25;
            RgbImage::from_fn(16, 12, |x, _| Rgb([level, (x as u8) * 10, 255 - level]))
                .save(images.join(format!("img_{i}.png")))
                .unwrap();
            body.push_str(&format!("images/img_{i}.png,{}\n", (i as f64 - 4.5) / 10.0));
        }
        let csv = dir.join("labels.csv");
        fs::write(&csv, body).unwrap();
        csv
    }

    fn dataset(csv: &Path) -> SteeringDataset {
        let pipeline = TransformPipeline::new(
            CropSpec::new(2, 0, 0, 0),
            ResizeSpec::new(HEIGHT as u32, WIDTH as u32),
            Some(0.6),
            AugmentConfig::default(),
        )
        .unwrap();
        SteeringDataset::new(LabelStore::load(csv).unwrap(), pipeline, true)
    }

    fn settings(epochs: usize) -> FitSettings {
        FitSettings { epochs, learning_rate: 1e-2, huber_delta: 1.0 }
    }

    #[test]
    fn test_tracker_is_strict_and_starts_at_infinity() {
        let mut tracker = BestTracker::new();
        let improved: Vec<bool> = [0.5, 0.6, 0.4, 0.4]
            .into_iter()
            .map(|v| tracker.observe(v))
            .collect();
        assert_eq!(improved, vec![true, false, true, false]);
        assert_eq!(tracker.best(), 0.4);

        assert!(!tracker.observe(f64::NAN));
        assert!(BestTracker::new().observe(1e12));
    }

    #[test]
    fn test_checkpoint_decision_writes_twice_for_scripted_losses() {
        let device = Default::default();
        let model: Linear<NdArray> = LinearConfig::new(2, 1).init(&device);
        let mut tracker = BestTracker::new();
        let mut sink    = CountingSink::default();

        for (i, val) in [0.5, 0.6, 0.4, 0.4].into_iter().enumerate() {
            checkpoint_decision::<NdArray, _, _>(
                &mut tracker, &mut sink, &model, i + 1, 1.0, val,
            )
            .unwrap();
        }
        assert_eq!(sink.epochs, vec![1, 3]);
    }

    #[test]
    fn test_fit_reports_every_epoch_and_checkpoints_improvements() {
        let tmp   = tempfile::tempdir().unwrap();
        let train = dataset(&write_dataset(tmp.path()));
        let val   = train.with_augment(false);
        let plan  = split_indices(train.len(), Some(3), Some(5)).unwrap();
        let sched = BatchScheduler::new(4, Some(5), 1).unwrap();
        let data  = TrainingData { train: &train, validation: &val, plan: &plan, scheduler: &sched };

        let device  = Default::default();
        let model   = FlatLinear::<TestBackend>::new(&device);
        let optim   = AdamWConfig::new().init::<TestBackend, FlatLinear<TestBackend>>();
        let metrics = MetricsLogger::new(tmp.path().join("ckpt")).unwrap();
        let mut sink = CountingSink::default();

        let (_, report) = fit::<TestBackend, _, _, _>(
            model, optim, data, &settings(3), &device, &mut sink, Some(&metrics),
        )
        .unwrap();

        assert_eq!(report.history.len(), 3);
        assert!(report.history.iter().all(|m| m.train_loss.is_finite() && m.val_loss.is_finite()));
        assert!(report.history[0].best, "first finite loss always beats +inf");

        let best_epochs: Vec<usize> = report.history.iter().filter(|m| m.best).map(|m| m.epoch).collect();
        assert_eq!(sink.epochs, best_epochs);
        assert_eq!(report.best.map(|b| b.epoch), best_epochs.last().copied());

        let csv = fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_fit_writes_real_checkpoint() {
        let tmp   = tempfile::tempdir().unwrap();
        let train = dataset(&write_dataset(tmp.path()));
        let val   = train.with_augment(false);
        let plan  = split_indices(train.len(), Some(2), Some(1)).unwrap();
        let sched = BatchScheduler::new(3, Some(1), 2).unwrap();
        let data  = TrainingData { train: &train, validation: &val, plan: &plan, scheduler: &sched };

        let device   = Default::default();
        let model    = FlatLinear::<TestBackend>::new(&device);
        let optim    = AdamWConfig::new().init::<TestBackend, FlatLinear<TestBackend>>();
        let mut ckpt = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();

        let (_, report) = fit::<TestBackend, _, _, _>(
            model, optim, data, &settings(1), &device, &mut ckpt, None,
        )
        .unwrap();

        assert!(ckpt.model_path().is_file());
        assert_eq!(ckpt.load_best_meta().unwrap(), report.best.unwrap());
    }

    #[test]
    fn test_missing_image_aborts_before_any_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = write_dataset(tmp.path());
        fs::remove_file(tmp.path().join("images/img_0.png")).unwrap();

        let train = dataset(&csv);
        let val   = train.with_augment(false);
        let plan  = split_indices(train.len(), Some(3), Some(2)).unwrap();
        let sched = BatchScheduler::new(4, Some(2), 1).unwrap();
        let data  = TrainingData { train: &train, validation: &val, plan: &plan, scheduler: &sched };

        let device   = Default::default();
        let model    = FlatLinear::<TestBackend>::new(&device);
        let optim    = AdamWConfig::new().init::<TestBackend, FlatLinear<TestBackend>>();
        let mut sink = CountingSink::default();

        let result = fit::<TestBackend, _, _, _>(
            model, optim, data, &settings(2), &device, &mut sink, None,
        );
        let err = result.err().unwrap();
        assert!(format!("{err:#}").contains("img_0.png"), "{err:#}");
        assert!(sink.epochs.is_empty());
    }
}
