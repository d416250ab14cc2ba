// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained PilotNet from the checkpoint directory and
// predicts the steering angle of single frames.
//
// The frame goes through the same crop → resize → YUV → centre
// steps as training, never augmented, so the network sees inputs
// distributed exactly like its validation set.
use anyhow::Result;
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use std::path::Path;

use crate::data::{batcher::SteeringBatcher, transform::TransformPipeline};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{PilotNet, SteeringModel};
use crate::ml::trainer::model_config;

/// One prediction in both the network's scale and radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringPrediction {
    /// Raw network output (normalized when trained with max_angle)
    pub normalized: f32,
    /// Steering angle in radians
    pub radians: f64,
}

impl SteeringPrediction {
    pub fn new(normalized: f32, max_angle: Option<f64>) -> Self {
        let radians = match max_angle {
            Some(scale) => normalized as f64 * scale,
            None => normalized as f64,
        };
        Self { normalized, radians }
    }
}

pub struct Inferencer<B: Backend> {
    model:     PilotNet<B>,
    pipeline:  TransformPipeline,
    max_angle: Option<f64>,
    batcher:   SteeringBatcher<B>,
}

impl<B: Backend> Inferencer<B> {
    /// Rebuild pipeline and model from the config and weights saved
    /// together in the checkpoint directory.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: &B::Device) -> Result<Self> {
        let cfg      = ckpt_manager.load_config()?;
        let pipeline = cfg.pipeline()?;

        let model: PilotNet<B> = model_config(&cfg).with_dropout(0.0).init(device)?;
        let model = ckpt_manager.load_best(model, device)?;
        match ckpt_manager.load_best_meta() {
            Ok(best) => tracing::info!(
                "Model loaded from epoch {} (val_loss={:.5})",
                best.epoch,
                best.val_loss
            ),
            Err(e) => tracing::warn!("Model loaded without metadata: {e:#}"),
        }

        Ok(Self {
            model,
            pipeline,
            max_angle: cfg.max_angle,
            batcher: SteeringBatcher::new(device.clone()),
        })
    }

    pub fn predict(&self, image: &Path) -> Result<SteeringPrediction> {
        // Label is irrelevant here; augmentation is off so the
        // generator is never drawn from.
        let sample = self
            .pipeline
            .process(image, 0.0, false, &mut rand::thread_rng())?;
        let batch = self.batcher.batch(vec![sample]);

        let output: f32 = self.model.forward(batch.images).into_scalar().elem::<f32>();
        Ok(SteeringPrediction::new(output, self.max_angle))
    }
}
