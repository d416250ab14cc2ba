// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Loads the best checkpoint and predicts the steering angle for
// a single camera frame.
//
//   Step 1: Open the checkpoint directory   (Layer 6 - infra)
//   Step 2: Rebuild pipeline + model        (Layer 5 - ml)
//   Step 3: Run one frame through both      (Layer 5 - ml)

use anyhow::Result;
use std::path::Path;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{Inferencer, SteeringPrediction};

type InferBackend = burn::backend::Wgpu;

pub struct PredictUseCase {
    inferencer: Inferencer<InferBackend>,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: impl AsRef<Path>) -> Result<Self> {
        let ckpt_manager = CheckpointManager::new(checkpoint_dir.as_ref())?;
        let device       = burn::backend::wgpu::WgpuDevice::default();
        let inferencer   = Inferencer::from_checkpoint(&ckpt_manager, &device)?;
        Ok(Self { inferencer })
    }

    pub fn predict(&self, image: impl AsRef<Path>) -> Result<SteeringPrediction> {
        let image = image.as_ref();
        tracing::info!("Predicting steering for '{}'", image.display());
        self.inferencer.predict(image)
    }
}
