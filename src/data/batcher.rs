// ============================================================
// Layer 4 — Steering Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<SteeringSample>
// into tensors.
//
// How batching works here:
//   Input:  N samples, each a flat CHW Vec of length 3*H*W
//   Output: images  [N, 3, H, W]
//           targets [N, 1]
//
//   All image planes are concatenated into one long Vec, then
//   reshaped: [s1_Y.., s1_U.., s1_V.., s2_Y.., ...] → [N, 3, H, W]
//
// Every sample already has the configured resize shape, so no
// padding is needed.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::SteeringSample;

/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SteeringBatch<B: Backend> {
    /// YUV images — shape: [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,

    /// Steering targets — shape: [batch_size, 1]
    pub targets: Tensor<B, 2>,
}

impl<B: Backend> SteeringBatch<B> {
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }
}

/// Holds the target device so tensors are created on the
/// correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct SteeringBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SteeringBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SteeringSample, SteeringBatch<B>> for SteeringBatcher<B> {
    fn batch(&self, items: Vec<SteeringSample>) -> SteeringBatch<B> {
        let batch_size = items.len();
        let (height, width) = items
            .first()
            .map(|s| {
                let [_, height, width] = s.shape();
                (height, width)
            })
            .unwrap_or((0, 0));

        let image_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.image_chw.iter().copied())
            .collect();
        let target_flat: Vec<f32> = items.iter().map(|s| s.target).collect();

        let images = Tensor::<B, 1>::from_floats(image_flat.as_slice(), &self.device)
            .reshape([batch_size, 3, height, width]);
        let targets = Tensor::<B, 1>::from_floats(target_flat.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        SteeringBatch { images, targets }
    }
}
