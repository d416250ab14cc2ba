// ============================================================
// Layer 5 — PilotNet Steering Regressor
// ============================================================
// End-to-end CNN mapping one camera frame to one steering value.
//
//   input  [batch, 3, H, W]   YUV, per-channel centred
//     conv 5×5 /2 →  24  ─┐
//     conv 5×5 /2 →  36   │ ReLU after each
//     conv 5×5 /2 →  48   │
//     conv 3×3 /1 →  64   │
//     conv 3×3 /1 →  64  ─┘
//     flatten
//     dense → 100 → 50 → 10 (ReLU) → 1
//   output [batch, 1]         normalized steering
//
// All convolutions use valid padding, so the flattened size is
// derived from the resize dimensions rather than hard-coded. The
// default 66×200 input produces a 64×1×18 feature map (1152).
//
// Reference: Bojarski et al. (2016) "End to End Learning for
//            Self-Driving Cars"

use anyhow::{bail, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

/// Anything that regresses a steering value from a batch of frames.
///
/// The training loop is generic over this trait, so tests can drive
/// it with a tiny model instead of the full PilotNet.
pub trait SteeringModel<B: Backend> {
    /// images: [batch, 3, H, W] → steering: [batch, 1]
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

/// (in_channels, out_channels, kernel, stride)
const CONV_STACK: [(usize, usize, usize, usize); 5] = [
    (3,  24, 5, 2),
    (24, 36, 5, 2),
    (36, 48, 5, 2),
    (48, 64, 3, 1),
    (64, 64, 3, 1),
];

const DENSE_STACK: [usize; 3] = [100, 50, 10];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct PilotNetConfig {
    /// Input frame height after resize
    pub height: usize,
    /// Input frame width after resize
    pub width:  usize,
    /// Dropout before the first dense layer (0 disables)
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl PilotNetConfig {
    /// Spatial size of the last conv output, or None if the input
    /// is too small to survive the conv stack.
    pub fn feature_map(&self) -> Option<(usize, usize)> {
        CONV_STACK
            .iter()
            .try_fold((self.height, self.width), |(h, w), &(_, _, k, s)| {
                Some((valid_conv(h, k, s)?, valid_conv(w, k, s)?))
            })
    }

    /// Length of the flattened feature vector fed to the dense head
    pub fn flattened_len(&self) -> Option<usize> {
        let (h, w) = self.feature_map()?;
        Some(CONV_STACK[CONV_STACK.len() - 1].1 * h * w)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<PilotNet<B>> {
        let Some(flattened) = self.flattened_len() else {
            bail!(
                "Input {}x{} is too small for the PilotNet conv stack",
                self.height,
                self.width
            );
        };

        let convs = CONV_STACK
            .iter()
            .map(|&(c_in, c_out, k, s)| {
                Conv2dConfig::new([c_in, c_out], [k, k])
                    .with_stride([s, s])
                    .init(device)
            })
            .collect();

        let mut dense = Vec::with_capacity(DENSE_STACK.len());
        let mut width = flattened;
        for &units in &DENSE_STACK {
            dense.push(LinearConfig::new(width, units).init(device));
            width = units;
        }
        let head    = LinearConfig::new(width, 1).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();

        tracing::debug!(
            "PilotNet: input {}x{}, flattened features {}",
            self.height,
            self.width,
            flattened
        );
        Ok(PilotNet { convs, dense, head, dropout })
    }
}

fn valid_conv(size: usize, kernel: usize, stride: usize) -> Option<usize> {
    if size < kernel {
        None
    } else {
        Some((size - kernel) / stride + 1)
    }
}

#[derive(Module, Debug)]
pub struct PilotNet<B: Backend> {
    pub convs:   Vec<Conv2d<B>>,
    pub dense:   Vec<Linear<B>>,
    pub head:    Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> SteeringModel<B> for PilotNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for conv in &self.convs {
            x = relu(conv.forward(x));
        }

        let mut x = self.dropout.forward(x.flatten::<2>(1, 3));
        for layer in &self.dense {
            x = relu(layer.forward(x));
        }
        self.head.forward(x)
    }
}
