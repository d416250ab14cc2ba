// ============================================================
// Layer 3 — SteeringSample Domain Type
// ============================================================
// The output of the image transform pipeline for one frame:
// a 3 × height × width float image in channel-first (CHW)
// layout plus the scalar steering target.
//
// Samples are rebuilt on every retrieval and never cached,
// because augmentation may change both the pixels and the target.

/// One prepared training example.
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringSample {
    /// Y, U, V planes, each zero-centered; length = 3 * height * width
    pub image_chw: Vec<f32>,

    /// Height of each plane in pixels
    pub height: usize,

    /// Width of each plane in pixels
    pub width: usize,

    /// Normalized (or raw, when no scale is configured) steering angle
    pub target: f32,
}

impl SteeringSample {
    /// Tensor shape as (channels, height, width)
    pub fn shape(&self) -> [usize; 3] {
        [3, self.height, self.width]
    }
}
