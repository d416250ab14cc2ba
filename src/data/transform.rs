// ============================================================
// Layer 4 — Image Transform Pipeline
// ============================================================
// Turns one camera frame on disk into a fixed-shape, zero-
// centered YUV tensor plus its steering target.
//
// Steps, in order:
//
//   image file
//       │  load, force RGB (drop alpha / expand grayscale)
//       ▼
//   crop            → remove fixed pixel margins (sky, hood)
//       │
//       ▼
//   augment         → brightness jitter, mirror + negate angle
//       │             (training only)
//       ▼
//   resize          → bilinear to (height, width)
//       │
//       ▼
//   tensorize       → f32 in [0, 1], channel-first
//       │
//       ▼
//   RGB → YUV       → fixed 3x3 linear transform per pixel
//       │
//       ▼
//   center          → subtract each channel's own mean
//       │
//       ▼
//   label           → angle / max_angle, clamped to [-1, 1]
//
// The mirror flip lives on LabeledFrame, which owns both the
// pixels and the angle, so the image can only be flipped
// together with its label.
//
// Reference: image crate documentation (imageops)
//            rand crate documentation

use std::path::Path;

use image::{
    imageops::{self, FilterType},
    RgbImage,
};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::data::error::{DataError, DataResult};
use crate::domain::geometry::{CropSpec, ResizeSpec};
use crate::domain::label_record::normalize_angle;
use crate::domain::sample::SteeringSample;

/// Rows of the RGB → YUV matrix; output channel order is (Y, U, V).
pub const RGB_TO_YUV: [[f32; 3]; 3] = [
    [ 0.299,    0.587,    0.114  ],
    [-0.14713, -0.28886,  0.436  ],
    [ 0.615,   -0.51499, -0.10001],
];

// ─── Augmentation ─────────────────────────────────────────────────────────────

/// Probabilities and ranges of the training-time augmentations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentConfig {
    /// Probability of scaling brightness
    pub brightness_prob: f32,
    /// Lower bound of the brightness factor
    pub brightness_min: f32,
    /// Upper bound of the brightness factor
    pub brightness_max: f32,
    /// Probability of mirroring the frame (and negating the angle)
    pub flip_prob: f32,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            brightness_prob: 0.5,
            brightness_min:  0.5,
            brightness_max:  1.5,
            flip_prob:       0.5,
        }
    }
}

/// Which augmentations were drawn for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AugmentOutcome {
    pub brightness: Option<f32>,
    pub flipped:    bool,
}

/// A frame together with the steering angle it is labelled with.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledFrame {
    pub image: RgbImage,
    pub angle: f64,
}

impl LabeledFrame {
    pub fn new(image: RgbImage, angle: f64) -> Self {
        Self { image, angle }
    }

    /// Scale every channel by `factor`, truncating toward zero and
    /// saturating at 255. The angle is unaffected.
    pub fn brightened(mut self, factor: f32) -> Self {
        for pixel in self.image.pixels_mut() {
            for c in 0..3 {
                pixel[c] = (pixel[c] as f32 * factor).clamp(0.0, 255.0) as u8;
            }
        }
        self
    }

    /// Mirror the frame left-to-right and negate the angle.
    pub fn mirrored(mut self) -> Self {
        imageops::flip_horizontal_in_place(&mut self.image);
        self.angle = -self.angle;
        self
    }
}

impl AugmentConfig {
    /// Draw both augmentations for one frame.
    ///
    /// Two independent Bernoulli draws are always consumed from `rng`
    /// (brightness first, then flip) so the stream position does not
    /// depend on which branches were taken.
    pub fn apply(
        &self,
        frame: LabeledFrame,
        rng:   &mut dyn RngCore,
    ) -> (LabeledFrame, AugmentOutcome) {
        let mut frame   = frame;
        let mut outcome = AugmentOutcome::default();

        if rng.gen::<f32>() < self.brightness_prob {
            let factor = if self.brightness_max > self.brightness_min {
                rng.gen_range(self.brightness_min..=self.brightness_max)
            } else {
                self.brightness_min
            };
            frame = frame.brightened(factor);
            outcome.brightness = Some(factor);
        }

        if rng.gen::<f32>() < self.flip_prob {
            frame = frame.mirrored();
            outcome.flipped = true;
        }

        (frame, outcome)
    }

    pub fn describe(&self) -> String {
        format!(
            "brightness_p={:.2} range=[{:.2},{:.2}] flip_p={:.2}",
            self.brightness_prob, self.brightness_min, self.brightness_max, self.flip_prob,
        )
    }
}

// ─── Pipeline ─────────────────────────────────────────────────────────────────

/// Deterministic geometry plus the label scale and augmentation
/// settings. Holds no per-call state; all randomness comes from
/// the generator passed to `process`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformPipeline {
    pub crop:      CropSpec,
    pub resize:    ResizeSpec,
    pub max_angle: Option<f64>,
    pub augment:   AugmentConfig,
}

impl TransformPipeline {
    /// Validate and build a pipeline.
    ///
    /// `max_angle` must be finite and positive when present; the
    /// resize target must be non-zero in both dimensions.
    pub fn new(
        crop:      CropSpec,
        resize:    ResizeSpec,
        max_angle: Option<f64>,
        augment:   AugmentConfig,
    ) -> DataResult<Self> {
        if resize.is_empty() {
            return Err(DataError::InvalidResize {
                height: resize.height,
                width:  resize.width,
            });
        }
        if let Some(scale) = max_angle {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(DataError::InvalidConfig(format!(
                    "max_angle must be a positive number, got {scale}"
                )));
            }
        }
        for (name, p) in [
            ("brightness_prob", augment.brightness_prob),
            ("flip_prob", augment.flip_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(DataError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {p}"
                )));
            }
        }
        if augment.brightness_min < 0.0 || augment.brightness_min > augment.brightness_max {
            return Err(DataError::InvalidConfig(format!(
                "brightness range [{}, {}] is empty or negative",
                augment.brightness_min, augment.brightness_max
            )));
        }
        Ok(Self { crop, resize, max_angle, augment })
    }

    /// Run the full transform for one frame.
    pub fn process(
        &self,
        path:      &Path,
        raw_angle: f64,
        augment:   bool,
        rng:       &mut dyn RngCore,
    ) -> DataResult<SteeringSample> {
        let image = load_rgb(path)?;
        let image = self.crop_frame(image, path)?;

        let mut frame = LabeledFrame::new(image, raw_angle);
        if augment {
            let (augmented, outcome) = self.augment.apply(frame, rng);
            tracing::trace!(
                "augmented {}: brightness={:?} flipped={}",
                path.display(),
                outcome.brightness,
                outcome.flipped
            );
            frame = augmented;
        }

        Ok(self.finish(&frame))
    }

    /// Resize, tensorize, convert to YUV, center, and scale the label.
    pub fn finish(&self, frame: &LabeledFrame) -> SteeringSample {
        let resized = if frame.image.dimensions() == (self.resize.width, self.resize.height) {
            frame.image.clone()
        } else {
            imageops::resize(
                &frame.image,
                self.resize.width,
                self.resize.height,
                FilterType::Triangle,
            )
        };

        let mut image_chw = rgb_to_yuv_chw(&resized);
        center_channels(&mut image_chw, self.resize.plane_len());

        SteeringSample {
            image_chw,
            height: self.resize.height as usize,
            width:  self.resize.width as usize,
            target: normalize_angle(frame.angle, self.max_angle) as f32,
        }
    }

    /// Remove the configured margins; a no-op crop returns the frame as is.
    pub fn crop_frame(&self, image: RgbImage, path: &Path) -> DataResult<RgbImage> {
        if self.crop.is_noop() {
            return Ok(image);
        }
        let (width, height) = image.dimensions();
        let window = self
            .crop
            .window(width, height)
            .ok_or_else(|| DataError::InvalidCrop {
                path:   path.to_path_buf(),
                top:    self.crop.top,
                bottom: self.crop.bottom,
                left:   self.crop.left,
                right:  self.crop.right,
                width,
                height,
            })?;
        Ok(imageops::crop_imm(&image, window.x, window.y, window.width, window.height).to_image())
    }

    pub fn describe(&self) -> String {
        let scale = self
            .max_angle
            .map(|s| format!("{s:.3}"))
            .unwrap_or_else(|| "none".to_string());
        format!(
            "crop=({},{},{},{}) resize={}x{} max_angle={} {}",
            self.crop.top,
            self.crop.bottom,
            self.crop.left,
            self.crop.right,
            self.resize.height,
            self.resize.width,
            scale,
            self.augment.describe(),
        )
    }
}

/// Load any supported raster format as 8-bit RGB.
pub fn load_rgb(path: &Path) -> DataResult<RgbImage> {
    let img = image::open(path).map_err(|source| DataError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Pixels → [0, 1] floats → YUV, laid out as three planes (Y, U, V).
pub fn rgb_to_yuv_chw(img: &RgbImage) -> Vec<f32> {
    let (w, h)    = img.dimensions();
    let plane     = (w * h) as usize;
    let mut out   = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in img.enumerate_pixels() {
        let base = (y * w + x) as usize;
        let r = pixel[0] as f32 / 255.0;
        let g = pixel[1] as f32 / 255.0;
        let b = pixel[2] as f32 / 255.0;
        for (c, row) in RGB_TO_YUV.iter().enumerate() {
            out[c * plane + base] = row[0] * r + row[1] * g + row[2] * b;
        }
    }
    out
}

/// Subtract each plane's mean from every value in that plane.
pub fn center_channels(chw: &mut [f32], plane: usize) {
    if plane == 0 {
        return;
    }
    for channel in chw.chunks_mut(plane) {
        let mean = channel.iter().map(|&v| v as f64).sum::<f64>() / plane as f64;
        for v in channel.iter_mut() {
            *v = (*v as f64 - mean) as f32;
        }
    }
}
