// ============================================================
// Layer 3 — LabelRecord Domain Type
// ============================================================
// One row of the simulator's record file: a frame image path
// (relative to the record file's directory) and the steering
// angle, in radians, that was applied when the frame was taken.
//
// Example row:
//   images/img_000042.png,0.124000,0.206667
//   └── image path ──────┘└ steer ┘└ steer_norm (ignored) ┘

/// A single labelled camera frame as recorded on disk.
/// Immutable once parsed; the row order in the file is the
/// canonical sample index order.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    /// Image path relative to the record file's directory
    pub image_path: String,

    /// Raw steering angle in radians
    pub steer_angle_raw: f64,
}

impl LabelRecord {
    pub fn new(image_path: impl Into<String>, steer_angle_raw: f64) -> Self {
        Self {
            image_path: image_path.into(),
            steer_angle_raw,
        }
    }
}

/// Map a raw angle into the training target.
///
/// With a scale configured the angle is divided by it and clamped
/// to [-1, 1]; without one the raw angle is passed through.
pub fn normalize_angle(angle: f64, max_angle: Option<f64>) -> f64 {
    match max_angle {
        Some(scale) => (angle / scale).clamp(-1.0, 1.0),
        None => angle,
    }
}
