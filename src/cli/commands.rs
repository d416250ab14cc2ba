// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `predict` and `inspect`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::data::transform::AugmentConfig;
use crate::domain::geometry::{CropSpec, ResizeSpec};

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the steering model on a labelled image folder
    Train(TrainArgs),

    /// Predict the steering angle of one frame with the best checkpoint
    Predict(PredictArgs),

    /// Summarize a label file and check its images exist
    Inspect(InspectArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV with `image` and `steer_rad` columns; image paths are
    /// relative to the CSV's directory
    #[arg(long, default_value = "dataset/labels.csv")]
    pub labels: String,

    /// Directory to save the best model, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Steering scale in radians; targets become clamp(angle / max_angle).
    /// 0 trains on raw angles
    #[arg(long, default_value_t = 0.6)]
    pub max_angle: f64,

    /// Pixels removed as top,bottom,left,right
    #[arg(long, default_value = "20,8,0,0", value_parser = parse_crop)]
    pub crop: CropSpec,

    /// Network input height after resize
    #[arg(long, default_value_t = 66)]
    pub height: u32,

    /// Network input width after resize
    #[arg(long, default_value_t = 200)]
    pub width: u32,

    /// Disable brightness and flip augmentation of training frames
    #[arg(long)]
    pub no_augment: bool,

    /// Probability of mirroring a training frame (and its angle)
    #[arg(long, default_value_t = 0.5)]
    pub flip_prob: f32,

    /// Probability of rescaling a training frame's brightness
    #[arg(long, default_value_t = 0.5)]
    pub brightness_prob: f32,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// AdamW learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// AdamW decoupled weight decay
    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f64,

    /// Huber loss transition point
    #[arg(long, default_value_t = 1.0)]
    pub huber_delta: f32,

    /// Dropout before the dense head
    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Validation size; defaults to max(1000, 10% of the rows)
    #[arg(long)]
    pub validation_count: Option<usize>,

    /// Seed for split, shuffle and augmentation; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Threads loading frames in parallel (0 or 1 loads inline)
    #[arg(long, default_value_t = 0)]
    pub num_workers: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            labels_csv:       a.labels,
            checkpoint_dir:   a.checkpoint_dir,
            max_angle:        (a.max_angle != 0.0).then_some(a.max_angle),
            crop:             a.crop,
            resize:           ResizeSpec::new(a.height, a.width),
            augment:          !a.no_augment,
            augmentation:     AugmentConfig {
                flip_prob:       a.flip_prob,
                brightness_prob: a.brightness_prob,
                ..AugmentConfig::default()
            },
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            learning_rate:    a.lr,
            weight_decay:     a.weight_decay,
            huber_delta:      a.huber_delta,
            dropout:          a.dropout,
            validation_count: a.validation_count,
            seed:             a.seed,
            num_workers:      a.num_workers,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Camera frame to predict
    #[arg(long)]
    pub image: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Label CSV to summarize
    #[arg(long, default_value = "dataset/labels.csv")]
    pub labels: String,

    /// List every missing image instead of the first few
    #[arg(long)]
    pub all_missing: bool,
}

/// Parse "top,bottom,left,right" pixel margins.
pub fn parse_crop(s: &str) -> Result<CropSpec, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("crop margins must be non-negative integers: {e}"))?;
    match parts.as_slice() {
        &[top, bottom, left, right] => Ok(CropSpec::new(top, bottom, left, right)),
        _ => Err(format!("expected 4 values top,bottom,left,right, got {}", parts.len())),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> TrainConfig {
        let argv = ["pilotnet-trainer", "train"].iter().chain(args).copied();
        match Cli::parse_from(argv).command {
            Commands::Train(a) => a.into(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_crop() {
        assert_eq!(parse_crop("20,8,0,0"), Ok(CropSpec::new(20, 8, 0, 0)));
        assert_eq!(parse_crop(" 1, 2 ,3,4"), Ok(CropSpec::new(1, 2, 3, 4)));
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("1,2,3,-4").is_err());
    }

    #[test]
    fn test_train_defaults() {
        let cfg = train_config(&[]);
        assert_eq!(cfg.max_angle, Some(0.6));
        assert_eq!(cfg.crop, CropSpec::new(20, 8, 0, 0));
        assert_eq!(cfg.resize, ResizeSpec::new(66, 200));
        assert!(cfg.augment);
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn test_zero_max_angle_disables_normalization() {
        let cfg = train_config(&["--max-angle", "0", "--no-augment", "--seed", "7"]);
        assert_eq!(cfg.max_angle, None);
        assert!(!cfg.augment);
        assert_eq!(cfg.seed, Some(7));
    }
}
