// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`   — trains the steering model on a label CSV
//   2. `predict` — loads the best checkpoint and predicts one frame
//   3. `inspect` — summarizes a label CSV without training
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, PredictArgs, TrainArgs};

/// Missing images listed by `inspect` unless --all-missing is given
const MISSING_PREVIEW: usize = 10;

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "pilotnet-trainer",
    version,
    about = "Train a steering-angle CNN on camera frames, then predict with the best checkpoint."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

/// Handles the `train` subcommand.
/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on labels in: {}", args.labels);

    // Convert CLI args → application config (separates presentation from domain)
    let use_case = TrainUseCase::new(args.into());
    let report   = use_case.execute()?;

    match report.best {
        Some(best) => println!(
            "Training complete after {} epochs. Best val {:.5} at epoch {:02}, saved to '{}'.",
            report.history.len(),
            best.val_loss,
            best.epoch,
            use_case.config().checkpoint_dir
        ),
        None => println!(
            "Training complete after {} epochs. No epoch produced a finite validation loss.",
            report.history.len()
        ),
    }
    Ok(())
}

/// Handles the `predict` subcommand.
fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case   = PredictUseCase::new(&args.checkpoint_dir)?;
    let prediction = use_case.predict(&args.image)?;
    println!(
        "{}: steering {:+.4} rad (network output {:+.4})",
        args.image, prediction.radians, prediction.normalized
    );
    Ok(())
}

/// Handles the `inspect` subcommand.
fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let summary = InspectUseCase::new(&args.labels).execute()?;
    println!("{}", args.labels);
    println!("  rows           {}", summary.rows);
    if summary.rows > 0 {
        println!(
            "  steer_rad      min {:+.4}  max {:+.4}  mean {:+.4}",
            summary.min_angle, summary.max_angle, summary.mean_angle
        );
        println!("  zero angle     {}", summary.zero_angle);
    }
    println!("  missing images {}", summary.missing_images.len());

    let shown = if args.all_missing { usize::MAX } else { MISSING_PREVIEW };
    for path in summary.missing_images.iter().take(shown) {
        println!("    {path}");
    }
    if summary.missing_images.len() > shown {
        println!("    … {} more", summary.missing_images.len() - shown);
    }
    Ok(())
}
