// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in any specific
// business layer:
//
//   checkpoint.rs — Saving and loading the best model
//                   Uses Burn's CompactRecorder to serialise
//                   model parameters to disk, renaming the
//                   finished file over the previous best.
//                   Also saves/loads TrainConfig as JSON so
//                   inference can rebuild the model.
//
//   metrics.rs    — Training metrics logging
//                   Appends epoch-level losses to a CSV file
//                   for later analysis and plotting.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Best-model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
