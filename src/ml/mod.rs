// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model, training and inference
// code. The data layer only touches Burn to stack samples into
// tensors (batcher.rs); everything else lives here.
//
// What's in this layer:
//
//   model.rs      — The SteeringModel trait and PilotNet
//                   • 5 convolutions (24/36/48 stride 2, 64/64)
//                   • Dense head 100 → 50 → 10 → 1
//                   • Flattened width derived from the resize
//
//   trainer.rs    — The training loop
//                   Handles forward pass, Huber loss, backward
//                   pass, AdamW step, validation and saving the
//                   best model by validation loss
//
//   inferencer.rs — The inference engine
//                   Loads the best checkpoint, runs one frame
//                   through the non-augmenting pipeline and the
//                   model, and rescales the output to radians
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Bojarski et al. (2016) End to End Learning for
//            Self-Driving Cars

/// Steering regressor trait and PilotNet architecture
pub mod model;

/// Full training loop with validation and best-model checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and predicts steering
pub mod inferencer;
