// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the simulator's record
// file all the way to tensor batches.
//
// The pipeline flows in this order:
//
//   labels.csv + images/
//       │
//       ▼
//   LabelStore         → parses rows into LabelRecords
//       │
//       ▼
//   TransformPipeline  → crop, augment, resize, YUV, center
//       │
//       ▼
//   SteeringDataset    → indexable (tensor, target) samples
//       │
//       ▼
//   split_indices      → disjoint train / validation indices
//       │
//       ▼
//   BatchScheduler     → per-epoch index batches, sample fetch
//       │
//       ▼
//   SteeringBatcher    → stacks samples into tensor batches
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Error type shared by the whole data layer
pub mod error;

/// Parses the steering record file
pub mod label_store;

/// Crop / augmentation / colorspace / normalization transform
pub mod transform;

/// Indexable collection of prepared samples
pub mod dataset;

/// Random train/validation index split
pub mod splitter;

/// Per-epoch batch order and sample fetching
pub mod scheduler;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
