// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that describe the steering
// dataset: what a label row is, what a prepared sample is,
// and the crop/resize geometry applied to camera frames.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// One row of the steering record file
pub mod label_record;

/// A prepared (tensor, target) pair
pub mod sample;

/// Crop margins and resize targets
pub mod geometry;

/// Core abstractions (traits) that other layers implement
pub mod traits;
