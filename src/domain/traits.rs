// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// SampleSource is the seam between the dataset and the batch
// scheduler. The scheduler only needs "how many samples" and
// "give me sample i using this random generator", so it can be
// driven by the real image-backed dataset or by an in-memory
// fake in tests.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use rand::RngCore;

/// Any indexable, read-only collection of training samples.
///
/// Implementations:
///   - SteeringDataset → loads and transforms camera frames
///
/// `Sync` because the scheduler may fetch disjoint indices of one
/// batch from several worker threads at once.
pub trait SampleSource: Sync {
    /// The item produced for one index
    type Sample: Send;

    /// Error raised when an item cannot be produced
    type Error: std::error::Error + Send + Sync + 'static;

    /// Number of samples available
    fn len(&self) -> usize;

    /// Produce sample `index`, drawing any randomness from `rng`.
    fn get_with_rng(
        &self,
        index: usize,
        rng:   &mut dyn RngCore,
    ) -> Result<Self::Sample, Self::Error>;
}
