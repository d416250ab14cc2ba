// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Randomly permutes the sample indices 0..N and splits them
// into two disjoint sets:
//   - Training set:   N - k indices, reshuffled every epoch
//   - Validation set: k indices, visited in ascending order
//
// Only indices are split. The dataset itself is never touched,
// so one SteeringDataset can back both sides (through views
// with different augmentation settings).
//
// Default validation size: max(1000, ceil(0.1 * N)).
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom; with a
// seed the split is reproducible across runs.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::error::{DataError, DataResult};

/// Floor of the derived validation size
pub const MIN_DEFAULT_VALIDATION: usize = 1000;

/// Disjoint train/validation index sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// Training indices, in permutation order
    pub train: Vec<usize>,
    /// Validation indices, ascending
    pub validation: Vec<usize>,
}

/// `max(1000, ceil(0.1 * n))`
pub fn default_validation_count(n: usize) -> usize {
    MIN_DEFAULT_VALIDATION.max(n.div_ceil(10))
}

/// Randomly split `0..n` into `n - k` training and `k` validation indices.
///
/// `validation_count` defaults to [`default_validation_count`]. Both sides
/// must end up non-empty: `k == 0` or `k >= n` is an `InvalidSplit`.
pub fn split_indices(
    n:                usize,
    validation_count: Option<usize>,
    seed:             Option<u64>,
) -> DataResult<SplitPlan> {
    let k = validation_count.unwrap_or_else(|| default_validation_count(n));
    if k == 0 {
        return Err(DataError::InvalidSplit(
            "validation set must hold at least one sample".to_string(),
        ));
    }
    if k >= n {
        return Err(DataError::InvalidSplit(format!(
            "validation count {k} leaves no training samples out of {n}{}",
            if validation_count.is_none() { " (pass an explicit validation count)" } else { "" }
        )));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_entropy(),
    };

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    // split_off(n - k) leaves [0..n-k] in `indices` and returns the tail
    let mut validation = indices.split_off(n - k);
    validation.sort_unstable();

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        indices.len(),
        validation.len(),
        (indices.len() * 100) / n,
        (validation.len() * 100) / n,
    );

    Ok(SplitPlan { train: indices, validation })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_validation_count() {
        assert_eq!(default_validation_count(10), 1000);
        assert_eq!(default_validation_count(10_000), 1000);
        assert_eq!(default_validation_count(10_001), 1001);
        assert_eq!(default_validation_count(25_000), 2500);
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let plan = split_indices(5000, None, Some(42)).unwrap();
        assert_eq!(plan.validation.len(), 1000);
        assert_eq!(plan.train.len(), 4000);

        let train: HashSet<_> = plan.train.iter().copied().collect();
        let val:   HashSet<_> = plan.validation.iter().copied().collect();
        assert!(train.is_disjoint(&val));
        let all: HashSet<_> = train.union(&val).copied().collect();
        assert_eq!(all, (0..5000).collect::<HashSet<_>>());
    }

    #[test]
    fn test_explicit_validation_count() {
        let plan = split_indices(50, Some(7), Some(1)).unwrap();
        assert_eq!(plan.validation.len(), 7);
        assert_eq!(plan.train.len(), 43);
    }

    #[test]
    fn test_validation_indices_are_sorted() {
        let plan = split_indices(200, Some(40), None).unwrap();
        assert!(plan.validation.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_seed_makes_split_reproducible() {
        let a = split_indices(300, Some(30), Some(9)).unwrap();
        let b = split_indices(300, Some(30), Some(9)).unwrap();
        let c = split_indices(300, Some(30), Some(10)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_degenerate_splits_are_rejected() {
        assert!(matches!(split_indices(10, Some(0), None), Err(DataError::InvalidSplit(_))));
        assert!(matches!(split_indices(10, Some(10), None), Err(DataError::InvalidSplit(_))));
        // Derived default of 1000 cannot be met by a tiny dataset
        assert!(split_indices(3, None, None).is_err());
    }
}
