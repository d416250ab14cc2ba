// ============================================================
// Layer 4 — Batch Scheduler
// ============================================================
// Turns a SplitPlan into per-epoch lists of index batches and
// fetches the samples for one batch.
//
//   train:      indices reshuffled every epoch, chunked by batch_size
//   validation: indices in ascending order, chunked by batch_size
//
// The final partial batch is always kept.
//
// Fetching runs sequentially by default. With num_workers > 1
// the samples of one batch are produced on a rayon pool; each
// sample gets its own generator derived from (seed, epoch, index),
// so the result does not depend on which worker produced it.
// The output order always equals the input index order.

use std::sync::Arc;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;

use crate::data::error::{DataError, DataResult};
use crate::data::splitter::SplitPlan;
use crate::domain::traits::SampleSource;

const SHUFFLE_STREAM: u64 = 0x5348_5546_464c_4521;

#[derive(Debug, Clone)]
pub struct BatchScheduler {
    batch_size:  usize,
    seed:        Option<u64>,
    num_workers: usize,
    pool:        Option<Arc<rayon::ThreadPool>>,
}

impl BatchScheduler {
    pub fn new(batch_size: usize, seed: Option<u64>, num_workers: usize) -> DataResult<Self> {
        if batch_size == 0 {
            return Err(DataError::InvalidConfig("batch_size must be at least 1".to_string()));
        }
        let pool = if num_workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .thread_name(|i| format!("fetch-{i}"))
                .build()
                .map_err(|e| DataError::InvalidConfig(format!("cannot start fetch workers: {e}")))?;
            Some(Arc::new(pool))
        } else {
            None
        };
        Ok(Self { batch_size, seed, num_workers: num_workers.max(1), pool })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Training batches for `epoch`: a fresh permutation of the training indices.
    pub fn train_batches(&self, plan: &SplitPlan, epoch: usize) -> Vec<Vec<usize>> {
        let mut order = plan.train.clone();
        match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(mix(seed ^ SHUFFLE_STREAM, epoch as u64, 0));
                order.shuffle(&mut rng);
            }
            None => order.shuffle(&mut rand::thread_rng()),
        }
        self.chunk(&order)
    }

    /// Validation batches: fixed ascending order, identical every epoch.
    pub fn validation_batches(&self, plan: &SplitPlan) -> Vec<Vec<usize>> {
        let mut order = plan.validation.clone();
        order.sort_unstable();
        self.chunk(&order)
    }

    /// Produce the samples for one batch, in `indices` order.
    /// The first failing index aborts the whole batch.
    pub fn fetch<S: SampleSource>(
        &self,
        source:  &S,
        indices: &[usize],
        epoch:   usize,
    ) -> Result<Vec<S::Sample>, S::Error> {
        tracing::trace!(
            "epoch {epoch}: fetching {} of {} samples",
            indices.len(),
            source.len()
        );
        match &self.pool {
            Some(pool) => pool.install(|| {
                indices
                    .par_iter()
                    .map(|&index| self.fetch_one(source, index, epoch))
                    .collect()
            }),
            None => indices
                .iter()
                .map(|&index| self.fetch_one(source, index, epoch))
                .collect(),
        }
    }

    fn fetch_one<S: SampleSource>(
        &self,
        source: &S,
        index:  usize,
        epoch:  usize,
    ) -> Result<S::Sample, S::Error> {
        match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(mix(seed, epoch as u64, index as u64));
                source.get_with_rng(index, &mut rng)
            }
            None => source.get_with_rng(index, &mut rand::thread_rng()),
        }
    }

    fn chunk(&self, order: &[usize]) -> Vec<Vec<usize>> {
        order.chunks(self.batch_size).map(|c| c.to_vec()).collect()
    }
}

/// splitmix64 over the three inputs
fn mix(seed: u64, epoch: u64, index: u64) -> u64 {
    let mut z = seed
        .wrapping_add(epoch.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(index.wrapping_mul(0xBF58_476D_1CE4_E5B9));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
