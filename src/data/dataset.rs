// ============================================================
// Layer 4 — Steering Dataset (Sample Provider)
// ============================================================
// Combines the LabelStore with the TransformPipeline into an
// indexable collection of SteeringSamples.
//
//   fetch(i, rng) = pipeline.process(root / records[i].image_path,
//                                    records[i].steer_angle_raw,
//                                    augment, rng)
//
// Nothing is cached: every call re-reads the frame and, when
// augmenting, draws fresh randomness from the caller's generator.
// The label store is shared behind an Arc so a training view and
// a non-augmenting validation view can coexist cheaply.

use std::sync::Arc;

use rand::RngCore;

use crate::data::error::{DataError, DataResult};
use crate::data::label_store::LabelStore;
use crate::data::transform::TransformPipeline;
use crate::domain::sample::SteeringSample;
use crate::domain::traits::SampleSource;

#[derive(Debug, Clone)]
pub struct SteeringDataset {
    store:    Arc<LabelStore>,
    pipeline: TransformPipeline,
    augment:  bool,
}

impl SteeringDataset {
    pub fn new(store: LabelStore, pipeline: TransformPipeline, augment: bool) -> Self {
        Self {
            store: Arc::new(store),
            pipeline,
            augment,
        }
    }

    /// Same records and pipeline, different augmentation switch.
    pub fn with_augment(&self, augment: bool) -> Self {
        Self {
            store:    Arc::clone(&self.store),
            pipeline: self.pipeline,
            augment,
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Retrieve sample `index` drawing augmentation from `rng`.
    pub fn fetch(&self, index: usize, rng: &mut dyn RngCore) -> DataResult<SteeringSample> {
        let record = self.store.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.store.len(),
        })?;
        let path = self.store.resolve(record);
        tracing::trace!("fetch #{index}: {}", path.display());
        self.pipeline
            .process(&path, record.steer_angle_raw, self.augment, rng)
    }
}

impl SampleSource for SteeringDataset {
    type Sample = SteeringSample;
    type Error  = DataError;

    fn len(&self) -> usize {
        self.store.len()
    }

    fn get_with_rng(&self, index: usize, rng: &mut dyn RngCore) -> DataResult<SteeringSample> {
        self.fetch(index, rng)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transform::AugmentConfig;
    use crate::domain::geometry::{CropSpec, ResizeSpec};
    use image::{Rgb, RgbImage};
    use rand::{rngs::StdRng, SeedableRng};
    use std::fs;
    use std::path::Path;

    /// Sample `index` with a fixed generator
    fn get(ds: &SteeringDataset, index: usize) -> DataResult<SteeringSample> {
        ds.fetch(index, &mut StdRng::seed_from_u64(0))
    }

    /// Record file plus three frames of different sizes under images/
    fn write_dataset(dir: &Path) -> std::path::PathBuf {
        let images = dir.join("images");
        fs::create_dir_all(&images).unwrap();
        RgbImage::from_fn(320, 160, |x, _| Rgb([(x % 256) as u8, 40, 90]))
            .save(images.join("a.png"))
            .unwrap();
        RgbImage::from_pixel(64, 48, Rgb([200, 10, 10]))
            .save(images.join("b.png"))
            .unwrap();
        RgbImage::from_fn(100, 100, |x, y| Rgb([x as u8, y as u8, 0]))
            .save(images.join("c.png"))
            .unwrap();

        let csv = dir.join("labels.csv");
        fs::write(
            &csv,
            "image,steer_rad,steer_norm\n\
             images/a.png,0.3,0.5\n\
             images/b.png,-0.1,-0.166667\n\
             images/c.png,0.0,0.0\n",
        )
        .unwrap();
        csv
    }

    fn dataset(csv: &Path, augment: bool) -> SteeringDataset {
        let pipeline = TransformPipeline::new(
            CropSpec::default(),
            ResizeSpec::new(66, 200),
            Some(0.6),
            AugmentConfig::default(),
        )
        .unwrap();
        SteeringDataset::new(LabelStore::load(csv).unwrap(), pipeline, augment)
    }

    #[test]
    fn test_three_row_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        let ds  = dataset(&write_dataset(tmp.path()), false);

        assert_eq!(ds.len(), 3);
        let s0 = get(&ds, 0).unwrap();
        let s1 = get(&ds, 1).unwrap();
        let s2 = get(&ds, 2).unwrap();
        assert!((s0.target - 0.5).abs() < 1e-6);
        assert!((s1.target + 0.1 / 0.6).abs() < 1e-6);
        assert_eq!(s2.target, 0.0);
        for s in [&s0, &s1, &s2] {
            assert_eq!(s.shape(), [3, 66, 200]);
        }
    }

    #[test]
    fn test_length_matches_data_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = tmp.path().join("labels.csv");
        let mut body = String::from("image,steer_rad\n");
        for i in 0..17 {
            body.push_str(&format!("images/img_{i:06}.png,0.0\n"));
        }
        fs::write(&csv, body).unwrap();

        assert_eq!(dataset(&csv, true).len(), 17);
    }

    #[test]
    fn test_retrieval_without_augmentation_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let ds  = dataset(&write_dataset(tmp.path()), false);
        for i in 0..ds.len() {
            let a = ds.fetch(i, &mut StdRng::seed_from_u64(1)).unwrap();
            let b = ds.fetch(i, &mut StdRng::seed_from_u64(2)).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_seeded_augmentation_is_reproducible() {
        let tmp = tempfile::tempdir().unwrap();
        let ds  = dataset(&write_dataset(tmp.path()), true);

        let a = ds.fetch(0, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = ds.fetch(0, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_view_shares_records_without_augmenting() {
        let tmp   = tempfile::tempdir().unwrap();
        let train = dataset(&write_dataset(tmp.path()), true);
        let val   = train.with_augment(false);

        assert!(train.augment);
        assert!(!val.augment);
        assert_eq!(val.len(), train.len());
        assert!(Arc::ptr_eq(&train.store, &val.store));
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ds  = dataset(&write_dataset(tmp.path()), false);
        let err = get(&ds, 3).unwrap_err();
        assert!(matches!(err, DataError::IndexOutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn test_missing_frame_surfaces_image_error() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = write_dataset(tmp.path());
        fs::remove_file(tmp.path().join("images/b.png")).unwrap();

        let ds = dataset(&csv, false);
        assert!(get(&ds, 0).is_ok());
        assert!(matches!(get(&ds, 1), Err(DataError::ImageLoad { .. })));
    }
}
