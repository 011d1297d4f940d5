//! The similarity engine: catalog builds, incremental adds and calibrated
//! search, orchestrating the extractor, embedder, assembler and index.

use crate::assemble::HybridAssembler;
use crate::config::EngineConfig;
use crate::embedder::EmbeddingSource;
use image::DynamicImage;
use parking_lot::RwLock;
use profilex_core::{Error, FlatIndex, Result, ScoreCalibrator, Vector};
use profilex_geometry::FeatureExtractor;
use profilex_storage::{self as storage, CatalogMetadata, ProfileRecord};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One calibrated match returned by a search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityResult {
    pub profile_code: String,
    /// Calibrated similarity percentage in `[0, 100]`
    pub score: f32,
}

struct EngineState {
    index: FlatIndex,
    metadata: CatalogMetadata,
}

/// Thread-safe similarity engine over a profile image catalog.
///
/// The engine is cheap to share behind an `Arc`; searches take a read lock,
/// builds and adds take a write lock. It must be initialized before use.
pub struct SimilarityEngine {
    config: EngineConfig,
    extractor: FeatureExtractor,
    assembler: HybridAssembler,
    calibrator: ScoreCalibrator,
    embedder: Arc<dyn EmbeddingSource>,
    state: RwLock<Option<EngineState>>,
}

impl SimilarityEngine {
    /// Create an engine from a validated config and an embedding source.
    ///
    /// Fails if the embedder width disagrees with the configured dimension.
    pub fn new(config: EngineConfig, embedder: Arc<dyn EmbeddingSource>) -> Result<Self> {
        config.validate()?;
        if embedder.dimension() != config.embedding_dim {
            return Err(Error::Embedding(format!(
                "embedder produces {} values, config expects {}",
                embedder.dimension(),
                config.embedding_dim
            )));
        }

        let assembler = HybridAssembler::new(
            config.embedding_dim,
            config.ai_weight,
            config.geo_weight,
            config.cavity_amplification,
            config.roughness_amplification,
        );
        let calibrator = ScoreCalibrator::new(config.calibration_k, config.calibration_threshold);

        Ok(Self {
            config,
            extractor: FeatureExtractor::new(),
            assembler,
            calibrator,
            embedder,
            state: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of indexed profiles, zero before initialization
    pub fn len(&self) -> usize {
        self.state.read().as_ref().map_or(0, |s| s.index.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the persisted index and catalog, or rebuild from the image
    /// directory when they are missing or `force_rebuild` is set.
    pub fn initialize(&self, force_rebuild: bool) -> Result<()> {
        if !force_rebuild {
            match self.try_load() {
                Ok(state) => {
                    info!(profiles = state.index.len(), "Loaded persisted catalog");
                    *self.state.write() = Some(state);
                    return Ok(());
                }
                Err(e) => {
                    info!("No usable persisted catalog ({e}), rebuilding");
                }
            }
        }
        self.build_from_directory()
    }

    fn try_load(&self) -> Result<EngineState> {
        let index = storage::load_index(&self.config.index_path)?;
        let metadata = CatalogMetadata::load(&self.config.metadata_path)?;
        if index.dimension() != self.assembler.dimension() {
            return Err(Error::InvalidDimension {
                expected: self.assembler.dimension(),
                actual: index.dimension(),
            });
        }
        if index.len() != metadata.len() {
            return Err(Error::Persistence(format!(
                "index holds {} vectors but catalog lists {} profiles",
                index.len(),
                metadata.len()
            )));
        }
        Ok(EngineState { index, metadata })
    }

    /// Rebuild the whole catalog from the configured image directory.
    ///
    /// Images are processed in parallel; unreadable or featureless files are
    /// skipped with a warning. Fails only when not a single image survives.
    pub fn build_from_directory(&self) -> Result<()> {
        let paths = image_paths(&self.config.image_directory)?;
        info!(
            directory = %self.config.image_directory,
            candidates = paths.len(),
            "Building catalog"
        );

        let processed: Vec<(String, Vector, ProfileRecord)> = paths
            .par_iter()
            .filter_map(|path| match self.process_image(path) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = %path.display(), "Skipping image: {e}");
                    None
                }
            })
            .collect();

        if processed.is_empty() {
            return Err(Error::Persistence(format!(
                "no usable profile images in {}",
                self.config.image_directory
            )));
        }

        let mut index = FlatIndex::new(self.assembler.dimension());
        let mut metadata = CatalogMetadata::new();
        let mut vectors = Vec::with_capacity(processed.len());
        let mut codes = Vec::with_capacity(processed.len());
        for (code, vector, record) in processed {
            if metadata.contains(&code) {
                warn!(code = %code, "Duplicate profile code, keeping the first occurrence");
                continue;
            }
            metadata.insert(code.clone(), record);
            vectors.push(vector);
            codes.push(code);
        }
        index.build(vectors, codes)?;

        self.persist(&index, &metadata)?;
        info!(profiles = index.len(), "Catalog build complete");
        *self.state.write() = Some(EngineState { index, metadata });
        Ok(())
    }

    /// Extract the hybrid vector and bookkeeping record of one image file.
    ///
    /// The profile code is the file stem.
    pub fn process_image(&self, path: &Path) -> Result<(String, Vector, ProfileRecord)> {
        let code = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Image(format!("unusable file name: {}", path.display())))?
            .to_string();

        let image = image::open(path).map_err(|e| Error::Image(format!("{}: {e}", path.display())))?;
        let vector = self.vectorize(&image)?;

        let file_size = std::fs::metadata(path)?.len();
        let record = ProfileRecord {
            file_path: path.to_string_lossy().into_owned(),
            file_size,
            image_shape: (image.height(), image.width(), image.color().channel_count()),
        };
        debug!(code = %code, "Profile image processed");
        Ok((code, vector, record))
    }

    /// Compute the hybrid vector of an already-loaded image.
    pub fn vectorize(&self, image: &DynamicImage) -> Result<Vector> {
        let descriptor = self.extractor.extract(image);
        let embedding = self.embedder.extract(image)?;
        self.assembler.assemble(&embedding, &descriptor)
    }

    /// Find the `k` most similar profiles to an indexed profile.
    ///
    /// The query's own slot is excluded from the result. The code lookup is
    /// case-insensitive.
    pub fn find_similar(&self, code: &str, k: usize) -> Result<Vec<SimilarityResult>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(Error::NotInitialized)?;

        let canonical = state
            .metadata
            .resolve_code(code)
            .ok_or_else(|| Error::ProfileNotFound(code.to_string()))?
            .to_string();
        let own_slot = state.index.slot_of(&canonical)?;

        let record = state
            .metadata
            .record(&canonical)
            .ok_or_else(|| Error::ProfileNotFound(canonical.clone()))?;
        // Recompute from the source image rather than trusting the stored
        // vector, so a stale index surfaces as a low self-similarity instead
        // of silently matching
        let image = image::open(&record.file_path)
            .map_err(|e| Error::Image(format!("{}: {e}", record.file_path)))?;
        let query = self.vectorize(&image)?;

        let hits = state.index.search_calibrated(&query, k, &self.calibrator)?;
        let results = hits
            .into_iter()
            .filter(|(slot, _)| *slot != own_slot)
            .take(k)
            .map(|(slot, score)| {
                Ok(SimilarityResult {
                    profile_code: state.index.code_at(slot)?.to_string(),
                    score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            code = %canonical,
            matches = results.len(),
            top = results.first().map(|r| r.score).unwrap_or(0.0),
            "Similarity search complete"
        );
        Ok(results)
    }

    /// Add one profile image to the running catalog and persist.
    ///
    /// Returns `Ok(false)` without changes when the code is already indexed.
    /// `code` overrides the file-stem code when given.
    pub fn add_profile(&self, path: &Path, code: Option<&str>) -> Result<bool> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(Error::NotInitialized)?;

        let (stem_code, vector, record) = self.process_image(path)?;
        let code = code.map_or(stem_code, str::to_string);

        if state.metadata.contains(&code) {
            warn!(code = %code, "Profile already indexed, skipping add");
            return Ok(false);
        }

        state.index.add(vector, code.clone())?;
        state.metadata.insert(code.clone(), record);
        self.persist(&state.index, &state.metadata)?;
        info!(code = %code, profiles = state.index.len(), "Profile added");
        Ok(true)
    }

    fn persist(&self, index: &FlatIndex, metadata: &CatalogMetadata) -> Result<()> {
        storage::save_index(index, &self.config.index_path)?;
        metadata.save(&self.config.metadata_path)?;
        Ok(())
    }
}

/// Sorted list of the PNG files directly inside `directory`.
fn image_paths(directory: &str) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(directory)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::GridEmbedder;
    use image::{GrayImage, Luma};
    use std::fs;

    fn stroke_rect(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for t in 0..3 {
            for x in x0..x1 {
                img.put_pixel(x, y0 + t, Luma([0]));
                img.put_pixel(x, y1 - 1 - t, Luma([0]));
            }
            for y in y0..y1 {
                img.put_pixel(x0 + t, y, Luma([0]));
                img.put_pixel(x1 - 1 - t, y, Luma([0]));
            }
        }
    }

    fn write_profile(dir: &Path, name: &str, holes: &[(u32, u32, u32, u32)]) {
        let mut img = GrayImage::from_pixel(128, 128, Luma([255]));
        stroke_rect(&mut img, 8, 8, 120, 120);
        for &(x0, y0, x1, y1) in holes {
            stroke_rect(&mut img, x0, y0, x1, y1);
        }
        img.save(dir.join(name)).unwrap();
    }

    fn test_engine(dir: &Path) -> SimilarityEngine {
        let config = EngineConfig {
            image_directory: dir.join("profiles").to_string_lossy().into_owned(),
            index_path: dir.join("data/index.bin").to_string_lossy().into_owned(),
            metadata_path: dir.join("data/catalog.json").to_string_lossy().into_owned(),
            embedding_dim: 64,
            ..Default::default()
        };
        SimilarityEngine::new(config, Arc::new(GridEmbedder::for_dimension(64).unwrap())).unwrap()
    }

    fn seed_profiles(dir: &Path) {
        let profiles = dir.join("profiles");
        fs::create_dir_all(&profiles).unwrap();
        // A and B share the cavity layout, C is plain
        write_profile(&profiles, "AP0001.png", &[(30, 30, 60, 60), (70, 70, 100, 100)]);
        write_profile(&profiles, "AP0002.png", &[(32, 32, 62, 62), (72, 72, 102, 102)]);
        write_profile(&profiles, "AP0003.png", &[]);
    }

    #[test]
    fn test_uninitialized_engine_rejects_search() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        assert!(matches!(
            engine.find_similar("AP0001", 5).unwrap_err(),
            Error::NotInitialized
        ));
    }

    #[test]
    fn test_build_indexes_all_profiles() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let engine = test_engine(dir.path());
        engine.initialize(true).unwrap();
        assert_eq!(engine.len(), 3);
        assert!(dir.path().join("data/index.bin").exists());
        assert!(dir.path().join("data/catalog.json").exists());
    }

    #[test]
    fn test_shared_cavity_layout_ranks_first() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let engine = test_engine(dir.path());
        engine.initialize(true).unwrap();

        let results = engine.find_similar("AP0001", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].profile_code, "AP0002");
        assert!(results[0].score > results[1].score);
        assert!(results.iter().all(|r| r.profile_code != "AP0001"));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let engine = test_engine(dir.path());
        engine.initialize(true).unwrap();

        let results = engine.find_similar("ap0001", 1).unwrap();
        assert_eq!(results[0].profile_code, "AP0002");
    }

    #[test]
    fn test_unknown_code_fails() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let engine = test_engine(dir.path());
        engine.initialize(true).unwrap();
        assert!(matches!(
            engine.find_similar("AP9999", 3).unwrap_err(),
            Error::ProfileNotFound(_)
        ));
    }

    #[test]
    fn test_initialize_prefers_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let engine = test_engine(dir.path());
        engine.initialize(false).unwrap();
        assert_eq!(engine.len(), 3);

        // A fresh engine with the same paths loads instead of rebuilding,
        // even after the source directory gains a new image
        write_profile(&dir.path().join("profiles"), "AP0004.png", &[]);
        let reloaded = test_engine(dir.path());
        reloaded.initialize(false).unwrap();
        assert_eq!(reloaded.len(), 3);

        reloaded.initialize(true).unwrap();
        assert_eq!(reloaded.len(), 4);
    }

    #[test]
    fn test_add_profile_and_duplicate_noop() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());

        let engine = test_engine(dir.path());
        engine.initialize(true).unwrap();

        let extra = dir.path().join("extra.png");
        write_profile(dir.path(), "extra.png", &[(40, 40, 90, 90)]);

        assert!(engine.add_profile(&extra, Some("AP0100")).unwrap());
        assert_eq!(engine.len(), 4);
        assert!(!engine.add_profile(&extra, Some("AP0100")).unwrap());
        assert_eq!(engine.len(), 4);

        let results = engine.find_similar("AP0100", 1).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_build_skips_unreadable_images() {
        let dir = tempfile::tempdir().unwrap();
        seed_profiles(dir.path());
        fs::write(dir.path().join("profiles/broken.png"), b"not a png").unwrap();

        let engine = test_engine(dir.path());
        engine.initialize(true).unwrap();
        assert_eq!(engine.len(), 3);
    }

    #[test]
    fn test_build_with_no_images_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("profiles")).unwrap();

        let engine = test_engine(dir.path());
        assert!(engine.initialize(true).is_err());
    }
}
