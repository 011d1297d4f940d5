//! End-to-end tests over synthetic profile drawings: build a catalog from a
//! directory of generated PNGs, search it, grow it, and reload it from disk.

use image::{GrayImage, Luma};
use profilex::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Draw a rectangle outline stroke, dark on light.
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

/// Write a synthetic profile drawing: an outer frame plus hole outlines.
fn write_profile(dir: &Path, name: &str, holes: &[(u32, u32, u32, u32)]) {
    let mut img = GrayImage::from_pixel(160, 160, Luma([255]));
    stroke_rect(&mut img, 10, 10, 150, 150);
    for &(x0, y0, x1, y1) in holes {
        stroke_rect(&mut img, x0, y0, x1, y1);
    }
    img.save(dir.join(name)).unwrap();
}

fn engine_for(dir: &Path) -> SimilarityEngine {
    let config = EngineConfig {
        image_directory: dir.join("profiles").to_string_lossy().into_owned(),
        index_path: dir.join("data/index.bin").to_string_lossy().into_owned(),
        metadata_path: dir.join("data/catalog.json").to_string_lossy().into_owned(),
        embedding_dim: 256,
        ..Default::default()
    };
    let embedder = Arc::new(GridEmbedder::for_dimension(256).unwrap());
    SimilarityEngine::new(config, embedder).unwrap()
}

fn seed_catalog(dir: &Path) {
    let profiles = dir.join("profiles");
    std::fs::create_dir_all(&profiles).unwrap();
    // A and B share the two-hole layout with a small shift, C has no holes
    write_profile(&profiles, "AP0001.png", &[(40, 40, 75, 75), (90, 90, 130, 130)]);
    write_profile(&profiles, "AP0002.png", &[(42, 42, 77, 77), (92, 92, 132, 132)]);
    write_profile(&profiles, "AP0003.png", &[]);
}

#[test]
fn test_build_search_rank() {
    let dir = tempfile::tempdir().unwrap();
    seed_catalog(dir.path());

    let engine = engine_for(dir.path());
    engine.initialize(true).unwrap();
    assert_eq!(engine.len(), 3);

    // Shared cavity layout must outrank the plain profile
    let results = engine.find_similar("AP0001", 2).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].profile_code, "AP0002");
    assert_eq!(results[1].profile_code, "AP0003");
    assert!(results[0].score > results[1].score);

    // Scores are calibrated percentages
    for r in &results {
        assert!((0.0..=100.0).contains(&r.score));
    }
}

#[test]
fn test_persisted_catalog_reloads() {
    let dir = tempfile::tempdir().unwrap();
    seed_catalog(dir.path());

    let engine = engine_for(dir.path());
    engine.initialize(true).unwrap();
    let first = engine.find_similar("AP0002", 2).unwrap();

    // A second engine over the same paths loads the snapshot and answers
    // identically
    let reloaded = engine_for(dir.path());
    reloaded.initialize(false).unwrap();
    assert_eq!(reloaded.len(), 3);
    let second = reloaded.find_similar("AP0002", 2).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_add_profile_grows_catalog() {
    let dir = tempfile::tempdir().unwrap();
    seed_catalog(dir.path());

    let engine = engine_for(dir.path());
    engine.initialize(true).unwrap();

    let extra = dir.path().join("AP0004.png");
    write_profile(dir.path(), "AP0004.png", &[(50, 50, 110, 110)]);
    assert!(engine.add_profile(&extra, None).unwrap());
    assert_eq!(engine.len(), 4);

    // The new profile is immediately searchable
    let results = engine.find_similar("AP0004", 3).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.profile_code != "AP0004"));

    // And the grown catalog was persisted
    let reloaded = engine_for(dir.path());
    reloaded.initialize(false).unwrap();
    assert_eq!(reloaded.len(), 4);
}

#[test]
fn test_descriptor_is_scale_invariant_on_cavity_block() {
    // The same two-hole layout drawn at 2x scale keeps its normalized
    // cavity-area ratios
    let small = {
        let mut img = GrayImage::from_pixel(160, 160, Luma([255]));
        stroke_rect(&mut img, 10, 10, 150, 150);
        stroke_rect(&mut img, 40, 40, 80, 80);
        image::DynamicImage::ImageLuma8(img)
    };
    let large = {
        let mut img = GrayImage::from_pixel(320, 320, Luma([255]));
        stroke_rect(&mut img, 20, 20, 300, 300);
        stroke_rect(&mut img, 80, 80, 160, 160);
        image::DynamicImage::ImageLuma8(img)
    };

    let extractor = FeatureExtractor::new();
    let a = extractor.extract(&small);
    let b = extractor.extract(&large);

    // Total cavity area ratio (index 11) and largest cavity (index 12); the
    // stroke width does not scale with the drawing, hence the loose tolerance
    assert!((a[11] - b[11]).abs() < 0.08, "{} vs {}", a[11], b[11]);
    assert!((a[12] - b[12]).abs() < 0.08, "{} vs {}", a[12], b[12]);
}

#[test]
fn test_unknown_profile_code_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    seed_catalog(dir.path());

    let engine = engine_for(dir.path());
    engine.initialize(true).unwrap();

    assert!(engine.find_similar("NOPE", 2).is_err());
    // Case-insensitive lookup still resolves
    assert!(engine.find_similar("ap0003", 2).is_ok());
}
