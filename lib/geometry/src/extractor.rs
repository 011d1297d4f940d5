//! The end-to-end geometric extraction pipeline.

use crate::contour::{self, Contour};
use crate::features::{self, RawFeatures, FEATURE_DIM};
use crate::normalize;
use crate::polyline;
use crate::raster;
use image::DynamicImage;
use tracing::{debug, warn};

/// Extracts the normalized 55-component geometric descriptor of an image.
///
/// The pipeline is grayscale conversion, adaptive binarization, contour
/// extraction, per-group feature computation and fixed-range normalization.
/// It is fail-soft: an image with no usable outline yields the zero vector
/// rather than an error, so one bad scan never aborts a catalog build.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Compute the normalized descriptor of `image`.
    pub fn extract(&self, image: &DynamicImage) -> [f32; FEATURE_DIM] {
        let gray = raster::to_grayscale(image);
        let binary = raster::binarize(&gray);
        let contours = contour::find_contours(&binary);

        let Some(largest) = largest_outer(&contours) else {
            warn!("No outer contour found, emitting zero descriptor");
            return [0.0; FEATURE_DIM];
        };
        let inner: Vec<&Contour> = contours.iter().filter(|c| !c.is_outer()).collect();

        let outer_area = polyline::area(&largest.points);
        debug!(
            outer_area,
            inner_count = inner.len(),
            "Computing feature groups"
        );

        let raw = RawFeatures {
            outer: features::outer_features(largest),
            cavity: features::cavity_features(&inner, outer_area),
            hu: features::hu_features(largest),
            symmetry: features::symmetry_features(&binary),
            spatial: features::spatial_features(largest, binary.dimensions()),
            legacy: features::legacy_cavity_features(&inner, outer_area),
            roughness: features::roughness_features(largest, &inner),
            shape_context: features::shape_context_features(largest),
        };

        normalize::normalize(&raw.concat())
    }
}

/// The outer contour with the largest enclosed area, if any.
fn largest_outer(contours: &[Contour]) -> Option<&Contour> {
    contours
        .iter()
        .filter(|c| c.is_outer())
        .max_by(|a, b| {
            polyline::area(&a.points)
                .partial_cmp(&polyline::area(&b.points))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
