//! Fixed-range normalization of the raw 55-component feature vector.
//!
//! Every component carries a hard-coded divisor or affine map chosen from the
//! physical range of that feature, so two images normalize identically without
//! any dataset statistics. Non-finite inputs are zeroed and the raw magnitude
//! is clamped before mapping; the output always lands in [0, 1].

use crate::features::FEATURE_DIM;

/// Raw magnitude clamp applied before the per-component maps
const RAW_CLAMP: f64 = 1e6;

/// Map the raw features onto `[0, 1]` component by component.
pub fn normalize(raw: &[f64; FEATURE_DIM]) -> [f32; FEATURE_DIM] {
    let mut out = [0.0f32; FEATURE_DIM];
    for (i, &value) in raw.iter().enumerate() {
        let v = if value.is_finite() {
            value.clamp(-RAW_CLAMP, RAW_CLAMP)
        } else {
            0.0
        };
        out[i] = map_component(i, v).clamp(0.0, 1.0) as f32;
    }
    out
}

/// Per-component map, indexed by position in the concatenated layout.
fn map_component(index: usize, v: f64) -> f64 {
    use std::f64::consts::PI;
    match index {
        // Outer: area, perimeter
        0 | 1 => v / 100_000.0,
        // Outer: complexity
        2 => v / 1_000.0,
        // Outer: ratios already near [0, 1]
        3..=9 => v,
        // Cavity: count
        10 => v / 20.0,
        // Cavity: normalized-area statistics
        11..=15 => v,
        // Cavity: count density per outer-area pixel
        16 => v / 0.001,
        // Cavity: largest perimeter
        17 => v / 10_000.0,
        // Cavity: average complexity
        18 => v / 2_000.0,
        // Cavity: centroid spread
        19 => v / 1_000.0,
        // Cavity: area variance, tiny for normalized areas
        20 => v.min(1.0),
        // Cavity: average aspect ratio, average circularity
        21 | 22 => v,
        // Hu invariants, log-compressed into roughly [-10, 10]
        23..=29 => (v + 10.0) / 20.0,
        // Symmetry fractions
        30..=33 => v,
        // Spatial: centroid fractions
        34 | 35 => v,
        // Spatial: orientation in [0, pi)
        36 => (v + PI) / (2.0 * PI),
        // Spatial: axes
        37 | 38 => v / 1_000.0,
        // Spatial: eccentricity
        39 => v,
        // Legacy: cavity count
        40 => v / 50.0,
        // Legacy: raw pixel areas
        41..=43 => v / 50_000.0,
        // Legacy: density
        44 => v,
        // Roughness: compactness
        45 => v / 100.0,
        // Roughness: defect count
        46 => v / 50.0,
        // Roughness: average defect depth, perimeter ratio
        47 | 48 => v,
        // Roughness: cavity uniformity
        49 => v / 10.0,
        // Shape context: mean radius, radius std
        50 | 51 => v / 1_000.0,
        // Shape context: skewness in roughly [-5, 5]
        52 => (v + 5.0) / 10.0,
        // Shape context: entropy, at most ln(8)
        53 => v / 3.0,
        // Shape context: curvature variation
        54 => v / 5.0,
        _ => unreachable!("feature index {index} out of range"),
    }
}
