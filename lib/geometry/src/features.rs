//! The eight fixed-width feature groups.
//!
//! Every group is a named struct with a `to_array` of its declared width, so
//! the 55-component layout is enforced by the type system rather than by
//! runtime padding. Group computations degrade to an all-zero struct on
//! empty or degenerate input; one degenerate group never affects another.

use crate::contour::Contour;
use crate::polyline::{self, Moments, Point};
use image::GrayImage;

/// Total width of the raw feature vector
pub const FEATURE_DIM: usize = 55;

/// Cavities below this fraction of the outer area are treated as noise
pub const CAVITY_NOISE_RATIO: f64 = 0.001;
/// Douglas-Peucker epsilon as a fraction of the outer perimeter
pub const APPROX_EPSILON_RATIO: f64 = 0.01;
/// Maximum number of boundary samples for shape-context statistics
pub const SHAPE_CONTEXT_SAMPLES: usize = 100;
/// Angular sectors for the boundary isotropy entropy
pub const ANGULAR_BINS: usize = 8;

/// Outer-contour shape features (10)
#[derive(Debug, Clone, Copy, Default)]
pub struct OuterFeatures {
    pub area: f64,
    pub perimeter: f64,
    pub complexity: f64,
    pub aspect_ratio: f64,
    pub convex_ratio: f64,
    pub vertex_count: f64,
    pub solidity: f64,
    pub extent: f64,
    pub circularity: f64,
    pub orientation: f64,
}

impl OuterFeatures {
    pub fn to_array(self) -> [f64; 10] {
        [
            self.area,
            self.perimeter,
            self.complexity,
            self.aspect_ratio,
            self.convex_ratio,
            self.vertex_count,
            self.solidity,
            self.extent,
            self.circularity,
            self.orientation,
        ]
    }
}

/// Inner-contour/cavity statistics (13), with cavity areas normalized by the
/// outer area so they stay comparable across differently scaled drawings
#[derive(Debug, Clone, Copy, Default)]
pub struct CavityFeatures {
    pub count: f64,
    pub total_area: f64,
    pub largest_area: f64,
    pub smallest_area: f64,
    pub average_area: f64,
    pub area_ratio: f64,
    pub count_density: f64,
    pub largest_perimeter: f64,
    pub average_complexity: f64,
    pub centroid_spread: f64,
    pub area_variance: f64,
    pub average_aspect_ratio: f64,
    pub average_circularity: f64,
}

impl CavityFeatures {
    pub fn to_array(self) -> [f64; 13] {
        [
            self.count,
            self.total_area,
            self.largest_area,
            self.smallest_area,
            self.average_area,
            self.area_ratio,
            self.count_density,
            self.largest_perimeter,
            self.average_complexity,
            self.centroid_spread,
            self.area_variance,
            self.average_aspect_ratio,
            self.average_circularity,
        ]
    }
}

/// Log-compressed Hu moment invariants (7)
#[derive(Debug, Clone, Copy, Default)]
pub struct HuFeatures {
    pub values: [f64; 7],
}

impl HuFeatures {
    pub fn to_array(self) -> [f64; 7] {
        self.values
    }
}

/// Mirror/transpose symmetry fractions (4)
#[derive(Debug, Clone, Copy, Default)]
pub struct SymmetryFeatures {
    pub horizontal: f64,
    pub vertical: f64,
    pub diagonal: f64,
    pub radial: f64,
}

impl SymmetryFeatures {
    pub fn to_array(self) -> [f64; 4] {
        [self.horizontal, self.vertical, self.diagonal, self.radial]
    }
}

/// Centroid and best-fit-ellipse measures (6)
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialFeatures {
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub orientation: f64,
    pub major_axis: f64,
    pub minor_axis: f64,
    pub eccentricity: f64,
}

impl SpatialFeatures {
    pub fn to_array(self) -> [f64; 6] {
        [
            self.centroid_x,
            self.centroid_y,
            self.orientation,
            self.major_axis,
            self.minor_axis,
            self.eccentricity,
        ]
    }
}

/// Legacy cavity aggregate over raw pixel areas (5), kept as a second,
/// differently scaled cavity signal
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCavityFeatures {
    pub count: f64,
    pub total_area: f64,
    pub largest_area: f64,
    pub average_area: f64,
    pub density: f64,
}

impl LegacyCavityFeatures {
    pub fn to_array(self) -> [f64; 5] {
        [
            self.count,
            self.total_area,
            self.largest_area,
            self.average_area,
            self.density,
        ]
    }
}

/// Contour roughness and convexity-defect measures (5)
#[derive(Debug, Clone, Copy, Default)]
pub struct RoughnessFeatures {
    pub compactness: f64,
    pub defect_count: f64,
    pub average_defect_depth: f64,
    pub roughness: f64,
    pub cavity_uniformity: f64,
}

impl RoughnessFeatures {
    pub fn to_array(self) -> [f64; 5] {
        [
            self.compactness,
            self.defect_count,
            self.average_defect_depth,
            self.roughness,
            self.cavity_uniformity,
        ]
    }
}

/// Radial shape-context statistics from sampled boundary points (5)
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeContextFeatures {
    pub mean_radius: f64,
    pub radius_std: f64,
    pub radius_skewness: f64,
    pub angular_entropy: f64,
    pub curvature_variation: f64,
}

impl ShapeContextFeatures {
    pub fn to_array(self) -> [f64; 5] {
        [
            self.mean_radius,
            self.radius_std,
            self.radius_skewness,
            self.angular_entropy,
            self.curvature_variation,
        ]
    }
}

/// All eight groups in their fixed order
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFeatures {
    pub outer: OuterFeatures,
    pub cavity: CavityFeatures,
    pub hu: HuFeatures,
    pub symmetry: SymmetryFeatures,
    pub spatial: SpatialFeatures,
    pub legacy: LegacyCavityFeatures,
    pub roughness: RoughnessFeatures,
    pub shape_context: ShapeContextFeatures,
}

impl RawFeatures {
    /// Concatenate the groups into the fixed 55-component layout
    pub fn concat(&self) -> [f64; FEATURE_DIM] {
        let mut out = [0.0; FEATURE_DIM];
        let mut offset = 0;
        for v in self.outer.to_array() {
            out[offset] = v;
            offset += 1;
        }
        for v in self.cavity.to_array() {
            out[offset] = v;
            offset += 1;
        }
        for v in self.hu.to_array() {
            out[offset] = v;
            offset += 1;
        }
        for v in self.symmetry.to_array() {
            out[offset] = v;
            offset += 1;
        }
        for v in self.spatial.to_array() {
            out[offset] = v;
            offset += 1;
        }
        for v in self.legacy.to_array() {
            out[offset] = v;
            offset += 1;
        }
        for v in self.roughness.to_array() {
            out[offset] = v;
            offset += 1;
        }
        for v in self.shape_context.to_array() {
            out[offset] = v;
            offset += 1;
        }
        out
    }
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Cavities surviving the noise filter, as references with cached raw areas
fn significant_cavities<'a>(inner: &[&'a Contour], outer_area: f64) -> Vec<(&'a Contour, f64)> {
    let threshold = outer_area * CAVITY_NOISE_RATIO;
    inner
        .iter()
        .map(|c| (*c, polyline::area(&c.points)))
        .filter(|(_, a)| *a > threshold)
        .collect()
}

pub fn outer_features(largest: &Contour) -> OuterFeatures {
    let area = polyline::area(&largest.points);
    let perimeter = polyline::arc_length(&largest.points);
    if area <= 0.0 || perimeter <= 0.0 {
        return OuterFeatures::default();
    }

    let (_, _, bw, bh) = polyline::bounding_rect(&largest.points);
    let aspect_ratio = if bh > 0 { f64::from(bw) / f64::from(bh) } else { 0.0 };

    let hull = polyline::convex_hull(&largest.points);
    let hull_area = polyline::area(&hull);

    let rect_area = f64::from(bw) * f64::from(bh);
    let approx = polyline::approx_polygon(&largest.points, APPROX_EPSILON_RATIO * perimeter);

    let orientation = if largest.points.len() >= 5 {
        polyline::fit_ellipse(&Moments::of_polygon(&largest.points))
            .map(|(_, _, o)| o)
            .unwrap_or(0.0)
    } else {
        0.0
    };

    OuterFeatures {
        area,
        perimeter,
        complexity: perimeter * perimeter / area,
        aspect_ratio,
        convex_ratio: hull_area / area,
        vertex_count: approx.len() as f64,
        solidity: if hull_area > 0.0 { area / hull_area } else { 0.0 },
        extent: if rect_area > 0.0 { area / rect_area } else { 0.0 },
        circularity: 4.0 * std::f64::consts::PI * area / (perimeter * perimeter),
        orientation,
    }
}

pub fn cavity_features(inner: &[&Contour], outer_area: f64) -> CavityFeatures {
    if inner.is_empty() || outer_area <= 0.0 {
        return CavityFeatures::default();
    }
    let cavities = significant_cavities(inner, outer_area);
    if cavities.is_empty() {
        return CavityFeatures::default();
    }

    let count = cavities.len() as f64;
    let raw_areas: Vec<f64> = cavities.iter().map(|(_, a)| *a).collect();
    let perimeters: Vec<f64> = cavities
        .iter()
        .map(|(c, _)| polyline::arc_length(&c.points))
        .collect();
    let normalized_areas: Vec<f64> = raw_areas.iter().map(|a| a / outer_area).collect();

    let total = normalized_areas.iter().sum::<f64>();
    let largest = normalized_areas.iter().cloned().fold(f64::MIN, f64::max);
    let smallest = normalized_areas.iter().cloned().fold(f64::MAX, f64::min);

    let complexities: Vec<f64> = raw_areas
        .iter()
        .zip(&perimeters)
        .filter(|(a, p)| **a > 0.0 && **p > 0.0)
        .map(|(a, p)| p * p / a)
        .collect();

    let centroids: Vec<(f64, f64)> = cavities
        .iter()
        .filter_map(|(c, _)| Moments::of_polygon(&c.points).centroid())
        .collect();
    let centroid_spread = if centroids.len() > 1 {
        // Population std over all coordinates of all centroids
        let coords: Vec<f64> = centroids.iter().flat_map(|&(x, y)| [x, y]).collect();
        population_std(&coords)
    } else {
        0.0
    };

    let area_variance = if normalized_areas.len() > 1 {
        let m = mean(&normalized_areas);
        normalized_areas.iter().map(|a| (a - m).powi(2)).sum::<f64>() / normalized_areas.len() as f64
    } else {
        0.0
    };

    let aspect_ratios: Vec<f64> = cavities
        .iter()
        .map(|(c, _)| {
            let (_, _, bw, bh) = polyline::bounding_rect(&c.points);
            if bh > 0 {
                f64::from(bw) / f64::from(bh)
            } else {
                0.0
            }
        })
        .filter(|r| *r > 0.0)
        .collect();

    let circularities: Vec<f64> = raw_areas
        .iter()
        .zip(&perimeters)
        .filter(|(_, p)| **p > 0.0)
        .map(|(a, p)| 4.0 * std::f64::consts::PI * a / (p * p))
        .collect();

    CavityFeatures {
        count,
        total_area: total,
        largest_area: largest,
        smallest_area: smallest,
        average_area: total / count,
        area_ratio: total,
        count_density: count / outer_area,
        largest_perimeter: perimeters.iter().cloned().fold(0.0, f64::max),
        average_complexity: mean(&complexities),
        centroid_spread,
        area_variance,
        average_aspect_ratio: mean(&aspect_ratios),
        average_circularity: mean(&circularities),
    }
}

pub fn hu_features(largest: &Contour) -> HuFeatures {
    let hu = Moments::of_polygon(&largest.points).hu();
    let mut values = [0.0; 7];
    for (out, &m) in values.iter_mut().zip(hu.iter()) {
        // Log-magnitude transform with sign preserved, compressing the
        // enormous dynamic range of the higher invariants
        *out = -m.signum() * (m.abs() + 1e-10).log10();
    }
    HuFeatures { values }
}

pub fn symmetry_features(binary: &GrayImage) -> SymmetryFeatures {
    let (w, h) = binary.dimensions();
    if w == 0 || h == 0 {
        return SymmetryFeatures::default();
    }

    // Horizontal mirror: top half vs flipped bottom half, truncated to the
    // common height
    let half_h = h / 2;
    let mut h_matches = 0u64;
    for y in 0..half_h {
        for x in 0..w {
            if binary.get_pixel(x, y)[0] == binary.get_pixel(x, h - 1 - y)[0] {
                h_matches += 1;
            }
        }
    }
    let horizontal = if half_h * w > 0 {
        h_matches as f64 / f64::from(half_h * w)
    } else {
        0.0
    };

    let half_w = w / 2;
    let mut v_matches = 0u64;
    for y in 0..h {
        for x in 0..half_w {
            if binary.get_pixel(x, y)[0] == binary.get_pixel(w - 1 - x, y)[0] {
                v_matches += 1;
            }
        }
    }
    let vertical = if h * half_w > 0 {
        v_matches as f64 / f64::from(h * half_w)
    } else {
        0.0
    };

    // Transpose match over the top-left square block
    let side = w.min(h);
    let mut d_matches = 0u64;
    for y in 0..side {
        for x in 0..side {
            if binary.get_pixel(x, y)[0] == binary.get_pixel(y, x)[0] {
                d_matches += 1;
            }
        }
    }
    let diagonal = if side > 0 {
        d_matches as f64 / f64::from(side * side)
    } else {
        0.0
    };

    let radial = f64::from(binary.get_pixel(w / 2, h / 2)[0]) / 255.0;

    SymmetryFeatures {
        horizontal,
        vertical,
        diagonal,
        radial,
    }
}

pub fn spatial_features(largest: &Contour, dimensions: (u32, u32)) -> SpatialFeatures {
    let (w, h) = dimensions;
    if w == 0 || h == 0 {
        return SpatialFeatures::default();
    }
    let moments = Moments::of_polygon(&largest.points);
    let Some((cx, cy)) = moments.centroid() else {
        return SpatialFeatures::default();
    };

    let (orientation, major, minor, eccentricity) = if largest.points.len() >= 5 {
        match polyline::fit_ellipse(&moments) {
            Some((major, minor, orientation)) => {
                let ecc = if major > 0.0 {
                    (1.0 - (minor / major).powi(2)).max(0.0).sqrt()
                } else {
                    0.0
                };
                (orientation, major, minor, ecc)
            }
            None => (0.0, 0.0, 0.0, 0.0),
        }
    } else {
        (0.0, 0.0, 0.0, 0.0)
    };

    SpatialFeatures {
        centroid_x: cx / f64::from(w),
        centroid_y: cy / f64::from(h),
        orientation,
        major_axis: major,
        minor_axis: minor,
        eccentricity,
    }
}

pub fn legacy_cavity_features(inner: &[&Contour], outer_area: f64) -> LegacyCavityFeatures {
    if inner.is_empty() || outer_area <= 0.0 {
        return LegacyCavityFeatures::default();
    }
    let cavities = significant_cavities(inner, outer_area);
    if cavities.is_empty() {
        return LegacyCavityFeatures::default();
    }

    let raw_areas: Vec<f64> = cavities.iter().map(|(_, a)| *a).collect();
    let count = raw_areas.len() as f64;
    let total = raw_areas.iter().sum::<f64>();

    LegacyCavityFeatures {
        count,
        total_area: total,
        largest_area: raw_areas.iter().cloned().fold(0.0, f64::max),
        average_area: total / count,
        density: total / outer_area,
    }
}

pub fn roughness_features(largest: &Contour, inner: &[&Contour]) -> RoughnessFeatures {
    let area = polyline::area(&largest.points);
    let perimeter = polyline::arc_length(&largest.points);

    let compactness = if area > 0.0 {
        perimeter * perimeter / area
    } else {
        0.0
    };

    let depths = polyline::convexity_defect_depths(&largest.points);
    let defect_count = depths.len() as f64;
    let average_defect_depth = mean(&depths);

    let hull = polyline::convex_hull(&largest.points);
    let hull_perimeter = polyline::arc_length(&hull);
    let roughness = if hull_perimeter > 0.0 {
        perimeter / hull_perimeter
    } else {
        1.0
    };

    // Coefficient of variation of pairwise cavity-centroid distances; lower
    // means a more regular cavity layout
    let centroids: Vec<(f64, f64)> = inner
        .iter()
        .filter_map(|c| Moments::of_polygon(&c.points).centroid())
        .collect();
    let cavity_uniformity = if centroids.len() > 1 {
        let mut distances = Vec::new();
        for i in 0..centroids.len() {
            for j in (i + 1)..centroids.len() {
                let dx = centroids[i].0 - centroids[j].0;
                let dy = centroids[i].1 - centroids[j].1;
                distances.push(dx.hypot(dy));
            }
        }
        let m = mean(&distances);
        if m > 0.0 {
            population_std(&distances) / m
        } else {
            0.0
        }
    } else {
        0.0
    };

    RoughnessFeatures {
        compactness,
        defect_count,
        average_defect_depth,
        roughness,
        cavity_uniformity,
    }
}

/// Evenly sample up to `SHAPE_CONTEXT_SAMPLES` boundary points
fn sample_boundary(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n <= SHAPE_CONTEXT_SAMPLES {
        return points.to_vec();
    }
    (0..SHAPE_CONTEXT_SAMPLES)
        .map(|i| points[i * (n - 1) / (SHAPE_CONTEXT_SAMPLES - 1)])
        .collect()
}

pub fn shape_context_features(largest: &Contour) -> ShapeContextFeatures {
    let samples = sample_boundary(&largest.points);
    let moments = Moments::of_polygon(&largest.points);

    let mut out = ShapeContextFeatures::default();

    if let Some((cx, cy)) = moments.centroid() {
        let radii: Vec<f64> = samples
            .iter()
            .map(|&(x, y)| (f64::from(x) - cx).hypot(f64::from(y) - cy))
            .collect();
        let mean_radius = mean(&radii);
        let radius_std = population_std(&radii);
        out.mean_radius = mean_radius;
        out.radius_std = radius_std;
        out.radius_skewness = if radius_std > 0.0 {
            radii
                .iter()
                .map(|r| ((r - mean_radius) / radius_std).powi(3))
                .sum::<f64>()
                / radii.len() as f64
        } else {
            0.0
        };

        // Angular-bin entropy over eight sectors as an isotropy measure
        let mut bins = [0.0f64; ANGULAR_BINS];
        for &(x, y) in &samples {
            let angle = (f64::from(y) - cy).atan2(f64::from(x) - cx);
            let fraction = (angle + std::f64::consts::PI) / (2.0 * std::f64::consts::PI);
            let bin = ((fraction * ANGULAR_BINS as f64) as usize).min(ANGULAR_BINS - 1);
            bins[bin] += 1.0;
        }
        let total: f64 = bins.iter().sum();
        if total > 0.0 {
            out.angular_entropy = bins
                .iter()
                .filter(|&&b| b > 0.0)
                .map(|&b| {
                    let p = b / total;
                    -p * p.ln()
                })
                .sum();
        }
    }

    // Std of successive tangent-angle changes along the sampled boundary
    if samples.len() > 2 {
        let angles: Vec<f64> = samples
            .windows(2)
            .map(|w| {
                let (x0, y0) = w[0];
                let (x1, y1) = w[1];
                f64::from(y1 - y0).atan2(f64::from(x1 - x0))
            })
            .collect();
        let diffs: Vec<f64> = angles
            .windows(2)
            .map(|w| {
                let d = w[1] - w[0];
                d.sin().atan2(d.cos()) // wrap to [-pi, pi]
            })
            .collect();
        out.curvature_variation = population_std(&diffs);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contour_square(origin: i32, size: i32) -> Contour {
        let mut points = Vec::new();
        for i in 0..size {
            points.push((origin + i, origin));
        }
        for i in 0..size {
            points.push((origin + size, origin + i));
        }
        for i in 0..size {
            points.push((origin + size - i, origin + size));
        }
        for i in 0..size {
            points.push((origin, origin + size - i));
        }
        Contour {
            points,
            parent: None,
        }
    }

    fn inner_square(origin: i32, size: i32, parent: usize) -> Contour {
        let mut c = contour_square(origin, size);
        c.parent = Some(parent);
        c
    }

    #[test]
    fn test_outer_features_of_square() {
        let f = outer_features(&contour_square(0, 20));
        assert!((f.area - 400.0).abs() < 1e-9);
        assert!((f.perimeter - 80.0).abs() < 1e-9);
        assert!((f.solidity - 1.0).abs() < 1e-6);
        assert!((f.extent - 400.0 / 441.0).abs() < 1e-6);
        // Circularity of a square is pi/4
        assert!((f.circularity - std::f64::consts::FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn test_outer_features_degenerate() {
        let degenerate = Contour {
            points: vec![(0, 0), (1, 0)],
            parent: None,
        };
        let f = outer_features(&degenerate);
        assert_eq!(f.to_array(), [0.0; 10]);
    }

    #[test]
    fn test_cavity_features_normalized_by_outer_area() {
        let a = inner_square(10, 10, 0);
        let b = inner_square(40, 10, 0);
        let inner = vec![&a, &b];

        let f = cavity_features(&inner, 10_000.0);
        assert!((f.count - 2.0).abs() < 1e-9);
        assert!((f.total_area - 0.02).abs() < 1e-6);
        assert!((f.largest_area - 0.01).abs() < 1e-6);
        assert!((f.average_area - 0.01).abs() < 1e-6);
        assert!((f.area_ratio - f.total_area).abs() < 1e-12);
    }

    #[test]
    fn test_cavity_noise_filter() {
        let tiny = inner_square(10, 2, 0); // area 4
        let inner = vec![&tiny];
        // 4 < 0.1% of 10000 -> filtered as noise
        let f = cavity_features(&inner, 10_000.0);
        assert_eq!(f.to_array(), [0.0; 13]);
    }

    #[test]
    fn test_cavity_empty_input() {
        let f = cavity_features(&[], 10_000.0);
        assert_eq!(f.to_array(), [0.0; 13]);
    }

    #[test]
    fn test_hu_features_finite() {
        let f = hu_features(&contour_square(0, 30));
        assert!(f.values.iter().all(|v| v.is_finite()));
        // First invariant of a real shape is small and positive, so the log
        // transform lands in single digits
        assert!(f.values[0].abs() < 10.0);
    }

    #[test]
    fn test_legacy_features_use_raw_areas() {
        let a = inner_square(10, 10, 0);
        let inner = vec![&a];
        let f = legacy_cavity_features(&inner, 10_000.0);
        assert!((f.total_area - 100.0).abs() < 1e-9);
        assert!((f.density - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_roughness_of_convex_square() {
        let f = roughness_features(&contour_square(0, 20), &[]);
        assert!((f.roughness - 1.0).abs() < 0.05);
        assert_eq!(f.cavity_uniformity, 0.0);
    }

    #[test]
    fn test_shape_context_of_square() {
        let f = shape_context_features(&contour_square(0, 40));
        assert!(f.mean_radius > 0.0);
        assert!(f.radius_std > 0.0);
        // A square is isotropic enough to be near the ln(8) entropy ceiling
        assert!(f.angular_entropy > 1.8);
    }

    #[test]
    fn test_concat_order_and_width() {
        let raw = RawFeatures {
            outer: OuterFeatures {
                area: 1.0,
                ..Default::default()
            },
            cavity: CavityFeatures {
                count: 2.0,
                ..Default::default()
            },
            legacy: LegacyCavityFeatures {
                count: 3.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let flat = raw.concat();
        assert_eq!(flat.len(), FEATURE_DIM);
        assert_eq!(flat[0], 1.0); // outer area
        assert_eq!(flat[10], 2.0); // cavity count
        assert_eq!(flat[40], 3.0); // legacy count
    }
}
