//! Geometry over closed integer-pixel polylines.
//!
//! Everything downstream of contour extraction works on these primitives:
//! shoelace area, arc length, convex hulls, Douglas-Peucker approximation,
//! convexity defects, and Green's-theorem polygon moments with Hu invariants.

pub type Point = (i32, i32);

/// Signed shoelace area; positive for counterclockwise orientation in image
/// coordinates.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        sum += f64::from(x0) * f64::from(y1) - f64::from(x1) * f64::from(y0);
    }
    sum / 2.0
}

/// Enclosed polygon area
pub fn area(points: &[Point]) -> f64 {
    signed_area(points).abs()
}

/// Perimeter of the closed polyline
pub fn arc_length(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        total += f64::from(x1 - x0).hypot(f64::from(y1 - y0));
    }
    total
}

/// Axis-aligned bounding rectangle as `(x, y, width, height)` in pixel units
pub fn bounding_rect(points: &[Point]) -> (i32, i32, i32, i32) {
    if points.is_empty() {
        return (0, 0, 0, 0);
    }
    let min_x = points.iter().map(|p| p.0).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.0).max().unwrap_or(0);
    let min_y = points.iter().map(|p| p.1).min().unwrap_or(0);
    let max_y = points.iter().map(|p| p.1).max().unwrap_or(0);
    (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    i64::from(a.0 - o.0) * i64::from(b.1 - o.1) - i64::from(a.1 - o.1) * i64::from(b.0 - o.0)
}

/// Convex hull by Andrew's monotone chain, returned as hull vertices
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    convex_hull_indices(points)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Convex hull as indices into `points`.
///
/// Duplicate coordinates keep their first occurrence so the indices stay
/// usable for walking contour arcs between hull vertices.
pub fn convex_hull_indices(points: &[Point]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| points[i]);
    order.dedup_by_key(|i| points[*i]);

    if order.len() < 3 {
        return order;
    }

    let mut hull: Vec<usize> = Vec::with_capacity(order.len() * 2);
    // Lower hull
    for &i in &order {
        while hull.len() >= 2
            && cross(
                points[hull[hull.len() - 2]],
                points[hull[hull.len() - 1]],
                points[i],
            ) <= 0
        {
            hull.pop();
        }
        hull.push(i);
    }
    // Upper hull
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(
                points[hull[hull.len() - 2]],
                points[hull[hull.len() - 1]],
                points[i],
            ) <= 0
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();
    hull
}

/// Perpendicular distance from `p` to the segment `a`-`b`
fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (px, py) = (f64::from(p.0), f64::from(p.1));
    let (ax, ay) = (f64::from(a.0), f64::from(a.1));
    let (bx, by) = (f64::from(b.0), f64::from(b.1));

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return (px - ax).hypot(py - ay);
    }
    let t = ((px - ax) * dx + (py - ay) * dy) / len_sq;
    let t = t.clamp(0.0, 1.0);
    (px - (ax + t * dx)).hypot(py - (ay + t * dy))
}

fn douglas_peucker(points: &[Point], epsilon: f64, out: &mut Vec<Point>) {
    if points.len() < 3 {
        out.extend_from_slice(points);
        return;
    }

    let first = points[0];
    let last = points[points.len() - 1];
    let mut max_dist = 0.0;
    let mut max_idx = 0;
    for (i, &p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let d = point_segment_distance(p, first, last);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        douglas_peucker(&points[..=max_idx], epsilon, out);
        out.pop(); // shared split point, re-added by the second half
        douglas_peucker(&points[max_idx..], epsilon, out);
    } else {
        out.push(first);
        out.push(last);
    }
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The contour is split at the point farthest from its first vertex so both
/// halves have stable anchors, mirroring the usual closed-curve treatment.
pub fn approx_polygon(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let far = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            let da = f64::from(a.0 - first.0).hypot(f64::from(a.1 - first.1));
            let db = f64::from(b.0 - first.0).hypot(f64::from(b.1 - first.1));
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return vec![first];
    }

    let mut half_a = Vec::new();
    douglas_peucker(&points[..=far], epsilon, &mut half_a);
    let mut closing: Vec<Point> = points[far..].to_vec();
    closing.push(first);
    let mut half_b = Vec::new();
    douglas_peucker(&closing, epsilon, &mut half_b);

    // Drop the shared split vertex and the repeated closing vertex
    half_a.pop();
    half_b.pop();
    half_a.extend(half_b);
    half_a
}

/// Depths of convexity defects: one entry per hull arc that spans at least
/// one contour point, holding the maximum distance from the arc to the hull
/// chord, in pixels.
pub fn convexity_defect_depths(points: &[Point]) -> Vec<f64> {
    if points.len() < 4 {
        return Vec::new();
    }
    let mut hull = convex_hull_indices(points);
    if hull.len() < 3 {
        return Vec::new();
    }
    hull.sort_unstable();

    let mut depths = Vec::new();
    for w in 0..hull.len() {
        let start = hull[w];
        let end = hull[(w + 1) % hull.len()];
        let chord_a = points[start];
        let chord_b = points[end];

        let mut i = (start + 1) % points.len();
        let mut max_depth: Option<f64> = None;
        while i != end {
            let d = point_segment_distance(points[i], chord_a, chord_b);
            max_depth = Some(max_depth.map_or(d, |m: f64| m.max(d)));
            i = (i + 1) % points.len();
        }
        if let Some(depth) = max_depth {
            depths.push(depth);
        }
    }
    depths
}

/// Spatial polygon moments up to third order, via Green's theorem.
#[derive(Debug, Clone, Copy, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
    pub m30: f64,
    pub m21: f64,
    pub m12: f64,
    pub m03: f64,
}

impl Moments {
    pub fn of_polygon(points: &[Point]) -> Self {
        let n = points.len();
        if n < 3 {
            return Self::default();
        }

        let mut m = Self::default();
        for i in 0..n {
            let (xi, yi) = (f64::from(points[i].0), f64::from(points[i].1));
            let j = (i + 1) % n;
            let (xj, yj) = (f64::from(points[j].0), f64::from(points[j].1));
            let c = xi * yj - xj * yi;

            m.m00 += c;
            m.m10 += c * (xi + xj);
            m.m01 += c * (yi + yj);
            m.m20 += c * (xi * xi + xi * xj + xj * xj);
            m.m11 += c * (2.0 * xi * yi + xi * yj + xj * yi + 2.0 * xj * yj);
            m.m02 += c * (yi * yi + yi * yj + yj * yj);
            m.m30 += c * (xi.powi(3) + xi * xi * xj + xi * xj * xj + xj.powi(3));
            m.m21 += c
                * (xi * xi * (3.0 * yi + yj)
                    + 2.0 * xi * xj * (yi + yj)
                    + xj * xj * (yi + 3.0 * yj));
            m.m12 += c
                * (yi * yi * (3.0 * xi + xj)
                    + 2.0 * yi * yj * (xi + xj)
                    + yj * yj * (xi + 3.0 * xj));
            m.m03 += c * (yi.powi(3) + yi * yi * yj + yi * yj * yj + yj.powi(3));
        }

        m.m00 /= 2.0;
        m.m10 /= 6.0;
        m.m01 /= 6.0;
        m.m20 /= 12.0;
        m.m11 /= 24.0;
        m.m02 /= 12.0;
        m.m30 /= 20.0;
        m.m21 /= 60.0;
        m.m12 /= 60.0;
        m.m03 /= 20.0;

        // Orientation of the traced polyline must not flip the sign of the
        // mass distribution.
        if m.m00 < 0.0 {
            m.m00 = -m.m00;
            m.m10 = -m.m10;
            m.m01 = -m.m01;
            m.m20 = -m.m20;
            m.m11 = -m.m11;
            m.m02 = -m.m02;
            m.m30 = -m.m30;
            m.m21 = -m.m21;
            m.m12 = -m.m12;
            m.m03 = -m.m03;
        }
        m
    }

    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00.abs() <= f64::EPSILON {
            None
        } else {
            Some((self.m10 / self.m00, self.m01 / self.m00))
        }
    }

    /// Central moments `(mu20, mu11, mu02, mu30, mu21, mu12, mu03)`
    pub fn central(&self) -> [f64; 7] {
        let Some((cx, cy)) = self.centroid() else {
            return [0.0; 7];
        };

        let mu20 = self.m20 - cx * self.m10;
        let mu11 = self.m11 - cx * self.m01;
        let mu02 = self.m02 - cy * self.m01;
        let mu30 = self.m30 - 3.0 * cx * self.m20 + 2.0 * cx * cx * self.m10;
        let mu21 = self.m21 - 2.0 * cx * self.m11 - cy * self.m20 + 2.0 * cx * cx * self.m01;
        let mu12 = self.m12 - 2.0 * cy * self.m11 - cx * self.m02 + 2.0 * cy * cy * self.m10;
        let mu03 = self.m03 - 3.0 * cy * self.m02 + 2.0 * cy * cy * self.m01;
        [mu20, mu11, mu02, mu30, mu21, mu12, mu03]
    }

    /// The seven Hu rotation/scale invariants
    pub fn hu(&self) -> [f64; 7] {
        if self.m00.abs() <= f64::EPSILON {
            return [0.0; 7];
        }
        let [mu20, mu11, mu02, mu30, mu21, mu12, mu03] = self.central();

        let inv2 = self.m00.powf(2.0);
        let inv3 = self.m00.powf(2.5);
        let n20 = mu20 / inv2;
        let n11 = mu11 / inv2;
        let n02 = mu02 / inv2;
        let n30 = mu30 / inv3;
        let n21 = mu21 / inv3;
        let n12 = mu12 / inv3;
        let n03 = mu03 / inv3;

        let h1 = n20 + n02;
        let h2 = (n20 - n02).powi(2) + 4.0 * n11 * n11;
        let h3 = (n30 - 3.0 * n12).powi(2) + (3.0 * n21 - n03).powi(2);
        let h4 = (n30 + n12).powi(2) + (n21 + n03).powi(2);
        let h5 = (n30 - 3.0 * n12)
            * (n30 + n12)
            * ((n30 + n12).powi(2) - 3.0 * (n21 + n03).powi(2))
            + (3.0 * n21 - n03) * (n21 + n03) * (3.0 * (n30 + n12).powi(2) - (n21 + n03).powi(2));
        let h6 = (n20 - n02) * ((n30 + n12).powi(2) - (n21 + n03).powi(2))
            + 4.0 * n11 * (n30 + n12) * (n21 + n03);
        let h7 = (3.0 * n21 - n03)
            * (n30 + n12)
            * ((n30 + n12).powi(2) - 3.0 * (n21 + n03).powi(2))
            - (n30 - 3.0 * n12) * (n21 + n03) * (3.0 * (n30 + n12).powi(2) - (n21 + n03).powi(2));

        [h1, h2, h3, h4, h5, h6, h7]
    }
}

/// Best-fit ellipse from second-order moments.
///
/// Returns `(major_axis, minor_axis, orientation)` with the orientation in
/// `[0, pi)` radians, or `None` for a degenerate mass distribution.
pub fn fit_ellipse(moments: &Moments) -> Option<(f64, f64, f64)> {
    let (cx, cy) = moments.centroid()?;
    let a = moments.m20 / moments.m00 - cx * cx;
    let b = moments.m11 / moments.m00 - cx * cy;
    let c = moments.m02 / moments.m00 - cy * cy;

    let mut orientation = 0.5 * (2.0 * b).atan2(a - c);
    if orientation < 0.0 {
        orientation += std::f64::consts::PI;
    }

    let common = ((a - c).powi(2) + 4.0 * b * b).sqrt();
    let lambda1 = ((a + c + common) / 2.0).max(0.0);
    let lambda2 = ((a + c - common) / 2.0).max(0.0);
    let major = 4.0 * lambda1.sqrt();
    let minor = 4.0 * lambda2.sqrt();

    Some((major, minor, orientation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: i32) -> Vec<Point> {
        let mut pts = Vec::new();
        for i in 0..size {
            pts.push((i, 0));
        }
        for i in 0..size {
            pts.push((size, i));
        }
        for i in 0..size {
            pts.push((size - i, size));
        }
        for i in 0..size {
            pts.push((0, size - i));
        }
        pts
    }

    #[test]
    fn test_square_area_and_perimeter() {
        let pts = square(10);
        assert!((area(&pts) - 100.0).abs() < 1e-9);
        assert!((arc_length(&pts) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_rect() {
        let pts = vec![(2, 3), (7, 3), (7, 9), (2, 9)];
        assert_eq!(bounding_rect(&pts), (2, 3, 6, 7));
    }

    #[test]
    fn test_convex_hull_of_square_with_notch() {
        let mut pts = square(10);
        pts.push((5, 5)); // interior point, must not appear on the hull
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(hull.contains(&(0, 0)));
        assert!(hull.contains(&(10, 0)));
        assert!(hull.contains(&(10, 10)));
        assert!(hull.contains(&(0, 10)));
    }

    #[test]
    fn test_approx_polygon_reduces_square() {
        let pts = square(20);
        let approx = approx_polygon(&pts, 1.0);
        assert!(approx.len() <= 6, "got {} vertices", approx.len());
        assert!(approx.len() >= 3);
    }

    #[test]
    fn test_defects_of_convex_square_are_shallow() {
        let pts = square(10);
        let depths = convexity_defect_depths(&pts);
        assert!(depths.iter().all(|&d| d < 1.0));
    }

    #[test]
    fn test_notched_square_has_deep_defect() {
        // A square with a V notch cut into the top edge
        let mut pts: Vec<Point> = Vec::new();
        for i in 0..=8 {
            pts.push((i, 0));
        }
        pts.push((10, 8)); // notch bottom
        for i in 12..=20 {
            pts.push((i, 0));
        }
        pts.push((20, 20));
        pts.push((0, 20));

        let depths = convexity_defect_depths(&pts);
        assert!(depths.iter().any(|&d| d > 5.0));
    }

    #[test]
    fn test_polygon_moments_centroid() {
        let pts = square(10);
        let m = Moments::of_polygon(&pts);
        assert!((m.m00 - 100.0).abs() < 1e-9);
        let (cx, cy) = m.centroid().unwrap();
        assert!((cx - 5.0).abs() < 1e-9);
        assert!((cy - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_hu_scale_invariance() {
        let small = Moments::of_polygon(&square(10)).hu();
        let large = Moments::of_polygon(&square(40)).hu();
        // Leading invariants agree across a 4x scale change
        for i in 0..4 {
            assert!(
                (small[i] - large[i]).abs() < 1e-6,
                "hu[{}]: {} vs {}",
                i,
                small[i],
                large[i]
            );
        }
    }

    #[test]
    fn test_fit_ellipse_elongated_rect() {
        // 40x10 rectangle centered at origin-ish, elongated along x
        let pts = vec![(0, 0), (40, 0), (40, 10), (0, 10)];
        let m = Moments::of_polygon(&pts);
        let (major, minor, orientation) = fit_ellipse(&m).unwrap();
        assert!(major > minor);
        // Orientation along the x axis (0 or pi)
        assert!(orientation < 0.1 || (std::f64::consts::PI - orientation) < 0.1);
    }
}
