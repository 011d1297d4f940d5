//! Contour extraction with a two-level outer/inner hierarchy.
//!
//! Foreground regions are 8-connected; their traced boundaries are the outer
//! contours. Background regions that do not touch the image border are
//! cavities; they are 4-connected and carry a parent pointer to the slot of
//! the enclosing outer contour. An island nested inside a cavity is itself a
//! foreground region and re-enters the outer set, so the hierarchy never
//! grows deeper than one level.

use crate::polyline::Point;
use image::GrayImage;
use tracing::debug;

/// An ordered closed polyline of pixel coordinates bounding a region
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point>,
    /// Slot of the enclosing outer contour; `None` for outer contours
    pub parent: Option<usize>,
}

impl Contour {
    pub fn is_outer(&self) -> bool {
        self.parent.is_none()
    }
}

// Clockwise Moore neighborhood in image coordinates (y grows downward),
// starting west.
const NEIGHBORS: [(i32, i32); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

/// Extract all contours of a binary image (foreground = nonzero).
///
/// Outer contours come first in discovery order, inner contours after them;
/// `parent` indices point into the returned vector.
pub fn find_contours(binary: &GrayImage) -> Vec<Contour> {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let w = width as i32;
    let h = height as i32;

    let foreground =
        |x: i32, y: i32| x >= 0 && y >= 0 && x < w && y < h && binary.get_pixel(x as u32, y as u32)[0] != 0;

    // Label 8-connected foreground components; remember each component's
    // topmost-leftmost pixel as the trace start.
    let mut labels = vec![0u32; (w * h) as usize];
    let mut seeds: Vec<Point> = Vec::new();
    let mut next_label = 0u32;
    for y in 0..h {
        for x in 0..w {
            if !foreground(x, y) || labels[(y * w + x) as usize] != 0 {
                continue;
            }
            next_label += 1;
            seeds.push((x, y));
            let mut stack = vec![(x, y)];
            labels[(y * w + x) as usize] = next_label;
            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBORS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if foreground(nx, ny) && labels[(ny * w + nx) as usize] == 0 {
                        labels[(ny * w + nx) as usize] = next_label;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }

    let mut contours: Vec<Contour> = Vec::with_capacity(seeds.len());
    for (label_zero, &seed) in seeds.iter().enumerate() {
        let label = label_zero as u32 + 1;
        let points = trace_boundary(
            |x, y| x >= 0 && y >= 0 && x < w && y < h && labels[(y * w + x) as usize] == label,
            seed,
            (w * h) as usize,
        );
        contours.push(Contour {
            points,
            parent: None,
        });
    }

    // Label 4-connected background components; those not reaching the image
    // border are cavities.
    let mut bg_labels = vec![0u32; (w * h) as usize];
    let mut bg_seeds: Vec<Point> = Vec::new();
    let mut bg_touches_border: Vec<bool> = Vec::new();
    let mut next_bg = 0u32;
    for y in 0..h {
        for x in 0..w {
            if foreground(x, y) || bg_labels[(y * w + x) as usize] != 0 {
                continue;
            }
            next_bg += 1;
            bg_seeds.push((x, y));
            bg_touches_border.push(false);
            let mut stack = vec![(x, y)];
            bg_labels[(y * w + x) as usize] = next_bg;
            while let Some((cx, cy)) = stack.pop() {
                if cx == 0 || cy == 0 || cx == w - 1 || cy == h - 1 {
                    bg_touches_border[next_bg as usize - 1] = true;
                }
                for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if nx >= 0
                        && ny >= 0
                        && nx < w
                        && ny < h
                        && !foreground(nx, ny)
                        && bg_labels[(ny * w + nx) as usize] == 0
                    {
                        bg_labels[(ny * w + nx) as usize] = next_bg;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }

    let outer_count = contours.len();
    for (bg_zero, &seed) in bg_seeds.iter().enumerate() {
        if bg_touches_border[bg_zero] {
            continue;
        }
        let bg_label = bg_zero as u32 + 1;
        // The pixel above a cavity's topmost-leftmost pixel is always part of
        // the enclosing foreground component.
        let (sx, sy) = seed;
        let parent_label = labels[((sy - 1) * w + sx) as usize];
        if parent_label == 0 {
            continue;
        }
        let points = trace_boundary(
            |x, y| x >= 0 && y >= 0 && x < w && y < h && bg_labels[(y * w + x) as usize] == bg_label,
            seed,
            (w * h) as usize,
        );
        contours.push(Contour {
            points,
            parent: Some(parent_label as usize - 1),
        });
    }

    debug!(
        "Found {} outer and {} inner contours",
        outer_count,
        contours.len() - outer_count
    );
    contours
}

/// Moore-neighbor boundary tracing from a topmost-leftmost region pixel.
///
/// The west neighbor of the start pixel is outside the region by scan order,
/// which gives the initial backtrack. Terminates when the walk re-enters the
/// start pixel from the initial direction.
fn trace_boundary<F: Fn(i32, i32) -> bool>(inside: F, start: Point, pixel_cap: usize) -> Vec<Point> {
    let initial_back = (start.0 - 1, start.1);
    let mut points = vec![start];
    let mut cur = start;
    let mut back = initial_back;
    let cap = pixel_cap.saturating_mul(4).max(8);

    loop {
        let back_idx = NEIGHBORS
            .iter()
            .position(|&(dx, dy)| (cur.0 + dx, cur.1 + dy) == back)
            .unwrap_or(0);

        let mut advanced = false;
        for step in 1..=NEIGHBORS.len() {
            let dir = (back_idx + step) % NEIGHBORS.len();
            let cand = (cur.0 + NEIGHBORS[dir].0, cur.1 + NEIGHBORS[dir].1);
            if inside(cand.0, cand.1) {
                let prev_dir = (dir + NEIGHBORS.len() - 1) % NEIGHBORS.len();
                back = (cur.0 + NEIGHBORS[prev_dir].0, cur.1 + NEIGHBORS[prev_dir].1);
                cur = cand;
                advanced = true;
                break;
            }
        }
        if !advanced {
            break; // isolated pixel
        }
        if cur == start && back == initial_back {
            break; // closed the loop with the entry direction
        }
        points.push(cur);
        if points.len() >= cap {
            break;
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn blank(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([0]))
    }

    fn fill(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, v: u8) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([v]));
            }
        }
    }

    #[test]
    fn test_empty_image_has_no_contours() {
        assert!(find_contours(&blank(16, 16)).is_empty());
    }

    #[test]
    fn test_filled_square_single_outer() {
        let mut img = blank(32, 32);
        fill(&mut img, 8, 8, 24, 24, 255);

        let contours = find_contours(&img);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].is_outer());

        let area = crate::polyline::area(&contours[0].points);
        // Boundary polygon of a 16x16 block encloses 15x15 pixel centers
        assert!((area - 225.0).abs() < 1.0, "area {}", area);
    }

    #[test]
    fn test_ring_produces_outer_and_inner() {
        let mut img = blank(40, 40);
        fill(&mut img, 5, 5, 35, 35, 255);
        fill(&mut img, 12, 12, 28, 28, 0); // hole

        let contours = find_contours(&img);
        let outers: Vec<_> = contours.iter().filter(|c| c.is_outer()).collect();
        let inners: Vec<_> = contours.iter().filter(|c| !c.is_outer()).collect();

        assert_eq!(outers.len(), 1);
        assert_eq!(inners.len(), 1);
        assert_eq!(inners[0].parent, Some(0));

        let outer_area = crate::polyline::area(&outers[0].points);
        let inner_area = crate::polyline::area(&inners[0].points);
        assert!(outer_area > inner_area);
        assert!(inner_area > 100.0);
    }

    #[test]
    fn test_two_separate_squares() {
        let mut img = blank(40, 20);
        fill(&mut img, 2, 2, 12, 12, 255);
        fill(&mut img, 20, 2, 36, 16, 255);

        let contours = find_contours(&img);
        assert_eq!(contours.len(), 2);
        assert!(contours.iter().all(Contour::is_outer));
    }

    #[test]
    fn test_island_inside_cavity_is_outer() {
        let mut img = blank(60, 60);
        fill(&mut img, 5, 5, 55, 55, 255);
        fill(&mut img, 15, 15, 45, 45, 0); // cavity
        fill(&mut img, 25, 25, 35, 35, 255); // island inside the cavity

        let contours = find_contours(&img);
        let outers = contours.iter().filter(|c| c.is_outer()).count();
        let inners = contours.iter().filter(|c| !c.is_outer()).count();
        assert_eq!(outers, 2);
        assert_eq!(inners, 1);
    }

    #[test]
    fn test_background_touching_border_is_not_cavity() {
        let mut img = blank(20, 20);
        // U shape open to the top border
        fill(&mut img, 4, 4, 16, 16, 255);
        fill(&mut img, 8, 0, 12, 12, 0);

        let contours = find_contours(&img);
        assert!(contours.iter().all(Contour::is_outer));
    }
}
