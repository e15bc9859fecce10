//! Plane geometry for document boundary estimation
//!
//! Polygon measurements, closed-curve simplification, canonical corner
//! ordering and the quad-to-rectangle projection used by the rectify step.

use imageproc::geometric_transformations::Projection;
use imageproc::point::Point;
use std::cmp::Ordering;

/// Euclidean distance between two points
pub fn distance(a: Point<f32>, b: Point<f32>) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Area enclosed by a polygon (shoelace formula). Vertex order may be
/// clockwise or counter-clockwise.
pub fn polygon_area(points: &[Point<f32>]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x as f64 * points[j].y as f64;
        twice_area -= points[j].x as f64 * points[i].y as f64;
    }

    (twice_area.abs() / 2.0) as f32
}

/// Length of the closed curve through `points`
pub fn perimeter(points: &[Point<f32>]) -> f32 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }

    (0..n)
        .map(|i| distance(points[i], points[(i + 1) % n]))
        .sum()
}

/// Simplify a closed curve with the Douglas-Peucker algorithm.
///
/// The ring is split at the vertex farthest from the first one, each half is
/// simplified independently, and the starting vertex is dropped afterwards if
/// it turns out to lie within `epsilon` of the segment joining its
/// neighbours (it is only a vertex because contour tracing began there).
pub fn simplify_closed(points: &[Point<f32>], epsilon: f32) -> Vec<Point<f32>> {
    if points.len() <= 3 {
        return points.to_vec();
    }

    let start = points[0];
    let far = (1..points.len())
        .max_by(|&a, &b| {
            distance(start, points[a])
                .partial_cmp(&distance(start, points[b]))
                .unwrap_or(Ordering::Equal)
        })
        .unwrap_or(0);

    if distance(start, points[far]) == 0.0 {
        return vec![start];
    }

    // Close the ring so the second half ends where the first one started
    let mut ring = points.to_vec();
    ring.push(start);
    let last = ring.len() - 1;

    let mut keep = vec![false; ring.len()];
    keep[0] = true;
    keep[far] = true;
    keep[last] = true;
    mark_vertices(&ring, 0, far, epsilon, &mut keep);
    mark_vertices(&ring, far, last, epsilon, &mut keep);

    let mut simplified: Vec<Point<f32>> = ring[..last]
        .iter()
        .zip(&keep[..last])
        .filter(|&(_, &kept)| kept)
        .map(|(p, _)| *p)
        .collect();

    if simplified.len() > 3 {
        let prev = simplified[simplified.len() - 1];
        let next = simplified[1];
        if segment_distance(simplified[0], prev, next) <= epsilon {
            simplified.remove(0);
        }
    }

    simplified
}

/// Iterative Douglas-Peucker over `points[start..=end]`
fn mark_vertices(
    points: &[Point<f32>],
    start: usize,
    end: usize,
    epsilon: f32,
    keep: &mut [bool],
) {
    let mut stack = vec![(start, end)];

    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = 0.0f32;
        let mut max_index = start;
        for i in (start + 1)..end {
            let dist = segment_distance(points[i], points[start], points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        if max_dist > epsilon {
            keep[max_index] = true;
            stack.push((start, max_index));
            stack.push((max_index, end));
        }
    }
}

/// Distance from `p` to the segment `a`-`b`
fn segment_distance(p: Point<f32>, a: Point<f32>, b: Point<f32>) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(p, a);
    }

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, Point::new(a.x + t * dx, a.y + t * dy))
}

/// Assign four points to the roles {top-left, top-right, bottom-right,
/// bottom-left}.
///
/// Smallest `x + y` is the top-left corner and largest is the bottom-right;
/// smallest `y - x` is the top-right corner and largest is the bottom-left.
/// Ties resolve to the earliest point. Returns `None` when two roles land on
/// the same point, in which case the quad has no reliable orientation.
pub fn order_corners(points: &[Point<f32>; 4]) -> Option<[Point<f32>; 4]> {
    let sum = |p: &Point<f32>| p.x + p.y;
    let diff = |p: &Point<f32>| p.y - p.x;

    let tl = arg_extreme(points, sum, Ordering::Less);
    let br = arg_extreme(points, sum, Ordering::Greater);
    let tr = arg_extreme(points, diff, Ordering::Less);
    let bl = arg_extreme(points, diff, Ordering::Greater);

    let roles = [tl, tr, br, bl];
    for i in 0..roles.len() {
        for j in (i + 1)..roles.len() {
            if roles[i] == roles[j] {
                return None;
            }
        }
    }

    Some([points[tl], points[tr], points[br], points[bl]])
}

/// Index of the first point whose key is strictly more extreme (in the
/// `wanted` direction) than every earlier one
fn arg_extreme<F>(points: &[Point<f32>; 4], key: F, wanted: Ordering) -> usize
where
    F: Fn(&Point<f32>) -> f32,
{
    let mut best = 0;
    for i in 1..points.len() {
        if key(&points[i]).partial_cmp(&key(&points[best])) == Some(wanted) {
            best = i;
        }
    }
    best
}

/// A document boundary in canonical corner order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub top_left: Point<f32>,
    pub top_right: Point<f32>,
    pub bottom_right: Point<f32>,
    pub bottom_left: Point<f32>,
}

impl Quadrilateral {
    /// Order four corner candidates and validate the result.
    ///
    /// Returns `None` if the orientation is ambiguous or the enclosed area
    /// is not above `min_area` (collinear or collapsed corners).
    pub fn from_points(points: [Point<f32>; 4], min_area: f32) -> Option<Self> {
        let [top_left, top_right, bottom_right, bottom_left] = order_corners(&points)?;
        let quad = Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        };

        let area = quad.area();
        if !area.is_finite() || area <= min_area.max(0.0) {
            return None;
        }

        Some(quad)
    }

    /// Corners as `[tl, tr, br, bl]`
    pub fn corners(&self) -> [Point<f32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    pub fn area(&self) -> f32 {
        polygon_area(&self.corners())
    }

    /// Output rectangle size: the longer of each pair of opposite edges,
    /// rounded down to whole pixels
    pub fn target_size(&self) -> (u32, u32) {
        let width = distance(self.bottom_right, self.bottom_left)
            .max(distance(self.top_right, self.top_left));
        let height = distance(self.top_right, self.bottom_right)
            .max(distance(self.top_left, self.bottom_left));

        (width.max(0.0).floor() as u32, height.max(0.0).floor() as u32)
    }
}

/// Projection taking `quad` onto the axis-aligned rectangle
/// `[(0,0), (w-1,0), (w-1,h-1), (0,h-1)]`.
///
/// Returns `None` for an empty rectangle or when the corners admit no
/// invertible projection.
pub fn to_rectangle(quad: &Quadrilateral, width: u32, height: u32) -> Option<Projection> {
    if width == 0 || height == 0 {
        return None;
    }

    let right = (width - 1) as f32;
    let bottom = (height - 1) as f32;
    let from = quad.corners().map(|c| (c.x, c.y));
    let to = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

    Projection::from_control_points(from, to)
}
