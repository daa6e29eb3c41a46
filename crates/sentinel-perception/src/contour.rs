//! External contour extraction and minimum enclosing circles.
//!
//! Each 8-connected component of a [`Mask`] yields exactly one external
//! contour, traced with Moore-neighbour tracing from the component's first
//! pixel in raster order.  Contour area is the polygon area of the traced
//! boundary (pixel centres), so a solid `n × n` square has area `(n-1)²`.

use crate::morphology::Mask;

/// Clockwise 8-neighbourhood in image coordinates (y grows downwards),
/// starting from west.
const DIRS: [(i64, i64); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

const WEST: usize = 0;

/// Ordered boundary points of one connected component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    points: Vec<(i64, i64)>,
}

impl Contour {
    pub fn points(&self) -> &[(i64, i64)] {
        &self.points
    }

    /// Shoelace area of the boundary polygon.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[(i + 1) % n];
                x0 * y1 - x1 * y0
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    /// Smallest circle containing every boundary point.
    pub fn enclosing_circle(&self) -> Circle {
        min_enclosing_circle(&convex_hull(&self.points))
    }
}

/// Trace the external contour of every 8-connected component of `mask`,
/// in raster order of each component's first pixel.
pub fn find_external_contours(mask: &Mask) -> Vec<Contour> {
    let (w, h) = (mask.width(), mask.height());
    let mut visited = vec![false; w * h];
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if !mask.get(x, y) || visited[y * w + x] {
                continue;
            }
            let start = (x as i64, y as i64);
            contours.push(Contour {
                points: trace_boundary(mask, start),
            });
            mark_component(mask, start, &mut visited);
        }
    }
    contours
}

/// Moore-neighbour tracing.  `start` must be the first set pixel of its
/// component in raster order, so its west neighbour is background.
fn trace_boundary(mask: &Mask, start: (i64, i64)) -> Vec<(i64, i64)> {
    let mut points = vec![start];
    let Some((second, second_back)) = moore_step(mask, start, WEST) else {
        return points;
    };

    let max_steps = 4 * mask.width() * mask.height() + 8;
    let (mut cur, mut back) = (second, second_back);
    for _ in 0..max_steps {
        points.push(cur);
        let Some((next, next_back)) = moore_step(mask, cur, back) else {
            break;
        };
        // Stop when the very first move is about to repeat.
        if cur == start && next == second && next_back == second_back {
            break;
        }
        cur = next;
        back = next_back;
    }

    if points.len() > 1 && points.last() == Some(&start) {
        points.pop();
    }
    points
}

/// From `p`, scan its neighbours clockwise starting after the backtrack
/// direction.  Returns the first set neighbour and the direction from it back
/// to the last background pixel examined.
fn moore_step(mask: &Mask, p: (i64, i64), back: usize) -> Option<((i64, i64), usize)> {
    for k in 1..=8 {
        let d = (back + k) % 8;
        let q = (p.0 + DIRS[d].0, p.1 + DIRS[d].1);
        if mask.get_signed(q.0, q.1) {
            let prev_dir = (d + 7) % 8;
            let prev = (p.0 + DIRS[prev_dir].0, p.1 + DIRS[prev_dir].1);
            let delta = (prev.0 - q.0, prev.1 - q.1);
            let q_back = DIRS.iter().position(|&dd| dd == delta).unwrap_or(WEST);
            return Some((q, q_back));
        }
    }
    None
}

/// Flood-fill the 8-connected component containing `seed` into `visited`.
fn mark_component(mask: &Mask, seed: (i64, i64), visited: &mut [bool]) {
    let w = mask.width();
    let mut stack = vec![seed];
    visited[seed.1 as usize * w + seed.0 as usize] = true;
    while let Some((x, y)) = stack.pop() {
        for (dx, dy) in DIRS {
            let (nx, ny) = (x + dx, y + dy);
            if !mask.get_signed(nx, ny) {
                continue;
            }
            let idx = ny as usize * w + nx as usize;
            if !visited[idx] {
                visited[idx] = true;
                stack.push((nx, ny));
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Enclosing circle
// ────────────────────────────────────────────────────────────────────────────

/// A circle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl Circle {
    fn contains(&self, p: (f64, f64)) -> bool {
        let dx = p.0 - self.cx;
        let dy = p.1 - self.cy;
        (dx * dx + dy * dy).sqrt() <= self.radius + 1e-7
    }

    fn from_two(a: (f64, f64), b: (f64, f64)) -> Circle {
        let cx = (a.0 + b.0) / 2.0;
        let cy = (a.1 + b.1) / 2.0;
        let radius = ((a.0 - cx).powi(2) + (a.1 - cy).powi(2)).sqrt();
        Circle { cx, cy, radius }
    }

    fn from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Circle {
        let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
        if d.abs() < 1e-12 {
            // Collinear: the widest pair spans the other point.
            return [
                Circle::from_two(a, b),
                Circle::from_two(a, c),
                Circle::from_two(b, c),
            ]
            .into_iter()
            .fold(Circle::from_two(a, b), |best, c| {
                if c.radius > best.radius { c } else { best }
            });
        }
        let a2 = a.0 * a.0 + a.1 * a.1;
        let b2 = b.0 * b.0 + b.1 * b.1;
        let c2 = c.0 * c.0 + c.1 * c.1;
        let cx = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
        let cy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
        let radius = ((a.0 - cx).powi(2) + (a.1 - cy).powi(2)).sqrt();
        Circle { cx, cy, radius }
    }
}

/// Convex hull (Andrew's monotone chain), counter-clockwise, without
/// repeated points.
pub fn convex_hull(points: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut pts = points.to_vec();
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: (i64, i64), a: (i64, i64), b: (i64, i64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut hull: Vec<(i64, i64)> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Minimum enclosing circle (incremental Welzl).
pub fn min_enclosing_circle(points: &[(i64, i64)]) -> Circle {
    let pts: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
    let Some(&first) = pts.first() else {
        return Circle {
            cx: 0.0,
            cy: 0.0,
            radius: 0.0,
        };
    };

    let mut circle = Circle {
        cx: first.0,
        cy: first.1,
        radius: 0.0,
    };
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle {
            cx: pts[i].0,
            cy: pts[i].1,
            radius: 0.0,
        };
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::from_two(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = Circle::from_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    circle
}
