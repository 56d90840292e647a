//! Polygon geometry with a cached axis-aligned bounding box.

use nalgebra::Point2;

const EDGE_EPSILON: f64 = 1e-9;

/// Closed polygon; vertex order defines the boundary path.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point2<f64>>,
    min: Point2<f64>,
    max: Point2<f64>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point2<f64>>) -> Self {
        let (min, max) = bounds(&vertices);
        Self { vertices, min, max }
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    /// Bounding box as (min corner, max corner).
    pub fn bounds(&self) -> (Point2<f64>, Point2<f64>) {
        (self.min, self.max)
    }

    /// Point-in-polygon test; points on an edge count as inside.
    ///
    /// Points outside the bounding box are rejected before any edge is visited.
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        if point.x < self.min.x
            || point.x > self.max.x
            || point.y < self.min.y
            || point.y > self.max.y
        {
            return false;
        }

        let n = self.vertices.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = &self.vertices[j];
            let b = &self.vertices[i];

            if on_segment(point, a, b) {
                return true;
            }

            if (b.y > point.y) != (a.y > point.y) {
                let x_cross = b.x + (point.y - b.y) * (a.x - b.x) / (a.y - b.y);
                if point.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Scale every vertex independently per axis and rebuild the bounding box.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        for v in &mut self.vertices {
            v.x *= sx;
            v.y *= sy;
        }
        let (min, max) = bounds(&self.vertices);
        self.min = min;
        self.max = max;
    }
}

fn bounds(vertices: &[Point2<f64>]) -> (Point2<f64>, Point2<f64>) {
    if vertices.is_empty() {
        return (Point2::origin(), Point2::origin());
    }
    let mut min = vertices[0];
    let mut max = vertices[0];
    for v in &vertices[1..] {
        min.x = min.x.min(v.x);
        min.y = min.y.min(v.y);
        max.x = max.x.max(v.x);
        max.y = max.y.max(v.y);
    }
    (min, max)
}

fn on_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> bool {
    let ab = *b - *a;
    let ap = *p - *a;
    let cross = ab.x * ap.y - ab.y * ap.x;
    if cross.abs() > EDGE_EPSILON * ab.norm().max(1.0) {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}
