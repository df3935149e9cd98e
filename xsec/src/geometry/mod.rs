//! Planar and 3D geometry primitives for cross-section construction.

/// Representation of a 2D map-view point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Representation of a 3D point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Drops the elevation component.
    pub fn xy(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Calculates the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Calculates the Euclidean distance between two 3D points.
pub fn distance3(a: Point3, b: Point3) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2) + (b.z - a.z).powi(2)).sqrt()
}

/// Representation of a series of connected 2D line segments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polyline {
    pub vertices: Vec<Point>,
}

impl Polyline {
    /// Creates a new polyline from a list of vertices.
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Returns the total length of all segments in the polyline.
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| distance(pair[0], pair[1]))
            .sum()
    }
}

/// Representation of a series of connected 3D line segments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polyline3 {
    pub vertices: Vec<Point3>,
}

impl Polyline3 {
    /// Creates a new polyline from a list of vertices.
    pub fn new(vertices: Vec<Point3>) -> Self {
        Self { vertices }
    }

    /// Returns the total length of all segments in the polyline.
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| distance3(pair[0], pair[1]))
            .sum()
    }
}

/// Calculates the area of a simple polygon using the shoelace formula.
pub fn polygon_area(vertices: &[Point]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let j = (i + 1) % vertices.len();
        sum += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
    }
    sum.abs() * 0.5
}

/// Returns `true` if point `p` is inside the polygon defined by `poly` using
/// the ray casting algorithm. The ring is treated as implicitly closed.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let mut inside = false;
    if poly.is_empty() {
        return inside;
    }
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let pi = poly[i];
        let pj = poly[j];
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Intersection of the segments `p1..p2` and `p3..p4`, if any.
///
/// Returns the crossing point together with the parameter along `p1..p2`.
pub fn segment_intersection(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<(Point, f64)> {
    let d1x = p2.x - p1.x;
    let d1y = p2.y - p1.y;
    let d2x = p4.x - p3.x;
    let d2y = p4.y - p3.y;
    let denom = d1x * d2y - d1y * d2x;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let t = ((p3.x - p1.x) * d2y - (p3.y - p1.y) * d2x) / denom;
    let u = ((p3.x - p1.x) * d1y - (p3.y - p1.y) * d1x) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some((Point::new(p1.x + t * d1x, p1.y + t * d1y), t))
}

/// Nearest point on the segment `a..b` to `p`, with its parameter along the
/// segment.
pub fn closest_point_on_segment(a: Point, b: Point, p: Point) -> (Point, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < f64::EPSILON {
        return (a, 0.0);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    (Point::new(a.x + t * dx, a.y + t * dy), t)
}

/// Minimum distance from `p` to any segment of `vertices`.
pub fn distance_to_polyline(p: Point, vertices: &[Point]) -> f64 {
    let mut best = f64::INFINITY;
    if vertices.len() == 1 {
        return distance(p, vertices[0]);
    }
    for pair in vertices.windows(2) {
        let (q, _) = closest_point_on_segment(pair[0], pair[1], p);
        let d = distance(p, q);
        if d < best {
            best = d;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyline_length() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(6.0, 8.0),
        ];
        let pl = Polyline::new(pts);
        assert!((pl.length() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn polyline3_length() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 2.0),
        ];
        let pl = Polyline3::new(pts);
        assert!((pl.length() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn polygon_area_square() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!((polygon_area(&square) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn point_in_polygon_square() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        assert!(point_in_polygon(Point::new(1.0, 1.0), &square));
        assert!(!point_in_polygon(Point::new(3.0, 1.0), &square));
    }

    #[test]
    fn segments_cross_at_midpoint() {
        let (pt, t) = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 0.0),
        )
        .unwrap();
        assert!((pt.x - 0.5).abs() < 1e-6);
        assert!((pt.y - 0.5).abs() < 1e-6);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn segments_disjoint() {
        assert!(segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn closest_point_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        let (q, t) = closest_point_on_segment(a, b, Point::new(-5.0, 3.0));
        assert_eq!(q, a);
        assert_eq!(t, 0.0);
        let (q, t) = closest_point_on_segment(a, b, Point::new(4.0, 3.0));
        assert!((q.x - 4.0).abs() < 1e-6);
        assert!((t - 0.4).abs() < 1e-6);
    }

    #[test]
    fn distance_to_polyline_interior() {
        let line = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        assert!((distance_to_polyline(Point::new(5.0, 3.0), &line) - 3.0).abs() < 1e-6);
        assert!((distance_to_polyline(Point::new(12.0, 5.0), &line) - 2.0).abs() < 1e-6);
    }
}
