//! Geometry engine capability seam.
//!
//! The tool pipelines call intersection, buffering and multipart handling
//! through [`GeometryEngine`] rather than a concrete library, with
//! [`PlanarEngine`] supplying the planar implementations the cross-section
//! datasets need.

use crate::dataset::Geometry;
use crate::geometry::{
    distance, distance_to_polyline, point_in_polygon, segment_intersection, Point, Point3,
    Polyline, Polyline3,
};
use crate::trace::Trace;

/// Planar tolerance for coincidence tests, in trace units (meters).
pub const XY_TOLERANCE: f64 = 1e-3;

/// Output geometry requested from an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectMode {
    Point,
    Line,
}

/// Membership region produced by buffering polylines.
///
/// The pipelines only ever ask a buffer whether it contains a point, so the
/// region answers distance-to-polyline membership exactly instead of
/// materializing an offset polygon.
#[derive(Debug, Clone)]
pub struct BufferRegion {
    lines: Vec<Polyline>,
    distance: f64,
}

impl BufferRegion {
    pub fn contains(&self, p: Point) -> bool {
        self.lines
            .iter()
            .any(|line| distance_to_polyline(p, &line.vertices) <= self.distance)
    }
}

/// Geometry operations the batch tools depend on.
pub trait GeometryEngine {
    /// Arc length from the trace start to the projection of `point`.
    fn project_arc_length(&self, trace: &Trace, point: Point) -> f64;

    /// Intersects two geometries, returning single-part results.
    fn intersect(&self, a: &Geometry, b: &Geometry, mode: IntersectMode) -> Vec<Geometry>;

    /// Buffers polylines by a planar distance.
    fn buffer(&self, lines: &[Polyline], distance: f64) -> BufferRegion;

    /// Flattens multipart geometry into its single parts.
    fn split_multipart(&self, geometry: &Geometry) -> Vec<Geometry>;
}

/// Planar implementation of [`GeometryEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarEngine;

impl GeometryEngine for PlanarEngine {
    fn project_arc_length(&self, trace: &Trace, point: Point) -> f64 {
        trace.measure_on_line(point)
    }

    fn intersect(&self, a: &Geometry, b: &Geometry, mode: IntersectMode) -> Vec<Geometry> {
        let mut out = Vec::new();
        for pa in a.parts() {
            for pb in b.parts() {
                intersect_parts(&pa, &pb, mode, &mut out);
            }
        }
        out
    }

    fn buffer(&self, lines: &[Polyline], distance: f64) -> BufferRegion {
        BufferRegion {
            lines: lines.to_vec(),
            distance,
        }
    }

    fn split_multipart(&self, geometry: &Geometry) -> Vec<Geometry> {
        geometry.parts()
    }
}

fn intersect_parts(a: &Geometry, b: &Geometry, mode: IntersectMode, out: &mut Vec<Geometry>) {
    match (a, b, mode) {
        (Geometry::Polygon(ring), Geometry::Line(line), IntersectMode::Line)
        | (Geometry::Line(line), Geometry::Polygon(ring), IntersectMode::Line) => {
            out.extend(clip_polyline(line, ring).into_iter().map(Geometry::Line));
        }
        (Geometry::Polygon(ring), Geometry::LineZ(line), IntersectMode::Line)
        | (Geometry::LineZ(line), Geometry::Polygon(ring), IntersectMode::Line) => {
            out.extend(clip_polyline3(line, ring).into_iter().map(Geometry::LineZ));
        }
        (Geometry::Line(la), Geometry::Line(lb), IntersectMode::Point) => {
            out.extend(line_crossings(la, lb).into_iter().map(Geometry::Point));
        }
        (Geometry::Line(line), Geometry::Point(p), IntersectMode::Point)
        | (Geometry::Point(p), Geometry::Line(line), IntersectMode::Point) => {
            if distance_to_polyline(*p, &line.vertices) <= XY_TOLERANCE {
                out.push(Geometry::Point(*p));
            }
        }
        _ => {}
    }
}

/// Crossing points of two polylines, deduplicated within tolerance.
fn line_crossings(a: &Polyline, b: &Polyline) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::new();
    for sa in a.vertices.windows(2) {
        for sb in b.vertices.windows(2) {
            if let Some((pt, _)) = segment_intersection(sa[0], sa[1], sb[0], sb[1]) {
                if !points.iter().any(|q| distance(*q, pt) <= XY_TOLERANCE) {
                    points.push(pt);
                }
            }
        }
    }
    points
}

/// Parameters where the segment `a..b` crosses the ring's edges, sorted.
fn ring_crossings(a: Point, b: Point, ring: &[Point]) -> Vec<f64> {
    let mut ts = Vec::new();
    if ring.len() < 3 {
        return ts;
    }
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        if let Some((_, t)) = segment_intersection(a, b, ring[j], ring[i]) {
            ts.push(t);
        }
        j = i;
    }
    ts.sort_by(|x, y| x.total_cmp(y));
    ts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);
    ts
}

/// Clips a 2D polyline to the interior of a polygon ring.
pub fn clip_polyline(line: &Polyline, ring: &[Point]) -> Vec<Polyline> {
    let mut parts: Vec<Polyline> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    for pair in line.vertices.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let mut ts = vec![0.0];
        ts.extend(ring_crossings(a, b, ring));
        ts.push(1.0);
        for w in ts.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            if t1 - t0 < 1e-12 {
                continue;
            }
            let tm = 0.5 * (t0 + t1);
            let mid = Point::new(a.x + tm * (b.x - a.x), a.y + tm * (b.y - a.y));
            let p0 = Point::new(a.x + t0 * (b.x - a.x), a.y + t0 * (b.y - a.y));
            let p1 = Point::new(a.x + t1 * (b.x - a.x), a.y + t1 * (b.y - a.y));
            if point_in_polygon(mid, ring) {
                match current.last() {
                    Some(last) if distance(*last, p0) <= XY_TOLERANCE => current.push(p1),
                    Some(_) => {
                        parts.push(Polyline::new(std::mem::take(&mut current)));
                        current.push(p0);
                        current.push(p1);
                    }
                    None => {
                        current.push(p0);
                        current.push(p1);
                    }
                }
            }
        }
    }
    if current.len() >= 2 {
        parts.push(Polyline::new(current));
    }
    parts
}

/// Clips a 3D polyline to a polygon ring in plan view, interpolating Z at
/// the crossings.
pub fn clip_polyline3(line: &Polyline3, ring: &[Point]) -> Vec<Polyline3> {
    let at = |a: Point3, b: Point3, t: f64| {
        Point3::new(
            a.x + t * (b.x - a.x),
            a.y + t * (b.y - a.y),
            a.z + t * (b.z - a.z),
        )
    };
    let mut parts: Vec<Polyline3> = Vec::new();
    let mut current: Vec<Point3> = Vec::new();
    for pair in line.vertices.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let mut ts = vec![0.0];
        ts.extend(ring_crossings(a.xy(), b.xy(), ring));
        ts.push(1.0);
        for w in ts.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            if t1 - t0 < 1e-12 {
                continue;
            }
            let mid = at(a, b, 0.5 * (t0 + t1));
            let p0 = at(a, b, t0);
            let p1 = at(a, b, t1);
            if point_in_polygon(mid.xy(), ring) {
                match current.last() {
                    Some(last) if distance(last.xy(), p0.xy()) <= XY_TOLERANCE => current.push(p1),
                    Some(_) => {
                        parts.push(Polyline3::new(std::mem::take(&mut current)));
                        current.push(p0);
                        current.push(p1);
                    }
                    None => {
                        current.push(p0);
                        current.push(p1);
                    }
                }
            }
        }
    }
    if current.len() >= 2 {
        parts.push(Polyline3::new(current));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn clip_line_through_square() {
        let line = Polyline::new(vec![Point::new(-5.0, 5.0), Point::new(15.0, 5.0)]);
        let parts = clip_polyline(&line, &unit_square());
        assert_eq!(parts.len(), 1);
        assert!((parts[0].vertices[0].x - 0.0).abs() < 1e-9);
        assert!((parts[0].vertices.last().unwrap().x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn clip_line_outside_square_is_empty() {
        let line = Polyline::new(vec![Point::new(-5.0, 20.0), Point::new(15.0, 20.0)]);
        assert!(clip_polyline(&line, &unit_square()).is_empty());
    }

    #[test]
    fn clip_reentrant_line_yields_two_parts() {
        // u-shaped polygon crossed by one straight segment
        let ring = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(6.0, 10.0),
            Point::new(6.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let line = Polyline::new(vec![Point::new(-1.0, 8.0), Point::new(11.0, 8.0)]);
        let parts = clip_polyline(&line, &ring);
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn clip3_interpolates_z() {
        let line = Polyline3::new(vec![
            Point3::new(-10.0, 5.0, 0.0),
            Point3::new(10.0, 5.0, 20.0),
        ]);
        let parts = clip_polyline3(&line, &unit_square());
        assert_eq!(parts.len(), 1);
        let start = parts[0].vertices[0];
        let end = *parts[0].vertices.last().unwrap();
        assert!((start.z - 10.0).abs() < 1e-9);
        assert!((end.z - 20.0).abs() < 1e-9);
    }

    #[test]
    fn probe_crosses_zigzag_twice() {
        let engine = PlanarEngine;
        let probe = Geometry::Line(Polyline::new(vec![
            Point::new(5.0, -100.0),
            Point::new(5.0, 100.0),
        ]));
        let zigzag = Geometry::Line(Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ]));
        let hits = engine.intersect(&probe, &zigzag, IntersectMode::Point);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn point_on_line_within_tolerance() {
        let engine = PlanarEngine;
        let line = Geometry::Line(Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        ]));
        let on = Geometry::Point(Point::new(5.0, 0.0005));
        let off = Geometry::Point(Point::new(5.0, 0.5));
        assert_eq!(engine.intersect(&line, &on, IntersectMode::Point).len(), 1);
        assert!(engine.intersect(&line, &off, IntersectMode::Point).is_empty());
    }

    #[test]
    fn buffer_contains_nearby_points() {
        let engine = PlanarEngine;
        let line = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        let region = engine.buffer(&[line], 50.0);
        assert!(region.contains(Point::new(50.0, 49.0)));
        assert!(!region.contains(Point::new(50.0, 51.0)));
    }
}
