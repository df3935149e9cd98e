//! Cross-section traces and the map-view to section-view transform.
//!
//! A trace is the map-view reference polyline of one cross section. Section
//! view places distance along the trace on the horizontal axis (converted to
//! feet and divided by the vertical exaggeration) and true elevation in feet
//! on the vertical axis.

use crate::dataset::{FeatureClass, Geometry, GeometryKind};
use crate::error::Result;
use crate::geometry::{closest_point_on_segment, distance, Point, Polyline, Polyline3};

/// Planar trace coordinates are meters; display coordinates are feet.
pub const METERS_PER_FOOT: f64 = 0.3048;

/// Map-view cross-section reference polyline with its text identifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Trace {
    pub id: String,
    pub vertices: Vec<Point>,
}

impl Trace {
    pub fn new(id: impl Into<String>, vertices: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            vertices,
        }
    }

    /// Total planar length of the trace.
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| distance(pair[0], pair[1]))
            .sum()
    }

    /// Returns the trace vertices as a polyline.
    pub fn polyline(&self) -> Polyline {
        Polyline::new(self.vertices.clone())
    }

    /// Arc length from the trace start to the projection of `p` onto the
    /// trace.
    ///
    /// Points off the trace are projected perpendicularly onto the nearest
    /// segment; when two segments are equally near, the one earlier along
    /// the trace wins. Points beyond an end project onto the end vertex.
    pub fn measure_on_line(&self, p: Point) -> f64 {
        let mut best_dist = f64::INFINITY;
        let mut best_measure = 0.0;
        let mut cumulative = 0.0;
        for pair in self.vertices.windows(2) {
            let seg_len = distance(pair[0], pair[1]);
            let (q, t) = closest_point_on_segment(pair[0], pair[1], p);
            let d = distance(p, q);
            if d < best_dist {
                best_dist = d;
                best_measure = cumulative + t * seg_len;
            }
            cumulative += seg_len;
        }
        best_measure
    }

    /// Returns the point at the given arc length along the trace, clamped to
    /// the trace ends.
    pub fn point_at(&self, station: f64) -> Option<Point> {
        let first = *self.vertices.first()?;
        if station <= 0.0 {
            return Some(first);
        }
        let mut remaining = station;
        for pair in self.vertices.windows(2) {
            let seg_len = distance(pair[0], pair[1]);
            if remaining <= seg_len {
                let t = if seg_len < f64::EPSILON {
                    0.0
                } else {
                    remaining / seg_len
                };
                return Some(Point::new(
                    pair[0].x + t * (pair[1].x - pair[0].x),
                    pair[0].y + t * (pair[1].y - pair[0].y),
                ));
            }
            remaining -= seg_len;
        }
        self.vertices.last().copied()
    }

    /// Stations of the trace vertices, starting at zero.
    pub fn vertex_stations(&self) -> Vec<f64> {
        let mut stations = Vec::with_capacity(self.vertices.len());
        let mut cumulative = 0.0;
        stations.push(0.0);
        for pair in self.vertices.windows(2) {
            cumulative += distance(pair[0], pair[1]);
            stations.push(cumulative);
        }
        stations
    }
}

/// Builds traces from a polyline feature class, keyed by the text field
/// `id_field`. Rows with a null identifier or degenerate geometry are
/// skipped; only the first part of multipart lines is used.
pub fn traces_from_class(fc: &FeatureClass, id_field: &str) -> Result<Vec<Trace>> {
    fc.require_field(id_field)?;
    if !matches!(
        fc.geometry_kind,
        Some(GeometryKind::Line | GeometryKind::LineZ)
    ) {
        fc.require_geometry(GeometryKind::Line)?;
    }
    let mut traces = Vec::new();
    for feature in &fc.features {
        let Some(id) = feature.text(id_field) else {
            continue;
        };
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let vertices: Vec<Point> = geometry
            .parts()
            .into_iter()
            .find_map(|part| match part {
                Geometry::Line(line) => Some(line.vertices),
                Geometry::LineZ(line) => Some(line.vertices.iter().map(|v| v.xy()).collect()),
                _ => None,
            })
            .unwrap_or_default();
        if vertices.len() >= 2 {
            traces.push(Trace::new(id, vertices));
        }
    }
    Ok(traces)
}

/// Map view to cross-section view conversion for one exaggeration factor.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SectionTransform {
    pub vertical_exaggeration: f64,
}

impl SectionTransform {
    pub fn new(vertical_exaggeration: u32) -> Self {
        Self {
            vertical_exaggeration: f64::from(vertical_exaggeration),
        }
    }

    /// Display x for a planar distance along the trace, in meters.
    pub fn display_x(&self, distance_m: f64) -> f64 {
        (distance_m / METERS_PER_FOOT) / self.vertical_exaggeration
    }

    /// Converts a map-view point near `trace` with a known elevation to
    /// section view.
    pub fn to_section(&self, trace: &Trace, map_xy: Point, elevation: f64) -> Point {
        Point::new(self.display_x(trace.measure_on_line(map_xy)), elevation)
    }

    /// Converts a 3D polyline to section view vertex by vertex, pairing each
    /// vertex's along-trace distance with its elevation.
    pub fn line3_to_section(&self, trace: &Trace, line: &Polyline3) -> Polyline {
        Polyline::new(
            line.vertices
                .iter()
                .map(|v| self.to_section(trace, v.xy(), v.z))
                .collect(),
        )
    }
}
