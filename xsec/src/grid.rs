//! Reference grid generation for cross-section sheets.
//!
//! Produces two line classes: horizontal elevation gridlines spanning the
//! display width, and vertical coordinate gridlines located wherever a
//! probe line at a given planar x crosses a trace. Both carry `label`
//! (the elevation or coordinate value) and `rank` (`major`/`minor`).

use log::info;

use crate::config::GridConfig;
use crate::container::Container;
use crate::crs;
use crate::dataset::{Feature, FeatureClass, FieldType, Geometry, GeometryKind, Value};
use crate::engine::{GeometryEngine, IntersectMode, PlanarEngine};
use crate::error::{Error, Result};
use crate::geometry::{Point, Polyline};
use crate::trace::{traces_from_class, SectionTransform, Trace};

pub const RANK_MAJOR: &str = "major";
pub const RANK_MINOR: &str = "minor";

const LABEL_FIELD: &str = "label";
const RANK_FIELD: &str = "rank";

/// A zero or negative step would loop forever; reject it up front.
fn require_positive(name: &'static str, value: i64) -> Result<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(Error::BadInterval { name, value })
    }
}

/// Values from `min` up to but excluding `max`, stepped by `interval`.
fn interval_values(min: i64, max: i64, interval: i64) -> Vec<i64> {
    let mut values = Vec::new();
    let mut v = min;
    while v < max {
        values.push(v);
        v += interval;
    }
    values
}

/// Major and minor elevation values for the grid. Values up to one minor
/// interval outside `min_z..max_z` are tolerated; any value belonging to
/// the major set is excluded from the minor set.
pub fn elevation_values(cfg: &GridConfig) -> Result<(Vec<i64>, Vec<i64>)> {
    require_positive("major_elev_interval", cfg.major_elev_interval)?;
    require_positive("minor_elev_interval", cfg.minor_elev_interval)?;
    let major: Vec<i64> = interval_values(cfg.min_z, cfg.max_z, cfg.major_elev_interval);
    let minor: Vec<i64> = interval_values(cfg.min_z, cfg.max_z, cfg.minor_elev_interval)
        .into_iter()
        .filter(|v| !major.contains(v))
        .collect();
    let below = cfg.min_z - cfg.minor_elev_interval;
    let above = cfg.max_z + cfg.minor_elev_interval;
    let clamp = |values: Vec<i64>| -> Vec<i64> {
        values
            .into_iter()
            .filter(|v| *v >= below && *v <= above)
            .collect()
    };
    Ok((clamp(major), clamp(minor)))
}

// ties round away from zero: a padded extent of 2500 becomes 3000, not the
// nearest even thousand
fn round_to_thousand(v: i64) -> i64 {
    ((v as f64 / 1000.0).round() as i64) * 1000
}

/// Major and minor planar x values spanning the traces' extent, padded by
/// one major interval and rounded outward to the nearest 1000.
pub fn coordinate_values(traces: &[Trace], cfg: &GridConfig) -> Result<(Vec<i64>, Vec<i64>)> {
    require_positive("major_coord_interval", cfg.major_coord_interval)?;
    require_positive("minor_coord_interval", cfg.minor_coord_interval)?;
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    for trace in traces {
        for v in &trace.vertices {
            x_min = x_min.min(v.x);
            x_max = x_max.max(v.x);
        }
    }
    if !x_min.is_finite() {
        return Ok((Vec::new(), Vec::new()));
    }
    let lo = round_to_thousand(x_min as i64 - cfg.major_coord_interval);
    let hi = round_to_thousand(x_max as i64 + cfg.major_coord_interval);
    let major = interval_values(lo, hi, cfg.major_coord_interval);
    let minor = interval_values(lo, hi, cfg.minor_coord_interval)
        .into_iter()
        .filter(|v| !major.contains(v))
        .collect();
    Ok((major, minor))
}

/// Display width of the grid: the longest trace's length converted to
/// section view, truncated to a whole number of display units.
pub fn max_display_x(traces: &[Trace], transform: &SectionTransform) -> f64 {
    let max_length = traces.iter().map(Trace::length).fold(0.0, f64::max);
    transform.display_x(max_length).trunc()
}

/// Builds the horizontal elevation gridline class.
pub fn elevation_ref_lines(traces: &[Trace], cfg: &GridConfig) -> Result<FeatureClass> {
    let transform = SectionTransform::new(cfg.vertical_exaggeration);
    let max_x = max_display_x(traces, &transform);
    let (major, minor) = elevation_values(cfg)?;
    info!("major elevations: {major:?}");
    info!("minor elevations: {minor:?}");

    let mut fc = FeatureClass::new(
        format!("elevation_ref_lines_{}x", cfg.vertical_exaggeration),
        GeometryKind::Line,
    );
    fc.schema.push_field(LABEL_FIELD, FieldType::Long);
    fc.schema.push_field(RANK_FIELD, FieldType::Text);
    for (values, rank) in [(&major, RANK_MAJOR), (&minor, RANK_MINOR)] {
        for &elevation in values {
            let line = Polyline::new(vec![
                Point::new(0.0, elevation as f64),
                Point::new(max_x, elevation as f64),
            ]);
            fc.insert(
                Feature::new(Geometry::Line(line))
                    .with_attr(LABEL_FIELD, Value::Long(elevation))
                    .with_attr(RANK_FIELD, Value::Text(rank.to_string())),
            );
        }
    }
    Ok(fc)
}

/// Builds the vertical coordinate gridline class.
///
/// A trace crossed more than once by the same coordinate produces one line
/// per crossing.
pub fn coordinate_ref_lines(
    traces: &[Trace],
    cfg: &GridConfig,
    id_field: &str,
    engine: &dyn GeometryEngine,
) -> Result<FeatureClass> {
    let transform = SectionTransform::new(cfg.vertical_exaggeration);
    let (major, minor) = coordinate_values(traces, cfg)?;

    let mut fc = FeatureClass::new(
        format!("xcoord_ref_lines_{}x", cfg.vertical_exaggeration),
        GeometryKind::Line,
    );
    fc.schema.push_field(LABEL_FIELD, FieldType::Long);
    fc.schema.push_field(RANK_FIELD, FieldType::Text);
    fc.schema.push_field(id_field, FieldType::Text);

    for trace in traces {
        let trace_geom = Geometry::Line(trace.polyline());
        for (values, rank) in [(&major, RANK_MAJOR), (&minor, RANK_MINOR)] {
            info!("working on {rank} divisions for line {}", trace.id);
            for &coordinate in values {
                let probe = Geometry::Line(Polyline::new(vec![
                    Point::new(coordinate as f64, cfg.probe_y_min),
                    Point::new(coordinate as f64, cfg.probe_y_max),
                ]));
                for hit in engine.intersect(&probe, &trace_geom, IntersectMode::Point) {
                    let Geometry::Point(pt) = hit else {
                        continue;
                    };
                    let x = transform.display_x(engine.project_arc_length(trace, pt));
                    let line = Polyline::new(vec![
                        Point::new(x, cfg.min_z as f64),
                        Point::new(x, cfg.max_z as f64),
                    ]);
                    fc.insert(
                        Feature::new(Geometry::Line(line))
                            .with_attr(LABEL_FIELD, Value::Long(coordinate))
                            .with_attr(RANK_FIELD, Value::Text(rank.to_string()))
                            .with_attr(id_field, Value::Text(trace.id.clone())),
                    );
                }
            }
        }
    }
    Ok(fc)
}

/// Runs the full reference-grid pipeline against a container, returning the
/// names of the two output classes.
pub fn write_reference_grid(
    container: &Container,
    traces_name: &str,
    id_field: &str,
    cfg: &GridConfig,
) -> Result<(String, String)> {
    let xsln = container.load(traces_name)?;
    crs::warn_if_unknown(&xsln.name, &xsln.crs);
    let traces = traces_from_class(&xsln, id_field)?;
    let max_length = traces.iter().map(Trace::length).fold(0.0, f64::max);
    info!("maximum line length is {max_length}");

    let engine = PlanarEngine;
    let elevation = elevation_ref_lines(&traces, cfg)?;
    container.save(&elevation)?;
    let coordinate = coordinate_ref_lines(&traces, cfg, id_field, &engine)?;
    container.save(&coordinate)?;
    Ok((elevation.name, coordinate.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_set_excludes_major_multiples() {
        let cfg = GridConfig::default();
        let (major, minor) = elevation_values(&cfg).unwrap();
        // 0, 50, 100, ... 2450: one major line per multiple in range
        assert_eq!(major.len(), 50);
        assert_eq!(major[0], 0);
        assert_eq!(*major.last().unwrap(), 2450);
        assert!(minor.contains(&10));
        assert!(minor.contains(&40));
        assert!(minor.contains(&60));
        for v in &minor {
            assert!(v % 50 != 0, "minor set contains major multiple {v}");
            assert!(!major.contains(v));
        }
    }

    #[test]
    fn elevation_lines_span_display_width() {
        let traces = vec![Trace::new(
            "01",
            vec![Point::new(0.0, 0.0), Point::new(3048.0, 0.0)],
        )];
        let cfg = GridConfig::default();
        let fc = elevation_ref_lines(&traces, &cfg).unwrap();
        assert_eq!(fc.len(), 50 + 200);
        for feature in &fc.features {
            let Some(Geometry::Line(line)) = &feature.geometry else {
                panic!("expected line geometry");
            };
            // 3048 m at 50x exaggeration spans 200 display units
            assert_eq!(line.vertices[0].x, 0.0);
            assert_eq!(line.vertices[1].x, 200.0);
            assert_eq!(line.vertices[0].y, feature.long("label").unwrap() as f64);
        }
    }

    #[test]
    fn coordinate_lines_per_crossing() {
        // trace doubles back across x = 1000, so that coordinate appears twice
        let traces = vec![Trace::new(
            "02",
            vec![
                Point::new(500.0, 100.0),
                Point::new(1500.0, 100.0),
                Point::new(700.0, 900.0),
            ],
        )];
        let cfg = GridConfig {
            probe_y_min: 0.0,
            probe_y_max: 1000.0,
            ..GridConfig::default()
        };
        let engine = PlanarEngine;
        let fc = coordinate_ref_lines(&traces, &cfg, "et_id", &engine).unwrap();
        let at_1000: Vec<_> = fc
            .features
            .iter()
            .filter(|f| f.long("label") == Some(1000))
            .collect();
        assert_eq!(at_1000.len(), 2);
        for feature in at_1000 {
            assert_eq!(feature.text("et_id"), Some("02"));
            assert_eq!(feature.text("rank"), Some("major"));
        }
    }

    #[test]
    fn coordinate_extent_rounds_outward() {
        let traces = vec![Trace::new(
            "03",
            vec![Point::new(432_120.0, 0.0), Point::new(433_980.0, 10.0)],
        )];
        let (major, _) = coordinate_values(&traces, &GridConfig::default()).unwrap();
        assert_eq!(*major.first().unwrap(), 431_000);
        assert_eq!(*major.last().unwrap(), 434_000);
    }

    #[test]
    fn zero_or_negative_intervals_are_rejected() {
        let cfg = GridConfig {
            minor_elev_interval: 0,
            ..GridConfig::default()
        };
        let err = elevation_values(&cfg).unwrap_err();
        assert!(matches!(
            err,
            Error::BadInterval {
                name: "minor_elev_interval",
                value: 0,
            }
        ));

        let traces = vec![Trace::new(
            "04",
            vec![Point::new(431_000.0, 0.0), Point::new(432_000.0, 0.0)],
        )];
        let cfg = GridConfig {
            major_coord_interval: -1000,
            ..GridConfig::default()
        };
        assert!(matches!(
            coordinate_values(&traces, &cfg),
            Err(Error::BadInterval { .. })
        ));
    }

    #[test]
    fn half_thousand_extents_round_away_from_zero() {
        // x extent 431500 padded by 1000: 430500 and 432500 both sit on a
        // half-thousand boundary
        let traces = vec![Trace::new(
            "05",
            vec![Point::new(431_500.0, 0.0), Point::new(431_500.0, 100.0)],
        )];
        let (major, _) = coordinate_values(&traces, &GridConfig::default()).unwrap();
        assert_eq!(*major.first().unwrap(), 431_000);
        assert_eq!(*major.last().unwrap(), 432_000);
    }
}
