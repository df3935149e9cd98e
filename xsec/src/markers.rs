//! Vertical marker lines in section view.
//!
//! Wherever an input feature meets a trace in map view, a full-height
//! vertical line is placed at the corresponding display x. Polygons mark
//! both edges of their overlap with the trace, lines mark each crossing,
//! and points on the trace mark their own position. Input attributes are
//! joined onto the markers.

use log::info;

use crate::config::MarkerConfig;
use crate::container::Container;
use crate::crs;
use crate::dataset::{carry_fields, Feature, FeatureClass, FieldType, Geometry, GeometryKind, Value};
use crate::engine::{GeometryEngine, IntersectMode, PlanarEngine};
use crate::error::Result;
use crate::geometry::{Point, Polyline};
use crate::trace::{traces_from_class, SectionTransform, Trace};

const UNIQUE_ID_FIELD: &str = "unique_id";

/// Display-x positions where one input feature meets a trace.
fn marker_positions(
    feature_geom: &Geometry,
    trace: &Trace,
    transform: &SectionTransform,
    engine: &dyn GeometryEngine,
) -> Vec<f64> {
    let trace_geom = Geometry::Line(trace.polyline());
    let mut positions = Vec::new();
    for part in engine.split_multipart(feature_geom) {
        match part {
            // each overlap run marks its entry and exit
            Geometry::Polygon(_) => {
                for piece in engine.intersect(&part, &trace_geom, IntersectMode::Line) {
                    let Geometry::Line(clipped) = piece else {
                        continue;
                    };
                    let (Some(first), Some(last)) =
                        (clipped.vertices.first(), clipped.vertices.last())
                    else {
                        continue;
                    };
                    for endpoint in [*first, *last] {
                        positions
                            .push(transform.display_x(engine.project_arc_length(trace, endpoint)));
                    }
                }
            }
            Geometry::Line(_) | Geometry::LineZ(_) | Geometry::Point(_) | Geometry::PointZ(_) => {
                let flat = flatten_z(&part);
                for hit in engine.intersect(&flat, &trace_geom, IntersectMode::Point) {
                    let Geometry::Point(pt) = hit else {
                        continue;
                    };
                    positions.push(transform.display_x(engine.project_arc_length(trace, pt)));
                }
            }
            Geometry::Multi(_) => {}
        }
    }
    positions
}

fn flatten_z(geometry: &Geometry) -> Geometry {
    match geometry {
        Geometry::PointZ(p) => Geometry::Point(p.xy()),
        Geometry::LineZ(line) => Geometry::Line(Polyline::new(
            line.vertices.iter().map(|v| v.xy()).collect(),
        )),
        other => other.clone(),
    }
}

/// Builds the vertical marker class for one input feature class.
///
/// Exact duplicate markers from the same input feature are merged, the way
/// a dissolve on all attributes would.
pub fn marker_lines(
    input: &FeatureClass,
    traces: &[Trace],
    id_field: &str,
    cfg: &MarkerConfig,
    vertical_exaggeration: u32,
    engine: &dyn GeometryEngine,
) -> Result<FeatureClass> {
    let transform = SectionTransform::new(vertical_exaggeration);
    let mut fc = FeatureClass::new(
        format!("{}_markers_{}x", input.name, vertical_exaggeration),
        GeometryKind::Line,
    );
    fc.schema.push_field(id_field, FieldType::Text);
    fc.schema.push_field(UNIQUE_ID_FIELD, FieldType::Long);

    // (display x, trace id, input row) triples already emitted
    let mut seen: Vec<(f64, String, Value)> = Vec::new();
    for trace in traces {
        for feature in &input.features {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            let unique_id = feature.get(UNIQUE_ID_FIELD).clone();
            for x in marker_positions(geometry, trace, &transform, engine) {
                let duplicate = seen.iter().any(|(sx, sid, suid)| {
                    (sx - x).abs() < 1e-9 && sid == &trace.id && suid == &unique_id
                });
                if duplicate {
                    continue;
                }
                seen.push((x, trace.id.clone(), unique_id.clone()));
                let line = Polyline::new(vec![
                    Point::new(x, cfg.bottom),
                    Point::new(x, cfg.top),
                ]);
                fc.insert(
                    Feature::new(Geometry::Line(line))
                        .with_attr(id_field, Value::Text(trace.id.clone()))
                        .with_attr(UNIQUE_ID_FIELD, unique_id.clone()),
                );
            }
        }
    }
    Ok(fc)
}

/// Runs the vertical marker pipeline against a container, returning the
/// output name.
pub fn write_vertical_markers(
    container: &Container,
    traces_name: &str,
    input_name: &str,
    id_field: &str,
    cfg: &MarkerConfig,
    vertical_exaggeration: u32,
) -> Result<String> {
    let engine = PlanarEngine;
    let xsln = container.load(traces_name)?;
    crs::warn_if_unknown(&xsln.name, &xsln.crs);
    let traces = traces_from_class(&xsln, id_field)?;

    let mut input = container.load(input_name)?;
    input.tag_unique_ids(UNIQUE_ID_FIELD)?;
    let temp_name = format!("{}_temp", input.name);
    input.name = temp_name.clone();
    container.save(&input)?;

    let mut markers = marker_lines(
        &input,
        &traces,
        id_field,
        cfg,
        vertical_exaggeration,
        &engine,
    )?;
    markers.name = format!("{input_name}_markers_{vertical_exaggeration}x");
    info!("joining input attributes to {}", markers.name);
    let carried = carry_fields(&input.schema, &[UNIQUE_ID_FIELD, id_field]);
    markers.join_field(UNIQUE_ID_FIELD, &input, UNIQUE_ID_FIELD, &carried)?;
    markers.drop_field(UNIQUE_ID_FIELD);
    container.save(&markers)?;

    info!("deleting temporary files");
    container.delete_or_warn(&temp_name);
    Ok(markers.name)
}
