//! Polygon intersections with surface profiles.
//!
//! Where a map-view polygon (bedrock geology, surficial units) overlaps a
//! 3D surface profile, the overlapping pieces are converted to section view
//! as lines, with companion points at the ends of each piece. The polygon's
//! attributes ride along on both outputs.

use log::info;

use crate::container::Container;
use crate::crs;
use crate::dataset::{carry_fields, Feature, FeatureClass, FieldType, Geometry, GeometryKind, Value};
use crate::engine::{GeometryEngine, IntersectMode, PlanarEngine};
use crate::error::{Error, Result};
use crate::trace::{traces_from_class, SectionTransform, Trace};

const UNIQUE_ID_FIELD: &str = "unique_id";

/// Source dataset names for the polygon intersection pipeline.
#[derive(Debug, Clone)]
pub struct PolygonIntersectParams<'a> {
    pub traces: &'a str,
    pub profiles: &'a str,
    pub polygons: &'a str,
}

/// Clipped profile pieces and their endpoints for one polygon class.
#[derive(Debug)]
pub struct SectionIntersections {
    pub lines: FeatureClass,
    pub points: FeatureClass,
}

/// Intersects every polygon with every matching profile and converts the
/// overlapping pieces to section view.
pub fn intersect_polygons(
    traces: &[Trace],
    profiles: &FeatureClass,
    polygons: &FeatureClass,
    id_field: &str,
    vertical_exaggeration: u32,
    engine: &dyn GeometryEngine,
) -> Result<SectionIntersections> {
    profiles.require_field(id_field)?;
    if profiles.geometry_kind != Some(GeometryKind::LineZ) {
        return Err(Error::WrongGeometryType {
            dataset: profiles.name.clone(),
            expected: GeometryKind::LineZ.name(),
            found: profiles
                .geometry_kind
                .map(|k| k.name().to_string())
                .unwrap_or_else(|| "table".to_string()),
        });
    }
    polygons.require_geometry(GeometryKind::Polygon)?;

    let transform = SectionTransform::new(vertical_exaggeration);
    let mut lines = FeatureClass::new(
        format!("{}_intersect_lines_{}x", polygons.name, vertical_exaggeration),
        GeometryKind::Line,
    );
    let mut points = FeatureClass::new(
        format!(
            "{}_intersect_points_{}x",
            polygons.name, vertical_exaggeration
        ),
        GeometryKind::Point,
    );
    for fc in [&mut lines, &mut points] {
        fc.schema.push_field(id_field, FieldType::Text);
        fc.schema.push_field(UNIQUE_ID_FIELD, FieldType::Long);
    }

    for profile_feature in &profiles.features {
        let Some(id) = profile_feature.text(id_field) else {
            continue;
        };
        let Some(trace) = traces.iter().find(|t| t.id == id) else {
            info!("no trace matches profile line {id}, skipping");
            continue;
        };
        let Some(profile_geom) = &profile_feature.geometry else {
            continue;
        };
        for polygon_feature in &polygons.features {
            let Some(polygon_geom) = &polygon_feature.geometry else {
                continue;
            };
            let unique_id = polygon_feature.get(UNIQUE_ID_FIELD).clone();
            for piece in engine.intersect(polygon_geom, profile_geom, IntersectMode::Line) {
                let Geometry::LineZ(part) = piece else {
                    continue;
                };
                let section = transform.line3_to_section(trace, &part);
                let endpoints = [*section.vertices.first().ok_or_else(degenerate_part)?,
                    *section.vertices.last().ok_or_else(degenerate_part)?];
                lines.insert(
                    Feature::new(Geometry::Line(section))
                        .with_attr(id_field, Value::Text(id.to_string()))
                        .with_attr(UNIQUE_ID_FIELD, unique_id.clone()),
                );
                for endpoint in endpoints {
                    points.insert(
                        Feature::new(Geometry::Point(endpoint))
                            .with_attr(id_field, Value::Text(id.to_string()))
                            .with_attr(UNIQUE_ID_FIELD, unique_id.clone()),
                    );
                }
            }
        }
    }
    Ok(SectionIntersections { lines, points })
}

fn degenerate_part() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        "intersection produced an empty line part",
    ))
}

/// Runs the polygon intersection pipeline against a container, returning
/// the names of the line and point outputs.
pub fn write_polygon_intersections(
    container: &Container,
    params: &PolygonIntersectParams<'_>,
    id_field: &str,
    vertical_exaggeration: u32,
) -> Result<(String, String)> {
    let engine = PlanarEngine;
    let xsln = container.load(params.traces)?;
    crs::warn_if_unknown(&xsln.name, &xsln.crs);
    let traces = traces_from_class(&xsln, id_field)?;
    let profiles = container.load(params.profiles)?;

    // work on a tagged copy so polygon attributes can be joined back by row
    let mut polys = container.load(params.polygons)?;
    polys.tag_unique_ids(UNIQUE_ID_FIELD)?;
    let temp_name = format!("{}_temp", polys.name);
    polys.name = temp_name.clone();
    container.save(&polys)?;

    let mut out = intersect_polygons(
        &traces,
        &profiles,
        &polys,
        id_field,
        vertical_exaggeration,
        &engine,
    )?;
    // outputs are named for the input class, not the tagged copy
    out.lines.name = format!(
        "{}_intersect_lines_{}x",
        params.polygons, vertical_exaggeration
    );
    out.points.name = format!(
        "{}_intersect_points_{}x",
        params.polygons, vertical_exaggeration
    );

    info!("joining polygon attributes to intersect output");
    let carried = carry_fields(&polys.schema, &[UNIQUE_ID_FIELD, id_field]);
    for fc in [&mut out.lines, &mut out.points] {
        fc.join_field(UNIQUE_ID_FIELD, &polys, UNIQUE_ID_FIELD, &carried)?;
        fc.drop_field(UNIQUE_ID_FIELD);
    }
    container.save(&out.lines)?;
    container.save(&out.points)?;

    info!("deleting temporary files");
    container.delete_or_warn(&temp_name);
    Ok((out.lines.name, out.points.name))
}
