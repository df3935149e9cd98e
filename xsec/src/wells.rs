//! Well point and stratigraphy attachment.
//!
//! Clips statewide well data to a buffer around the traces, spatial-joins
//! trace attributes onto each point (one row per point/trace pair), and
//! derives construction interval elevations from surface elevation and
//! drilled depths.

use log::info;

use crate::config::WellConfig;
use crate::container::Container;
use crate::crs;
use crate::dataset::{carry_fields, Feature, FeatureClass, FieldType, Geometry, GeometryKind, Value};
use crate::engine::{GeometryEngine, PlanarEngine};
use crate::error::Result;
use crate::geometry::{Point, Polyline};

pub const RELATE_ID_FIELD: &str = "relateid";
pub const ELEVATION_FIELD: &str = "elevation";
pub const FROM_DEPTH_FIELD: &str = "from_depth";
pub const TO_DEPTH_FIELD: &str = "to_depth";
pub const ELEV_TOP_FIELD: &str = "elev_top";
pub const ELEV_BOT_FIELD: &str = "elev_bot";

fn point_of(feature: &Feature) -> Option<Point> {
    match feature.geometry.as_ref()?.parts().into_iter().next()? {
        Geometry::Point(p) => Some(p),
        Geometry::PointZ(p) => Some(p.xy()),
        _ => None,
    }
}

fn line_of(feature: &Feature) -> Option<Polyline> {
    match feature.geometry.as_ref()?.parts().into_iter().next()? {
        Geometry::Line(line) => Some(line),
        Geometry::LineZ(line) => Some(Polyline::new(
            line.vertices.iter().map(|v| v.xy()).collect(),
        )),
        _ => None,
    }
}

/// Keeps only the points within `distance` of any trace.
pub fn clip_points_to_buffer(
    points: &FeatureClass,
    xsln: &FeatureClass,
    distance: f64,
    engine: &dyn GeometryEngine,
    out_name: &str,
) -> Result<FeatureClass> {
    points.require_geometry(GeometryKind::Point)?;
    let lines: Vec<Polyline> = xsln.features.iter().filter_map(line_of).collect();
    let region = engine.buffer(&lines, distance);

    let mut out = FeatureClass::new(out_name, GeometryKind::Point);
    out.crs = points.crs.clone();
    out.schema = points.schema.clone();
    for feature in &points.features {
        if point_of(feature).is_some_and(|p| region.contains(p)) {
            out.insert(feature.clone());
        }
    }
    Ok(out)
}

/// One-to-many spatial join of trace attributes onto buffered points.
///
/// A point within range of several traces yields one output row per trace.
/// All non-reserved trace fields are carried; names already present on the
/// point dataset keep the point's value.
pub fn spatial_join_traces(
    points: &FeatureClass,
    xsln: &FeatureClass,
    distance: f64,
    engine: &dyn GeometryEngine,
    out_name: &str,
) -> Result<FeatureClass> {
    points.require_geometry(GeometryKind::Point)?;
    let carried = carry_fields(&xsln.schema, &[]);

    let mut out = FeatureClass::new(out_name, GeometryKind::Point);
    out.crs = points.crs.clone();
    out.schema = points.schema.clone();
    for name in &carried {
        if let Some(def) = xsln.schema.field(name) {
            out.schema.push_field(&def.name, def.ty);
        }
    }

    for trace_feature in &xsln.features {
        let Some(line) = line_of(trace_feature) else {
            continue;
        };
        let region = engine.buffer(&[line], distance);
        for point_feature in &points.features {
            let Some(p) = point_of(point_feature) else {
                continue;
            };
            if !region.contains(p) {
                continue;
            }
            let mut joined = point_feature.clone();
            for name in &carried {
                if points.schema.has_field(name) {
                    continue;
                }
                joined.set(name, trace_feature.get(name).clone());
            }
            out.insert(joined);
        }
    }
    Ok(out)
}

/// Drops geometry, turning a point class into a plain table.
pub fn export_as_table(fc: &FeatureClass, out_name: &str) -> FeatureClass {
    let mut table = FeatureClass::table(out_name);
    table.schema = fc.schema.clone();
    for feature in &fc.features {
        let mut row = feature.clone();
        row.geometry = None;
        table.insert(row);
    }
    table
}

/// Selects construction records whose relate-ID matches a clipped well.
pub fn select_construction_records(
    state_table: &FeatureClass,
    wells: &FeatureClass,
    out_name: &str,
) -> Result<FeatureClass> {
    state_table.require_field(RELATE_ID_FIELD)?;
    wells.require_field(RELATE_ID_FIELD)?;
    let ids: std::collections::BTreeSet<&str> = wells
        .features
        .iter()
        .filter_map(|f| f.text(RELATE_ID_FIELD))
        .collect();

    let mut out = FeatureClass::table(out_name);
    out.schema = state_table.schema.clone();
    for feature in &state_table.features {
        if feature
            .text(RELATE_ID_FIELD)
            .is_some_and(|id| ids.contains(id))
        {
            out.insert(feature.clone());
        }
    }
    Ok(out)
}

/// Derives `elev_top` and `elev_bot` from the well surface elevation and
/// the interval depths. Rows missing any operand are left underived.
pub fn derive_interval_elevations(table: &mut FeatureClass) -> Result<()> {
    table.require_field(ELEVATION_FIELD)?;
    table.require_field(FROM_DEPTH_FIELD)?;
    table.require_field(TO_DEPTH_FIELD)?;
    table.schema.push_field(ELEV_TOP_FIELD, FieldType::Double);
    table.schema.push_field(ELEV_BOT_FIELD, FieldType::Double);
    for feature in &mut table.features {
        let (Some(elevation), Some(from_depth), Some(to_depth)) = (
            feature.double(ELEVATION_FIELD),
            feature.double(FROM_DEPTH_FIELD),
            feature.double(TO_DEPTH_FIELD),
        ) else {
            continue;
        };
        feature.set(ELEV_TOP_FIELD, Value::Double(elevation - from_depth));
        feature.set(ELEV_BOT_FIELD, Value::Double(elevation - to_depth));
    }
    Ok(())
}

/// Source and output dataset names for the well-data pipeline.
#[derive(Debug, Clone)]
pub struct WellDataParams<'a> {
    pub traces: &'a str,
    pub well_points: &'a str,
    pub stratigraphy: Option<&'a str>,
    pub construction: Option<&'a str>,
}

/// Runs the full well-data pipeline against a container.
///
/// Outputs `wwpt` (joined well points), optionally `strat_cwi`
/// (stratigraphy table) and `constr_cwi` (construction intervals).
pub fn write_well_data(
    container: &Container,
    params: &WellDataParams<'_>,
    cfg: &WellConfig,
) -> Result<()> {
    let engine = PlanarEngine;
    let xsln = container.load(params.traces)?;
    crs::warn_if_unknown(&xsln.name, &xsln.crs);
    let state_points = container.load(params.well_points)?;

    info!("clipping statewide well points with trace buffer");
    let clipped = clip_points_to_buffer(
        &state_points,
        &xsln,
        cfg.buffer_distance,
        &engine,
        "wwpt_temp",
    )?;
    container.save(&clipped)?;

    info!("spatial join of trace attributes to well points");
    let wwpt = spatial_join_traces(&clipped, &xsln, cfg.buffer_distance, &engine, "wwpt")?;
    container.save(&wwpt)?;

    if let Some(strat_name) = params.stratigraphy {
        info!("clipping statewide stratigraphy data with trace buffer");
        let state_strat = container.load(strat_name)?;
        let strat_clipped = clip_points_to_buffer(
            &state_strat,
            &xsln,
            cfg.buffer_distance,
            &engine,
            "strat_temp",
        )?;
        container.save(&strat_clipped)?;
        let strat_joined = spatial_join_traces(
            &strat_clipped,
            &xsln,
            cfg.buffer_distance,
            &engine,
            "strat_temp2",
        )?;
        container.save(&strat_joined)?;
        info!("exporting stratigraphy points to table");
        container.save(&export_as_table(&strat_joined, "strat_cwi"))?;
    }

    if let Some(construction_name) = params.construction {
        let state_construction = container.load(construction_name)?;
        let mut construction =
            select_construction_records(&state_construction, &wwpt, "constr_cwi")?;
        info!("joining elevation field from well point file");
        construction.join_field(
            RELATE_ID_FIELD,
            &wwpt,
            RELATE_ID_FIELD,
            &[ELEVATION_FIELD.to_string()],
        )?;
        derive_interval_elevations(&mut construction)?;
        container.save(&construction)?;
    }

    info!("deleting temporary files");
    container.delete_or_warn("wwpt_temp");
    if params.stratigraphy.is_some() {
        container.delete_or_warn("strat_temp");
        container.delete_or_warn("strat_temp2");
    }
    Ok(())
}
