//! Surface profiles along cross-section traces.
//!
//! Each raster surface is draped along every trace, producing a 3D profile
//! class in map view and a companion 2D class in section view. Trace
//! attributes are carried onto both.

use std::path::Path;

use log::info;

use crate::container::Container;
use crate::crs;
use crate::dataset::{carry_fields, Feature, FeatureClass, FieldType, Geometry, GeometryKind, Value};
use crate::error::Result;
use crate::raster::Raster;
use crate::trace::{traces_from_class, SectionTransform, Trace};

/// Builds the 3D and section-view profile classes for one raster surface.
pub fn profile_classes(
    raster: &Raster,
    traces: &[Trace],
    id_field: &str,
    vertical_exaggeration: u32,
) -> (FeatureClass, FeatureClass) {
    let transform = SectionTransform::new(vertical_exaggeration);
    let mut profiles3d = FeatureClass::new(
        format!("{}_profiles3d", raster.name()),
        GeometryKind::LineZ,
    );
    let mut profiles2d = FeatureClass::new(
        format!("{}_profiles2d_{}x", raster.name(), vertical_exaggeration),
        GeometryKind::Line,
    );
    profiles3d.schema.push_field(id_field, FieldType::Text);
    profiles2d.schema.push_field(id_field, FieldType::Text);

    for trace in traces {
        let parts = raster.drape(trace);
        if parts.is_empty() {
            info!(
                "line {} does not overlap surface {}, skipping",
                trace.id,
                raster.name()
            );
            continue;
        }
        info!(
            "draped line {} on {} ({} part{})",
            trace.id,
            raster.name(),
            parts.len(),
            if parts.len() == 1 { "" } else { "s" }
        );
        for part in parts {
            let section = transform.line3_to_section(trace, &part);
            profiles3d.insert(
                Feature::new(Geometry::LineZ(part))
                    .with_attr(id_field, Value::Text(trace.id.clone())),
            );
            profiles2d.insert(
                Feature::new(Geometry::Line(section))
                    .with_attr(id_field, Value::Text(trace.id.clone())),
            );
        }
    }
    (profiles3d, profiles2d)
}

/// Runs the raster profile pipeline against a container for every surface
/// file given, returning the `(profiles3d, profiles2d)` output names.
pub fn write_raster_profiles(
    container: &Container,
    traces_name: &str,
    rasters: &[impl AsRef<Path>],
    id_field: &str,
    vertical_exaggeration: u32,
) -> Result<Vec<(String, String)>> {
    let xsln = container.load(traces_name)?;
    crs::warn_if_unknown(&xsln.name, &xsln.crs);
    let traces = traces_from_class(&xsln, id_field)?;
    let carried: Vec<String> = carry_fields(&xsln.schema, &[id_field]);

    let mut outputs = Vec::with_capacity(rasters.len());
    for path in rasters {
        let raster = Raster::from_ascii_grid(path)?;
        info!("working on surface {}", raster.name());
        let (mut profiles3d, mut profiles2d) =
            profile_classes(&raster, &traces, id_field, vertical_exaggeration);
        for fc in [&mut profiles3d, &mut profiles2d] {
            fc.crs = xsln.crs.clone();
            fc.join_field(id_field, &xsln, id_field, &carried)?;
        }
        container.save(&profiles3d)?;
        container.save(&profiles2d)?;
        outputs.push((profiles3d.name, profiles2d.name));
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use std::io::Write;

    fn flat_raster() -> (tempfile::NamedTempFile, Raster) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"ncols 4\nnrows 4\nxllcorner 0.0\nyllcorner 0.0\ncellsize 1000.0\n\
              NODATA_value -9999\n\
              1200 1200 1200 1200\n1200 1200 1200 1200\n\
              1200 1200 1200 1200\n1200 1200 1200 1200\n",
        )
        .unwrap();
        let raster = Raster::from_ascii_grid(file.path()).unwrap();
        (file, raster)
    }

    #[test]
    fn profiles_come_in_map_and_section_pairs() {
        let (_file, raster) = flat_raster();
        let traces = vec![Trace::new(
            "01",
            vec![Point::new(500.0, 2000.0), Point::new(3548.0, 2000.0)],
        )];
        let (p3d, p2d) = profile_classes(&raster, &traces, "et_id", 50);
        assert_eq!(p3d.len(), 1);
        assert_eq!(p2d.len(), 1);
        assert_eq!(p3d.features[0].text("et_id"), Some("01"));

        let Some(Geometry::LineZ(line3)) = &p3d.features[0].geometry else {
            panic!("expected 3d line");
        };
        assert!(line3.vertices.iter().all(|v| (v.z - 1200.0).abs() < 1e-9));

        let Some(Geometry::Line(section)) = &p2d.features[0].geometry else {
            panic!("expected section line");
        };
        // flat surface stays at its elevation in section view
        assert!(section.vertices.iter().all(|v| (v.y - 1200.0).abs() < 1e-9));
        // trace is 3048 m long: 200 display units at 50x
        let last = section.vertices.last().unwrap();
        assert!((last.x - 200.0).abs() < 1e-6);
    }

    #[test]
    fn trace_outside_surface_is_skipped() {
        let (_file, raster) = flat_raster();
        let traces = vec![Trace::new(
            "09",
            vec![Point::new(50_000.0, 50_000.0), Point::new(51_000.0, 50_000.0)],
        )];
        let (p3d, p2d) = profile_classes(&raster, &traces, "et_id", 50);
        assert!(p3d.is_empty());
        assert!(p2d.is_empty());
    }
}
