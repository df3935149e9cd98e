use assert_fs::prelude::*;
use predicates::prelude::*;

use xsec::config::{Config, GridConfig, MarkerConfig, WellConfig};
use xsec::container::Container;
use xsec::crs::Crs;
use xsec::dataset::{
    Feature, FeatureClass, FieldType, Geometry, GeometryKind, Schema, Value,
};
use xsec::geometry::{Point, Point3, Polyline, Polyline3};
use xsec::grid::write_reference_grid;
use xsec::markers::write_vertical_markers;
use xsec::polygons::{write_polygon_intersections, PolygonIntersectParams};
use xsec::profile::write_raster_profiles;
use xsec::wells::{write_well_data, WellDataParams};

fn trace_class() -> FeatureClass {
    let mut fc = FeatureClass::new("xsln", GeometryKind::Line);
    fc.crs = Crs::utm15n();
    fc.schema = Schema::with_fields(&[
        ("et_id", FieldType::Text),
        ("mapsheet", FieldType::Text),
        ("OBJECTID", FieldType::Long),
    ]);
    fc.insert(
        Feature::new(Geometry::Line(Polyline::new(vec![
            Point::new(430_000.0, 4_900_000.0),
            Point::new(433_048.0, 4_900_000.0),
        ])))
        .with_attr("et_id", Value::Text("01".to_string()))
        .with_attr("mapsheet", Value::Text("A1".to_string()))
        .with_attr("OBJECTID", Value::Long(1)),
    );
    fc
}

fn new_container(temp: &assert_fs::TempDir) -> Container {
    let container = Container::create(temp.child("gdb").path()).unwrap();
    container.save(&trace_class()).unwrap();
    container
}

#[test]
fn reference_grid_end_to_end() {
    let temp = assert_fs::TempDir::new().unwrap();
    let container = new_container(&temp);
    let cfg = GridConfig::default();
    let (elevation, coordinate) =
        write_reference_grid(&container, "xsln", "et_id", &cfg).unwrap();
    assert_eq!(elevation, "elevation_ref_lines_50x");
    assert_eq!(coordinate, "xcoord_ref_lines_50x");
    temp.child("gdb/elevation_ref_lines_50x.geojson")
        .assert(predicate::path::exists());

    let elev = container.load(&elevation).unwrap();
    // 50 majors plus 200 minors over 0..2500
    assert_eq!(elev.len(), 250);

    let coord = container.load(&coordinate).unwrap();
    assert!(!coord.is_empty());
    // 3048 m span padded by 1000 m each side: one major line per km crossing
    let majors = coord
        .features
        .iter()
        .filter(|f| f.text("rank") == Some("major"))
        .count();
    assert_eq!(majors, 4); // 430000, 431000, 432000, 433000
    for feature in &coord.features {
        assert_eq!(feature.text("et_id"), Some("01"));
        let Some(Geometry::Line(line)) = &feature.geometry else {
            panic!("expected line");
        };
        assert_eq!(line.vertices[0].y, 0.0);
        assert_eq!(line.vertices[1].y, 2500.0);
    }
}

#[test]
fn well_data_end_to_end() {
    let temp = assert_fs::TempDir::new().unwrap();
    let container = new_container(&temp);

    let mut wells = FeatureClass::new("loc_wells", GeometryKind::Point);
    wells.crs = Crs::utm15n();
    wells.schema = Schema::with_fields(&[
        ("relateid", FieldType::Text),
        ("elevation", FieldType::Double),
    ]);
    wells.insert(
        Feature::new(Geometry::Point(Point::new(431_000.0, 4_900_200.0)))
            .with_attr("relateid", Value::Text("100".to_string()))
            .with_attr("elevation", Value::Double(1300.0)),
    );
    wells.insert(
        Feature::new(Geometry::Point(Point::new(431_000.0, 4_950_000.0)))
            .with_attr("relateid", Value::Text("900".to_string()))
            .with_attr("elevation", Value::Double(1400.0)),
    );
    container.save(&wells).unwrap();

    let mut constr = FeatureClass::table("loc_wells_c5c2");
    constr.schema = Schema::with_fields(&[
        ("relateid", FieldType::Text),
        ("from_depth", FieldType::Double),
        ("to_depth", FieldType::Double),
    ]);
    constr.insert(
        Feature::row()
            .with_attr("relateid", Value::Text("100".to_string()))
            .with_attr("from_depth", Value::Double(20.0))
            .with_attr("to_depth", Value::Double(95.0)),
    );
    constr.insert(
        Feature::row()
            .with_attr("relateid", Value::Text("900".to_string()))
            .with_attr("from_depth", Value::Double(0.0))
            .with_attr("to_depth", Value::Double(50.0)),
    );
    container.save(&constr).unwrap();

    let params = WellDataParams {
        traces: "xsln",
        well_points: "loc_wells",
        stratigraphy: None,
        construction: Some("loc_wells_c5c2"),
    };
    write_well_data(&container, &params, &WellConfig::default()).unwrap();

    let wwpt = container.load("wwpt").unwrap();
    assert_eq!(wwpt.len(), 1);
    assert_eq!(wwpt.features[0].text("et_id"), Some("01"));
    assert_eq!(wwpt.features[0].text("mapsheet"), Some("A1"));
    assert!(!wwpt.schema.has_field("OBJECTID"));

    let out = container.load("constr_cwi").unwrap();
    assert_eq!(out.len(), 1); // the distant well never joins
    assert_eq!(out.features[0].double("elev_top"), Some(1280.0));
    assert_eq!(out.features[0].double("elev_bot"), Some(1205.0));

    // temp intermediates are cleaned up
    temp.child("gdb/wwpt_temp.geojson")
        .assert(predicate::path::missing());
}

#[test]
fn polygon_intersect_end_to_end() {
    let temp = assert_fs::TempDir::new().unwrap();
    let container = new_container(&temp);

    let mut profiles = FeatureClass::new("dem_profiles3d", GeometryKind::LineZ);
    profiles.crs = Crs::utm15n();
    profiles.schema = Schema::with_fields(&[("et_id", FieldType::Text)]);
    profiles.insert(
        Feature::new(Geometry::LineZ(Polyline3::new(vec![
            Point3::new(430_000.0, 4_900_000.0, 1300.0),
            Point3::new(433_048.0, 4_900_000.0, 1200.0),
        ])))
        .with_attr("et_id", Value::Text("01".to_string())),
    );
    container.save(&profiles).unwrap();

    let mut polys = FeatureClass::new("bedrock", GeometryKind::Polygon);
    polys.crs = Crs::utm15n();
    polys.schema = Schema::with_fields(&[("unit", FieldType::Text)]);
    polys.insert(
        Feature::new(Geometry::Polygon(vec![
            Point::new(431_000.0, 4_899_000.0),
            Point::new(432_000.0, 4_899_000.0),
            Point::new(432_000.0, 4_901_000.0),
            Point::new(431_000.0, 4_901_000.0),
        ]))
        .with_attr("unit", Value::Text("Opdc".to_string())),
    );
    container.save(&polys).unwrap();

    let params = PolygonIntersectParams {
        traces: "xsln",
        profiles: "dem_profiles3d",
        polygons: "bedrock",
    };
    let (lines, points) =
        write_polygon_intersections(&container, &params, "et_id", 50).unwrap();
    // named for the input class, not the tagged working copy
    assert_eq!(lines, "bedrock_intersect_lines_50x");
    assert_eq!(points, "bedrock_intersect_points_50x");

    let lines = container.load(&lines).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.features[0].text("unit"), Some("Opdc"));
    assert!(!lines.schema.has_field("unique_id"));

    let points = container.load(&points).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points.features[0].text("unit"), Some("Opdc"));

    temp.child("gdb/bedrock_temp.geojson")
        .assert(predicate::path::missing());
}

#[test]
fn raster_profiles_end_to_end() {
    let temp = assert_fs::TempDir::new().unwrap();
    let container = new_container(&temp);

    let dem = temp.child("dem.asc");
    dem.write_str(
        "ncols 4\nnrows 2\nxllcorner 429000\nyllcorner 4899000\ncellsize 2000\n\
         NODATA_value -9999\n\
         1250 1250 1250 1250\n1250 1250 1250 1250\n",
    )
    .unwrap();

    let outputs =
        write_raster_profiles(&container, "xsln", &[dem.path()], "et_id", 50).unwrap();
    assert_eq!(outputs.len(), 1);
    let (p3d_name, p2d_name) = &outputs[0];
    assert_eq!(p3d_name, "dem_profiles3d");
    assert_eq!(p2d_name, "dem_profiles2d_50x");

    let p3d = container.load(p3d_name).unwrap();
    assert_eq!(p3d.len(), 1);
    assert_eq!(p3d.features[0].text("et_id"), Some("01"));
    // trace attributes ride along, bookkeeping fields do not
    assert_eq!(p3d.features[0].text("mapsheet"), Some("A1"));
    assert!(!p3d.schema.has_field("OBJECTID"));

    let p2d = container.load(p2d_name).unwrap();
    let Some(Geometry::Line(section)) = &p2d.features[0].geometry else {
        panic!("expected section line");
    };
    assert!(section
        .vertices
        .iter()
        .all(|v| (v.y - 1250.0).abs() < 1e-6));
    let last = section.vertices.last().unwrap();
    assert!((last.x - 200.0).abs() < 1e-6);
}

#[test]
fn vertical_markers_end_to_end() {
    let temp = assert_fs::TempDir::new().unwrap();
    let container = new_container(&temp);

    let mut quarries = FeatureClass::new("quarries", GeometryKind::Polygon);
    quarries.crs = Crs::utm15n();
    quarries.schema = Schema::with_fields(&[("site", FieldType::Text)]);
    quarries.insert(
        Feature::new(Geometry::Polygon(vec![
            Point::new(431_000.0, 4_899_900.0),
            Point::new(432_000.0, 4_899_900.0),
            Point::new(432_000.0, 4_900_100.0),
            Point::new(431_000.0, 4_900_100.0),
        ]))
        .with_attr("site", Value::Text("pit".to_string())),
    );
    container.save(&quarries).unwrap();

    let name = write_vertical_markers(
        &container,
        "xsln",
        "quarries",
        "et_id",
        &MarkerConfig::default(),
        50,
    )
    .unwrap();
    assert_eq!(name, "quarries_markers_50x");

    let markers = container.load(&name).unwrap();
    assert_eq!(markers.len(), 2);
    for feature in &markers.features {
        assert_eq!(feature.text("site"), Some("pit"));
        assert_eq!(feature.text("et_id"), Some("01"));
    }
    assert!(!markers.schema.has_field("unique_id"));

    temp.child("gdb/quarries_temp.geojson")
        .assert(predicate::path::missing());
}

#[test]
fn missing_trace_dataset_is_fatal() {
    let temp = assert_fs::TempDir::new().unwrap();
    let container = Container::create(temp.child("gdb").path()).unwrap();
    let err = write_reference_grid(&container, "xsln", "et_id", &GridConfig::default())
        .unwrap_err();
    assert!(matches!(err, xsec::Error::MissingDataset(_)));
}

#[test]
fn config_file_drives_the_tools() {
    let temp = assert_fs::TempDir::new().unwrap();
    let cfg_file = temp.child("params.json");
    cfg_file
        .write_str(r#"{"grid":{"vertical_exaggeration":100,"minor_elev_interval":25}}"#)
        .unwrap();
    let cfg = Config::from_file(cfg_file.path()).unwrap();
    assert_eq!(cfg.grid.vertical_exaggeration, 100);
    assert_eq!(cfg.grid.minor_elev_interval, 25);
    assert_eq!(cfg.id_field, "et_id");

    let container = new_container(&temp);
    let (elevation, _) = write_reference_grid(&container, "xsln", &cfg.id_field, &cfg.grid).unwrap();
    assert_eq!(elevation, "elevation_ref_lines_100x");
}
