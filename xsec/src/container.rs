//! Directory-backed dataset container.
//!
//! A container is a directory holding one GeoJSON document per feature
//! class, addressed by logical name. Schema, geometry kind and CRS travel in
//! a foreign member so round trips are lossless; documents written by other
//! software load with inferred schemas.

use std::fs;
use std::path::{Path, PathBuf};

use geojson::{FeatureCollection, GeoJson, JsonObject};

use crate::crs::Crs;
use crate::dataset::{Feature, FeatureClass, FieldType, Geometry, GeometryKind, Schema, Value};
use crate::error::{Error, Result};
use crate::geometry::{Point, Point3, Polyline, Polyline3};

const META_KEY: &str = "xsec";

/// A geodatabase-like container: a directory of named datasets.
#[derive(Debug, Clone)]
pub struct Container {
    dir: PathBuf,
}

impl Container {
    /// Opens an existing container directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(Error::MissingDataset(dir.display().to_string()));
        }
        Ok(Self { dir })
    }

    /// Opens a container, creating the directory when absent.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.geojson"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.dataset_path(name).is_file()
    }

    /// Writes a feature class, overwriting any dataset of the same name.
    pub fn save(&self, fc: &FeatureClass) -> Result<()> {
        let collection = to_collection(fc)?;
        let file = fs::File::create(self.dataset_path(&fc.name))?;
        serde_json::to_writer_pretty(file, &GeoJson::FeatureCollection(collection))?;
        Ok(())
    }

    /// Loads a feature class by logical name.
    pub fn load(&self, name: &str) -> Result<FeatureClass> {
        let path = self.dataset_path(name);
        if !path.is_file() {
            return Err(Error::MissingDataset(name.to_string()));
        }
        let text = fs::read_to_string(&path)?;
        let geojson: GeoJson = text.parse()?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{name}: expected a GeoJSON FeatureCollection"),
            )));
        };
        from_collection(name, &collection)
    }

    /// Removes a dataset. Callers treat failures on temporary datasets as
    /// warnings, not errors.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.dataset_path(name);
        if !path.is_file() {
            return Err(Error::MissingDataset(name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Removes a temporary dataset, downgrading failure to a warning.
    pub fn delete_or_warn(&self, name: &str) {
        if let Err(err) = self.delete(name) {
            log::warn!("unable to delete {name}: {err}");
        }
    }
}

fn position(p: Point) -> Vec<f64> {
    vec![p.x, p.y]
}

fn position3(p: Point3) -> Vec<f64> {
    vec![p.x, p.y, p.z]
}

fn ring_positions(ring: &[Point]) -> Vec<Vec<f64>> {
    let mut coords: Vec<Vec<f64>> = ring.iter().copied().map(position).collect();
    if coords.first() != coords.last() {
        if let Some(first) = coords.first().cloned() {
            coords.push(first);
        }
    }
    coords
}

fn geometry_to_geojson(geometry: &Geometry) -> geojson::Value {
    match geometry {
        Geometry::Point(p) => geojson::Value::Point(position(*p)),
        Geometry::PointZ(p) => geojson::Value::Point(position3(*p)),
        Geometry::Line(line) => {
            geojson::Value::LineString(line.vertices.iter().copied().map(position).collect())
        }
        Geometry::LineZ(line) => {
            geojson::Value::LineString(line.vertices.iter().copied().map(position3).collect())
        }
        Geometry::Polygon(ring) => geojson::Value::Polygon(vec![ring_positions(ring)]),
        Geometry::Multi(_) => {
            let parts = geometry.parts();
            match geometry.kind() {
                GeometryKind::Point | GeometryKind::PointZ => geojson::Value::MultiPoint(
                    parts
                        .iter()
                        .map(|g| match g {
                            Geometry::Point(p) => position(*p),
                            Geometry::PointZ(p) => position3(*p),
                            _ => Vec::new(),
                        })
                        .collect(),
                ),
                GeometryKind::Line | GeometryKind::LineZ => geojson::Value::MultiLineString(
                    parts
                        .iter()
                        .map(|g| match g {
                            Geometry::Line(l) => l.vertices.iter().copied().map(position).collect(),
                            Geometry::LineZ(l) => {
                                l.vertices.iter().copied().map(position3).collect()
                            }
                            _ => Vec::new(),
                        })
                        .collect(),
                ),
                GeometryKind::Polygon => geojson::Value::MultiPolygon(
                    parts
                        .iter()
                        .map(|g| match g {
                            Geometry::Polygon(ring) => vec![ring_positions(ring)],
                            _ => Vec::new(),
                        })
                        .collect(),
                ),
            }
        }
    }
}

fn point_from_position(pos: &[f64]) -> Geometry {
    if pos.len() >= 3 {
        Geometry::PointZ(Point3::new(pos[0], pos[1], pos[2]))
    } else {
        Geometry::Point(Point::new(pos[0], pos[1]))
    }
}

fn line_from_positions(coords: &[Vec<f64>]) -> Geometry {
    if !coords.is_empty() && coords.iter().all(|c| c.len() >= 3) {
        Geometry::LineZ(Polyline3::new(
            coords
                .iter()
                .map(|c| Point3::new(c[0], c[1], c[2]))
                .collect(),
        ))
    } else {
        Geometry::Line(Polyline::new(
            coords.iter().map(|c| Point::new(c[0], c[1])).collect(),
        ))
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Geometry {
    let mut ring: Vec<Point> = rings
        .first()
        .map(|r| r.iter().map(|c| Point::new(c[0], c[1])).collect())
        .unwrap_or_default();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    Geometry::Polygon(ring)
}

fn geometry_from_geojson(value: &geojson::Value) -> Option<Geometry> {
    match value {
        geojson::Value::Point(pos) => Some(point_from_position(pos)),
        geojson::Value::LineString(coords) => Some(line_from_positions(coords)),
        geojson::Value::Polygon(rings) => Some(polygon_from_rings(rings)),
        geojson::Value::MultiPoint(coords) => Some(Geometry::Multi(
            coords.iter().map(|c| point_from_position(c)).collect(),
        )),
        geojson::Value::MultiLineString(lines) => Some(Geometry::Multi(
            lines.iter().map(|l| line_from_positions(l)).collect(),
        )),
        geojson::Value::MultiPolygon(polys) => Some(Geometry::Multi(
            polys.iter().map(|p| polygon_from_rings(p)).collect(),
        )),
        _ => None,
    }
}

fn to_collection(fc: &FeatureClass) -> Result<FeatureCollection> {
    let mut features = Vec::with_capacity(fc.features.len());
    for feature in &fc.features {
        let mut properties = JsonObject::new();
        for field in fc.schema.fields() {
            properties.insert(field.name.clone(), feature.get(&field.name).to_json());
        }
        features.push(geojson::Feature {
            bbox: None,
            geometry: feature
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geometry_to_geojson(g))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let mut meta = JsonObject::new();
    meta.insert("schema".to_string(), serde_json::to_value(&fc.schema)?);
    meta.insert(
        "geometry_kind".to_string(),
        serde_json::to_value(fc.geometry_kind)?,
    );
    meta.insert("crs".to_string(), serde_json::to_value(&fc.crs)?);
    let mut foreign = JsonObject::new();
    foreign.insert(META_KEY.to_string(), serde_json::Value::Object(meta));

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign),
    })
}

fn infer_schema(collection: &FeatureCollection) -> Schema {
    let mut schema = Schema::new();
    for feature in &collection.features {
        if let Some(props) = &feature.properties {
            for (name, value) in props {
                if schema.has_field(name) {
                    continue;
                }
                let ty = match value {
                    serde_json::Value::String(_) => FieldType::Text,
                    serde_json::Value::Number(n) if n.is_i64() => FieldType::Long,
                    serde_json::Value::Number(_) => FieldType::Double,
                    _ => continue,
                };
                schema.push_field(name, ty);
            }
        }
    }
    schema
}

fn from_collection(name: &str, collection: &FeatureCollection) -> Result<FeatureClass> {
    let meta = collection
        .foreign_members
        .as_ref()
        .and_then(|fm| fm.get(META_KEY))
        .and_then(serde_json::Value::as_object);

    let schema = match meta.and_then(|m| m.get("schema")) {
        Some(raw) => serde_json::from_value(raw.clone())?,
        None => infer_schema(collection),
    };
    let crs: Crs = match meta.and_then(|m| m.get("crs")) {
        Some(raw) => serde_json::from_value(raw.clone())?,
        None => Crs::unknown(),
    };
    let mut kind: Option<GeometryKind> = match meta.and_then(|m| m.get("geometry_kind")) {
        Some(raw) => serde_json::from_value(raw.clone())?,
        None => None,
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for raw in &collection.features {
        let geometry = raw
            .geometry
            .as_ref()
            .and_then(|g| geometry_from_geojson(&g.value));
        if kind.is_none() {
            kind = geometry.as_ref().map(Geometry::kind);
        }
        let mut feature = Feature {
            geometry,
            attrs: Default::default(),
        };
        if let Some(props) = &raw.properties {
            for (field_name, value) in props {
                let ty = schema
                    .field(field_name)
                    .map(|f| f.ty)
                    .unwrap_or(FieldType::Text);
                feature.set(field_name, Value::from_json(value, ty));
            }
        }
        features.push(feature);
    }

    Ok(FeatureClass {
        name: name.to_string(),
        geometry_kind: kind,
        crs,
        schema,
        features,
    })
}
