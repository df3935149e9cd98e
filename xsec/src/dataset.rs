//! In-memory feature classes and tables.
//!
//! A feature class pairs a typed attribute schema with rows of geometry and
//! attribute values. A table is simply a feature class without geometry.

use std::collections::BTreeMap;

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::geometry::{Point, Point3, Polyline, Polyline3};

/// Attribute field data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FieldType {
    Text,
    Long,
    Double,
}

/// Attribute values. `Null` stands in for absent or underived values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Long(i64),
    Double(f64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; longs widen to double.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Long(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Long(v) => serde_json::Value::from(*v),
            Value::Double(v) => serde_json::Value::from(*v),
        }
    }

    pub fn from_json(value: &serde_json::Value, ty: FieldType) -> Value {
        match (value, ty) {
            (serde_json::Value::Null, _) => Value::Null,
            (serde_json::Value::String(s), FieldType::Text) => Value::Text(s.clone()),
            (serde_json::Value::Number(n), FieldType::Long) => {
                n.as_i64().map(Value::Long).unwrap_or(Value::Null)
            }
            (serde_json::Value::Number(n), FieldType::Double) => {
                n.as_f64().map(Value::Double).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    }
}

/// Geometry kinds a feature class can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GeometryKind {
    Point,
    PointZ,
    Line,
    LineZ,
    Polygon,
}

impl GeometryKind {
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "point",
            GeometryKind::PointZ => "point-z",
            GeometryKind::Line => "polyline",
            GeometryKind::LineZ => "polyline-z",
            GeometryKind::Polygon => "polygon",
        }
    }
}

/// Feature geometry. `Multi` holds multipart results from intersections.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    PointZ(Point3),
    Line(Polyline),
    LineZ(Polyline3),
    /// Outer ring, implicitly closed.
    Polygon(Vec<Point>),
    Multi(Vec<Geometry>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::PointZ(_) => GeometryKind::PointZ,
            Geometry::Line(_) => GeometryKind::Line,
            Geometry::LineZ(_) => GeometryKind::LineZ,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::Multi(parts) => parts
                .first()
                .map(Geometry::kind)
                .unwrap_or(GeometryKind::Point),
        }
    }

    pub fn has_z(&self) -> bool {
        matches!(self.kind(), GeometryKind::PointZ | GeometryKind::LineZ)
    }

    /// Flattens multipart geometry into its single parts.
    pub fn parts(&self) -> Vec<Geometry> {
        match self {
            Geometry::Multi(parts) => parts.iter().flat_map(Geometry::parts).collect(),
            other => vec![other.clone()],
        }
    }
}

/// One field of a schema.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

/// Ordered attribute schema.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(defs: &[(&str, FieldType)]) -> Self {
        Self {
            fields: defs
                .iter()
                .map(|(name, ty)| FieldDef {
                    name: (*name).to_string(),
                    ty: *ty,
                })
                .collect(),
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn push_field(&mut self, name: &str, ty: FieldType) {
        if !self.has_field(name) {
            self.fields.push(FieldDef {
                name: name.to_string(),
                ty,
            });
        }
    }

    pub fn remove_field(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.name != name);
        before != self.fields.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// Bookkeeping fields a geodatabase maintains on its own; never carried
/// through attribute joins.
pub const RESERVED_FIELDS: &[&str] = &[
    "OBJECTID",
    "FID",
    "Shape",
    "Shape_Length",
    "Shape_Area",
    "Join_Count",
    "TARGET_FID",
];

/// Schema-diff routine: the field names of `schema` minus the reserved
/// bookkeeping names and any caller-supplied exclusions.
pub fn carry_fields(schema: &Schema, exclude: &[&str]) -> Vec<String> {
    schema
        .fields()
        .iter()
        .map(|f| f.name.clone())
        .filter(|name| {
            !RESERVED_FIELDS.contains(&name.as_str()) && !exclude.contains(&name.as_str())
        })
        .collect()
}

/// One row: optional geometry plus attribute values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub attrs: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            attrs: BTreeMap::new(),
        }
    }

    pub fn row() -> Self {
        Self::default()
    }

    pub fn with_attr(mut self, name: &str, value: Value) -> Self {
        self.attrs.insert(name.to_string(), value);
        self
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.attrs.insert(name.to_string(), value);
    }

    /// Value for `name`, with `Null` standing in for absent attributes.
    pub fn get(&self, name: &str) -> &Value {
        self.attrs.get(name).unwrap_or(&Value::Null)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).as_text()
    }

    pub fn long(&self, name: &str) -> Option<i64> {
        self.get(name).as_long()
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        self.get(name).as_double()
    }
}

/// Named feature class: schema, geometry kind, CRS and rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureClass {
    pub name: String,
    pub geometry_kind: Option<GeometryKind>,
    pub crs: Crs,
    pub schema: Schema,
    pub features: Vec<Feature>,
}

impl FeatureClass {
    pub fn new(name: impl Into<String>, geometry_kind: GeometryKind) -> Self {
        Self {
            name: name.into(),
            geometry_kind: Some(geometry_kind),
            crs: Crs::unknown(),
            schema: Schema::new(),
            features: Vec::new(),
        }
    }

    /// Creates a geometry-less table.
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry_kind: None,
            crs: Crs::unknown(),
            schema: Schema::new(),
            features: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn insert(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Adds a field, erroring when a field of that name already exists.
    pub fn add_field(&mut self, name: &str, ty: FieldType) -> Result<()> {
        if self.schema.has_field(name) {
            return Err(Error::DuplicateField {
                dataset: self.name.clone(),
                field: name.to_string(),
            });
        }
        self.schema.push_field(name, ty);
        Ok(())
    }

    /// Removes a field from the schema and from every row.
    pub fn drop_field(&mut self, name: &str) -> bool {
        let removed = self.schema.remove_field(name);
        if removed {
            for feature in &mut self.features {
                feature.attrs.remove(name);
            }
        }
        removed
    }

    /// Fails with a user-visible error when `name` is not in the schema.
    pub fn require_field(&self, name: &str) -> Result<()> {
        if self.schema.has_field(name) {
            Ok(())
        } else {
            Err(Error::MissingField {
                dataset: self.name.clone(),
                field: name.to_string(),
            })
        }
    }

    /// Fails when the class does not carry the expected geometry kind.
    pub fn require_geometry(&self, expected: GeometryKind) -> Result<()> {
        match self.geometry_kind {
            Some(kind) if kind == expected => Ok(()),
            Some(kind) => Err(Error::WrongGeometryType {
                dataset: self.name.clone(),
                expected: expected.name(),
                found: kind.name().to_string(),
            }),
            None => Err(Error::WrongGeometryType {
                dataset: self.name.clone(),
                expected: expected.name(),
                found: "table".to_string(),
            }),
        }
    }

    /// Tags every row with a synthetic join key taken from its row index.
    pub fn tag_unique_ids(&mut self, field: &str) -> Result<()> {
        self.add_field(field, FieldType::Long)?;
        for (oid, feature) in self.features.iter_mut().enumerate() {
            feature.set(field, Value::Long(oid as i64));
        }
        Ok(())
    }

    /// Copies `fields` from `source` onto matching rows, first match wins.
    ///
    /// Mirrors a geodatabase field join: joined fields are appended to the
    /// schema with the source's types, rows without a match keep nulls.
    pub fn join_field(
        &mut self,
        on: &str,
        source: &FeatureClass,
        source_on: &str,
        fields: &[String],
    ) -> Result<()> {
        self.require_field(on)?;
        source.require_field(source_on)?;
        for name in fields {
            let def = source.schema.field(name).ok_or_else(|| Error::MissingField {
                dataset: source.name.clone(),
                field: name.clone(),
            })?;
            self.schema.push_field(&def.name, def.ty);
        }

        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for (i, feature) in source.features.iter().enumerate() {
            if let Some(key) = join_key(feature.get(source_on)) {
                index.entry(key).or_insert(i);
            }
        }
        for feature in &mut self.features {
            let Some(key) = join_key(feature.get(on)) else {
                continue;
            };
            let Some(&i) = index.get(&key) else {
                continue;
            };
            for name in fields {
                let value = source.features[i].get(name).clone();
                feature.set(name, value);
            }
        }
        Ok(())
    }
}

fn join_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s.clone()),
        Value::Long(v) => Some(v.to_string()),
        Value::Double(v) => Some(format!("{v}")),
    }
}
