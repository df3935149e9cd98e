//! Coordinate reference system tags carried on feature classes.

/// Representation of a coordinate reference system.
///
/// A CRS is stored as a definition string, normally an EPSG identifier
/// (`"EPSG:26915"`). When created from an EPSG code the numeric value is
/// retained so that callers can inspect it. The tools never reproject; the
/// tag exists so outputs can carry their source's reference and so an
/// unknown reference can be reported.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Crs {
    definition: String,
    epsg: Option<u32>,
}

impl Crs {
    /// Creates a new CRS from the given EPSG code.
    pub fn from_epsg(code: u32) -> Self {
        Self {
            definition: format!("EPSG:{}", code),
            epsg: Some(code),
        }
    }

    /// Creates a CRS from an arbitrary definition string.
    pub fn from_definition(definition: &str) -> Self {
        Self {
            definition: definition.to_string(),
            epsg: None,
        }
    }

    /// A placeholder for datasets without a spatial reference.
    pub fn unknown() -> Self {
        Self {
            definition: "Unknown".to_string(),
            epsg: None,
        }
    }

    /// UTM zone 15N on NAD83 (EPSG:26915), the planar meter grid the
    /// original cross-section datasets use.
    pub fn utm15n() -> Self {
        Self::from_epsg(26915)
    }

    /// Returns the EPSG code for this CRS, if available.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Returns the underlying definition string.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Whether the reference is anything other than the unknown placeholder.
    pub fn is_known(&self) -> bool {
        self.definition != "Unknown"
    }
}

/// Logs the unknown-spatial-reference warning the tools share. Never fatal.
pub fn warn_if_unknown(dataset: &str, crs: &Crs) {
    if !crs.is_known() {
        log::warn!("{dataset} has an unknown spatial reference; continuing may result in errors");
    } else {
        log::info!("spatial reference set as {} from {dataset}", crs.definition());
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::unknown()
    }
}
