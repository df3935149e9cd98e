//! Error types shared by every cross-section tool.

use thiserror::Error;

/// Errors surfaced by dataset access and the tool pipelines.
///
/// Missing datasets, missing fields and wrong geometry kinds are fatal and
/// reported before any output is written. Cleanup failures are not errors;
/// callers downgrade them to warnings.
#[derive(Debug, Error)]
pub enum Error {
    #[error("dataset `{0}` does not exist")]
    MissingDataset(String),

    #[error("field `{field}` does not exist in `{dataset}`")]
    MissingField { dataset: String, field: String },

    #[error("`{dataset}` has {found} geometry, expected {expected}")]
    WrongGeometryType {
        dataset: String,
        expected: &'static str,
        found: String,
    },

    #[error("field `{field}` already exists in `{dataset}`")]
    DuplicateField { dataset: String, field: String },

    #[error("interval `{name}` must be positive, got {value}")]
    BadInterval { name: &'static str, value: i64 },

    #[error("{path}: {message}")]
    RasterParse { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    GeoJson(#[from] geojson::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
