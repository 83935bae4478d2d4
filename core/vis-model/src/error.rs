//! FILENAME: core/vis-model/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisError {
    /// A field referenced by the configuration does not exist in the catalog.
    #[error("Unknown field for {role}: {name}")]
    UnknownField { role: &'static str, name: String },

    /// A role that the current dataset shape requires was left unset.
    #[error("No field selected for {role}")]
    MissingSelection { role: &'static str },

    #[error("Malformed query metadata: {0}")]
    MalformedCatalog(String),

    #[error("Duplicate column id: {0}")]
    DuplicateColumn(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type VisResult<T> = Result<T, VisError>;
