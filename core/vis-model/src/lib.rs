//! FILENAME: core/vis-model/src/lib.rs
//! Data model for pivot-aware bubble visualizations.
//!
//! Turns a query result (source rows plus field metadata) into a normalized
//! model: a field catalog, an addressable column index, built rows and the
//! per-field ranges observed while building them. From there the model is
//! reshaped into the flat or tidy rows the renderer draws.
//!
//! Layers:
//! - `definition`: Serializable inputs (rows, query metadata, config)
//! - `catalog` / `columns`: What the dataset IS
//! - `rows` / `ranges`: Materialized values and their bounds
//! - `model`: The aggregate root built once per update
//! - `melt` / `layout`: What the renderer consumes
//! - `options`: The configuration schema offered to the host

pub mod error;
pub mod definition;
pub mod ranges;
pub mod catalog;
pub mod columns;
pub mod rows;
pub mod model;
pub mod melt;
pub mod options;
pub mod layout;

pub use error::{VisError, VisResult};
pub use definition::*;
pub use ranges::*;
pub use catalog::{build_catalog, Field, FieldCatalog, FieldRole, MeasureKind};
pub use columns::{build_columns, Column, ColumnIndex, ColumnKind};
pub use rows::{apply_conditional_styles, build_rows, row_id, BuiltRows, Row, NEGATIVE_TAG};
pub use model::VisModel;
pub use melt::{FlatRow, MeltMode, VisData};
pub use options::{
    get_config_options, resolve_selection, OptionChoice, OptionDisplay, OptionFlags,
    OptionSchema, OptionSpec, OptionType, Selection, PIVOT_SERIES_LABEL,
};
pub use layout::{group_position, BubbleScale, DEFAULT_RADIUS};
