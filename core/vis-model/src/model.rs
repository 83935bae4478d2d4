//! FILENAME: core/vis-model/src/model.rs
//! Vis Model - The aggregate root of one update cycle.
//!
//! A model is built once from (source rows, config, query metadata) and then
//! only read. Construction runs the phases in order:
//! catalog -> columns -> rows (feeding ranges) -> conditional styles.

use log::debug;
use serde::Serialize;

use crate::catalog::{build_catalog, Field, FieldCatalog};
use crate::columns::{build_columns, Column, ColumnIndex};
use crate::definition::{PivotValue, QueryMetadata, SourceRow, VisConfig};
use crate::error::VisResult;
use crate::ranges::RangeTracker;
use crate::rows::{apply_conditional_styles, build_rows, Row};

#[derive(Debug, Clone, Serialize)]
pub struct VisModel {
    pub(crate) catalog: FieldCatalog,
    pub(crate) columns: ColumnIndex,
    pub(crate) rows: Vec<Row>,
    pub(crate) ranges: RangeTracker,
    #[serde(skip)]
    pub(crate) config: VisConfig,
}

impl VisModel {
    /// Runs every build phase over the inputs of one update.
    pub fn build(
        source_rows: &[SourceRow],
        config: &VisConfig,
        metadata: &QueryMetadata,
    ) -> VisResult<Self> {
        let catalog = build_catalog(metadata)?;
        let columns = build_columns(&catalog, config)?;
        let built = build_rows(&catalog, &columns, source_rows, catalog.initial_ranges());

        let mut rows = built.rows;
        apply_conditional_styles(&mut rows, &columns, config);

        debug!(
            "model built: columns={} rows={} ranges={}",
            columns.len(),
            rows.len(),
            built.ranges.len()
        );

        Ok(VisModel {
            catalog,
            columns,
            rows,
            ranges: built.ranges,
            config: config.clone(),
        })
    }

    /// Builds a model straight from the host's JSON documents.
    pub fn from_json(
        data: &serde_json::Value,
        config: &serde_json::Value,
        query: &serde_json::Value,
    ) -> VisResult<Self> {
        let source_rows: Vec<SourceRow> = serde_json::from_value(data.clone())?;
        let config: VisConfig = serde_json::from_value(config.clone())?;
        let metadata: QueryMetadata = serde_json::from_value(query.clone())?;
        VisModel::build(&source_rows, &config, &metadata)
    }

    pub fn from_json_str(data: &str, config: &str, query: &str) -> VisResult<Self> {
        let source_rows: Vec<SourceRow> = serde_json::from_str(data)?;
        let config: VisConfig = serde_json::from_str(config)?;
        let metadata: QueryMetadata = serde_json::from_str(query)?;
        VisModel::build(&source_rows, &config, &metadata)
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.get(id)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn ranges(&self) -> &RangeTracker {
        &self.ranges
    }

    pub fn config(&self) -> &VisConfig {
        &self.config
    }

    pub fn dimensions(&self) -> &[Field] {
        &self.catalog.dimensions
    }

    pub fn measures(&self) -> &[Field] {
        &self.catalog.measures
    }

    pub fn pivot_fields(&self) -> &[Field] {
        &self.catalog.pivot_fields
    }

    pub fn pivot_values(&self) -> &[PivotValue] {
        &self.catalog.pivot_values
    }

    pub fn is_pivoted(&self) -> bool {
        self.catalog.is_pivoted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VisError;
    use serde_json::json;

    #[test]
    fn test_from_json_flat() {
        let model = VisModel::from_json(
            &json!([
                { "users.city": { "value": "Oslo" }, "users.count": { "value": 4 } },
                { "users.city": { "value": "Bergen" }, "users.count": { "value": 2 } }
            ]),
            &json!({ "sizeBy": "users.count" }),
            &json!({
                "fields": {
                    "dimension_like": [{ "name": "users.city", "label": "City" }],
                    "measure_like": [{ "name": "users.count", "label": "Count" }]
                }
            }),
        )
        .unwrap();

        assert!(!model.is_pivoted());
        assert_eq!(model.columns().len(), 2);
        assert_eq!(model.rows().len(), 2);
        assert_eq!(model.rows()[1].id, "Bergen");
        assert_eq!(model.ranges().numeric("users.count").unwrap().max, Some(4.0));
        assert_eq!(model.config().size_by.as_deref(), Some("users.count"));
    }

    #[test]
    fn test_from_json_str_rejects_garbage() {
        let result = VisModel::from_json_str("not json", "{}", "{}");
        assert!(matches!(result, Err(VisError::Json(_))));
    }

    #[test]
    fn test_build_is_deterministic() {
        let data = json!([
            { "a": { "value": "x" }, "m": { "value": 1 } },
            { "a": { "value": "y" }, "m": { "value": 2 } }
        ]);
        let query = json!({
            "fields": {
                "dimension_like": [{ "name": "a" }],
                "measure_like": [{ "name": "m" }]
            }
        });
        let first = VisModel::from_json(&data, &json!({}), &query).unwrap();
        let second = VisModel::from_json(&data, &json!({}), &query).unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
