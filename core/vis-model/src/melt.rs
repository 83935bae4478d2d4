//! FILENAME: core/vis-model/src/melt.rs
//! Melter - Reshapes a built model into the rows the renderer consumes.
//!
//! The renderer needs one object per bubble:
//! - Flat: no pivots, one object per model row
//! - PivotFlatten: pivoted data sized by a row total or supermeasure, one
//!   object per (pivot value x row) carrying every measure at that pivot
//! - Tidy: pivoted data sized by a pivoted measure, one observation per
//!   (row x real pivot value) carrying only that measure
//!
//! Ranges handed out with the rows are refined from what was emitted.

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::catalog::Field;
use crate::definition::{CellValue, VisConfig, PIVOT_KEY_FIELD, ROW_ID_FIELD};
use crate::error::{VisError, VisResult};
use crate::model::VisModel;
use crate::options::{resolve_selection, Selection};
use crate::ranges::RangeTracker;
use crate::rows::Row;

/// One output object: field or column id -> value.
pub type FlatRow = IndexMap<String, CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeltMode {
    Flat,
    PivotFlatten,
    Tidy,
}

/// The mode-dispatched view for the current selection.
#[derive(Debug, Clone, Serialize)]
pub struct VisData {
    pub mode: MeltMode,
    pub selection: Selection,
    pub rows: Vec<FlatRow>,
    pub ranges: RangeTracker,
}

impl VisModel {
    /// The flat view (`melt == false` or no pivots) or the pivot-flattened
    /// view of the model.
    pub fn flattened_rows(&self, include_row_id: bool, melt: bool) -> Vec<FlatRow> {
        if !self.is_pivoted() || !melt {
            self.flat_rows(include_row_id)
        } else {
            self.pivot_flatten_rows(include_row_id)
        }
    }

    /// Picks the output shape from the selected size measure.
    pub fn melt_mode(&self, selection: &Selection) -> VisResult<MeltMode> {
        if !self.is_pivoted() {
            return Ok(MeltMode::Flat);
        }
        let size_field = selection
            .size_field(&self.catalog)
            .ok_or(VisError::MissingSelection { role: "sizeBy" })?;
        if size_field.is_row_total() || size_field.is_super() {
            Ok(MeltMode::PivotFlatten)
        } else {
            Ok(MeltMode::Tidy)
        }
    }

    /// Validates `config`, melts the model in the matching shape and
    /// refines the ranges of what was emitted.
    pub fn get_data(&self, config: &VisConfig) -> VisResult<VisData> {
        let selection = resolve_selection(&self.catalog, config)?;
        let mode = self.melt_mode(&selection)?;
        let mut ranges = self.ranges.clone();

        let rows = match mode {
            MeltMode::Flat => self.flat_rows(true),
            MeltMode::PivotFlatten => self.pivot_flatten_rows(true),
            MeltMode::Tidy => {
                let measure = selection
                    .size_field(&self.catalog)
                    .ok_or(VisError::MissingSelection { role: "sizeBy" })?;
                self.tidy_rows(measure, &mut ranges)
            }
        };

        if mode != MeltMode::Tidy {
            if let Some(size_by) = selection.size_by.as_deref() {
                ranges.reset_numeric(size_by);
                for row in &rows {
                    if let Some(value) = row.get(size_by).and_then(CellValue::as_f64) {
                        ranges.observe_number(size_by, value);
                    }
                }
            }
        }
        for dimension in &self.catalog.dimensions {
            for row in &rows {
                if let Some(value) = row.get(&dimension.name) {
                    ranges.observe_category(&dimension.name, value);
                }
            }
        }

        debug!("get_data: mode={:?} rows={}", mode, rows.len());

        Ok(VisData {
            mode,
            selection,
            rows,
            ranges,
        })
    }

    fn flat_rows(&self, include_row_id: bool) -> Vec<FlatRow> {
        self.rows
            .iter()
            .map(|row| {
                let mut out = FlatRow::with_capacity(row.cells.len() + 1);
                for column in &self.columns {
                    if let Some(cell) = row.cell(&column.id) {
                        out.insert(column.id.clone(), cell.value.clone());
                    }
                }
                if include_row_id {
                    out.insert(ROW_ID_FIELD.to_string(), CellValue::text(row.id.as_str()));
                }
                out
            })
            .collect()
    }

    fn pivot_flatten_rows(&self, include_row_id: bool) -> Vec<FlatRow> {
        let mut out_rows = Vec::with_capacity(self.catalog.pivot_values.len() * self.rows.len());

        for pivot_value in &self.catalog.pivot_values {
            let pivot_columns: Vec<_> = self.columns.columns_for_pivot(&pivot_value.key).collect();

            for row in &self.rows {
                let mut out: FlatRow = pivot_value.data.clone();

                for column in self.columns.dimension_columns().chain(self.columns.super_columns()) {
                    if let Some(cell) = row.cell(&column.id) {
                        out.insert(column.id.clone(), cell.value.clone());
                    }
                }
                for column in &pivot_columns {
                    if let Some(cell) = row.cell(&column.id) {
                        out.insert(column.field_name.clone(), cell.value.clone());
                    }
                }
                // Row totals stay addressable under their own name
                for column in self.columns.pivoted_columns().filter(|c| c.is_row_total) {
                    if let Some(cell) = row.cell(&column.id) {
                        out.insert(column.id.clone(), cell.value.clone());
                    }
                }

                if include_row_id {
                    let id = format!("{}|{}", pivot_value.key, row.id);
                    out.insert(ROW_ID_FIELD.to_string(), CellValue::Text(id));
                }
                out.insert(PIVOT_KEY_FIELD.to_string(), CellValue::text(pivot_value.key.as_str()));
                out_rows.push(out);
            }
        }

        out_rows
    }

    /// Wide-to-long reshape of a single pivoted measure.
    fn tidy_rows(&self, measure: &Field, ranges: &mut RangeTracker) -> Vec<FlatRow> {
        ranges.reset_numeric(&measure.name);
        let mut observations = Vec::new();

        for row in &self.rows {
            let dimension_values = self.dimension_values(row);

            for pivot_value in self.catalog.real_pivot_values() {
                let mut observation = FlatRow::new();
                for (dimension, value) in self.catalog.dimensions.iter().zip(&dimension_values) {
                    if let Some(value) = value {
                        observation.insert(dimension.name.clone(), value.clone());
                    }
                }
                for (field, value) in &pivot_value.data {
                    observation.insert(field.clone(), value.clone());
                }

                let column_id = format!("{}.{}", pivot_value.key, measure.name);
                if let Some(cell) = row.cell(&column_id) {
                    if let Some(value) = cell.value.as_f64() {
                        ranges.observe_number(&measure.name, value);
                    }
                    observation.insert(measure.name.clone(), cell.value.clone());
                }

                let id = std::iter::once(measure.name.clone())
                    .chain(
                        dimension_values
                            .iter()
                            .map(|v| v.as_ref().map(CellValue::key_string).unwrap_or_default()),
                    )
                    .chain(std::iter::once(pivot_value.key.clone()))
                    .collect::<Vec<_>>()
                    .join("|");
                observation.insert(PIVOT_KEY_FIELD.to_string(), CellValue::text(pivot_value.key.as_str()));
                observation.insert(ROW_ID_FIELD.to_string(), CellValue::Text(id));
                observations.push(observation);
            }
        }

        observations
    }

    /// Dimension values of a row; `None` where the row has no cell.
    fn dimension_values(&self, row: &Row) -> Vec<Option<CellValue>> {
        self.catalog
            .dimensions
            .iter()
            .map(|d| row.cell(&d.name).map(|c| c.value.clone()))
            .collect()
    }
}
