//! FILENAME: core/vis-model/src/rows.rs
//! Row Builder - Materializes source rows against the column index.
//!
//! Each source row becomes a `Row` whose cells are keyed by column id.
//! Pivoted columns read `row[field][pivot_key]`, all others read
//! `row[column_id]`. While walking the cells the builder feeds the range
//! tracker: numeric bounds for measures, first-seen sets for dimensions.
//!
//! A missing or wrongly shaped cell is skipped on its own; it never aborts
//! the row or the transform.

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::catalog::FieldCatalog;
use crate::columns::{Column, ColumnIndex};
use crate::definition::{Cell, FieldStyle, SourceRow, VisConfig};
use crate::ranges::RangeTracker;

/// Style tag set on negative cells of fields styled `negative`.
pub const NEGATIVE_TAG: &str = "negative";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// `|`-joined dimension values in declaration order.
    pub id: String,

    /// Present cells keyed by column id, in column order.
    pub cells: IndexMap<String, Cell>,
}

impl Row {
    pub fn cell(&self, column_id: &str) -> Option<&Cell> {
        self.cells.get(column_id)
    }
}

/// Output of the row phase: the rows plus the ranges they fed.
#[derive(Debug, Clone)]
pub struct BuiltRows {
    pub rows: Vec<Row>,
    pub ranges: RangeTracker,
}

fn lookup<'a>(source: &'a SourceRow, column: &Column) -> Option<&'a Cell> {
    match column.pivot_key.as_deref() {
        Some(pivot_key) if column.pivoted => source.pivoted(&column.field_name, pivot_key),
        _ => source.flat(&column.id),
    }
}

/// The row identity, read from the source row rather than the built cells.
pub fn row_id(catalog: &FieldCatalog, source: &SourceRow) -> String {
    catalog
        .dimensions
        .iter()
        .map(|d| {
            source
                .flat(&d.name)
                .map(|cell| cell.value.key_string())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Builds one `Row` per source row and feeds `ranges` along the way.
pub fn build_rows(
    catalog: &FieldCatalog,
    columns: &ColumnIndex,
    source_rows: &[SourceRow],
    mut ranges: RangeTracker,
) -> BuiltRows {
    let mut rows = Vec::with_capacity(source_rows.len());
    let mut skipped = 0usize;

    for (row_index, source) in source_rows.iter().enumerate() {
        let mut cells = IndexMap::with_capacity(columns.len());

        for column in columns {
            let Some(cell) = lookup(source, column) else {
                debug!("row {}: no cell for column {}", row_index, column.id);
                skipped += 1;
                continue;
            };

            if column.is_measure() {
                match cell.value.as_f64() {
                    Some(value) => ranges.observe_number(&column.range_key, value),
                    None if !cell.value.is_empty() => {
                        debug!("row {}: non-numeric value in measure {}", row_index, column.id);
                    }
                    None => {}
                }
            } else {
                ranges.observe_category(&column.range_key, &cell.value);
            }

            cells.insert(column.id.clone(), cell.clone());
        }

        rows.push(Row {
            id: row_id(catalog, source),
            cells,
        });
    }

    debug!("rows: built={} skipped_cells={}", rows.len(), skipped);

    BuiltRows { rows, ranges }
}

/// Tags negative numeric cells of every column whose field is styled
/// `negative`. Ranges are not touched.
pub fn apply_conditional_styles(rows: &mut [Row], columns: &ColumnIndex, config: &VisConfig) {
    let styled: Vec<&str> = columns
        .iter()
        .filter(|c| c.is_measure() && config.style_for(&c.field_name) == FieldStyle::Negative)
        .map(|c| c.id.as_str())
        .collect();
    if styled.is_empty() {
        return;
    }

    for row in rows.iter_mut() {
        for column_id in &styled {
            if let Some(cell) = row.cells.get_mut(*column_id) {
                if cell.value.as_f64().is_some_and(|v| v < 0.0) {
                    cell.add_tag(NEGATIVE_TAG);
                }
            }
        }
    }
}
