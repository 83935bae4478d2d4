//! FILENAME: core/vis-model/src/columns.rs
//! Column Index - The canonical, addressable columns of a model.
//!
//! Layout:
//! 1. One column per dimension, in declaration order
//! 2. Pivoted: one column per (pivot value x plain measure), skipping table
//!    calculations at the row-total pivot. Flat: one column per plain measure
//! 3. One unpivoted column per supermeasure

use log::debug;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::catalog::{Field, FieldCatalog};
use crate::definition::{PivotValue, VisConfig};
use crate::error::{VisError, VisResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Dimension,
    Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// `pivot_key + "." + field_name` for pivoted measures, else `field_name`.
    pub id: String,

    /// The field the column draws its values from.
    pub field_name: String,

    pub label: String,
    pub view_label: String,
    pub kind: ColumnKind,
    pub pivoted: bool,
    pub pivot_key: Option<String>,
    pub is_super: bool,

    /// Pivoted column sitting at the reserved row-total pivot.
    pub is_row_total: bool,

    /// The range entry fed by this column's values.
    pub range_key: String,

    /// Set by the `hide|<field>` / `style|<field>` display options.
    pub hidden: bool,
}

impl Column {
    fn new(field: &Field, kind: ColumnKind, config: &VisConfig) -> Self {
        Column {
            id: field.name.clone(),
            field_name: field.name.clone(),
            label: config
                .label_for(&field.name)
                .map(str::to_string)
                .unwrap_or_else(|| field.label.clone()),
            view_label: field.view_label.clone(),
            kind,
            pivoted: false,
            pivot_key: None,
            is_super: field.is_super(),
            is_row_total: false,
            range_key: field.name.clone(),
            hidden: config.is_hidden(&field.name),
        }
    }

    fn pivoted(
        field: &Field,
        pivot_value: &PivotValue,
        catalog: &FieldCatalog,
        config: &VisConfig,
    ) -> Self {
        let mut column = Column::new(field, ColumnKind::Measure, config);
        column.id = format!("{}.{}", pivot_value.key, field.name);
        column.pivoted = true;
        column.pivot_key = Some(pivot_value.key.clone());
        if pivot_value.is_row_total() {
            column.is_row_total = true;
            if let Some(total) = catalog.row_total_for(&field.name) {
                column.range_key = total.name.clone();
            }
        }
        column
    }

    pub fn is_dimension(&self) -> bool {
        self.kind == ColumnKind::Dimension
    }

    pub fn is_measure(&self) -> bool {
        self.kind == ColumnKind::Measure
    }
}

/// Ordered columns with an id lookup.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    columns: Vec<Column>,
    by_id: FxHashMap<String, usize>,
}

impl ColumnIndex {
    fn push(&mut self, column: Column) -> VisResult<()> {
        if self.by_id.contains_key(&column.id) {
            return Err(VisError::DuplicateColumn(column.id));
        }
        self.by_id.insert(column.id.clone(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Column> {
        self.by_id.get(id).map(|&i| &self.columns[i])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn dimension_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_dimension())
    }

    pub fn pivoted_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.pivoted)
    }

    pub fn super_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_super)
    }

    /// Pivoted columns addressed by one pivot key.
    pub fn columns_for_pivot<'a>(&'a self, pivot_key: &'a str) -> impl Iterator<Item = &'a Column> {
        self.columns
            .iter()
            .filter(move |c| c.pivot_key.as_deref() == Some(pivot_key))
    }
}

impl<'a> IntoIterator for &'a ColumnIndex {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl Serialize for ColumnIndex {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.columns.serialize(serializer)
    }
}

/// Builds the ordered column list for a catalog.
pub fn build_columns(catalog: &FieldCatalog, config: &VisConfig) -> VisResult<ColumnIndex> {
    let mut index = ColumnIndex::default();

    for dimension in &catalog.dimensions {
        index.push(Column::new(dimension, ColumnKind::Dimension, config))?;
    }

    if catalog.is_pivoted() {
        for pivot_value in &catalog.pivot_values {
            for measure in catalog.plain_measures() {
                // Table calculations are never defined for the row total
                if pivot_value.is_row_total() && measure.is_table_calculation {
                    continue;
                }
                index.push(Column::pivoted(measure, pivot_value, catalog, config))?;
            }
        }
    } else {
        for measure in catalog.plain_measures() {
            index.push(Column::new(measure, ColumnKind::Measure, config))?;
        }
    }

    for supermeasure in catalog.supermeasures() {
        index.push(Column::new(supermeasure, ColumnKind::Measure, config))?;
    }

    debug!(
        "columns: total={} pivoted={}",
        index.len(),
        index.pivoted_columns().count()
    );

    Ok(index)
}
