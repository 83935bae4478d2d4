//! FILENAME: core/vis-model/src/catalog.rs
//! Field Catalog - What the query result is made of.
//!
//! Extracts dimension, measure, pivot field and supermeasure records from the
//! query metadata, synthesizes the row-total variant of each eligible
//! measure, and seeds the range tracker with an entry per field.

use log::debug;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::definition::{
    row_total_name, FieldDescriptor, PivotValue, QueryMetadata, PIVOT_KEY_FIELD,
};
use crate::error::{VisError, VisResult};
use crate::ranges::RangeTracker;

// ============================================================================
// FIELD RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Dimension,
    Measure,
    PivotField,
}

/// Which measure concept a measure record stands for. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureKind {
    /// A measure of the query, pivoted when the dataset is.
    Plain,
    /// The synthesized row total of a plain measure.
    RowTotal,
    /// A measure that bypasses pivoting (one value per row).
    Super,
}

/// A catalog entry. `name` is the full (possibly synthesized) name,
/// `base_name` the measure it derives from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub base_name: String,
    pub label: String,
    pub view_label: String,
    pub role: FieldRole,
    /// Only meaningful for measures.
    pub measure_kind: Option<MeasureKind>,
    pub is_table_calculation: bool,
    pub is_pivoted: bool,
}

impl Field {
    fn from_descriptor(desc: &FieldDescriptor, role: FieldRole) -> Self {
        Field {
            name: desc.name.clone(),
            base_name: desc.name.clone(),
            label: desc.display_label(),
            view_label: desc.view_label.clone().unwrap_or_default(),
            role,
            measure_kind: None,
            is_table_calculation: false,
            is_pivoted: false,
        }
    }

    fn measure(desc: &FieldDescriptor, kind: MeasureKind, is_pivoted: bool) -> Self {
        let mut field = Field::from_descriptor(desc, FieldRole::Measure);
        field.measure_kind = Some(kind);
        field.is_table_calculation = kind == MeasureKind::Plain && desc.is_table_calculation;
        field.is_pivoted = is_pivoted;
        field
    }

    fn row_total_of(base: &Field) -> Self {
        Field {
            name: row_total_name(&base.name),
            base_name: base.name.clone(),
            label: format!("{} (Row Total)", base.label),
            view_label: base.view_label.clone(),
            role: FieldRole::Measure,
            measure_kind: Some(MeasureKind::RowTotal),
            is_table_calculation: false,
            is_pivoted: false,
        }
    }

    pub fn is_measure(&self) -> bool {
        self.role == FieldRole::Measure
    }

    pub fn is_plain_measure(&self) -> bool {
        self.measure_kind == Some(MeasureKind::Plain)
    }

    pub fn is_row_total(&self) -> bool {
        self.measure_kind == Some(MeasureKind::RowTotal)
    }

    pub fn is_super(&self) -> bool {
        self.measure_kind == Some(MeasureKind::Super)
    }
}

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldCatalog {
    pub dimensions: Vec<Field>,
    /// Plain measures, each followed by its row-total variant, then supermeasures.
    pub measures: Vec<Field>,
    pub pivot_fields: Vec<Field>,
    /// All pivot values in query order, the reserved total included.
    pub pivot_values: Vec<PivotValue>,
    pub has_row_totals: bool,
}

impl FieldCatalog {
    /// True when the dataset declares at least one pivot field.
    pub fn is_pivoted(&self) -> bool {
        !self.pivot_fields.is_empty()
    }

    /// Pivot values excluding the reserved row-total pseudo pivot.
    pub fn real_pivot_values(&self) -> impl Iterator<Item = &PivotValue> {
        self.pivot_values.iter().filter(|p| !p.is_row_total())
    }

    pub fn has_row_total_pivot(&self) -> bool {
        self.pivot_values.iter().any(|p| p.is_row_total())
    }

    pub fn plain_measures(&self) -> impl Iterator<Item = &Field> {
        self.measures.iter().filter(|m| m.is_plain_measure())
    }

    pub fn supermeasures(&self) -> impl Iterator<Item = &Field> {
        self.measures.iter().filter(|m| m.is_super())
    }

    pub fn measure(&self, name: &str) -> Option<&Field> {
        self.measures.iter().find(|m| m.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&Field> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn pivot_field(&self, name: &str) -> Option<&Field> {
        self.pivot_fields.iter().find(|p| p.name == name)
    }

    /// The synthesized row-total variant of a plain measure, if any.
    pub fn row_total_for(&self, base_name: &str) -> Option<&Field> {
        self.measures
            .iter()
            .find(|m| m.is_row_total() && m.base_name == base_name)
    }

    /// Seeds a tracker with one entry per field. Pivot field sets and the
    /// pivot-key set are filled from the real pivot values right away.
    pub fn initial_ranges(&self) -> RangeTracker {
        let mut ranges = RangeTracker::new();

        for pivot_field in &self.pivot_fields {
            ranges.insert_categorical(&pivot_field.name);
        }
        if self.is_pivoted() {
            ranges.insert_categorical(PIVOT_KEY_FIELD);
            for pivot_value in self.real_pivot_values() {
                ranges.observe_category(PIVOT_KEY_FIELD, &pivot_value.key.as_str().into());
                for (field, value) in &pivot_value.data {
                    ranges.observe_category(field, value);
                }
            }
        }

        for dimension in &self.dimensions {
            ranges.insert_categorical(&dimension.name);
        }
        for measure in &self.measures {
            ranges.insert_numeric(&measure.name);
        }

        ranges
    }
}

/// Extracts the field catalog from query metadata.
///
/// Malformed metadata (empty or duplicate names, pivot data naming an
/// undeclared pivot field, duplicate pivot keys) is fatal.
pub fn build_catalog(metadata: &QueryMetadata) -> VisResult<FieldCatalog> {
    let fields = &metadata.fields;
    let pivot_values = metadata.pivots.clone().unwrap_or_default();

    if fields.pivots.is_empty() && !pivot_values.is_empty() {
        return Err(VisError::MalformedCatalog(
            "pivot values present but no pivot field declared".to_string(),
        ));
    }

    let pivot_fields: Vec<Field> = fields
        .pivots
        .iter()
        .map(|p| Field::from_descriptor(p, FieldRole::PivotField))
        .collect();

    let dimensions: Vec<Field> = fields
        .dimension_like
        .iter()
        .map(|d| Field::from_descriptor(d, FieldRole::Dimension))
        .collect();

    let is_pivoted = !pivot_fields.is_empty();
    let mut measures = Vec::new();
    for desc in &fields.measure_like {
        let measure = Field::measure(desc, MeasureKind::Plain, is_pivoted);
        // Table calculations have no row-total semantics
        let row_total = (metadata.has_row_totals && !measure.is_table_calculation)
            .then(|| Field::row_total_of(&measure));
        measures.push(measure);
        measures.extend(row_total);
    }
    for desc in &fields.supermeasure_like {
        measures.push(Field::measure(desc, MeasureKind::Super, false));
    }

    let catalog = FieldCatalog {
        dimensions,
        measures,
        pivot_fields,
        pivot_values,
        has_row_totals: metadata.has_row_totals,
    };
    validate_catalog(&catalog)?;

    debug!(
        "catalog: dimensions={} measures={} pivot_fields={} pivot_values={} row_totals={}",
        catalog.dimensions.len(),
        catalog.measures.len(),
        catalog.pivot_fields.len(),
        catalog.pivot_values.len(),
        catalog.has_row_totals
    );

    Ok(catalog)
}

fn validate_catalog(catalog: &FieldCatalog) -> VisResult<()> {
    let mut names = FxHashSet::default();
    let all_fields = catalog
        .pivot_fields
        .iter()
        .chain(&catalog.dimensions)
        .chain(&catalog.measures);

    for field in all_fields {
        if field.name.is_empty() {
            return Err(VisError::MalformedCatalog(format!(
                "{:?} field with empty name",
                field.role
            )));
        }
        if !names.insert(field.name.as_str()) {
            return Err(VisError::MalformedCatalog(format!(
                "duplicate field name: {}",
                field.name
            )));
        }
    }

    let mut keys = FxHashSet::default();
    for pivot_value in &catalog.pivot_values {
        if !keys.insert(pivot_value.key.as_str()) {
            return Err(VisError::MalformedCatalog(format!(
                "duplicate pivot key: {}",
                pivot_value.key
            )));
        }
        for field in pivot_value.data.keys() {
            if catalog.pivot_field(field).is_none() {
                return Err(VisError::MalformedCatalog(format!(
                    "pivot value {} references undeclared pivot field {}",
                    pivot_value.key, field
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{CellValue, QueryFields, ROW_TOTAL_KEY};

    fn pivoted_metadata(has_row_totals: bool) -> QueryMetadata {
        QueryMetadata {
            fields: QueryFields {
                dimension_like: vec![FieldDescriptor::new("products.name", "Product")],
                measure_like: vec![
                    FieldDescriptor::new("orders.revenue", "Revenue"),
                    FieldDescriptor::new("share", "Share").table_calculation(),
                ],
                pivots: vec![FieldDescriptor::new("orders.region", "Region")],
                supermeasure_like: vec![FieldDescriptor::new("orders.total", "Total")],
            },
            pivots: Some(vec![
                PivotValue::new("North").with("orders.region", "North"),
                PivotValue::new("South").with("orders.region", "South"),
                PivotValue::row_total(),
            ]),
            has_row_totals,
        }
    }

    #[test]
    fn test_row_total_variants_follow_their_base() {
        let catalog = build_catalog(&pivoted_metadata(true)).unwrap();
        let names: Vec<&str> = catalog.measures.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "orders.revenue",
                "$$$_row_total_$$$.orders.revenue",
                "share",
                "orders.total"
            ]
        );

        let total = catalog.row_total_for("orders.revenue").unwrap();
        assert_eq!(total.label, "Revenue (Row Total)");
        assert_eq!(total.base_name, "orders.revenue");
        assert!(total.is_row_total());
        assert!(!total.is_pivoted);
        assert!(catalog.row_total_for("share").is_none());
    }

    #[test]
    fn test_no_row_totals_without_flag() {
        let catalog = build_catalog(&pivoted_metadata(false)).unwrap();
        assert!(catalog.measures.iter().all(|m| !m.is_row_total()));
        assert_eq!(catalog.measures.len(), 3);
    }

    #[test]
    fn test_measure_flags() {
        let catalog = build_catalog(&pivoted_metadata(true)).unwrap();
        let revenue = catalog.measure("orders.revenue").unwrap();
        assert!(revenue.is_plain_measure() && revenue.is_pivoted);
        let share = catalog.measure("share").unwrap();
        assert!(share.is_table_calculation);
        let total = catalog.measure("orders.total").unwrap();
        assert!(total.is_super() && !total.is_pivoted);
    }

    #[test]
    fn test_initial_ranges_exclude_total_pivot() {
        let catalog = build_catalog(&pivoted_metadata(true)).unwrap();
        let ranges = catalog.initial_ranges();

        let regions = ranges.categorical("orders.region").unwrap();
        assert_eq!(regions.values(), &[CellValue::text("North"), CellValue::text("South")]);
        let keys = ranges.categorical(PIVOT_KEY_FIELD).unwrap();
        assert!(!keys.contains(&CellValue::text(ROW_TOTAL_KEY)));
        assert_eq!(keys.len(), 2);

        assert!(ranges.categorical("products.name").unwrap().is_empty());
        assert!(ranges.numeric("$$$_row_total_$$$.orders.revenue").unwrap().is_empty());
        assert!(ranges.numeric("orders.total").is_some());
        assert_eq!(catalog.real_pivot_values().count(), 2);
        assert!(catalog.has_row_total_pivot());
    }

    #[test]
    fn test_malformed_metadata_is_fatal() {
        let mut metadata = pivoted_metadata(false);
        metadata.fields.dimension_like.push(FieldDescriptor::new("orders.revenue", "Dup"));
        assert!(matches!(build_catalog(&metadata), Err(VisError::MalformedCatalog(_))));

        let mut metadata = pivoted_metadata(false);
        metadata.pivots.as_mut().unwrap()[0].data.insert("orders.channel".into(), "Web".into());
        assert!(matches!(build_catalog(&metadata), Err(VisError::MalformedCatalog(_))));

        let mut metadata = pivoted_metadata(false);
        metadata.fields.pivots.clear();
        assert!(matches!(build_catalog(&metadata), Err(VisError::MalformedCatalog(_))));

        let mut metadata = pivoted_metadata(false);
        metadata.pivots.as_mut().unwrap().push(PivotValue::new("North"));
        assert!(matches!(build_catalog(&metadata), Err(VisError::MalformedCatalog(_))));
    }

    #[test]
    fn test_flat_catalog() {
        let metadata = QueryMetadata {
            fields: QueryFields {
                dimension_like: vec![FieldDescriptor::new("a", "A")],
                measure_like: vec![FieldDescriptor::new("m", "M")],
                ..QueryFields::default()
            },
            pivots: None,
            has_row_totals: false,
        };
        let catalog = build_catalog(&metadata).unwrap();
        assert!(!catalog.is_pivoted());
        assert!(!catalog.measures[0].is_pivoted);
        assert!(catalog.initial_ranges().get(PIVOT_KEY_FIELD).is_none());
    }
}
