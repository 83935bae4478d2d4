//! FILENAME: core/vis-model/src/ranges.rs
//! Range Tracker - Running statistics per field.
//!
//! Numeric fields keep a running {min, max}; categorical fields keep the
//! unique values they were fed, in first-seen order. Both are consumed by
//! the row builder and refined again by the melter.
//!
//! Bounds start out absent rather than at sentinel constants, so a field
//! with only negative values reports its true maximum and a field with no
//! observations reports "no data".

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::definition::CellValue;

// ============================================================================
// HASHABLE VALUE KEYS
// ============================================================================

/// Wrapper around f64 that implements Eq and Hash for set membership.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // 0.0 and -0.0 compare equal, so they must hash equal
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// A normalized, hashable form of a cell value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RangeKey {
    Empty,
    Number(OrderedFloat),
    Boolean(bool),
    Text(String),
}

impl From<&CellValue> for RangeKey {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => RangeKey::Empty,
            CellValue::Number(n) => RangeKey::Number(OrderedFloat(*n)),
            CellValue::Boolean(b) => RangeKey::Boolean(*b),
            CellValue::Text(s) => RangeKey::Text(s.clone()),
        }
    }
}

// ============================================================================
// NUMERIC RANGE
// ============================================================================

/// Running bounds of a numeric field. Both bounds are `None` until the
/// first observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new() -> Self {
        NumericRange::default()
    }

    /// Widens the bounds to include `value`. NaN is ignored.
    pub fn observe(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }

    /// Width of the range, or `None` without data.
    pub fn span(&self) -> Option<f64> {
        Some(self.max? - self.min?)
    }
}

// ============================================================================
// CATEGORY SET
// ============================================================================

/// Unique values of a categorical field in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct CategorySet {
    values: Vec<CellValue>,
    seen: FxHashSet<RangeKey>,
}

impl CategorySet {
    pub fn new() -> Self {
        CategorySet::default()
    }

    /// Appends the value if not already present. Returns true when added.
    pub fn insert(&mut self, value: &CellValue) -> bool {
        if self.seen.insert(RangeKey::from(value)) {
            self.values.push(value.clone());
            true
        } else {
            false
        }
    }

    pub fn contains(&self, value: &CellValue) -> bool {
        self.seen.contains(&RangeKey::from(value))
    }

    /// Position of the value in first-seen order.
    pub fn index_of(&self, value: &CellValue) -> Option<usize> {
        if !self.contains(value) {
            return None;
        }
        self.values.iter().position(|v| RangeKey::from(v) == RangeKey::from(value))
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for CategorySet {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Serialize for CategorySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("set", &self.values)?;
        map.end()
    }
}

// ============================================================================
// FIELD RANGE + TRACKER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldRange {
    Numeric(NumericRange),
    Categorical(CategorySet),
}

impl FieldRange {
    pub fn as_numeric(&self) -> Option<&NumericRange> {
        match self {
            FieldRange::Numeric(r) => Some(r),
            FieldRange::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&CategorySet> {
        match self {
            FieldRange::Categorical(s) => Some(s),
            FieldRange::Numeric(_) => None,
        }
    }
}

/// Ranges for every field of a model, keyed by field name in registration
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeTracker {
    ranges: IndexMap<String, FieldRange>,
}

impl RangeTracker {
    pub fn new() -> Self {
        RangeTracker::default()
    }

    /// Registers an empty numeric range. An existing entry is kept.
    pub fn insert_numeric(&mut self, field: &str) {
        self.ranges
            .entry(field.to_string())
            .or_insert_with(|| FieldRange::Numeric(NumericRange::new()));
    }

    /// Registers an empty categorical set. An existing entry is kept.
    pub fn insert_categorical(&mut self, field: &str) {
        self.ranges
            .entry(field.to_string())
            .or_insert_with(|| FieldRange::Categorical(CategorySet::new()));
    }

    /// Feeds a numeric observation. Unregistered fields get a numeric
    /// range on first use; a categorical entry is left untouched.
    pub fn observe_number(&mut self, field: &str, value: f64) {
        let range = self
            .ranges
            .entry(field.to_string())
            .or_insert_with(|| FieldRange::Numeric(NumericRange::new()));
        if let FieldRange::Numeric(r) = range {
            r.observe(value);
        }
    }

    /// Feeds a categorical observation. Unregistered fields get a set on
    /// first use; a numeric entry is left untouched.
    pub fn observe_category(&mut self, field: &str, value: &CellValue) {
        let range = self
            .ranges
            .entry(field.to_string())
            .or_insert_with(|| FieldRange::Categorical(CategorySet::new()));
        if let FieldRange::Categorical(set) = range {
            set.insert(value);
        }
    }

    /// Clears a numeric range so it can be recomputed from scratch.
    pub fn reset_numeric(&mut self, field: &str) {
        self.ranges
            .insert(field.to_string(), FieldRange::Numeric(NumericRange::new()));
    }

    pub fn get(&self, field: &str) -> Option<&FieldRange> {
        self.ranges.get(field)
    }

    pub fn numeric(&self, field: &str) -> Option<&NumericRange> {
        self.get(field)?.as_numeric()
    }

    pub fn categorical(&self, field: &str) -> Option<&CategorySet> {
        self.get(field)?.as_categorical()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldRange)> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl Serialize for RangeTracker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ranges.serialize(serializer)
    }
}
