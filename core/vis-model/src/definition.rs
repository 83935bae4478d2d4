//! FILENAME: core/vis-model/src/definition.rs
//! Vis Definition - The inputs handed over by the host on every update.
//!
//! This module contains all the types needed to DESCRIBE one update cycle:
//! - Source rows (flat or nested by pivot key)
//! - Query metadata (field descriptors, pivot values, row total flag)
//! - The caller-controlled configuration (selections + display toggles)
//!
//! Everything here deserializes straight from the host's JSON documents.

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

/// Reserved pivot key denoting the row-total pseudo pivot.
pub const ROW_TOTAL_KEY: &str = "$$$_row_total_$$$";

/// Output field carrying a row's (or observation's) identity.
pub const ROW_ID_FIELD: &str = "rowId";

/// Pseudo field holding the composite pivot key of a melted row.
/// Also the option value of the "Pivot Series" color/group choice.
pub const PIVOT_KEY_FIELD: &str = "pivotKey";

/// Name of the synthesized row-total variant of a measure.
pub fn row_total_name(base_name: &str) -> String {
    format!("{}.{}", ROW_TOTAL_KEY, base_name)
}

// ============================================================================
// CELL VALUES
// ============================================================================

/// The scalar carried by a cell or by a pivot value's data map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The raw string form used when joining values into identities.
    /// Empty values contribute an empty string.
    pub fn key_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// A single data cell as delivered by the query layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub value: CellValue,

    /// Pre-formatted display string (the host calls it `rendered`).
    #[serde(default, alias = "rendered", skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,

    /// Style markers attached by the conditional formatting pass.
    #[serde(default, skip_serializing_if = "no_tags")]
    pub style_tags: SmallVec<[String; 2]>,
}

fn no_tags(tags: &SmallVec<[String; 2]>) -> bool {
    tags.is_empty()
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Cell {
            value: value.into(),
            display_value: None,
            style_tags: SmallVec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.style_tags.iter().any(|t| t == tag)
    }

    /// Adds a style tag unless already present.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.has_tag(tag) {
            self.style_tags.push(tag.to_string());
        }
    }
}

// ============================================================================
// SOURCE ROWS
// ============================================================================

/// One entry of a source row: a flat cell, or the cells of a pivoted
/// measure keyed by pivot key. Anything else is kept as `Other` and
/// treated as absent on lookup.
///
/// Pivoted cells are read one by one: an unreadable cell under one pivot
/// key is dropped without taking its siblings with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Cell(Cell),
    Pivoted(IndexMap<String, Cell>),
    Other(serde_json::Value),
}

impl SourceEntry {
    fn from_value(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Object(map) if !map.contains_key("value") => {
                let mut cells = IndexMap::with_capacity(map.len());
                for (pivot_key, entry) in &map {
                    match Cell::deserialize(entry) {
                        Ok(cell) => {
                            cells.insert(pivot_key.clone(), cell);
                        }
                        Err(err) => debug!("pivot key {}: unreadable cell dropped ({})", pivot_key, err),
                    }
                }
                SourceEntry::Pivoted(cells)
            }
            other => match Cell::deserialize(&other) {
                Ok(cell) => SourceEntry::Cell(cell),
                Err(_) => SourceEntry::Other(other),
            },
        }
    }
}

impl<'de> Deserialize<'de> for SourceEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(SourceEntry::from_value)
    }
}

/// A row of the query result, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRow {
    entries: IndexMap<String, SourceEntry>,
}

impl SourceRow {
    pub fn new() -> Self {
        SourceRow::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: SourceEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn with_cell(mut self, name: impl Into<String>, cell: Cell) -> Self {
        self.insert(name, SourceEntry::Cell(cell));
        self
    }

    /// Flat addressing: `row[column_id]`.
    pub fn flat(&self, column_id: &str) -> Option<&Cell> {
        match self.entries.get(column_id)? {
            SourceEntry::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    /// Pivoted addressing: `row[field][pivot_key]`.
    pub fn pivoted(&self, field: &str, pivot_key: &str) -> Option<&Cell> {
        match self.entries.get(field)? {
            SourceEntry::Pivoted(cells) => cells.get(pivot_key),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// QUERY METADATA
// ============================================================================

/// Hosts send explicit `null` for unset flags and lists; read it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A raw field descriptor from the query metadata block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub label_short: Option<String>,

    #[serde(default)]
    pub view_label: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_table_calculation: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        FieldDescriptor {
            name: name.into(),
            label: Some(label.into()),
            ..FieldDescriptor::default()
        }
    }

    pub fn table_calculation(mut self) -> Self {
        self.is_table_calculation = true;
        self
    }

    /// Short label when present, then the full label, then the name.
    pub fn display_label(&self) -> String {
        self.label_short
            .as_deref()
            .or(self.label.as_deref())
            .unwrap_or(&self.name)
            .to_string()
    }
}

/// One combination of pivot field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotValue {
    pub key: String,

    /// Pivot field name -> that field's value in this combination.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: IndexMap<String, CellValue>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_total: bool,
}

impl PivotValue {
    pub fn new(key: impl Into<String>) -> Self {
        PivotValue {
            key: key.into(),
            data: IndexMap::new(),
            is_total: false,
        }
    }

    pub fn row_total() -> Self {
        PivotValue {
            key: ROW_TOTAL_KEY.to_string(),
            data: IndexMap::new(),
            is_total: true,
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// True for the reserved row-total pseudo pivot.
    pub fn is_row_total(&self) -> bool {
        self.is_total || self.key == ROW_TOTAL_KEY
    }
}

/// The four field lists of the query metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFields {
    #[serde(default, deserialize_with = "null_as_default")]
    pub dimension_like: Vec<FieldDescriptor>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub measure_like: Vec<FieldDescriptor>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub pivots: Vec<FieldDescriptor>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub supermeasure_like: Vec<FieldDescriptor>,
}

/// The query metadata block (the host's `queryResponse`, minus the data).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub fields: QueryFields,

    #[serde(default)]
    pub pivots: Option<Vec<PivotValue>>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub has_row_totals: bool,
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Per-field display option keys. The host stores them in the flat config
/// map as `"label|<field>"`, `"hide|<field>"` and `"style|<field>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisplayOptionKey {
    Label(String),
    Hide(String),
    Style(String),
}

impl DisplayOptionKey {
    pub fn parse(key: &str) -> Option<Self> {
        let (prefix, field) = key.split_once('|')?;
        if field.is_empty() {
            return None;
        }
        match prefix {
            "label" => Some(DisplayOptionKey::Label(field.to_string())),
            "hide" => Some(DisplayOptionKey::Hide(field.to_string())),
            "style" => Some(DisplayOptionKey::Style(field.to_string())),
            _ => None,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            DisplayOptionKey::Label(f) | DisplayOptionKey::Hide(f) | DisplayOptionKey::Style(f) => f,
        }
    }
}

impl fmt::Display for DisplayOptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayOptionKey::Label(field) => write!(f, "label|{}", field),
            DisplayOptionKey::Hide(field) => write!(f, "hide|{}", field),
            DisplayOptionKey::Style(field) => write!(f, "style|{}", field),
        }
    }
}

/// Values accepted by a `style|<field>` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStyle {
    #[default]
    Normal,
    Hide,
    /// Tag negative numeric cells with the `negative` style marker.
    Negative,
}

impl FieldStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(FieldStyle::Normal),
            "hide" => Some(FieldStyle::Hide),
            "negative" => Some(FieldStyle::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStyle::Normal => "normal",
            FieldStyle::Hide => "hide",
            FieldStyle::Negative => "negative",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldStyle::Normal => "Normal",
            FieldStyle::Hide => "Hide",
            FieldStyle::Negative => "Highlight Negative",
        }
    }
}

/// The caller-controlled selection map. Read-only for this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,

    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Remaining keys, including the per-field display options.
    #[serde(flatten)]
    pub display: IndexMap<String, serde_json::Value>,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for VisConfig {
    fn default() -> Self {
        VisConfig {
            size_by: None,
            color_by: None,
            group_by: None,
            scale: default_scale(),
            display: IndexMap::new(),
        }
    }
}

impl VisConfig {
    pub fn new() -> Self {
        VisConfig::default()
    }

    pub fn size_by(mut self, name: impl Into<String>) -> Self {
        self.size_by = Some(name.into());
        self
    }

    pub fn color_by(mut self, name: impl Into<String>) -> Self {
        self.color_by = Some(name.into());
        self
    }

    pub fn group_by(mut self, name: impl Into<String>) -> Self {
        self.group_by = Some(name.into());
        self
    }

    pub fn set_display(&mut self, key: DisplayOptionKey, value: serde_json::Value) {
        self.display.insert(key.to_string(), value);
    }

    fn display_value(&self, key: DisplayOptionKey) -> Option<&serde_json::Value> {
        self.display.get(&key.to_string())
    }

    /// User-supplied label override for a field, if any.
    pub fn label_for(&self, field: &str) -> Option<&str> {
        self.display_value(DisplayOptionKey::Label(field.to_string()))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn style_for(&self, field: &str) -> FieldStyle {
        self.display_value(DisplayOptionKey::Style(field.to_string()))
            .and_then(|v| v.as_str())
            .and_then(FieldStyle::parse)
            .unwrap_or_default()
    }

    /// True when the field is hidden by `hide|<field>` or `style|<field> = hide`.
    pub fn is_hidden(&self, field: &str) -> bool {
        let hidden = self
            .display_value(DisplayOptionKey::Hide(field.to_string()))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        hidden || self.style_for(field) == FieldStyle::Hide
    }
}
