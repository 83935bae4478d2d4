//! FILENAME: core/vis-model/src/options.rs
//! Config Options - The choices the host offers for each visualization role.
//!
//! Produces the option schema in the host's recognized shape
//! (`{ optionName: { values, default, ... } }`) and validates the caller's
//! current selection against the catalog, including the fallback rule for
//! size measures that have no pivot breakdown.

use indexmap::IndexMap;
use log::warn;
use serde::Serialize;

use crate::catalog::{Field, FieldCatalog};
use crate::definition::{DisplayOptionKey, FieldStyle, VisConfig, PIVOT_KEY_FIELD};
use crate::error::{VisError, VisResult};

const VIS_SECTION: &str = " Visualization";
const DIMENSIONS_SECTION: &str = "Dimensions";
const MEASURES_SECTION: &str = "Measures";

/// Label of the composite pivot key choice.
pub const PIVOT_SERIES_LABEL: &str = "Pivot Series";

// ============================================================================
// SCHEMA TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionDisplay {
    Select,
    Range,
}

/// One `{label: value}` choice of a select option.
pub type OptionChoice = IndexMap<String, String>;

fn choice(label: &str, value: &str) -> OptionChoice {
    let mut entry = IndexMap::with_capacity(1);
    entry.insert(label.to_string(), value.to_string());
    entry
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSpec {
    pub section: String,

    #[serde(rename = "type")]
    pub option_type: OptionType,

    pub label: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<OptionDisplay>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<OptionChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    pub order: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_size: Option<String>,
}

impl OptionSpec {
    fn new(section: &str, option_type: OptionType, label: &str, order: u32) -> Self {
        OptionSpec {
            section: section.to_string(),
            option_type,
            label: label.to_string(),
            display: None,
            values: Vec::new(),
            default: None,
            min: None,
            max: None,
            step: None,
            order,
            display_size: None,
        }
    }

    /// A select whose default is its first choice.
    fn select(section: &str, label: &str, values: Vec<OptionChoice>, order: u32) -> Self {
        let default = values
            .first()
            .and_then(|c| c.values().next())
            .map(|v| serde_json::Value::String(v.clone()));
        OptionSpec {
            display: Some(OptionDisplay::Select),
            values,
            default,
            ..OptionSpec::new(section, OptionType::String, label, order)
        }
    }

    /// The option values (field names) offered by a select.
    pub fn choice_values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().flat_map(|c| c.values().map(String::as_str))
    }
}

/// Ordered option name -> spec.
pub type OptionSchema = IndexMap<String, OptionSpec>;

/// Which options to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionFlags {
    pub size_by: bool,
    pub color_by: bool,
    pub group_by: bool,
    pub dimension_labels: bool,
    pub dimension_hide: bool,
    pub measure_labels: bool,
    /// Style choices offered per measure; none means no style option.
    pub measure_styles: Vec<FieldStyle>,
}

impl Default for OptionFlags {
    fn default() -> Self {
        OptionFlags {
            size_by: true,
            color_by: true,
            group_by: true,
            dimension_labels: true,
            dimension_hide: false,
            measure_labels: true,
            measure_styles: Vec::new(),
        }
    }
}

// ============================================================================
// SCHEMA BUILDER
// ============================================================================

/// Color/group choices: dimensions, pivot fields, and the pivot series
/// when more than one pivot field exists.
fn grouping_choices(catalog: &FieldCatalog) -> Vec<OptionChoice> {
    let mut values: Vec<OptionChoice> = catalog
        .dimensions
        .iter()
        .chain(&catalog.pivot_fields)
        .map(|f| choice(&f.label, &f.name))
        .collect();
    if catalog.pivot_fields.len() > 1 {
        values.push(choice(PIVOT_SERIES_LABEL, PIVOT_KEY_FIELD));
    }
    values
}

/// Derives the option schema from the catalog. Independent of the rows.
pub fn get_config_options(catalog: &FieldCatalog, flags: &OptionFlags) -> OptionSchema {
    let mut schema = OptionSchema::new();

    for (i, dimension) in catalog.dimensions.iter().enumerate() {
        let base = i as u32 * 10;
        if flags.dimension_labels {
            let mut spec = OptionSpec::new(DIMENSIONS_SECTION, OptionType::String, &dimension.label, base + 1);
            spec.default = Some(serde_json::Value::String(dimension.label.clone()));
            schema.insert(DisplayOptionKey::Label(dimension.name.clone()).to_string(), spec);
        }
        if flags.dimension_hide {
            let mut spec = OptionSpec::new(DIMENSIONS_SECTION, OptionType::Boolean, "Hide", base + 2);
            spec.display_size = Some("third".to_string());
            schema.insert(DisplayOptionKey::Hide(dimension.name.clone()).to_string(), spec);
        }
    }

    for (i, measure) in catalog.measures.iter().enumerate() {
        let base = 100 + i as u32 * 10;
        if flags.measure_labels {
            let mut spec = OptionSpec::new(MEASURES_SECTION, OptionType::String, &measure.label, base + 1);
            spec.default = Some(serde_json::Value::String(measure.label.clone()));
            schema.insert(DisplayOptionKey::Label(measure.name.clone()).to_string(), spec);
        }
        if !flags.measure_styles.is_empty() {
            let values = flags
                .measure_styles
                .iter()
                .map(|s| choice(s.label(), s.as_str()))
                .collect();
            schema.insert(
                DisplayOptionKey::Style(measure.name.clone()).to_string(),
                OptionSpec::select(MEASURES_SECTION, "Style", values, base + 2),
            );
        }
    }

    let groupings = grouping_choices(catalog);
    if flags.color_by {
        schema.insert(
            "colorBy".to_string(),
            OptionSpec::select(VIS_SECTION, "Color By", groupings.clone(), 100),
        );
    }
    if flags.group_by {
        schema.insert(
            "groupBy".to_string(),
            OptionSpec::select(VIS_SECTION, "Group By", groupings, 200),
        );
    }
    if flags.size_by {
        let values = catalog
            .measures
            .iter()
            .map(|m| choice(&m.label, &m.name))
            .collect();
        schema.insert(
            "sizeBy".to_string(),
            OptionSpec::select(VIS_SECTION, "Size By", values, 300),
        );
    }

    let mut scale = OptionSpec::new(VIS_SECTION, OptionType::Number, "Scale Size By", 100000);
    scale.display = Some(OptionDisplay::Range);
    scale.default = Some(serde_json::json!(1.0));
    scale.min = Some(0.2);
    scale.max = Some(2.0);
    scale.step = Some(0.2);
    schema.insert("scale".to_string(), scale);

    schema
}

// ============================================================================
// SELECTION VALIDATION
// ============================================================================

/// The effective selection for one update, after validation and fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub size_by: Option<String>,
    pub color_by: Option<String>,
    pub group_by: Option<String>,
    pub scale: f64,
}

impl Selection {
    /// The catalog record of the size measure.
    pub fn size_field<'a>(&self, catalog: &'a FieldCatalog) -> Option<&'a Field> {
        catalog.measure(self.size_by.as_deref()?)
    }
}

fn is_pivot_grouping(catalog: &FieldCatalog, name: &str) -> bool {
    catalog.pivot_field(name).is_some() || (catalog.is_pivoted() && name == PIVOT_KEY_FIELD)
}

fn check_grouping(
    catalog: &FieldCatalog,
    role: &'static str,
    name: Option<&String>,
) -> VisResult<()> {
    match name {
        Some(name) if catalog.dimension(name).is_none() && !is_pivot_grouping(catalog, name) => {
            Err(VisError::UnknownField { role, name: name.clone() })
        }
        _ => Ok(()),
    }
}

/// Validates the caller's selection against the catalog and applies the
/// fallback rule: when the size measure is a row total or a supermeasure,
/// color/group bound to a pivot field move to the first dimension.
pub fn resolve_selection(catalog: &FieldCatalog, config: &VisConfig) -> VisResult<Selection> {
    let size_field = match config.size_by.as_deref() {
        Some(name) => Some(catalog.measure(name).ok_or_else(|| VisError::UnknownField {
            role: "sizeBy",
            name: name.to_string(),
        })?),
        None => None,
    };
    check_grouping(catalog, "colorBy", config.color_by.as_ref())?;
    check_grouping(catalog, "groupBy", config.group_by.as_ref())?;

    let mut selection = Selection {
        size_by: config.size_by.clone(),
        color_by: config.color_by.clone(),
        group_by: config.group_by.clone(),
        scale: if config.scale.is_finite() && config.scale > 0.0 {
            config.scale
        } else {
            1.0
        },
    };

    let unbroken = size_field.is_some_and(|f| f.is_row_total() || f.is_super());
    if unbroken {
        let fallback = catalog.dimensions.first().map(|d| d.name.clone());
        for (role, slot) in [
            ("colorBy", &mut selection.color_by),
            ("groupBy", &mut selection.group_by),
        ] {
            if slot.as_deref().is_some_and(|name| is_pivot_grouping(catalog, name)) {
                if fallback.is_none() {
                    warn!("{} cleared: size measure has no pivot breakdown and no dimension exists", role);
                }
                *slot = fallback.clone();
            }
        }
    }

    Ok(selection)
}
