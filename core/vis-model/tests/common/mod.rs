//! FILENAME: tests/common/mod.rs
//! Fixtures and assertion helpers for vis-model integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use vis_model::{CellValue, FlatRow, VisModel};

// ============================================================================
// FLAT FIXTURE
// ============================================================================

/// Two dimensions, two measures, no pivots.
pub struct FlatFixture;

impl FlatFixture {
    pub fn query() -> Value {
        json!({
            "fields": {
                "dimension_like": [
                    { "name": "users.city", "label": "City", "view_label": "Users" },
                    { "name": "users.state", "label": "State", "label_short": "St" }
                ],
                "measure_like": [
                    { "name": "users.count", "label": "Count" },
                    { "name": "users.avg_age", "label": "Average Age" }
                ]
            }
        })
    }

    pub fn data() -> Value {
        json!([
            {
                "users.city": { "value": "Austin" },
                "users.state": { "value": "TX" },
                "users.count": { "value": 120, "rendered": "120" },
                "users.avg_age": { "value": 31.5 }
            },
            {
                "users.city": { "value": "Dallas" },
                "users.state": { "value": "TX" },
                "users.count": { "value": 80 },
                "users.avg_age": { "value": 35.0 }
            },
            {
                "users.city": { "value": "Boston" },
                "users.state": { "value": "MA" },
                "users.count": { "value": 45 },
                "users.avg_age": { "value": null }
            }
        ])
    }

    pub fn model(config: Value) -> VisModel {
        VisModel::from_json(&Self::data(), &config, &Self::query()).unwrap()
    }
}

// ============================================================================
// PIVOTED FIXTURE
// ============================================================================

/// One dimension, two pivot fields, a measure with row totals, a table
/// calculation and a supermeasure. Pears has no South|Web cell.
pub struct PivotFixture;

impl PivotFixture {
    pub const REAL_KEYS: [&'static str; 3] = ["North|Web", "North|Store", "South|Web"];

    pub fn query() -> Value {
        json!({
            "fields": {
                "dimension_like": [{ "name": "products.name", "label": "Product" }],
                "measure_like": [
                    { "name": "orders.revenue", "label": "Revenue" },
                    { "name": "share", "label": "Share", "is_table_calculation": true }
                ],
                "pivots": [
                    { "name": "orders.region", "label": "Region" },
                    { "name": "orders.channel", "label": "Channel" }
                ],
                "supermeasure_like": [{ "name": "orders.grand", "label": "Grand Total" }]
            },
            "pivots": [
                { "key": "North|Web", "data": { "orders.region": "North", "orders.channel": "Web" } },
                { "key": "North|Store", "data": { "orders.region": "North", "orders.channel": "Store" } },
                { "key": "South|Web", "data": { "orders.region": "South", "orders.channel": "Web" } },
                { "key": "$$$_row_total_$$$", "is_total": true }
            ],
            "has_row_totals": true
        })
    }

    pub fn data() -> Value {
        json!([
            {
                "products.name": { "value": "Apples" },
                "orders.revenue": {
                    "North|Web": { "value": 10 },
                    "North|Store": { "value": 20 },
                    "South|Web": { "value": 30 },
                    "$$$_row_total_$$$": { "value": 60 }
                },
                "share": {
                    "North|Web": { "value": 0.5 },
                    "North|Store": { "value": 0.6 },
                    "South|Web": { "value": 0.7 }
                },
                "orders.grand": { "value": 86 }
            },
            {
                "products.name": { "value": "Pears" },
                "orders.revenue": {
                    "North|Web": { "value": 5 },
                    "North|Store": { "value": 15 },
                    "$$$_row_total_$$$": { "value": 20 }
                },
                "share": {
                    "North|Web": { "value": 0.25 },
                    "North|Store": { "value": 0.3 },
                    "South|Web": { "value": null }
                },
                "orders.grand": { "value": 86 }
            },
            {
                "products.name": { "value": "Plums" },
                "orders.revenue": {
                    "North|Web": { "value": 1 },
                    "North|Store": { "value": 2 },
                    "South|Web": { "value": 3 },
                    "$$$_row_total_$$$": { "value": 6 }
                },
                "share": {
                    "North|Web": { "value": 0.25 },
                    "North|Store": { "value": 0.1 },
                    "South|Web": { "value": 0.3 }
                },
                "orders.grand": { "value": 86 }
            }
        ])
    }

    pub fn model(config: Value) -> VisModel {
        VisModel::from_json(&Self::data(), &config, &Self::query()).unwrap()
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Assert that a melted row carries an expected number under `key`.
pub fn assert_number(row: &FlatRow, key: &str, expected: f64) {
    match row.get(key) {
        Some(CellValue::Number(n)) => assert!(
            (n - expected).abs() < 1e-9,
            "{}: expected {}, got {}",
            key,
            expected,
            n
        ),
        other => panic!("{}: expected number {}, got {:?}", key, expected, other),
    }
}

/// Assert that a melted row carries an expected text under `key`.
pub fn assert_text(row: &FlatRow, key: &str, expected: &str) {
    assert_eq!(
        row.get(key),
        Some(&CellValue::text(expected)),
        "{}: unexpected value",
        key
    );
}
