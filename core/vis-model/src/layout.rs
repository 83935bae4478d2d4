//! FILENAME: core/vis-model/src/layout.rs
//! Layout helpers for the bubble renderer: radius scaling and horizontal
//! group slots. Both read the ranges returned with the melted rows.

use serde::Serialize;

use crate::definition::CellValue;
use crate::melt::VisData;
use crate::ranges::{CategorySet, NumericRange};

pub const MIN_RADIUS: f64 = 5.0;
pub const RADIUS_SPREAD: f64 = 45.0;
pub const DEFAULT_RADIUS: f64 = 20.0;

/// Maps size values to bubble radii relative to the range maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BubbleScale {
    max: Option<f64>,
    scale: f64,
}

impl BubbleScale {
    pub fn new(range: &NumericRange, scale: f64) -> Self {
        BubbleScale {
            max: range.max.filter(|m| *m != 0.0),
            scale,
        }
    }

    /// Scale for the size measure of a melted result. Without a size
    /// selection every bubble gets the default radius.
    pub fn for_data(data: &VisData) -> Self {
        let max = data
            .selection
            .size_by
            .as_deref()
            .and_then(|name| data.ranges.numeric(name))
            .and_then(|range| range.max)
            .filter(|m| *m != 0.0);
        BubbleScale {
            max,
            scale: data.selection.scale,
        }
    }

    pub fn radius(&self, value: f64) -> f64 {
        match self.max {
            Some(max) => (MIN_RADIUS + value / max * RADIUS_SPREAD * self.scale).floor(),
            None => DEFAULT_RADIUS,
        }
    }

    /// Radius of a cell value; non-numeric values get the default.
    pub fn radius_of(&self, value: &CellValue) -> f64 {
        value.as_f64().map_or(DEFAULT_RADIUS, |v| self.radius(v))
    }
}

/// Horizontal centre of `value`'s group. With no grouping every bubble sits
/// at the middle; an unknown value lands at 0.
pub fn group_position(groups: Option<&CategorySet>, value: &CellValue, width: f64) -> f64 {
    let Some(groups) = groups else {
        return width / 2.0;
    };
    let slots = (groups.len() + 1) as f64;
    let slot = groups.index_of(value).map_or(0.0, |i| (i + 1) as f64);
    width / slots * slot
}

impl VisData {
    /// The group set for the current `groupBy`, if any.
    pub fn group_set(&self) -> Option<&CategorySet> {
        self.ranges.categorical(self.selection.group_by.as_deref()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius() {
        let mut range = NumericRange::new();
        range.observe(10.0);
        range.observe(100.0);

        let scale = BubbleScale::new(&range, 1.0);
        assert_eq!(scale.radius(100.0), 50.0);
        assert_eq!(scale.radius(10.0), 9.0);
        assert_eq!(BubbleScale::new(&range, 2.0).radius(50.0), 50.0);
        assert_eq!(scale.radius_of(&CellValue::text("n/a")), DEFAULT_RADIUS);
    }

    #[test]
    fn test_radius_defaults_without_data() {
        assert_eq!(BubbleScale::new(&NumericRange::new(), 1.0).radius(3.0), DEFAULT_RADIUS);

        let mut zero = NumericRange::new();
        zero.observe(0.0);
        assert_eq!(BubbleScale::new(&zero, 1.0).radius(0.0), DEFAULT_RADIUS);
    }

    #[test]
    fn test_group_position() {
        let mut groups = CategorySet::new();
        groups.insert(&CellValue::text("a"));
        groups.insert(&CellValue::text("b"));
        groups.insert(&CellValue::text("c"));

        assert_eq!(group_position(Some(&groups), &CellValue::text("a"), 400.0), 100.0);
        assert_eq!(group_position(Some(&groups), &CellValue::text("c"), 400.0), 300.0);
        assert_eq!(group_position(Some(&groups), &CellValue::text("zzz"), 400.0), 0.0);
        assert_eq!(group_position(None, &CellValue::text("a"), 400.0), 200.0);
    }
}
