//! # Data Shape Classifier
//!
//! Labels a page by the field set of its first object. The check is purely
//! structural and never looks at which source was asked for, so a page that
//! happens to carry another source's fields gets that source's label.
//! Treat the result as a hint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataShape {
    Empty,
    TimeSeries,
    TabularCrm,
    TabularSupport,
    Unknown,
}

impl DataShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TimeSeries => "time_series",
            Self::TabularCrm => "tabular_crm",
            Self::TabularSupport => "tabular_support",
            Self::Unknown => "unknown",
        }
    }
}

pub fn classify(items: &[Value]) -> DataShape {
    if items.is_empty() {
        return DataShape::Empty;
    }

    let Some(sample) = items.iter().find_map(Value::as_object) else {
        return DataShape::Unknown;
    };

    if has_all(sample, &["date", "value"]) {
        DataShape::TimeSeries
    } else if has_all(sample, &["ticket_id", "status"]) {
        DataShape::TabularSupport
    } else if has_all(sample, &["customer_id", "email"]) {
        DataShape::TabularCrm
    } else {
        DataShape::Unknown
    }
}

fn has_all(sample: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().all(|k| sample.contains_key(*k))
}
