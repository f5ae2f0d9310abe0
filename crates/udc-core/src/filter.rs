//! # Filter Engine
//!
//! Applies a request's predicates to a collection. Every predicate is ANDed:
//!
//! - named filters: case-insensitive equality on a recognized key
//! - free-text query: case-insensitive substring over the source's search fields
//! - time range: inclusive bounds on the source's time field (analytics only)
//!
//! Unrecognized filter keys are ignored so clients can send optional filters a
//! given server does not know yet.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::record::{scalar_text, Record};

/// Filter values keyed by filter name, as they arrive from the request.
pub type FilterMap = BTreeMap<String, Value>;

/// A filter key a source recognizes.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FilterKey {
    pub name: &'static str,
    /// Human-readable value domain, e.g. `active|inactive`.
    pub hint: &'static str,
    /// Closed value domain; empty when any value is allowed.
    pub values: &'static [&'static str],
}

impl FilterKey {
    pub const fn open(name: &'static str, hint: &'static str) -> Self {
        Self {
            name,
            hint,
            values: &[],
        }
    }

    pub const fn closed(
        name: &'static str,
        hint: &'static str,
        values: &'static [&'static str],
    ) -> Self {
        Self { name, hint, values }
    }
}

/// `available_filters` description: key -> value hint.
pub fn describe(keys: &[FilterKey]) -> BTreeMap<String, String> {
    keys.iter()
        .map(|k| (k.name.to_string(), k.hint.to_string()))
        .collect()
}

/// [`describe`] for the keys source `R` recognizes.
pub fn available_filters<R: Record>() -> BTreeMap<String, String> {
    describe(R::FILTERS)
}

/// Inclusive time bounds. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

/// Everything the engine filters on.
#[derive(Debug, Clone, Copy)]
pub struct Criteria<'a> {
    pub query: Option<&'a str>,
    pub filters: &'a FilterMap,
    pub range: TimeRange,
}

/// Parse a record timestamp: RFC 3339, a naive datetime (taken as UTC), or a
/// bare date (midnight UTC).
pub fn parse_record_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Apply all criteria to `records`, keeping their relative order.
pub fn apply<R: Record>(records: Vec<R>, criteria: &Criteria<'_>) -> Vec<R> {
    let equalities = recognized_equalities::<R>(criteria.filters);

    let needle = criteria
        .query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let range = match R::TIME_FIELD {
        Some(field) if !criteria.range.is_unbounded() => Some((field, criteria.range)),
        _ => None,
    };

    records
        .into_iter()
        .filter(|record| {
            equalities.iter().all(|(key, wanted)| {
                record
                    .field_text(key)
                    .map_or(false, |actual| actual.to_lowercase() == *wanted)
            })
        })
        .filter(|record| match &needle {
            Some(needle) => R::SEARCH_FIELDS.iter().any(|field| {
                record
                    .field_text(field)
                    .map_or(false, |text| text.to_lowercase().contains(needle.as_str()))
            }),
            None => true,
        })
        .filter(|record| match range {
            Some((field, range)) => record
                .field_text(field)
                .and_then(|raw| parse_record_time(&raw))
                .map_or(false, |at| range.contains(at)),
            None => true,
        })
        .collect()
}

/// The filters that apply to `R`: recognized keys with a non-empty scalar value.
fn recognized_equalities<R: Record>(filters: &FilterMap) -> Vec<(&'static str, String)> {
    R::FILTERS
        .iter()
        .filter_map(|key| {
            let value = filters.get(key.name)?;
            match scalar_text(value) {
                Some(text) if !text.is_empty() => Some((key.name, text.to_lowercase())),
                Some(_) => None,
                None => {
                    if !value.is_null() {
                        tracing::debug!(filter = key.name, "ignoring non-scalar filter value");
                    }
                    None
                }
            }
        })
        .collect()
}
