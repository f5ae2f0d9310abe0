//! # Record Store
//!
//! The store is the only place raw, schema-less JSON enters the system. A
//! source's backing document is either a bare array of records or an
//! envelope object:
//!
//! ```json
//! { "as_of": "2024-06-01T12:00:00Z", "data": [ ... ] }
//! ```
//!
//! A bare array has no freshness anchor, so its `as_of` is the load time.
//! Stores are read-only from our side and reloaded on every fetch.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::ConnectorError;
use crate::record::{Record, Source};

/// The untyped contents of a source as loaded from a store.
#[derive(Debug, Clone)]
pub struct RawCollection {
    pub records: Vec<Value>,
    pub as_of: DateTime<Utc>,
}

/// A typed, normalized collection.
#[derive(Debug, Clone)]
pub struct Collection<R> {
    pub records: Vec<R>,
    pub as_of: DateTime<Utc>,
}

impl<R: Record> Collection<R> {
    /// Convert raw records to `R`, skipping entries that are not JSON objects.
    pub fn from_raw(raw: RawCollection) -> Self {
        let total = raw.records.len();
        let records: Vec<R> = raw
            .records
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(R::from_raw(map)),
                _ => None,
            })
            .collect();
        if records.len() < total {
            tracing::warn!(
                source = %R::SOURCE,
                skipped = total - records.len(),
                "skipped non-object records"
            );
        }
        Self {
            records,
            as_of: raw.as_of,
        }
    }
}

/// Anything that can hand out the full record set for a source.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn load(&self, source: Source) -> Result<RawCollection, ConnectorError>;
}

/// Split a source document into records and freshness anchor.
///
/// `legacy_key` is the per-source alternative to `data` some exports use.
pub fn normalize(
    source: Source,
    document: Value,
    legacy_key: &str,
    now: DateTime<Utc>,
) -> Result<RawCollection, ConnectorError> {
    match document {
        Value::Array(records) => Ok(RawCollection { records, as_of: now }),
        Value::Object(mut envelope) => {
            let as_of = envelope
                .get("as_of")
                .and_then(Value::as_str)
                .and_then(parse_as_of)
                .unwrap_or(now);
            let records = match envelope.remove("data") {
                Some(Value::Array(records)) => records,
                _ => match envelope.remove(legacy_key) {
                    Some(Value::Array(records)) => records,
                    _ => Vec::new(),
                },
            };
            Ok(RawCollection { records, as_of })
        }
        other => Err(ConnectorError::StoreUnavailable {
            data_source: source.to_string(),
            reason: format!("expected an array or envelope object, found {}", kind(&other)),
        }),
    }
}

fn parse_as_of(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn legacy_key(source: Source) -> &'static str {
    use crate::record::{Customer, MetricPoint, SupportTicket};
    match source {
        Source::Crm => Customer::LEGACY_KEY,
        Source::Support => SupportTicket::LEGACY_KEY,
        Source::Analytics => MetricPoint::LEGACY_KEY,
    }
}

// =============================================================================
// JSON files
// =============================================================================

/// Reads one JSON document per source from a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(source: Source) -> &'static str {
        match source {
            Source::Crm => "customers.json",
            Source::Support => "support_tickets.json",
            Source::Analytics => "analytics.json",
        }
    }

    pub fn path_for(&self, source: Source) -> PathBuf {
        self.dir.join(Self::file_name(source))
    }
}

#[async_trait::async_trait]
impl RecordStore for JsonFileStore {
    async fn load(&self, source: Source) -> Result<RawCollection, ConnectorError> {
        let path = self.path_for(source);
        let unavailable = |reason: String| ConnectorError::StoreUnavailable {
            data_source: source.to_string(),
            reason,
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
        let document: Value = serde_json::from_slice(&bytes)
            .map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;

        normalize(source, document, legacy_key(source), Utc::now())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Holds one JSON document per source in memory. Missing sources behave like
/// a missing file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: HashMap<Source, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Source, document: Value) -> Self {
        self.documents.insert(source, document);
        self
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn load(&self, source: Source) -> Result<RawCollection, ConnectorError> {
        let document = self
            .documents
            .get(&source)
            .cloned()
            .ok_or_else(|| ConnectorError::StoreUnavailable {
                data_source: source.to_string(),
                reason: "no document loaded".into(),
            })?;
        normalize(source, document, legacy_key(source), Utc::now())
    }
}
