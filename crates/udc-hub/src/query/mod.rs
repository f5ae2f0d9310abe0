//! # Unified Query
//!
//! Request/response shapes for `POST /query` and `GET /data/{source}`, and
//! the knobs that shape them. The work happens in [`executor`].

pub mod executor;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use udc_core::filter::parse_record_time;
use udc_core::{DataShape, FilterMap, Freshness, MetricSummary, PageLimits};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    #[default]
    Full,
    Voice,
}

/// Body of `POST /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// Parsed by the registry so unknown names surface as `UnknownSource`.
    pub source: String,
    #[serde(default)]
    pub mode: QueryMode,
    pub query: Option<String>,
    pub filters: Option<FilterMap>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339, naive datetimes (UTC) and plain dates.
fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_record_time(text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", text))),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub returned: usize,
    pub total: usize,
    pub limit: usize,
    pub next_cursor: Option<String>,
    pub message: String,
}

/// Response of `POST /query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub source: String,
    pub mode: QueryMode,
    pub data_type: DataShape,
    pub freshness: Freshness,
    pub page: PageInfo,
    pub summary: String,
    pub highlights: Vec<String>,
    /// Voice mode only: offers the next page when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_hint: Option<String>,
    pub items: Vec<Value>,
    pub available_filters: BTreeMap<String, String>,
    pub suggested_followups: Vec<String>,
}

/// Query string of `GET /data/{source}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataParams {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub q: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub metric: Option<String>,
    pub customer_id: Option<String>,
    pub ticket_id: Option<String>,
}

impl DataParams {
    /// The named filters present in the query string.
    pub fn filters(&self) -> FilterMap {
        [
            ("status", &self.status),
            ("priority", &self.priority),
            ("metric", &self.metric),
            ("customer_id", &self.customer_id),
            ("ticket_id", &self.ticket_id),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| (key.to_string(), Value::String(v.clone())))
        })
        .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub total_results: usize,
    pub returned_results: usize,
    pub data_freshness: String,
    pub next_cursor: Option<String>,
    pub data_type: DataShape,
}

/// Response of `GET /data/{source}`.
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse {
    pub data: Vec<Value>,
    pub metadata: Metadata,
}

/// Query string of `GET /data/{source}/summary`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryParams {
    pub metric: Option<String>,
    /// Look-back window; ignored when `start_time` is given.
    pub days: Option<i64>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetadata {
    pub data_freshness: String,
    pub query_context: String,
    pub period_days: i64,
}

/// Response of `GET /data/{source}/summary`. `data` is null when no numeric
/// point falls in the window.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub data: Option<MetricSummary>,
    pub metadata: SummaryMetadata,
    pub voice_summary: String,
}

fn default_limit() -> usize {
    10
}
fn default_max_limit() -> usize {
    100
}
fn default_voice_limit() -> i64 {
    10
}
fn default_full_limit() -> i64 {
    50
}
fn default_summary_threshold() -> usize {
    udc_core::voice::DEFAULT_SUMMARY_THRESHOLD
}
fn default_stale_after() -> u64 {
    udc_core::freshness::DEFAULT_STALE_AFTER_SECONDS
}

/// The `[query]` config section.
#[derive(Debug, Clone, Deserialize)]
pub struct QuerySettings {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Page size for voice queries that give no limit.
    #[serde(default = "default_voice_limit")]
    pub voice_limit: i64,
    /// Page size for full queries that give no limit.
    #[serde(default = "default_full_limit")]
    pub full_limit: i64,
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: usize,
    #[serde(default = "default_stale_after")]
    pub stale_after_seconds: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            voice_limit: default_voice_limit(),
            full_limit: default_full_limit(),
            summary_threshold: default_summary_threshold(),
            stale_after_seconds: default_stale_after(),
        }
    }
}

impl QuerySettings {
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}
