//! # Source Connectors
//!
//! One connector per data source. Each runs the shared query pipeline for its
//! record type and hands back a page already rendered to JSON, so the HTTP
//! layer and the query executor never see typed records.

pub mod analytics;
pub mod crm;
pub mod registry;
pub mod support;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use udc_core::filter;
use udc_core::pipeline::{self, FetchRequest, PageLimits};
use udc_core::{ConnectorError, FilterKey, MetricSummary, Record, RecordStore, Source};

/// Static description of a connector, used for tool schemas and `/sources`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorDescriptor {
    pub source: Source,
    /// Function name published in the tool schema.
    pub tool_name: &'static str,
    pub description: &'static str,
    pub filters: &'static [FilterKey],
    pub supports_time_range: bool,
    /// Tool name for the metric summary, when the source has one.
    pub summary_tool: Option<&'static str>,
}

impl ConnectorDescriptor {
    pub fn available_filters(&self) -> BTreeMap<String, String> {
        filter::describe(self.filters)
    }
}

/// A fetched page with its items rendered to JSON.
#[derive(Debug, Clone)]
pub struct ConnectorPage {
    pub items: Vec<Value>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub next_cursor: Option<String>,
    pub as_of: DateTime<Utc>,
    pub available_filters: BTreeMap<String, String>,
}

/// A metric summary over the filtered, time-limited collection.
#[derive(Debug, Clone)]
pub struct SummaryPage {
    pub summary: Option<MetricSummary>,
    pub as_of: DateTime<Utc>,
}

/// The fetch contract every data source implements.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    fn source(&self) -> Source;

    fn descriptor(&self) -> ConnectorDescriptor;

    async fn fetch(&self, request: &FetchRequest) -> Result<ConnectorPage, ConnectorError>;

    /// Cursor and limit in `request` are ignored.
    async fn summarize(&self, _request: &FetchRequest) -> Result<SummaryPage, ConnectorError> {
        Err(ConnectorError::Unsupported {
            data_source: self.source().to_string(),
            operation: "summary",
        })
    }
}

/// Run the pipeline for `R` and render the page.
async fn fetch_page<R: Record>(
    store: &dyn RecordStore,
    request: &FetchRequest,
    limits: PageLimits,
) -> Result<ConnectorPage, ConnectorError> {
    let result = pipeline::fetch::<R>(store, request, limits).await?;
    let items = result
        .page
        .items
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ConnectorPage {
        items,
        total: result.page.total,
        offset: result.page.offset,
        limit: result.limit,
        next_cursor: result.page.next_cursor,
        as_of: result.as_of,
        available_filters: result.available_filters,
    })
}
