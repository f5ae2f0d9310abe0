//! # Query Executor
//!
//! Runs a connector fetch and dresses the page for the caller: shape label,
//! freshness, and in voice mode the summary collapse plus highlights.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use udc_core::pipeline::FetchRequest;
use udc_core::{classify, freshness, voice, ConnectorError};

use super::{
    DataParams, DataResponse, Metadata, PageInfo, QueryMode, QueryRequest, QueryResponse,
    QuerySettings, SummaryMetadata, SummaryParams, SummaryResponse,
};
use crate::connectors::registry::ConnectorRegistry;

const SUGGESTED_FOLLOWUPS: [&str; 3] = [
    "Refine filters",
    "Ask for next page using next_cursor",
    "Switch to full mode for more fields",
];

const DEFAULT_SUMMARY_DAYS: i64 = 7;
const MAX_SUMMARY_DAYS: i64 = 365;

/// Execute a unified query at wall-clock time `now`.
pub async fn execute(
    request: QueryRequest,
    registry: &ConnectorRegistry,
    settings: &QuerySettings,
    now: DateTime<Utc>,
) -> Result<QueryResponse, ConnectorError> {
    let connector = registry.resolve(&request.source)?;
    let source = connector.source();

    let limit = request.limit.filter(|l| *l > 0).unwrap_or(match request.mode {
        QueryMode::Voice => settings.voice_limit,
        QueryMode::Full => settings.full_limit,
    });

    let fetch = FetchRequest {
        query: request.query,
        filters: request.filters.unwrap_or_default(),
        cursor: request.cursor,
        limit,
        start_time: request.start_time,
        end_time: request.end_time,
    };
    let page = connector.fetch(&fetch).await?;

    let data_type = classify(&page.items);
    let freshness = freshness::evaluate(page.as_of, now, settings.stale_after_seconds);
    let returned = page.items.len();
    let summary = voice::page_message(returned, page.total);

    let (items, highlights, voice_hint) = match request.mode {
        QueryMode::Voice => {
            let highlights = voice::highlights(&page.items, source);
            let hint = voice::more_results_hint(page.total, page.offset, returned);
            (
                voice::summarize_if_large(page.items, settings.summary_threshold),
                highlights,
                hint,
            )
        }
        QueryMode::Full => (page.items, Vec::new(), None),
    };

    Ok(QueryResponse {
        source: source.to_string(),
        mode: request.mode,
        data_type,
        freshness,
        page: PageInfo {
            returned,
            total: page.total,
            limit: page.limit,
            next_cursor: page.next_cursor,
            message: summary.clone(),
        },
        summary,
        highlights,
        voice_hint,
        items,
        available_filters: page.available_filters,
        suggested_followups: SUGGESTED_FOLLOWUPS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Execute a `GET /data/{source}` request.
pub async fn fetch_data(
    source: &str,
    params: DataParams,
    registry: &ConnectorRegistry,
    settings: &QuerySettings,
) -> Result<DataResponse, ConnectorError> {
    let connector = registry.resolve(source)?;

    let fetch = FetchRequest {
        filters: params.filters(),
        query: params.q,
        cursor: params.cursor,
        limit: params.limit.unwrap_or(0),
        ..Default::default()
    };
    let page = connector.fetch(&fetch).await?;

    let data_type = classify(&page.items);
    let data = voice::summarize_if_large(page.items, settings.summary_threshold);

    Ok(DataResponse {
        metadata: Metadata {
            total_results: page.total,
            returned_results: data.len(),
            data_freshness: format!("Data as of {}", page.as_of.to_rfc3339()),
            next_cursor: page.next_cursor,
            data_type,
        },
        data,
    })
}

/// Execute a `GET /data/{source}/summary` request at wall-clock time `now`.
///
/// The window is `start_time..end_time` when a start is given, otherwise the
/// last `days` days.
pub async fn summarize_data(
    source: &str,
    params: SummaryParams,
    registry: &ConnectorRegistry,
    now: DateTime<Utc>,
) -> Result<SummaryResponse, ConnectorError> {
    let connector = registry.resolve(source)?;

    let days = params.days.unwrap_or(DEFAULT_SUMMARY_DAYS);
    if !(1..=MAX_SUMMARY_DAYS).contains(&days) {
        return Err(ConnectorError::InvalidArgument(format!(
            "days must be between 1 and {}, got {}",
            MAX_SUMMARY_DAYS, days
        )));
    }

    let fetch = FetchRequest {
        filters: params
            .metric
            .iter()
            .map(|m| ("metric".to_string(), Value::String(m.clone())))
            .collect(),
        start_time: params.start_time.or(Some(now - Duration::days(days))),
        end_time: params.end_time,
        ..Default::default()
    };
    let page = connector.summarize(&fetch).await?;

    let subject = params.metric.as_deref().unwrap_or("all metrics");
    Ok(SummaryResponse {
        voice_summary: voice::metric_summary_sentence(page.summary.as_ref(), days),
        data: page.summary,
        metadata: SummaryMetadata {
            data_freshness: format!("Data as of {}", page.as_of.to_rfc3339()),
            query_context: format!("Summary of {}, last {} days", subject, days),
            period_days: days,
        },
    })
}
