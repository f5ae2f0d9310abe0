//! # Analytics Connector
//!
//! Metric points. The only source that honors `start_time` / `end_time`, and
//! the only one that can be summarized.

use std::sync::Arc;

use udc_core::pipeline::{self, FetchRequest, PageLimits};
use udc_core::{aggregate, ConnectorError, MetricPoint, Record, RecordStore, Source};

use super::{fetch_page, Connector, ConnectorDescriptor, ConnectorPage, SummaryPage};

pub struct AnalyticsConnector {
    store: Arc<dyn RecordStore>,
    limits: PageLimits,
}

impl AnalyticsConnector {
    pub fn new(store: Arc<dyn RecordStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }
}

#[async_trait::async_trait]
impl Connector for AnalyticsConnector {
    fn source(&self) -> Source {
        Source::Analytics
    }

    fn descriptor(&self) -> ConnectorDescriptor {
        ConnectorDescriptor {
            source: Source::Analytics,
            tool_name: "get_metrics",
            description: "Retrieve analytics metric data points, most recent date first. \
                          Filter by metric name (e.g. daily_active_users) and optionally \
                          restrict to a start_time/end_time window. Use for trends and \
                          latest values.",
            filters: MetricPoint::FILTERS,
            supports_time_range: true,
            summary_tool: Some("get_metrics_summary"),
        }
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<ConnectorPage, ConnectorError> {
        fetch_page::<MetricPoint>(self.store.as_ref(), request, self.limits).await
    }

    async fn summarize(&self, request: &FetchRequest) -> Result<SummaryPage, ConnectorError> {
        let selection = pipeline::select::<MetricPoint>(self.store.as_ref(), request).await?;
        let metric = request.filters.get("metric").and_then(|v| v.as_str());
        let summary = aggregate::summarize(&selection.records, metric);
        tracing::debug!(
            points = selection.records.len(),
            summarized = summary.is_some(),
            "analytics summary"
        );
        Ok(SummaryPage {
            summary,
            as_of: selection.as_of,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Number};
    use udc_core::MemoryStore;

    #[tokio::test]
    async fn test_window_and_envelope_as_of() {
        let store = MemoryStore::new().with(
            Source::Analytics,
            json!({
                "as_of": "2024-01-31T23:00:00Z",
                "data": [
                    {"metric": "daily_active_users", "date": "2024-01-10", "value": 10},
                    {"metric": "daily_active_users", "date": "2024-01-20", "value": 20},
                    {"metric": "daily_active_users", "date": "2024-01-30", "value": 30},
                ]
            }),
        );
        let connector = AnalyticsConnector::new(Arc::new(store), PageLimits::default());
        let page = connector
            .fetch(&FetchRequest {
                start_time: Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()),
                end_time: Some(Utc.with_ymd_and_hms(2024, 1, 30, 0, 0, 0).unwrap()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0]["value"], json!(30));
        assert_eq!(page.as_of, Utc.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_summary_covers_whole_window() {
        let data: Vec<_> = (1..=20)
            .map(|d| json!({"metric": "dau", "date": format!("2024-01-{:02}", d), "value": d}))
            .chain([json!({"metric": "revenue", "date": "2024-01-20", "value": 9000})])
            .collect();
        let store = MemoryStore::new().with(Source::Analytics, json!(data));
        let connector = AnalyticsConnector::new(Arc::new(store), PageLimits::default());

        let summary = connector
            .summarize(&FetchRequest {
                filters: [("metric".to_string(), json!("dau"))].into_iter().collect(),
                start_time: Some(Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap()),
                limit: 2,
                cursor: Some("eyJvZmZzZXQiOjV9".into()),
                ..Default::default()
            })
            .await
            .unwrap()
            .summary
            .unwrap();

        assert_eq!(summary.metric, "dau");
        assert_eq!(summary.data_points, 10);
        assert_eq!(summary.average, 15.5);
        assert_eq!(summary.max, Number::from(20));
        assert_eq!(summary.min, Number::from(11));
        assert_eq!(summary.trend, aggregate::Trend::Up);
    }
}
