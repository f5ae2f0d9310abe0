//! # Query Pipeline
//!
//! The one fetch contract every connector implements:
//!
//! 1. load the source's collection from the [`RecordStore`]
//! 2. apply the filter engine
//! 3. sort newest first on the source's recency field
//! 4. slice `[offset, offset + limit)` and mint the next cursor
//!
//! The cursor is decoded before the store is touched, so a bad cursor never
//! costs a load. Any failure aborts the fetch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cursor;
use crate::error::ConnectorError;
use crate::filter::{self, Criteria, FilterMap, TimeRange};
use crate::record::Record;
use crate::store::{Collection, RecordStore};

/// Parameters for one fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub query: Option<String>,
    pub filters: FilterMap,
    pub cursor: Option<String>,
    /// Requested page size. Zero or negative means "use the default".
    pub limit: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Page size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl PageLimits {
    /// Effective page size for a requested limit. Never unlimited.
    pub fn resolve(&self, requested: i64) -> usize {
        let default = self.default_limit.max(1);
        if requested <= 0 {
            return default.min(self.max_limit.max(1));
        }
        usize::try_from(requested)
            .unwrap_or(usize::MAX)
            .min(self.max_limit.max(1))
    }
}

/// A slice of a filtered, sorted collection.
#[derive(Debug, Clone, Serialize)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub total: usize,
    pub offset: usize,
    pub next_cursor: Option<String>,
}

/// What a fetch returns.
#[derive(Debug, Clone)]
pub struct FetchResult<R> {
    pub page: Page<R>,
    pub limit: usize,
    pub as_of: DateTime<Utc>,
    pub available_filters: BTreeMap<String, String>,
}

/// Slice `records` at `offset`. `next_cursor` is `None` exactly when the page
/// reaches the end of the collection.
pub fn paginate<R>(records: Vec<R>, offset: usize, limit: usize) -> Page<R> {
    let total = records.len();
    let items: Vec<R> = records.into_iter().skip(offset).take(limit).collect();
    let next_offset = offset.saturating_add(items.len());
    let next_cursor = (next_offset < total).then(|| cursor::encode(next_offset));

    Page {
        items,
        total,
        offset,
        next_cursor,
    }
}

/// Stable sort, newest first. Records without the field sort last.
pub fn sort_by_recency<R: Record>(records: &mut [R]) {
    records.sort_by_cached_key(|r| {
        std::cmp::Reverse(r.field_text(R::RECENCY_FIELD).unwrap_or_default())
    });
}

/// Every record of `R` matching the request, newest first, before paging.
#[derive(Debug, Clone)]
pub struct Selection<R> {
    pub records: Vec<R>,
    pub as_of: DateTime<Utc>,
}

/// Load, filter and sort source `R`. Cursor and limit are ignored.
pub async fn select<R: Record>(
    store: &dyn RecordStore,
    request: &FetchRequest,
) -> Result<Selection<R>, ConnectorError> {
    let collection = Collection::<R>::from_raw(store.load(R::SOURCE).await?);

    let criteria = Criteria {
        query: request.query.as_deref(),
        filters: &request.filters,
        range: TimeRange::new(request.start_time, request.end_time),
    };
    let mut records = filter::apply(collection.records, &criteria);
    sort_by_recency(&mut records);

    Ok(Selection {
        records,
        as_of: collection.as_of,
    })
}

/// Run the full pipeline for source `R`.
pub async fn fetch<R: Record>(
    store: &dyn RecordStore,
    request: &FetchRequest,
    limits: PageLimits,
) -> Result<FetchResult<R>, ConnectorError> {
    let offset = cursor::decode(request.cursor.as_deref())?;
    let limit = limits.resolve(request.limit);

    let selection = select::<R>(store, request).await?;
    let page = paginate(selection.records, offset, limit);
    tracing::info!(
        source = %R::SOURCE,
        total = page.total,
        offset,
        returned = page.items.len(),
        "fetch"
    );

    Ok(FetchResult {
        page,
        limit,
        as_of: selection.as_of,
        available_filters: filter::available_filters::<R>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Customer, MetricPoint, Source, SupportTicket};
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    /// 23 customers; every third one is inactive.
    fn crm_store() -> MemoryStore {
        let customers: Vec<Value> = (1..=23)
            .map(|i| {
                json!({
                    "customer_id": i,
                    "name": format!("Customer {}", i),
                    "email": format!("c{}@example.com", i),
                    "status": if i % 3 == 0 { "inactive" } else { "active" },
                    "created_at": format!("2024-01-{:02}T09:00:00Z", i),
                })
            })
            .collect();
        MemoryStore::new().with(
            Source::Crm,
            json!({"as_of": "2024-02-01T00:00:00Z", "data": customers}),
        )
    }

    fn ids(page: &Page<Customer>) -> Vec<String> {
        page.items
            .iter()
            .filter_map(|c| c.field_text("customer_id"))
            .collect()
    }

    #[test]
    fn test_limit_resolution() {
        let limits = PageLimits::default();
        assert_eq!(limits.resolve(0), 10);
        assert_eq!(limits.resolve(-5), 10);
        assert_eq!(limits.resolve(3), 3);
        assert_eq!(limits.resolve(10_000), 100);
    }

    #[test]
    fn test_next_cursor_null_iff_exhausted() {
        let page = paginate((0..10).collect::<Vec<_>>(), 0, 5);
        assert_eq!(page.items, vec![0, 1, 2, 3, 4]);
        assert_eq!(cursor::decode(page.next_cursor.as_deref()).unwrap(), 5);

        let last = paginate((0..10).collect::<Vec<_>>(), 5, 5);
        assert_eq!(last.items.len(), 5);
        assert!(last.next_cursor.is_none());

        let past_end = paginate((0..10).collect::<Vec<_>>(), 40, 5);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 10);
        assert!(past_end.next_cursor.is_none());
    }

    #[test]
    fn test_sort_puts_missing_recency_last() {
        let mut tickets: Vec<SupportTicket> = [
            json!({"ticket_id": 1, "created_at": "2024-01-01"}),
            json!({"ticket_id": 2}),
            json!({"ticket_id": 3, "created_at": "2024-03-01"}),
        ]
        .into_iter()
        .map(|v| match v {
            Value::Object(m) => SupportTicket::from_raw(m),
            _ => unreachable!(),
        })
        .collect();
        sort_by_recency(&mut tickets);
        let order: Vec<String> = tickets
            .iter()
            .filter_map(|t| t.field_text("ticket_id"))
            .collect();
        assert_eq!(order, vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn test_following_cursors_visits_every_record_once() {
        let store = crm_store();
        for limit in [1i64, 4, 7, 23, 50] {
            let mut seen = Vec::new();
            let mut cursor = None;
            loop {
                let request = FetchRequest {
                    cursor: cursor.clone(),
                    limit,
                    ..Default::default()
                };
                let result = fetch::<Customer>(&store, &request, PageLimits::default())
                    .await
                    .unwrap();
                seen.extend(ids(&result.page));
                match result.page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
            let expected: Vec<String> = (1..=23).rev().map(|i| i.to_string()).collect();
            assert_eq!(seen, expected, "limit {}", limit);
        }
    }

    #[tokio::test]
    async fn test_active_customers_end_to_end() {
        let store = crm_store();
        let mut filters = FilterMap::new();
        filters.insert("status".into(), json!("active"));

        let first = fetch::<Customer>(
            &store,
            &FetchRequest {
                filters: filters.clone(),
                limit: 10,
                ..Default::default()
            },
            PageLimits::default(),
        )
        .await
        .unwrap();

        let active_total = (1..=23).filter(|i| i % 3 != 0).count();
        assert_eq!(first.page.total, active_total);
        assert_eq!(first.page.items.len(), 10);
        assert!(first
            .page
            .items
            .iter()
            .all(|c| c.status.as_deref() == Some("active")));
        assert!(first.page.next_cursor.is_some());
        assert_eq!(first.available_filters["status"], "active|inactive");

        let second = fetch::<Customer>(
            &store,
            &FetchRequest {
                filters,
                cursor: first.page.next_cursor.clone(),
                limit: 10,
                ..Default::default()
            },
            PageLimits::default(),
        )
        .await
        .unwrap();

        let first_ids = ids(&first.page);
        let second_ids = ids(&second.page);
        assert!(second_ids.iter().all(|id| !first_ids.contains(id)));

        let expected: Vec<String> = (1..=23)
            .rev()
            .filter(|i| i % 3 != 0)
            .map(|i| i.to_string())
            .collect();
        assert_eq!(first_ids, expected[..10]);
        assert_eq!(second_ids, expected[10..]);
        assert!(second.page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_identity_lookup_is_a_filter() {
        let store = crm_store();
        let mut filters = FilterMap::new();
        filters.insert("customer_id".into(), json!(17));
        let result = fetch::<Customer>(
            &store,
            &FetchRequest {
                filters,
                ..Default::default()
            },
            PageLimits::default(),
        )
        .await
        .unwrap();
        assert_eq!(ids(&result.page), vec!["17"]);
    }

    #[tokio::test]
    async fn test_malformed_cursor_aborts_before_load() {
        // No documents at all: a load would fail with StoreUnavailable.
        let store = MemoryStore::new();
        let err = fetch::<Customer>(
            &store,
            &FetchRequest {
                cursor: Some("%%%".into()),
                ..Default::default()
            },
            PageLimits::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConnectorError::MalformedCursor(_)));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MemoryStore::new();
        let err = fetch::<MetricPoint>(&store, &FetchRequest::default(), PageLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_analytics_range_and_order() {
        let store = MemoryStore::new().with(
            Source::Analytics,
            json!([
                {"metric": "daily_active_users", "date": "2024-01-01", "value": 100},
                {"metric": "daily_active_users", "date": "2024-01-03", "value": 130},
                {"metric": "revenue", "date": "2024-01-02", "value": 9.5},
                {"metric": "daily_active_users", "date": "2024-01-02", "value": 120},
            ]),
        );
        let mut filters = FilterMap::new();
        filters.insert("metric".into(), json!("Daily_Active_Users"));
        let request = FetchRequest {
            filters,
            start_time: crate::filter::parse_record_time("2024-01-02"),
            ..Default::default()
        };
        let result = fetch::<MetricPoint>(&store, &request, PageLimits::default())
            .await
            .unwrap();
        let dates: Vec<String> = result
            .page
            .items
            .iter()
            .filter_map(|m| m.date.clone())
            .collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-02"]);
    }

    #[tokio::test]
    async fn test_select_ignores_cursor_and_limit() {
        let store = crm_store();
        let request = FetchRequest {
            cursor: Some(cursor::encode(20)),
            limit: 2,
            ..Default::default()
        };
        let selection = select::<Customer>(&store, &request).await.unwrap();
        assert_eq!(selection.records.len(), 23);
        assert_eq!(selection.records[0].field_text("customer_id").as_deref(), Some("23"));
    }
}
