//! # Voice Optimizer
//!
//! Shapes pages for speech: long pages collapse into a single spoken summary
//! and each source gets short highlight sentences. Every string produced here
//! is a plain sentence ending in a period, with no markup.

use serde_json::{json, Value};

use crate::aggregate::MetricSummary;
use crate::record::Source;

/// Pages longer than this are summarized in voice mode.
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 10;

/// Collapse `items` to one `{"summary": ...}` record when there are more than
/// `threshold` of them; otherwise return them untouched.
///
/// The "most relevant" wording is only wording: no ranking happens.
pub fn summarize_if_large(items: Vec<Value>, threshold: usize) -> Vec<Value> {
    if items.len() <= threshold {
        return items;
    }
    vec![json!({
        "summary": format!(
            "{} records found. Showing top {} most relevant results.",
            items.len(),
            threshold
        )
    })]
}

/// Short per-source facts about a page.
///
/// Highlights only appear when the page carries the fields they are built
/// from; a page without them yields none.
pub fn highlights(items: &[Value], source: Source) -> Vec<String> {
    if items.is_empty() {
        return vec![no_results(source)];
    }
    let mut out = Vec::new();
    match source {
        Source::Crm => {
            if let Some(active) = count_status(items, "active") {
                out.push(format!("{} active customers in this result set.", active));
            }
        }
        Source::Support => {
            if let Some(open) = count_status(items, "open") {
                out.push(format!("{} open tickets found.", open));
            }
            if let Some(high) = count_field(items, "priority", "high") {
                if high > 0 {
                    out.push(format!("{} high priority tickets found.", high));
                }
            }
        }
        Source::Analytics => {
            let latest = items.first().and_then(|first| {
                let metric = first.get("metric").and_then(spoken)?;
                let value = first.get("value").and_then(spoken)?;
                Some((metric, value))
            });
            if let Some((metric, value)) = latest {
                out.push(format!("Latest value for {} is {}.", metric, value));
            }
        }
    }
    out
}

/// Said when a query matches nothing.
pub fn no_results(source: Source) -> String {
    let label = match source {
        Source::Crm => "customer",
        Source::Support => "support ticket",
        Source::Analytics => "analytics",
    };
    format!("I didn't find any {} records matching your query.", label)
}

/// Offer the next page when the result set runs past this one.
pub fn more_results_hint(total: usize, offset: usize, returned: usize) -> Option<String> {
    let remaining = total.saturating_sub(offset + returned);
    if remaining == 0 {
        return None;
    }
    Some(format!(
        "There are {} more results. Ask me to show more if you'd like.",
        remaining
    ))
}

/// One or two sentences for a metric summary over the last `days` days.
pub fn metric_summary_sentence(summary: Option<&MetricSummary>, days: i64) -> String {
    let Some(summary) = summary else {
        return "No data available for the requested period.".to_string();
    };
    let subject = if summary.metric == "all" {
        "value".to_string()
    } else {
        summary.metric.replace('_', " ")
    };
    format!(
        "Over the last {} days, the average {} was {}. The trend is {}.",
        days,
        subject,
        summary.average,
        summary.trend.as_str()
    )
}

/// The page message used in unified query responses.
pub fn page_message(returned: usize, total: usize) -> String {
    format!("Showing {} of {} results.", returned, total)
}

fn count_status(items: &[Value], wanted: &str) -> Option<usize> {
    count_field(items, "status", wanted)
}

/// Records whose `field` matches `wanted`, or `None` if no record has the field.
fn count_field(items: &[Value], field: &str, wanted: &str) -> Option<usize> {
    let values: Vec<&str> = items
        .iter()
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .filter(|s| s.eq_ignore_ascii_case(wanted))
            .count(),
    )
}

fn spoken(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    fn rows(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"customer_id": i, "status": "active"})).collect()
    }

    #[test]
    fn test_eleven_records_collapse() {
        let out = summarize_if_large(rows(11), DEFAULT_SUMMARY_THRESHOLD);
        assert_eq!(out.len(), 1);
        let summary = out[0]["summary"].as_str().unwrap();
        assert!(summary.contains("11"));
        assert!(summary.ends_with('.'));
    }

    #[test]
    fn test_ten_or_fewer_pass_through() {
        for n in [0, 1, 10] {
            let input = rows(n);
            assert_eq!(summarize_if_large(input.clone(), DEFAULT_SUMMARY_THRESHOLD), input);
        }
    }

    #[test]
    fn test_crm_highlight_counts_active() {
        let items = vec![
            json!({"status": "active"}),
            json!({"status": "inactive"}),
            json!({"status": "Active"}),
        ];
        assert_eq!(
            highlights(&items, Source::Crm),
            vec!["2 active customers in this result set."]
        );
    }

    #[test]
    fn test_support_highlight_counts_open() {
        let items = vec![json!({"status": "open"}), json!({"status": "closed"})];
        assert_eq!(highlights(&items, Source::Support), vec!["1 open tickets found."]);
    }

    #[test]
    fn test_analytics_highlight_uses_first_item() {
        let items = vec![
            json!({"metric": "daily_active_users", "value": 1200, "date": "2024-01-02"}),
            json!({"metric": "daily_active_users", "value": 900, "date": "2024-01-01"}),
        ];
        assert_eq!(
            highlights(&items, Source::Analytics),
            vec!["Latest value for daily_active_users is 1200."]
        );
    }

    #[test]
    fn test_missing_fields_yield_no_highlight() {
        assert!(highlights(&[json!({"name": "x"})], Source::Crm).is_empty());
        assert!(highlights(&[json!({"subject": "x"})], Source::Support).is_empty());
        assert!(highlights(&[json!({"metric": "dau"})], Source::Analytics).is_empty());
    }

    #[test]
    fn test_empty_page_says_nothing_matched() {
        assert_eq!(
            highlights(&[], Source::Support),
            vec!["I didn't find any support ticket records matching your query."]
        );
        assert_eq!(
            no_results(Source::Crm),
            "I didn't find any customer records matching your query."
        );
    }

    #[test]
    fn test_support_highlight_counts_high_priority() {
        let items = vec![
            json!({"status": "open", "priority": "high"}),
            json!({"status": "open", "priority": "low"}),
            json!({"status": "closed", "priority": "High"}),
        ];
        assert_eq!(
            highlights(&items, Source::Support),
            vec!["2 open tickets found.", "2 high priority tickets found."]
        );

        let calm = vec![json!({"status": "open", "priority": "low"})];
        assert_eq!(highlights(&calm, Source::Support), vec!["1 open tickets found."]);
    }

    #[test]
    fn test_more_results_hint() {
        assert_eq!(
            more_results_hint(23, 0, 10).as_deref(),
            Some("There are 13 more results. Ask me to show more if you'd like.")
        );
        assert_eq!(more_results_hint(23, 20, 3), None);
        assert_eq!(more_results_hint(0, 0, 0), None);
    }

    #[test]
    fn test_metric_summary_sentence() {
        let summary = MetricSummary {
            metric: "daily_active_users".into(),
            data_points: 7,
            average: 1234.5,
            min: Number::from(1000),
            max: Number::from(1500),
            latest_value: Number::from(1500),
            latest_date: Some("2024-01-07".into()),
            trend: crate::aggregate::Trend::Up,
        };
        assert_eq!(
            metric_summary_sentence(Some(&summary), 7),
            "Over the last 7 days, the average daily active users was 1234.5. The trend is up."
        );
        assert_eq!(
            metric_summary_sentence(None, 30),
            "No data available for the requested period."
        );
    }

    #[test]
    fn test_page_message() {
        assert_eq!(page_message(5, 23), "Showing 5 of 23 results.");
    }
}
