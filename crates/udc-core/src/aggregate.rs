//! # Metric Aggregation
//!
//! Rolls a window of metric points up into a handful of numbers a voice agent
//! can say out loud: average, extremes, latest reading and direction.

use serde::Serialize;
use serde_json::Number;

use crate::record::{MetricPoint, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    /// The metric asked for, or `all`.
    pub metric: String,
    pub data_points: usize,
    /// Mean rounded to one decimal.
    pub average: f64,
    pub min: Number,
    pub max: Number,
    pub latest_value: Number,
    pub latest_date: Option<String>,
    pub trend: Trend,
}

/// Summarize `points`, ordered newest first as the pipeline returns them.
///
/// Points without a numeric `value` are skipped. Returns `None` when nothing
/// numeric is left.
pub fn summarize(points: &[MetricPoint], metric: Option<&str>) -> Option<MetricSummary> {
    let readings: Vec<(&MetricPoint, &Number, f64)> = points
        .iter()
        .filter_map(|p| {
            let n = p.value.as_ref()?;
            Some((p, n, n.as_f64()?))
        })
        .collect();
    let (latest, latest_value, _) = *readings.first()?;
    let (_, min, _) = *readings.iter().min_by(|a, b| a.2.total_cmp(&b.2))?;
    let (_, max, _) = *readings.iter().max_by(|a, b| a.2.total_cmp(&b.2))?;
    let values: Vec<f64> = readings.iter().map(|(_, _, v)| *v).collect();

    Some(MetricSummary {
        metric: metric.unwrap_or("all").to_string(),
        data_points: values.len(),
        average: (mean(&values) * 10.0).round() / 10.0,
        min: min.clone(),
        max: max.clone(),
        latest_value: latest_value.clone(),
        latest_date: latest.field_text(MetricPoint::RECENCY_FIELD),
        trend: trend(&values),
    })
}

/// Compare the newer half of the window against the older half.
fn trend(newest_first: &[f64]) -> Trend {
    if newest_first.len() < 2 {
        return Trend::Flat;
    }
    let (newer, older) = newest_first.split_at(newest_first.len() / 2);
    let (newer, older) = (mean(newer), mean(older));
    if newer > older {
        Trend::Up
    } else if newer < older {
        Trend::Down
    } else {
        Trend::Flat
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
