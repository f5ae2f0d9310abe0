//! # Records
//!
//! Typed records for the three sources. Raw store JSON is converted here via
//! [`Record::from_raw`] and nowhere else; every known field is optional and
//! anything unrecognized is kept in `extra` so `full` responses lose nothing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::ConnectorError;
use crate::filter::FilterKey;

/// One of the fixed data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Crm,
    Support,
    Analytics,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Crm, Source::Support, Source::Analytics];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crm => "crm",
            Self::Support => "support",
            Self::Analytics => "analytics",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crm" => Ok(Self::Crm),
            "support" => Ok(Self::Support),
            "analytics" => Ok(Self::Analytics),
            _ => Err(ConnectorError::UnknownSource(s.to_string())),
        }
    }
}

/// Identifiers show up as both numbers and strings in the wild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A record type owned by exactly one [`Source`].
pub trait Record: Serialize + Clone + Send + Sync + 'static {
    const SOURCE: Source;
    /// Filter keys this source recognizes.
    const FILTERS: &'static [FilterKey];
    /// Fields searched by the free-text query.
    const SEARCH_FIELDS: &'static [&'static str];
    /// Field sorted on, newest first.
    const RECENCY_FIELD: &'static str;
    /// Field used for start/end time filtering, if the source supports it.
    const TIME_FIELD: Option<&'static str> = None;
    /// Legacy envelope key some files use instead of `data`.
    const LEGACY_KEY: &'static str;

    fn from_raw(raw: Map<String, Value>) -> Self;

    /// String rendering of a field, used by filtering and sorting.
    fn field_text(&self, key: &str) -> Option<String>;
}

/// Scalar JSON rendered the way filters compare it.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Each `take_*` claims a field only when it already has the typed shape.
// Anything else goes back into `extra` untouched, so output keeps the
// original JSON type and `field_text` still sees it through `extra_text`.

fn take_text(raw: &mut Map<String, Value>, key: &str) -> Option<String> {
    match raw.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => {
            raw.insert(key.to_string(), other);
            None
        }
    }
}

fn take_id(raw: &mut Map<String, Value>, key: &str) -> Option<RecordId> {
    match raw.remove(key)? {
        Value::Number(n) if n.is_i64() => n.as_i64().map(RecordId::Int),
        Value::String(s) => Some(RecordId::Text(s)),
        Value::Null => None,
        other => {
            raw.insert(key.to_string(), other);
            None
        }
    }
}

fn take_number(raw: &mut Map<String, Value>, key: &str) -> Option<Number> {
    match raw.remove(key)? {
        Value::Number(n) => Some(n),
        Value::Null => None,
        other => {
            raw.insert(key.to_string(), other);
            None
        }
    }
}

fn extra_text(extra: &Map<String, Value>, key: &str) -> Option<String> {
    extra.get(key).and_then(scalar_text)
}

// =============================================================================
// CRM
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Customer {
    const SOURCE: Source = Source::Crm;
    const FILTERS: &'static [FilterKey] = &[
        FilterKey::closed("status", "active|inactive", &["active", "inactive"]),
        FilterKey::open("customer_id", "customer identifier"),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "email", "customer_id"];
    const RECENCY_FIELD: &'static str = "created_at";
    const LEGACY_KEY: &'static str = "customers";

    fn from_raw(mut raw: Map<String, Value>) -> Self {
        Self {
            customer_id: take_id(&mut raw, "customer_id"),
            name: take_text(&mut raw, "name"),
            email: take_text(&mut raw, "email"),
            status: take_text(&mut raw, "status"),
            created_at: take_text(&mut raw, "created_at"),
            extra: raw,
        }
    }

    fn field_text(&self, key: &str) -> Option<String> {
        let typed = match key {
            "customer_id" => self.customer_id.as_ref().map(ToString::to_string),
            "name" => self.name.clone(),
            "email" => self.email.clone(),
            "status" => self.status.clone(),
            "created_at" => self.created_at.clone(),
            _ => None,
        };
        typed.or_else(|| extra_text(&self.extra, key))
    }
}

// =============================================================================
// Support
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SupportTicket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for SupportTicket {
    const SOURCE: Source = Source::Support;
    const FILTERS: &'static [FilterKey] = &[
        FilterKey::closed("status", "open|closed|pending", &["open", "closed", "pending"]),
        FilterKey::closed("priority", "low|medium|high", &["low", "medium", "high"]),
        FilterKey::open("customer_id", "customer identifier"),
        FilterKey::open("ticket_id", "ticket identifier"),
    ];
    // Older exports call the subject `title`; it stays in `extra`.
    const SEARCH_FIELDS: &'static [&'static str] =
        &["subject", "title", "description", "ticket_id"];
    const RECENCY_FIELD: &'static str = "created_at";
    const LEGACY_KEY: &'static str = "tickets";

    fn from_raw(mut raw: Map<String, Value>) -> Self {
        Self {
            ticket_id: take_id(&mut raw, "ticket_id"),
            customer_id: take_id(&mut raw, "customer_id"),
            subject: take_text(&mut raw, "subject"),
            description: take_text(&mut raw, "description"),
            priority: take_text(&mut raw, "priority"),
            status: take_text(&mut raw, "status"),
            created_at: take_text(&mut raw, "created_at"),
            extra: raw,
        }
    }

    fn field_text(&self, key: &str) -> Option<String> {
        let typed = match key {
            "ticket_id" => self.ticket_id.as_ref().map(ToString::to_string),
            "customer_id" => self.customer_id.as_ref().map(ToString::to_string),
            "subject" => self.subject.clone(),
            "description" => self.description.clone(),
            "priority" => self.priority.clone(),
            "status" => self.status.clone(),
            "created_at" => self.created_at.clone(),
            _ => None,
        };
        typed.or_else(|| extra_text(&self.extra, key))
    }
}

// =============================================================================
// Analytics
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MetricPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for MetricPoint {
    const SOURCE: Source = Source::Analytics;
    const FILTERS: &'static [FilterKey] = &[FilterKey::open(
        "metric",
        "metric name, e.g. daily_active_users",
    )];
    const SEARCH_FIELDS: &'static [&'static str] = &["metric"];
    const RECENCY_FIELD: &'static str = "date";
    const TIME_FIELD: Option<&'static str> = Some("date");
    const LEGACY_KEY: &'static str = "metrics";

    fn from_raw(mut raw: Map<String, Value>) -> Self {
        Self {
            metric: take_text(&mut raw, "metric"),
            date: take_text(&mut raw, "date"),
            value: take_number(&mut raw, "value"),
            extra: raw,
        }
    }

    fn field_text(&self, key: &str) -> Option<String> {
        let typed = match key {
            "metric" => self.metric.clone(),
            "date" => self.date.clone(),
            "value" => self.value.as_ref().map(ToString::to_string),
            _ => None,
        };
        typed.or_else(|| extra_text(&self.extra, key))
    }
}
