//! # Tool Schema
//!
//! Function-calling definitions for an LLM agent, generated from the
//! registered connector descriptors.

use serde_json::{json, Map, Value};

use crate::connectors::ConnectorDescriptor;

const SCHEMA_DESCRIPTION: &str = "Tools for querying customer, support and analytics data. \
     Results are paginated: pass next_cursor back as cursor to continue.";

/// One `get_*` tool per descriptor, each followed by its summary tool if it
/// has one, then the unified `query_data` tool.
pub fn tool_definitions(descriptors: &[ConnectorDescriptor]) -> Vec<Value> {
    descriptors
        .iter()
        .flat_map(|d| std::iter::once(source_tool(d)).chain(d.summary_tool.map(summary_tool)))
        .chain(std::iter::once(query_data_tool(descriptors)))
        .collect()
}

/// Body of `GET /tools/schema`.
pub fn schema_document(descriptors: &[ConnectorDescriptor]) -> Value {
    json!({
        "tools": tool_definitions(descriptors),
        "description": SCHEMA_DESCRIPTION,
    })
}

fn function(
    name: &str,
    description: &str,
    properties: Map<String, Value>,
    required: &[&str],
) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        }
    })
}

fn source_tool(descriptor: &ConnectorDescriptor) -> Value {
    let mut properties = Map::new();
    for key in descriptor.filters {
        let mut prop = json!({
            "type": "string",
            "description": format!("Filter by {} ({}).", key.name, key.hint),
        });
        if !key.values.is_empty() {
            prop["enum"] = json!(key.values);
        }
        properties.insert(key.name.to_string(), prop);
    }
    properties.extend(paging_properties());
    if descriptor.supports_time_range {
        properties.extend(time_properties());
    }
    function(descriptor.tool_name, descriptor.description, properties, &[])
}

fn summary_tool(name: &str) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "metric".into(),
        json!({
            "type": "string",
            "description": "Metric to summarize (e.g. daily_active_users). Omit for all metrics.",
        }),
    );
    properties.insert(
        "days".into(),
        json!({
            "type": "integer",
            "minimum": 1,
            "maximum": 365,
            "default": 7,
            "description": "Number of days to look back.",
        }),
    );
    function(
        name,
        "Summarize a metric over recent days: average, minimum, maximum, latest value \
         and trend. Prefer this over listing data points when the user asks how a \
         metric is doing.",
        properties,
        &[],
    )
}

fn query_data_tool(descriptors: &[ConnectorDescriptor]) -> Value {
    let sources: Vec<&str> = descriptors.iter().map(|d| d.source.as_str()).collect();
    let filter_names: Vec<&str> = descriptors
        .iter()
        .flat_map(|d| d.filters.iter().map(|k| k.name))
        .collect();

    let mut properties = Map::new();
    properties.insert(
        "source".into(),
        json!({
            "type": "string",
            "enum": sources,
            "description": "Which data source to query.",
        }),
    );
    properties.insert(
        "mode".into(),
        json!({
            "type": "string",
            "enum": ["voice", "full"],
            "description": "voice returns a short spoken summary and highlights; \
                            full returns records.",
        }),
    );
    properties.insert(
        "filters".into(),
        json!({
            "type": "object",
            "description": format!(
                "Exact-match filters. Recognized keys: {}.",
                dedup(filter_names).join(", ")
            ),
            "additionalProperties": {"type": "string"},
        }),
    );
    properties.extend(paging_properties());
    properties.extend(time_properties());

    function(
        "query_data",
        "Query any data source in one call, optimized for voice responses. \
         Time range applies to analytics only.",
        properties,
        &["source"],
    )
}

fn paging_properties() -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(
        "query".into(),
        json!({"type": "string", "description": "Free-text search."}),
    );
    props.insert(
        "limit".into(),
        json!({
            "type": "integer",
            "minimum": 1,
            "maximum": 100,
            "description": "Maximum records to return.",
        }),
    );
    props.insert(
        "cursor".into(),
        json!({"type": "string", "description": "next_cursor from a previous page."}),
    );
    props
}

fn time_properties() -> Map<String, Value> {
    let mut props = Map::new();
    for (name, side) in [("start_time", "Earliest"), ("end_time", "Latest")] {
        props.insert(
            name.into(),
            json!({
                "type": "string",
                "format": "date-time",
                "description": format!("{} date or timestamp to include (ISO 8601).", side),
            }),
        );
    }
    props
}

fn dedup(mut names: Vec<&str>) -> Vec<&str> {
    names.sort_unstable();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::registry::ConnectorRegistry;
    use std::sync::Arc;
    use udc_core::{MemoryStore, PageLimits};

    fn descriptors() -> Vec<ConnectorDescriptor> {
        let store = Arc::new(MemoryStore::new());
        ConnectorRegistry::with_store(store, PageLimits::default()).descriptors()
    }

    #[test]
    fn test_tool_names() {
        let tools = tool_definitions(&descriptors());
        let names: Vec<&str> = tools
            .iter()
            .map(|t| t["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "get_customers",
                "get_support_tickets",
                "get_metrics",
                "get_metrics_summary",
                "query_data",
            ]
        );
        assert!(tools.iter().all(|t| t["type"] == "function"));
    }

    #[test]
    fn test_closed_filters_carry_enums() {
        let tools = tool_definitions(&descriptors());
        let props = &tools[1]["function"]["parameters"]["properties"];
        assert_eq!(props["priority"]["enum"], json!(["low", "medium", "high"]));
        assert!(props["customer_id"].get("enum").is_none());
        assert!(props.get("start_time").is_none());
    }

    #[test]
    fn test_only_metrics_has_time_range() {
        let tools = tool_definitions(&descriptors());
        let props = &tools[2]["function"]["parameters"]["properties"];
        assert_eq!(props["start_time"]["format"], "date-time");
        assert!(props.get("end_time").is_some());
        assert!(props.get("metric").is_some());
    }

    #[test]
    fn test_summary_tool_parameters() {
        let tools = tool_definitions(&descriptors());
        let summary = &tools[3]["function"];
        assert_eq!(summary["name"], "get_metrics_summary");
        let props = &summary["parameters"]["properties"];
        assert_eq!(props["days"]["default"], 7);
        assert_eq!(props["days"]["maximum"], 365);
        assert_eq!(props["metric"]["type"], "string");
        assert_eq!(summary["parameters"]["required"], json!([]));
    }

    #[test]
    fn test_query_data_requires_source() {
        let doc = schema_document(&descriptors());
        let query = &doc["tools"][4]["function"]["parameters"];
        assert_eq!(query["required"], json!(["source"]));
        assert_eq!(
            query["properties"]["source"]["enum"],
            json!(["crm", "support", "analytics"])
        );
        let filters = query["properties"]["filters"]["description"].as_str().unwrap();
        assert!(filters.contains("customer_id, metric, priority, status, ticket_id"));
        assert!(doc["description"].as_str().unwrap().ends_with('.'));
    }
}
