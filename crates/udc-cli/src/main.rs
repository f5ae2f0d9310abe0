//! # udc: command-line client for udc-hub
//!
//! - `udc health`: hub status.
//! - `udc fetch <source>`: one page of records, or every page with `--all`.
//!   Pages are requested as full-mode unified queries so they are never
//!   collapsed into a spoken summary.
//! - `udc query <json>`: raw unified query.
//! - `udc tools`: the published tool schema.

use std::future::Future;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Query CRM, support and analytics data through a running udc-hub.
#[derive(Parser)]
#[command(name = "udc", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the hub is up.
    Health,

    /// Fetch records from a source (crm, support, analytics).
    Fetch {
        source: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        metric: Option<String>,
        /// Free-text search.
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        cursor: Option<String>,
        /// Follow next_cursor until the last page.
        #[arg(long)]
        all: bool,
    },

    /// Send a unified query, e.g. '{"source":"crm","mode":"voice"}'.
    Query { body: String },

    /// Print the tool schema.
    Tools,
}

#[derive(Debug, Default, PartialEq)]
struct FetchOptions {
    status: Option<String>,
    priority: Option<String>,
    metric: Option<String>,
    q: Option<String>,
    limit: Option<u32>,
}

impl FetchOptions {
    /// Body of a full-mode `POST /query` for one page of `source`.
    fn body(&self, source: &str, cursor: Option<&str>) -> Value {
        let mut filters = Map::new();
        for (key, value) in [
            ("status", &self.status),
            ("priority", &self.priority),
            ("metric", &self.metric),
        ] {
            if let Some(v) = value {
                filters.insert(key.to_string(), json!(v));
            }
        }

        let mut body = json!({ "source": source, "mode": "full" });
        if !filters.is_empty() {
            body["filters"] = Value::Object(filters);
        }
        if let Some(q) = &self.q {
            body["query"] = json!(q);
        }
        if let Some(limit) = self.limit {
            body["limit"] = json!(limit);
        }
        if let Some(c) = cursor {
            body["cursor"] = json!(c);
        }
        body
    }
}

/// Records gathered from one or more pages.
#[derive(Debug, Default)]
struct Collected {
    items: Vec<Value>,
    total: u64,
    next_cursor: Option<String>,
}

/// Request pages through `fetch_page` starting at `cursor`. With `all`, keep
/// following `page.next_cursor` until the hub stops returning one.
async fn collect_pages<F, Fut>(
    cursor: Option<String>,
    all: bool,
    mut fetch_page: F,
) -> anyhow::Result<Collected>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    let mut collected = Collected {
        next_cursor: cursor,
        ..Default::default()
    };

    loop {
        let requested = collected.next_cursor.take();
        let page = fetch_page(requested.clone()).await?;
        if let Some(items) = page.get("items").and_then(Value::as_array) {
            collected.items.extend(items.iter().cloned());
        }
        let info = &page["page"];
        collected.total = info["total"].as_u64().unwrap_or(collected.total);
        collected.next_cursor = info["next_cursor"].as_str().map(str::to_string);

        match &collected.next_cursor {
            Some(next) if all => {
                if requested.as_deref() == Some(next.as_str()) {
                    bail!("hub returned the same cursor twice: {}", next);
                }
            }
            _ => break,
        }
    }
    Ok(collected)
}

struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    fn from_env() -> Self {
        let base_url =
            std::env::var("UDC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        read_json(resp).await
    }

    async fn post(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        read_json(resp).await
    }
}

/// Decode the body, turning hub error bodies into errors.
async fn read_json(resp: reqwest::Response) -> anyhow::Result<Value> {
    let status = resp.status();
    let body: Value = resp.json().await.context("hub returned a non-JSON body")?;
    if !status.is_success() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no detail");
        bail!("{}: {}", status, message);
    }
    Ok(body)
}

/// Render records as a table with the union of their keys as columns.
fn render_table(items: &[Value]) -> String {
    let mut columns: Vec<String> = Vec::new();
    for item in items {
        if let Some(obj) = item.as_object() {
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut builder = Builder::default();
    builder.push_record(columns.clone());
    for item in items {
        builder.push_record(columns.iter().map(|c| cell(item.get(c))));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn print_pretty(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn fetch(
    client: &Client,
    source: &str,
    options: &FetchOptions,
    cursor: Option<String>,
    all: bool,
) -> anyhow::Result<()> {
    let collected = collect_pages(cursor, all, |cursor| {
        let body = options.body(source, cursor.as_deref());
        async move { client.post("/query", &body).await }
    })
    .await?;

    if collected.items.is_empty() {
        println!("No records.");
    } else {
        println!("{}", render_table(&collected.items));
    }
    println!("{} of {} records.", collected.items.len(), collected.total);
    if let Some(next) = collected.next_cursor {
        println!("Next cursor: {}", next);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::from_env();

    match cli.command {
        Commands::Health => {
            let body = client.get("/health").await?;
            println!(
                "{} {}: {}",
                cell(body.get("service")),
                cell(body.get("version")),
                cell(body.get("status"))
            );
        }
        Commands::Fetch {
            source,
            status,
            priority,
            metric,
            q,
            limit,
            cursor,
            all,
        } => {
            let options = FetchOptions {
                status,
                priority,
                metric,
                q,
                limit,
            };
            fetch(&client, &source, &options, cursor, all).await?;
        }
        Commands::Query { body } => {
            let body: Value = serde_json::from_str(&body).context("query body is not valid JSON")?;
            let resp = client.post("/query", &body).await?;
            if let Some(summary) = resp.get("summary").and_then(Value::as_str) {
                println!("{}", summary);
            }
            if let Some(highlights) = resp.get("highlights").and_then(Value::as_array) {
                for h in highlights.iter().filter_map(Value::as_str) {
                    println!("- {}", h);
                }
            }
            if let Some(hint) = resp.get("voice_hint").and_then(Value::as_str) {
                println!("{}", hint);
            }
            print_pretty(&resp["items"])?;
        }
        Commands::Tools => {
            let schema = client.get("/tools/schema").await?;
            print_pretty(&schema)?;
        }
    }
    Ok(())
}
