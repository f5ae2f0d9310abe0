use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::Deserialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use udc_core::JsonFileStore;

mod api;
mod connectors;
mod query;
mod tools;

use connectors::registry::ConnectorRegistry;
use query::QuerySettings;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(
    name = "udc-hub",
    version,
    about = "Universal Data Connector: CRM, support and analytics over HTTP"
)]
struct Args {
    /// Server bind address (overrides [server] bind)
    #[arg(long)]
    bind: Option<String>,

    /// Path to config file
    #[arg(long, default_value = "udc-hub.toml")]
    config: PathBuf,

    /// Directory holding the source JSON files (overrides [data] dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Deserialize, Default, Clone)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    data: DataConfig,
    #[serde(default)]
    query: QuerySettings,
}

#[derive(Deserialize, Clone)]
struct ServerConfig {
    #[serde(default = "default_app_name")]
    app_name: String,
    #[serde(default = "default_bind")]
    bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            bind: default_bind(),
        }
    }
}

#[derive(Deserialize, Clone)]
struct DataConfig {
    #[serde(default = "default_data_dir")]
    dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

fn default_app_name() -> String {
    "Universal Data Connector".into()
}
fn default_bind() -> String {
    "127.0.0.1:8000".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// A missing file means defaults; an unreadable or invalid one is an error.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::info!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
}

// =============================================================================
// Application State
// =============================================================================

pub struct AppState {
    pub registry: ConnectorRegistry,
    pub settings: QuerySettings,
    pub app_name: String,
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    api::ApiError::Internal.into_response()
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/data/:source", get(api::get_data))
        .route("/data/:source/summary", get(api::get_summary))
        .route("/query", post(api::query))
        .route("/v1/query", post(api::query))
        .route("/tools/schema", get(api::tools_schema))
        .route("/sources", get(api::list_sources))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "udc_hub=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    let data_dir = args.data_dir.unwrap_or(config.data.dir);
    let bind = args.bind.unwrap_or(config.server.bind);

    let store = Arc::new(JsonFileStore::new(data_dir.clone()));
    let registry = ConnectorRegistry::with_store(store, config.query.page_limits());

    let state = Arc::new(AppState {
        registry,
        settings: config.query,
        app_name: config.server.app_name,
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!("serving sources from {} on http://{}", data_dir.display(), bind);
    axum::serve(listener, app).await?;
    Ok(())
}
