//! # API Handlers
//!
//! Axum handlers for the data connector routes and the error type they share.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use udc_core::{ConnectorError, Source};

use crate::query::executor;
use crate::query::{
    DataParams, DataResponse, QueryRequest, QueryResponse, SummaryParams, SummaryResponse,
};
use crate::tools;
use crate::AppState;

// =============================================================================
// Errors
// =============================================================================

const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again later.";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Details are logged, never returned.
    Internal,
}

impl From<ConnectorError> for ApiError {
    fn from(err: ConnectorError) -> Self {
        if err.is_client_error() {
            tracing::debug!("rejected request: {}", err);
            ApiError::BadRequest(err.to_string())
        } else {
            tracing::error!("request failed: {}", err);
            ApiError::Internal
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "Bad Request", message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                INTERNAL_MESSAGE.to_string(),
            ),
        };
        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.app_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_data(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    params: Result<Query<DataParams>, QueryRejection>,
) -> Result<Json<DataResponse>, ApiError> {
    let Query(params) = params?;
    let response = executor::fetch_data(&source, params, &state.registry, &state.settings).await?;
    Ok(Json(response))
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    params: Result<Query<SummaryParams>, QueryRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let Query(params) = params?;
    let response =
        executor::summarize_data(&source, params, &state.registry, chrono::Utc::now()).await?;
    Ok(Json(response))
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = body?;
    let response = executor::execute(
        request,
        &state.registry,
        &state.settings,
        chrono::Utc::now(),
    )
    .await?;
    Ok(Json(response))
}

pub async fn tools_schema(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(tools::schema_document(&state.registry.descriptors()))
}

#[derive(Debug, Serialize)]
pub struct SourceInfo {
    pub source: Source,
    pub tool_name: &'static str,
    pub description: &'static str,
    pub available_filters: BTreeMap<String, String>,
    pub supports_time_range: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_tool: Option<&'static str>,
}

pub async fn list_sources(State(state): State<Arc<AppState>>) -> Json<Vec<SourceInfo>> {
    let sources = state
        .registry
        .descriptors()
        .into_iter()
        .map(|d| SourceInfo {
            source: d.source,
            tool_name: d.tool_name,
            description: d.description,
            available_filters: d.available_filters(),
            supports_time_range: d.supports_time_range,
            summary_tool: d.summary_tool,
        })
        .collect();
    Json(sources)
}
