//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::AppState;
use crate::collector::Scrape;
use crate::config::ScrapeMode;
use crate::error::AppResult;
use crate::formatter::{self, PrometheusFormatter};
use crate::inventory::InventoryClient;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

/// Scrape query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeParams {
    /// Endpoint to scrape; required in multi mode
    pub target: Option<String>,
}

/// Root endpoint - landing page with a target form
pub async fn root<C: InventoryClient>(State(state): State<AppState<C>>) -> Html<String> {
    let config = state.config.snapshot();
    let path = html_escape(&config.server.path);

    let scrape_form = match config.mode {
        ScrapeMode::Multi => format!(
            r#"    <form action="{path}" method="get">
        <label for="target">Target:</label>
        <input type="text" id="target" name="target" placeholder="vcenter.example.com">
        <input type="submit" value="Scrape">
    </form>"#
        ),
        ScrapeMode::Single => format!(
            r#"    <p>Single mode: <a href="{path}">scrape {}</a></p>"#,
            html_escape(config.enabled_cluster.as_deref().unwrap_or_default())
        ),
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>vSphere Exporter</title>
</head>
<body>
    <h1>vSphere Exporter</h1>
    <p>Version: {}</p>
{}
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="/metrics">Exporter Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        scrape_form
    );
    Html(html)
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Exporter self-metrics endpoint
pub async fn internal_metrics<C: InventoryClient>(
    State(state): State<AppState<C>>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, formatter::CONTENT_TYPE)],
        state.metrics.format_prometheus(),
    )
}

/// Scrape endpoint - runs one collection pass against the target
///
/// Connection, credential and entity failures are all reported inside the
/// 200 response through `vsphere_up` and `vsphere_collector_scrape_status`.
/// Only a missing target in multi mode is rejected.
#[instrument(skip(state), name = "scrape_handler")]
pub async fn scrape<C: InventoryClient>(
    State(state): State<AppState<C>>,
    Query(params): Query<ScrapeParams>,
) -> AppResult<Response> {
    let start = Instant::now();
    let config = state.config.snapshot();
    let target = config.resolve_target(params.target.as_deref())?;

    let scrape = match config.credentials_for(&target) {
        Ok(credentials) => state.orchestrator.collect(&target, &credentials).await,
        Err(e) => {
            warn!(endpoint = %target, error = %e, "Skipping scrape, no credentials");
            Scrape::unavailable(start.elapsed())
        }
    };

    let duration = scrape.outcome.duration_seconds();
    if scrape.outcome.is_complete() {
        state.metrics.record_scrape_success(&target, duration);
    } else {
        state.metrics.record_scrape_failure(&target, duration);
    }

    let samples = scrape.into_samples();
    let output = PrometheusFormatter::new().format(&samples);

    debug!(
        endpoint = %target,
        duration_ms = start.elapsed().as_millis() as u64,
        samples = samples.len(),
        "Scrape response ready"
    );

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, formatter::CONTENT_TYPE)],
        output,
    )
        .into_response())
}
