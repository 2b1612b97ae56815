use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::upstream::{BestSimilarClient, UpstreamApi};
use anyhow::Result;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamApi>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    term: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    url: Option<String>,
}

pub async fn run_server(config: ProxyConfig) -> Result<()> {
    let upstream: Arc<dyn UpstreamApi> = Arc::new(BestSimilarClient::new(&config.upstream)?);
    info!("Relaying to upstream {}", config.upstream.base_url);

    let app = build_router(AppState { upstream });

    info!("Proxy listening on {}", config.bind);
    info!("  GET /api/suggestions?term=<search_term>");
    info!("  GET /api/recommendations?url=<movie_url>");
    info!("  GET /health");
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/suggestions", get(suggestions))
        .route("/api/recommendations", get(recommendations))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Malformed query strings get the same JSON error body as missing parameters.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ProxyError> {
    match query {
        Ok(Query(params)) => Ok(params),
        Err(rejection) => {
            debug!("Rejected query string: {}", rejection.body_text());
            Err(ProxyError::BadRequest("Invalid query parameters"))
        }
    }
}

async fn suggestions(
    State(state): State<AppState>,
    query: Result<Query<SuggestionsQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ProxyError> {
    let term = query_params(query)?
        .term
        .filter(|t| !t.trim().is_empty())
        .ok_or(ProxyError::BadRequest("Term parameter is required"))?;

    match state.upstream.autocomplete(&term).await {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            error!(term = %term, "Error fetching suggestions: {:#}", e);
            Err(ProxyError::Upstream("Failed to fetch suggestions"))
        }
    }
}

async fn recommendations(
    State(state): State<AppState>,
    query: Result<Query<RecommendationsQuery>, QueryRejection>,
) -> Result<Response, ProxyError> {
    let path = query_params(query)?
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or(ProxyError::BadRequest("URL parameter is required"))?;
    if !is_root_relative(&path) {
        return Err(ProxyError::BadRequest("URL parameter must be a root-relative path"));
    }

    let page = match state.upstream.fetch_page(&path).await {
        Ok(page) => page,
        Err(e) => {
            error!(path = %path, "Error fetching recommendations: {:#}", e);
            return Err(ProxyError::Upstream("Failed to fetch recommendations"));
        }
    };

    let content_type = page
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("text/html; charset=utf-8"));
    Ok(([(header::CONTENT_TYPE, content_type)], page.body).into_response())
}

/// Only paths on the upstream host are forwarded; `//host` would escape it.
fn is_root_relative(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
