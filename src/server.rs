use crate::config::{CredentialSource, ProxyConfig};
use crate::error::{ProxyError, Result};
use crate::logging::SharedLogger;
use crate::proxy::{self, Invocation};
use crate::translate::response::error_response;
use crate::translate::{InboundRequest, ProxyResponse};
use crate::upstream::{HttpUpstream, Upstream};

use axum::body::Body;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub config: ProxyConfig,
    pub credentials: CredentialSource,
    pub upstream: Arc<dyn Upstream>,
    pub logger: SharedLogger,
}

impl AppState {
    /// Production wiring: reqwest transport, credentials read from the
    /// environment on every request.
    pub fn from_config(config: ProxyConfig, logger: SharedLogger) -> Result<Self> {
        let client = config.upstream.build_client()?;
        Ok(Self {
            credentials: CredentialSource::Env(config.credentials.clone()),
            upstream: Arc::new(HttpUpstream::new(client)),
            config,
            logger,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .fallback(handle_proxy)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_proxy(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let Some(path) = route_suffix(uri.path(), state.config.normalized_prefix()) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Not found" })),
        )
            .into_response();
    };

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = ProxyError::request_body(rejection.status(), rejection.body_text());
            state.logger.warn("server", format!("{} {}: {}", method, uri.path(), err));
            return into_http(error_response(&err));
        }
    };

    let query: Vec<(String, String)> = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let req = InboundRequest {
        method,
        path: path.to_string(),
        uri_path: uri.path().to_string(),
        query,
        body: (!body.is_empty()).then_some(body),
    };

    let credentials = state.credentials.resolve();
    let ctx = Invocation {
        credentials: &credentials,
        settings: &state.config.upstream,
        upstream: state.upstream.as_ref(),
        logger: &state.logger,
    };

    into_http(proxy::handle(req, &ctx).await)
}

/// The part of `path` after the route prefix, without its leading slash.
fn route_suffix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path.trim_start_matches('/'));
    }

    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

fn into_http(resp: ProxyResponse) -> Response {
    (resp.status, resp.headers, Body::from(resp.body.into_bytes())).into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
