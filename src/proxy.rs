use crate::auth::{CredentialSet, Credentials};
use crate::config::UpstreamConfig;
use crate::error::{ProxyError, Result};
use crate::logging::{LogLevel, SharedLogger};
use crate::translate::request::{graphql_body, graphql_request, is_graphql, loggable_url, rest_request};
use crate::translate::response::{error_response, graphql_response, preflight, rest_response};
use crate::translate::{InboundRequest, ProxyResponse};
use crate::upstream::Upstream;

use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

/// Everything one invocation needs besides the request itself.
pub struct Invocation<'a> {
    pub credentials: &'a CredentialSet,
    pub settings: &'a UpstreamConfig,
    pub upstream: &'a dyn Upstream,
    pub logger: &'a SharedLogger,
}

/// Handle one proxied request. Never fails: every error becomes a JSON error
/// response that still carries the CORS headers.
pub async fn handle(req: InboundRequest, ctx: &Invocation<'_>) -> ProxyResponse {
    let request_id = Uuid::new_v4().to_string();

    match translate(&req, ctx, &request_id).await {
        Ok(resp) => resp,
        Err(e) => {
            ctx.logger.log_with_context(
                if matches!(e, ProxyError::Validation { .. }) {
                    LogLevel::Warn
                } else {
                    LogLevel::Error
                },
                "proxy",
                format!("Request failed: {}", e),
                json!({ "request_id": request_id, "path": req.path }),
            );
            error_response(&e)
        }
    }
}

/// The request/response translation with its outcome made explicit.
pub async fn translate(
    req: &InboundRequest,
    ctx: &Invocation<'_>,
    request_id: &str,
) -> Result<ProxyResponse> {
    if req.method == Method::OPTIONS {
        return Ok(preflight());
    }

    let credentials = ctx
        .credentials
        .credentials()
        .ok_or_else(ProxyError::missing_credentials)?;

    ctx.logger.log_with_context(
        LogLevel::Info,
        "proxy",
        format!("Using {} authentication", credentials.describe()),
        json!({ "request_id": request_id }),
    );

    if is_graphql(req) {
        proxy_graphql(req, &credentials, ctx, request_id).await
    } else {
        proxy_rest(req, &credentials, ctx, request_id).await
    }
}

async fn proxy_rest(
    req: &InboundRequest,
    credentials: &Credentials,
    ctx: &Invocation<'_>,
    request_id: &str,
) -> Result<ProxyResponse> {
    let upstream_req = rest_request(ctx.settings, req, credentials)?;

    ctx.logger.log_with_context(
        LogLevel::Info,
        "proxy",
        format!("GET {}", loggable_url(&upstream_req.url)),
        json!({ "request_id": request_id }),
    );

    let upstream_resp = ctx.upstream.send(upstream_req).await?;
    log_status(ctx, request_id, upstream_resp.status.as_u16());

    rest_response(upstream_resp)
}

async fn proxy_graphql(
    req: &InboundRequest,
    credentials: &Credentials,
    ctx: &Invocation<'_>,
    request_id: &str,
) -> Result<ProxyResponse> {
    let body = graphql_body(req)?;
    let upstream_req = graphql_request(ctx.settings, body, credentials)?;

    ctx.logger.log_with_context(
        LogLevel::Info,
        "proxy",
        format!("POST {}", upstream_req.url),
        json!({ "request_id": request_id }),
    );

    let upstream_resp = ctx.upstream.send(upstream_req).await?;
    log_status(ctx, request_id, upstream_resp.status.as_u16());

    graphql_response(upstream_resp)
}

fn log_status(ctx: &Invocation<'_>, request_id: &str, status: u16) {
    let level = if status >= 400 {
        LogLevel::Warn
    } else {
        LogLevel::Debug
    };
    ctx.logger.log_with_context(
        level,
        "proxy",
        format!("Upstream responded status={}", status),
        json!({ "request_id": request_id }),
    );
}
