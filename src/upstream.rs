//! The outbound transport seam.

use async_trait::async_trait;

use crate::error::{ProxyError, Result};
use crate::translate::{UpstreamRequest, UpstreamResponse};

/// Sends one request to GitHub and reads the whole response. No retries.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProxyError::upstream(format!("Request failed: {}", e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::upstream(format!("Failed to read response body: {}", e)))?;

        tracing::debug!(status = status.as_u16(), len = body.len(), "Upstream response");

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
