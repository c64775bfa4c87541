//! Per-request values flowing through the translator. None of them outlive
//! a single request/response cycle.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Route suffix after the proxy prefix, without a leading slash.
    pub path: String,
    /// Full inbound request path, used for GraphQL detection.
    pub uri_path: String,
    /// Query pairs in arrival order; keys may repeat.
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl InboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into().trim_start_matches('/').to_string();
        Self {
            method,
            uri_path: format!("/{path}"),
            path,
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_uri_path(mut self, uri_path: impl Into<String>) -> Self {
        self.uri_path = uri_path.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
}

impl ResponseBody {
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Json(value) => Bytes::from(value.to_string()),
            Self::Text(text) => Bytes::from(text),
        }
    }
}

/// The response returned to the original caller.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// The four GitHub quota headers. Any of them may be missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<String>,
    pub remaining: Option<String>,
    pub reset: Option<String>,
    pub used: Option<String>,
}
