//! Error types for the proxy.

use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

pub const MISSING_CREDENTIALS: &str = "Server configuration error - Missing authentication credentials";
pub const MISSING_GRAPHQL_QUERY: &str = "Missing GraphQL query in request body";
pub const PROXY_FAILURE: &str = "Failed to proxy GitHub API request";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("Request body rejected: {message}")]
    RequestBody { status: StatusCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream {
            message: msg.into(),
        }
    }

    pub fn request_body(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::RequestBody {
            status,
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub fn missing_credentials() -> Self {
        Self::config(MISSING_CREDENTIALS)
    }

    pub fn missing_graphql_query() -> Self {
        Self::validation(MISSING_GRAPHQL_QUERY)
    }

    /// Status code reported to the caller for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::RequestBody { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body reported to the caller. Configuration and validation errors
    /// carry their message as `error`; everything else is a generic proxy
    /// failure with the underlying text in `details`.
    #[must_use]
    pub fn body(&self) -> Value {
        match self {
            Self::Config { message } | Self::Validation { message } => json!({ "error": message }),
            other => json!({
                "error": PROXY_FAILURE,
                "details": other.to_string(),
            }),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
