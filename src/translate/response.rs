//! Build caller responses from upstream GitHub responses.
//!
//! Every response carries the CORS allow-lists so browser callers can read it,
//! including error responses. Relayed responses also expose the rate-limit
//! headers.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_TYPE,
};
use reqwest::StatusCode;

use super::types::{ProxyResponse, RateLimit, ResponseBody, UpstreamResponse};
use crate::error::{ProxyError, Result};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
pub const X_RATELIMIT_USED: HeaderName = HeaderName::from_static("x-ratelimit-used");

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const EXPOSE_HEADERS: &str =
    "X-RateLimit-Limit, X-RateLimit-Remaining, X-RateLimit-Reset, X-RateLimit-Used";
const JSON: &str = "application/json";

impl RateLimit {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            limit: read(&X_RATELIMIT_LIMIT),
            remaining: read(&X_RATELIMIT_REMAINING),
            reset: read(&X_RATELIMIT_RESET),
            used: read(&X_RATELIMIT_USED),
        }
    }

    /// Copy the values that are present onto `headers`; absent ones stay absent.
    fn write_to(&self, headers: &mut HeaderMap) {
        let fields = [
            (X_RATELIMIT_LIMIT, &self.limit),
            (X_RATELIMIT_REMAINING, &self.remaining),
            (X_RATELIMIT_RESET, &self.reset),
            (X_RATELIMIT_USED, &self.used),
        ];
        for (name, value) in fields {
            if let Some(value) = value.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(name, value);
            }
        }
    }
}

/// The three allow-list headers sent on every response.
#[must_use]
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    headers
}

/// Answer to a CORS preflight: 200, allow-lists, no body.
#[must_use]
pub fn preflight() -> ProxyResponse {
    ProxyResponse {
        status: StatusCode::OK,
        headers: cors_headers(),
        body: ResponseBody::Empty,
    }
}

/// Relay a REST response. The body is parsed as JSON only when upstream says
/// it is JSON; a JSON body that fails to parse is an error.
pub fn rest_response(upstream: UpstreamResponse) -> Result<ProxyResponse> {
    let content_type = upstream.headers.get(CONTENT_TYPE).cloned();
    let is_json = content_type
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(JSON));

    let body = if is_json {
        ResponseBody::Json(serde_json::from_slice(&upstream.body)?)
    } else {
        ResponseBody::Text(String::from_utf8_lossy(&upstream.body).into_owned())
    };

    let content_type = content_type.unwrap_or_else(|| HeaderValue::from_static(JSON));
    Ok(relayed(upstream.status, content_type, &upstream.headers, body))
}

/// Relay a GraphQL response. GraphQL always answers with JSON.
pub fn graphql_response(upstream: UpstreamResponse) -> Result<ProxyResponse> {
    let body = ResponseBody::Json(serde_json::from_slice(&upstream.body)?);
    Ok(relayed(
        upstream.status,
        HeaderValue::from_static(JSON),
        &upstream.headers,
        body,
    ))
}

#[must_use]
pub fn error_response(err: &ProxyError) -> ProxyResponse {
    let mut headers = cors_headers();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));

    ProxyResponse {
        status: err.status(),
        headers,
        body: ResponseBody::Json(err.body()),
    }
}

fn relayed(
    status: StatusCode,
    content_type: HeaderValue,
    upstream_headers: &HeaderMap,
    body: ResponseBody,
) -> ProxyResponse {
    let mut headers = cors_headers();
    headers.insert(CONTENT_TYPE, content_type);
    RateLimit::from_headers(upstream_headers).write_to(&mut headers);
    headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static(EXPOSE_HEADERS));

    ProxyResponse {
        status,
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn upstream(status: u16, content_type: Option<&str>, body: &'static str) -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        UpstreamResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_preflight() {
        let resp = preflight();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, ResponseBody::Empty);
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Authorization");
        assert_eq!(resp.headers.len(), 3);
    }

    #[test]
    fn test_json_body_is_parsed() {
        let resp = rest_response(upstream(
            200,
            Some("application/json; charset=utf-8"),
            r#"{"login":"octocat"}"#,
        ))
        .unwrap();

        assert_eq!(resp.body, ResponseBody::Json(json!({ "login": "octocat" })));
        assert_eq!(resp.headers[CONTENT_TYPE], "application/json; charset=utf-8");
        assert_eq!(
            resp.headers[ACCESS_CONTROL_EXPOSE_HEADERS],
            "X-RateLimit-Limit, X-RateLimit-Remaining, X-RateLimit-Reset, X-RateLimit-Used"
        );
    }

    #[test]
    fn test_json_key_order_is_kept() {
        let raw = r#"{"login":"octocat","id":1,"avatar_url":"x"}"#;
        let resp = rest_response(upstream(200, Some("application/json"), raw)).unwrap();
        assert_eq!(resp.body.into_bytes(), Bytes::from_static(raw.as_bytes()));
    }

    #[test]
    fn test_text_body_is_not_parsed() {
        let resp = rest_response(upstream(200, Some("text/plain"), "{not json")).unwrap();
        assert_eq!(resp.body, ResponseBody::Text("{not json".to_string()));
        assert_eq!(resp.headers[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_missing_content_type_defaults_to_json_header() {
        let resp = rest_response(upstream(200, None, "plain")).unwrap();
        assert_eq!(resp.headers[CONTENT_TYPE], "application/json");
        assert_eq!(resp.body, ResponseBody::Text("plain".to_string()));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = rest_response(upstream(200, Some("application/json"), "{oops")).unwrap_err();
        assert!(matches!(err, ProxyError::Json(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limit_headers_are_copied() {
        let mut up = upstream(200, Some("application/json"), "{}");
        up.headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from_static("60"));
        up.headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("59"));
        up.headers.insert(X_RATELIMIT_RESET, HeaderValue::from_static("1700000000"));
        up.headers.insert(X_RATELIMIT_USED, HeaderValue::from_static("1"));

        let resp = rest_response(up).unwrap();
        assert_eq!(resp.headers[X_RATELIMIT_LIMIT], "60");
        assert_eq!(resp.headers[X_RATELIMIT_REMAINING], "59");
        assert_eq!(resp.headers[X_RATELIMIT_RESET], "1700000000");
        assert_eq!(resp.headers[X_RATELIMIT_USED], "1");
    }

    #[test]
    fn test_absent_rate_limit_headers_stay_absent() {
        let mut up = upstream(200, Some("application/json"), "{}");
        up.headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from_static("5000"));

        let rate = RateLimit::from_headers(&up.headers);
        assert_eq!(rate.limit.as_deref(), Some("5000"));
        assert!(rate.remaining.is_none());

        let resp = rest_response(up).unwrap();
        assert!(resp.headers.get(X_RATELIMIT_REMAINING).is_none());
        assert!(resp.headers.get(X_RATELIMIT_USED).is_none());
    }

    #[test]
    fn test_upstream_error_status_is_relayed() {
        let resp = rest_response(upstream(
            404,
            Some("application/json"),
            r#"{"message":"Not Found"}"#,
        ))
        .unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.body, ResponseBody::Json(json!({ "message": "Not Found" })));
    }

    #[test]
    fn test_graphql_content_type_is_fixed() {
        let resp = graphql_response(upstream(
            200,
            Some("application/json; charset=utf-8"),
            r#"{"data":{"viewer":{"login":"octocat"}}}"#,
        ))
        .unwrap();
        assert_eq!(resp.headers[CONTENT_TYPE], "application/json");
        assert_eq!(
            resp.body,
            ResponseBody::Json(json!({ "data": { "viewer": { "login": "octocat" } } }))
        );
    }

    #[test]
    fn test_error_response_keeps_cors() {
        let resp = error_response(&ProxyError::upstream("boom"));
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(resp.headers[CONTENT_TYPE], "application/json");
    }
}
