//! Caller-side helper for talking to a deployed proxy.
//!
//! Rewrites direct `api.github.com` URLs onto the proxy, drops legacy OAuth
//! query parameters, and keeps successful JSON responses in a time-limited
//! cache so repeated lookups do not spend rate limit. The proxy itself knows
//! nothing about this cache.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

use crate::error::{ProxyError, Result};

pub const GITHUB_API_ORIGIN: &str = "https://api.github.com/";
const LEGACY_QUERY_KEYS: &[&str] = &["client_id", "client_secret"];

pub fn default_ttl() -> Duration {
    Duration::hours(24)
}

/// Point `target` at the proxy. Accepts a full GitHub API URL or a bare path.
pub fn rewrite_url(proxy_base: &str, target: &str) -> Result<Url> {
    let suffix = target.strip_prefix(GITHUB_API_ORIGIN).unwrap_or(target);
    let suffix = suffix.trim_start_matches('/');

    let (path, query) = match suffix.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (suffix, None),
    };

    let mut url = Url::parse(&format!("{}/{}", proxy_base.trim_end_matches('/'), path))?;

    if let Some(query) = query {
        let kept: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .filter(|(key, _)| !LEGACY_QUERY_KEYS.contains(&key.as_str()))
            .collect();
        if !kept.is_empty() {
            url.query_pairs_mut().extend_pairs(kept);
        }
    }

    Ok(url)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    value: Value,
}

/// Key/value cache with a fixed time-to-live.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Look up `key` as of `now`. Expired entries are evicted and miss.
    pub fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if now - entry.stored_at >= self.ttl {
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    /// Store `value` as of `now`, dropping whatever has already expired.
    pub fn insert_at(&mut self, key: impl Into<String>, value: Value, now: DateTime<Utc>) {
        self.purge_expired(now);
        self.entries.insert(
            key.into(),
            CacheEntry {
                stored_at: now,
                value,
            },
        );
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.insert_at(key, value, Utc::now());
    }

    /// Drop every entry that has outlived the TTL as of `now`.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.stored_at < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(default_ttl())
    }
}

pub struct ProxyClient {
    base_url: String,
    http: reqwest::Client,
    cache: Mutex<ResponseCache>,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self::with_cache(base_url, http, ResponseCache::default())
    }

    pub fn with_cache(base_url: impl Into<String>, http: reqwest::Client, cache: ResponseCache) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            cache: Mutex::new(cache),
        }
    }

    /// GET `target` through the proxy, serving from the cache when fresh.
    /// Only successful responses are cached.
    pub async fn get_json(&self, target: &str) -> Result<Value> {
        let url = rewrite_url(&self.base_url, target)?;
        let key = url.to_string();

        let cached = self.lock_cache()?.get(&key);
        if let Some(hit) = cached {
            tracing::debug!(url = %key, "Cache hit");
            return Ok(hit);
        }

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let value: Value = response.json().await?;

        if !status.is_success() {
            return Err(ProxyError::upstream(format!(
                "Proxy returned status {}: {}",
                status.as_u16(),
                value
            )));
        }

        self.lock_cache()?.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.lock_cache()?.clear();
        Ok(())
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, ResponseCache>> {
        self.cache
            .lock()
            .map_err(|_| ProxyError::other("response cache lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROXY: &str = "https://proxy.example.com/api/github";

    #[test]
    fn test_rewrite_full_github_url() {
        let url = rewrite_url(PROXY, "https://api.github.com/users/octocat/repos?per_page=5").unwrap();
        assert_eq!(
            url.as_str(),
            "https://proxy.example.com/api/github/users/octocat/repos?per_page=5"
        );
    }

    #[test]
    fn test_rewrite_strips_legacy_credentials() {
        let url = rewrite_url(
            PROXY,
            "https://api.github.com/users/octocat?client_id=abc&client_secret=def&page=2",
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/api/github/users/octocat?page=2");

        let url = rewrite_url(PROXY, "/rate_limit?client_id=abc").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/api/github/rate_limit");
    }

    #[test]
    fn test_rewrite_bare_path_with_trailing_slash_base() {
        let url = rewrite_url("https://proxy.example.com/api/github/", "users/octocat").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/api/github/users/octocat");
    }

    #[test]
    fn test_cache_hit_before_expiry() {
        let mut cache = ResponseCache::default();
        let t0 = Utc::now();
        cache.insert_at("k", json!({ "login": "octocat" }), t0);

        let hit = cache.get_at("k", t0 + Duration::hours(23));
        assert_eq!(hit, Some(json!({ "login": "octocat" })));
    }

    #[test]
    fn test_cache_expires_after_ttl() {
        let mut cache = ResponseCache::default();
        let t0 = Utc::now();
        cache.insert_at("k", json!(1), t0);

        assert!(cache.get_at("k", t0 + Duration::hours(24)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_evicts_expired_entries() {
        let mut cache = ResponseCache::new(Duration::minutes(10));
        let t0 = Utc::now();
        cache.insert_at("a", json!(1), t0);
        cache.insert_at("b", json!(2), t0 + Duration::minutes(5));
        cache.insert_at("c", json!(3), t0 + Duration::minutes(11));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("b", t0 + Duration::minutes(11)).is_some());
        assert!(cache.get_at("c", t0 + Duration::minutes(11)).is_some());
    }

    #[test]
    fn test_purge_expired() {
        let mut cache = ResponseCache::new(Duration::minutes(10));
        let t0 = Utc::now();
        cache.insert_at("old", json!(1), t0);
        cache.insert_at("new", json!(2), t0 + Duration::minutes(8));

        assert_eq!(cache.purge_expired(t0 + Duration::minutes(12)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("new", t0 + Duration::minutes(12)).is_some());
    }
}
