use crate::auth::CredentialSet;
use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "github-api-proxy.toml";
const CONFIG_DIR_NAME: &str = "github-api-proxy";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Names of the environment variables holding the secrets. The secrets
/// themselves never live in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_client_id_env")]
    pub client_id_env: String,
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
}

/// Where an invocation gets its credentials from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Read the configured environment variables on every invocation.
    Env(CredentialsConfig),
    Fixed(CredentialSet),
}

fn default_port() -> u16 {
    8787
}

fn default_route_prefix() -> String {
    "/api/github".to_string()
}

fn default_base_url() -> String {
    "https://api.github.com/".to_string()
}

fn default_graphql_url() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_user_agent() -> String {
    "GitHub-API-Proxy".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_client_id_env() -> String {
    "GITHUB_CLIENT_ID".to_string()
}

fn default_client_secret_env() -> String {
    "GITHUB_CLIENT_SECRET".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            route_prefix: default_route_prefix(),
            upstream: UpstreamConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            graphql_url: default_graphql_url(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            client_id_env: default_client_id_env(),
            client_secret_env: default_client_secret_env(),
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to defaults.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.route_prefix.starts_with('/') {
            return Err(ProxyError::config(format!(
                "route_prefix must start with '/', got '{}'",
                self.route_prefix
            )));
        }
        url::Url::parse(&self.upstream.base_url).map_err(|e| {
            ProxyError::config(format!("Invalid upstream.base_url '{}': {}", self.upstream.base_url, e))
        })?;
        url::Url::parse(&self.upstream.graphql_url).map_err(|e| {
            ProxyError::config(format!(
                "Invalid upstream.graphql_url '{}': {}",
                self.upstream.graphql_url, e
            ))
        })?;
        Ok(())
    }

    /// Route prefix without a trailing slash, `""` for the root.
    #[must_use]
    pub fn normalized_prefix(&self) -> &str {
        self.route_prefix.trim_end_matches('/')
    }
}

impl UpstreamConfig {
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(builder.build()?)
    }
}

impl CredentialsConfig {
    /// Read the credential variables as they are right now.
    #[must_use]
    pub fn read_env(&self) -> CredentialSet {
        CredentialSet {
            token: std::env::var(&self.token_env).ok(),
            client_id: std::env::var(&self.client_id_env).ok(),
            client_secret: std::env::var(&self.client_secret_env).ok(),
        }
    }
}

impl CredentialSource {
    #[must_use]
    pub fn resolve(&self) -> CredentialSet {
        match self {
            Self::Env(names) => names.read_env(),
            Self::Fixed(set) => set.clone(),
        }
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from(CONFIG_FILE_NAME));

    if cfg!(target_os = "macos") {
        if let Some(home) = dirs_path() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join(CONFIG_DIR_NAME)
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join(CONFIG_DIR_NAME).join("config.toml"));
        }
        if let Some(home) = dirs_path() {
            paths.push(home.join(".config").join(CONFIG_DIR_NAME).join("config.toml"));
        }
    }

    if let Some(home) = dirs_path() {
        paths.push(home.join(format!(".{CONFIG_FILE_NAME}")));
    }

    paths
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
