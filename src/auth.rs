//! Credential selection and presentation.
//!
//! The proxy holds either a personal access token or an OAuth app's client
//! id/secret pair. The token wins when both are configured. REST calls present
//! a pair as query parameters; GraphQL calls present it as HTTP Basic auth.

use base64::{engine::general_purpose, Engine as _};

use crate::logging::redact;

/// The raw, possibly incomplete, credential values available to one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// The single credential form selected for a request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    ClientPair {
        client_id: String,
        client_secret: String,
    },
}

/// How a REST request carries its credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestAuth {
    Header(String),
    Query(Vec<(String, String)>),
}

impl CredentialSet {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn client_pair(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            token: None,
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
        }
    }

    /// Pick the credential form to use, or `None` when no form is complete.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        if let Some(token) = present(&self.token) {
            return Some(Credentials::Token(token.to_string()));
        }

        match (present(&self.client_id), present(&self.client_secret)) {
            (Some(id), Some(secret)) => Some(Credentials::ClientPair {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            }),
            _ => None,
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Credentials {
    #[must_use]
    pub fn rest_auth(&self) -> RestAuth {
        match self {
            Self::Token(token) => RestAuth::Header(format!("Bearer {token}")),
            Self::ClientPair {
                client_id,
                client_secret,
            } => RestAuth::Query(vec![
                ("client_id".to_string(), client_id.clone()),
                ("client_secret".to_string(), client_secret.clone()),
            ]),
        }
    }

    /// `Authorization` header value for the GraphQL endpoint.
    #[must_use]
    pub fn graphql_authorization(&self) -> String {
        match self {
            Self::Token(token) => format!("Bearer {token}"),
            Self::ClientPair {
                client_id,
                client_secret,
            } => {
                let encoded =
                    general_purpose::STANDARD.encode(format!("{client_id}:{client_secret}"));
                format!("Basic {encoded}")
            }
        }
    }

    /// Log-safe description of the chosen strategy.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Token(_) => "token".to_string(),
            Self::ClientPair { client_id, .. } => {
                format!("client credentials (client_id={})", redact(client_id))
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}
