pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod server;
pub mod translate;
pub mod upstream;

pub use auth::{CredentialSet, Credentials};
pub use config::{CredentialSource, ProxyConfig};
pub use error::{ProxyError, Result};
pub use logging::SharedLogger;
pub use server::{build_router, AppState};
pub use upstream::{HttpUpstream, Upstream};
