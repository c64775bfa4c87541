//! Translation between inbound proxy requests and GitHub API calls.
//!
//! Everything in here is pure (no I/O): the handler in [`crate::proxy`] feeds
//! inbound requests through [`request`], sends the result upstream, and turns
//! the upstream answer into a caller response with [`response`].

pub mod request;
pub mod response;
pub mod types;

pub use types::{InboundRequest, ProxyResponse, RateLimit, ResponseBody, UpstreamRequest, UpstreamResponse};
