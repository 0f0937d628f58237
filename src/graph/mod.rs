//! Microsoft Graph access.
//!
//! - `GraphClient`: the request wrapper (URI resolution, paging, envelope
//!   unwrapping, failure logging)
//! - `GraphTransport` / `ReqwestTransport`: the authenticated HTTP call,
//!   including retries

mod client;
mod error;
mod http;
#[cfg(test)]
pub(crate) mod mock;
mod transport;
mod types;
#[cfg(test)]
mod tests;

pub use client::GraphClient;
pub use error::GraphError;
pub use http::RetryPolicy;
pub use transport::{GraphTransport, ReqwestTransport};
pub use types::{ApiVersion, GraphRequest, HttpMethod, Projection};

#[cfg(test)]
pub(crate) use error::TransportError;
#[cfg(test)]
pub(crate) use types::{GraphResponse, TransportCall};
