//! Transport layer: sends one authenticated HTTP call to Graph.
//!
//! The request wrapper never talks to reqwest directly; it goes through
//! `GraphTransport` so retries, auth headers and connection reuse stay here.

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

use super::error::TransportError;
use super::http::{send_with_retry, RetryPolicy};
use super::types::TransportCall;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default CLI version (from Cargo.toml)
const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sends a single call and returns the parsed JSON body.
pub trait GraphTransport: Send + Sync {
    fn send(
        &self,
        call: TransportCall,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

fn build_user_agent() -> String {
    std::env::var("ENTRA_LAB_USER_AGENT")
        .unwrap_or_else(|_| format!("entra-lab/{}", DEFAULT_VERSION))
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// reqwest-backed transport holding a bearer token.
///
/// One `Client` is reused for every call, so connections are pooled.
pub struct ReqwestTransport {
    client: Client,
    access_token: String,
    user_agent: String,
    retry: RetryPolicy,
}

impl ReqwestTransport {
    pub fn new(access_token: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            access_token: access_token.into(),
            user_agent: build_user_agent(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build(&self, call: &TransportCall, request_id: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(call.method.into(), &call.uri)
            .bearer_auth(&self.access_token)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .header("client-request-id", request_id);

        for (name, value) in &call.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &call.body {
            let payload = match body {
                Value::String(raw) if !is_json(&call.content_type) => raw.clone(),
                other => other.to_string(),
            };
            request = request
                .header(CONTENT_TYPE, call.content_type.as_str())
                .body(payload);
        }

        request
    }
}

impl GraphTransport for ReqwestTransport {
    async fn send(&self, call: TransportCall) -> Result<Value, TransportError> {
        if self.access_token.trim().is_empty() {
            return Err(TransportError::Unauthenticated(
                "access token is empty; run 'entra-lab login'".to_string(),
            ));
        }

        let request_id = Uuid::new_v4().to_string();
        debug!("=== Graph Request ===");
        debug!("{} {} (client-request-id {})", call.method, call.uri, request_id);

        let response = send_with_retry(&self.retry, || self.build(&call, &request_id)).await?;

        let status = response.status();
        debug!("=== Graph Response ===");
        debug!("Status: {}", status);

        let text = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        // 204 No Content from PATCH/DELETE
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        trace!("Response body: {}", text);
        Ok(serde_json::from_str(&text)?)
    }
}
