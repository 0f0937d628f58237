//! The Graph request wrapper.
//!
//! `GraphClient::request` is the single path to Graph. It resolves relative
//! paths against the configured host and API version, follows
//! `@odata.nextLink` for paged GETs, unwraps the `value` envelope, and logs
//! failures with their status code and error payload before returning them.

use serde_json::Value;
use tracing::{debug, debug_span, error, trace, warn, Instrument};
use url::Url;

use super::error::{ErrorDetail, GraphError};
use super::transport::GraphTransport;
use super::types::{
    ApiVersion, GraphRequest, GraphResponse, HttpMethod, TransportCall, DEFAULT_PAGE_SIZE,
};
use crate::config::LabConfig;

/// Continuation link field on paged responses
const NEXT_LINK: &str = "@odata.nextLink";

/// Envelope field holding a collection
const VALUE: &str = "value";

/// Graph client wrapping a transport.
///
/// Holds no state between calls besides its defaults; every `request` is
/// independent.
pub struct GraphClient<T> {
    transport: T,
    host: String,
    default_version: ApiVersion,
    default_page_size: i64,
}

impl<T: GraphTransport> GraphClient<T> {
    /// Create a client using the host, API version and page size from `config`.
    pub fn new(transport: T, config: &LabConfig) -> Self {
        Self {
            transport,
            host: config.graph_host.clone(),
            default_version: config.api_version,
            default_page_size: config.page_size,
        }
    }

    /// Create a client for an explicit host with the built-in defaults.
    #[cfg(test)]
    pub fn with_host(transport: T, host: impl Into<String>) -> Self {
        Self {
            transport,
            host: host.into(),
            default_version: ApiVersion::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a request carrying this client's configured API version and
    /// page size.
    pub fn build(&self, method: HttpMethod, uri: impl Into<String>) -> GraphRequest {
        GraphRequest::new(method, uri)
            .api_version(self.default_version)
            .page_size(self.default_page_size)
    }

    /// Resolve a request URI to the absolute address that is sent.
    ///
    /// Relative paths lose their leading `/` and are prefixed with
    /// `https://<host>/<version>/`. Absolute URIs are used unchanged, with a
    /// warning.
    pub fn resolve_uri(&self, uri: &str, version: ApiVersion) -> Result<String, GraphError> {
        let trimmed = uri.trim();
        let lower = trimmed.to_ascii_lowercase();

        let resolved = if lower.starts_with("https://") || lower.starts_with("http://") {
            warn!(
                "Absolute URI passed to Graph request: {}. Prefer a path relative to https://{}/{}/",
                trimmed, self.host, version
            );
            trimmed.to_string()
        } else {
            let path = trimmed.trim_start_matches('/');
            if path.is_empty() {
                return Err(GraphError::InvalidUri {
                    uri: uri.to_string(),
                    reason: "path is empty".to_string(),
                });
            }
            format!("https://{}/{}/{}", self.host, version.as_str(), path)
        };

        Url::parse(&resolved).map_err(|e| GraphError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Ok(resolved)
    }

    /// Run a Graph request.
    ///
    /// - GET with `fetch_all` follows every continuation link and returns a
    ///   `Collection` of all records in page order.
    /// - Everything else is exactly one call returning `Single`.
    ///
    /// A failure on any page fails the whole request; pages already read are
    /// dropped.
    pub async fn request(&self, request: GraphRequest) -> Result<GraphResponse, GraphError> {
        let span = debug_span!(
            "graph_request",
            operation = %request.operation,
            method = %request.method
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: GraphRequest) -> Result<GraphResponse, GraphError> {
        trace!("Entering {} {}", request.method, request.uri);

        let uri = self.resolve_uri(&request.uri, request.api_version)?;
        let paged = request.method == HttpMethod::Get && request.fetch_all;
        if request.fetch_all && !paged {
            debug!("fetch_all ignored for {}; only GET is paged", request.method);
        }

        let result = if paged {
            self.fetch_all_pages(&request, uri)
                .await
                .map(GraphResponse::Collection)
        } else {
            self.fetch_single(&request, uri).await
        };

        match &result {
            Ok(GraphResponse::Collection(items)) => {
                trace!("Leaving {} {} with {} record(s)", request.method, request.uri, items.len())
            }
            Ok(GraphResponse::Single(_)) => trace!("Leaving {} {}", request.method, request.uri),
            Err(_) => trace!("Leaving {} {} with error", request.method, request.uri),
        }
        result
    }

    async fn fetch_single(
        &self,
        request: &GraphRequest,
        uri: String,
    ) -> Result<GraphResponse, GraphError> {
        let body = match (&request.body, request.method) {
            (Some(_), HttpMethod::Get) => {
                debug!("Ignoring request body on GET");
                None
            }
            (body, _) => body.clone(),
        };

        let response = self.send(request, uri, body).await?;
        Ok(GraphResponse::Single(resolve_shape(request, response)))
    }

    async fn fetch_all_pages(
        &self,
        request: &GraphRequest,
        uri: String,
    ) -> Result<Vec<Value>, GraphError> {
        let mut next = Some(with_page_size(&uri, request.page_size));
        let mut items = Vec::new();
        let mut page = 0usize;

        while let Some(uri) = next.take() {
            page += 1;
            debug!("Fetching page {}", page);

            let mut response = self.send(request, uri, None).await?;
            next = take_next_link(&mut response);

            let before = items.len();
            collect_page(request, response, &mut items);
            debug!(
                "Page {} returned {} record(s){}",
                page,
                items.len() - before,
                if next.is_some() { ", more pages follow" } else { "" }
            );
        }

        debug!("Collected {} record(s) from {} page(s)", items.len(), page);
        Ok(items)
    }

    async fn send(
        &self,
        request: &GraphRequest,
        uri: String,
        body: Option<Value>,
    ) -> Result<Value, GraphError> {
        let call = TransportCall {
            method: request.method,
            uri,
            headers: request.headers.clone(),
            content_type: request.content_type.clone(),
            body,
        };

        debug!("{} {}", call.method, call.uri);
        if let Some(body) = &call.body {
            trace!("Request body ({}): {}", call.content_type, body);
        }

        match self.transport.send(call).await {
            Ok(response) => {
                trace!("Response: {}", response);
                Ok(response)
            }
            Err(source) => {
                let err = GraphError::remote(source);
                log_failure(request, &err);
                Err(err)
            }
        }
    }
}

fn log_failure(request: &GraphRequest, err: &GraphError) {
    let status = err
        .status()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string());

    match err.detail() {
        Some(detail @ ErrorDetail::Structured(_)) => error!(
            "{} {} failed (status {}, code {}): {} | message: {} | detail: {}",
            request.method,
            request.uri,
            status,
            detail.code().unwrap_or("unknown"),
            err,
            detail.message().unwrap_or(""),
            detail
        ),
        Some(ErrorDetail::Text(text)) => error!(
            "{} {} failed (status {}): {} | response text: {}",
            request.method, request.uri, status, err, text
        ),
        None => error!(
            "{} {} failed (status {}): {}",
            request.method, request.uri, status, err
        ),
    }
}

/// Append `$top` unless the page size leaves paging to the server or the
/// caller already set one.
fn with_page_size(uri: &str, page_size: i64) -> String {
    if page_size <= 0 || has_top(uri) {
        return uri.to_string();
    }
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}$top={}", uri, separator, page_size)
}

fn has_top(uri: &str) -> bool {
    let Some((_, query)) = uri.split_once('?') else {
        return false;
    };
    query.split('&').any(|option| {
        let option = option.to_ascii_lowercase();
        option.starts_with("$top=") || option.starts_with("%24top=")
    })
}

fn take_next_link(response: &mut Value) -> Option<String> {
    let link = response.as_object_mut()?.remove(NEXT_LINK)?;
    match link {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Shape of a single-call response: projection, then `value` on GET, then raw.
fn resolve_shape(request: &GraphRequest, mut response: Value) -> Value {
    if let Some(projected) = request.expand.as_ref().and_then(|p| p.apply(&response)) {
        return projected;
    }
    if request.method == HttpMethod::Get {
        if let Some(value) = response.as_object_mut().and_then(|o| o.remove(VALUE)) {
            return value;
        }
    }
    response
}

/// Records of one page: projection, then `value`, then the page itself.
fn collect_page(request: &GraphRequest, mut response: Value, items: &mut Vec<Value>) {
    let records = request
        .expand
        .as_ref()
        .and_then(|p| p.apply(&response))
        .or_else(|| response.as_object_mut().and_then(|o| o.remove(VALUE)));

    match records {
        Some(Value::Array(records)) => items.extend(records),
        Some(record) => items.push(record),
        None => items.push(response),
    }
}

/// Convenience wrappers using the client's defaults.
#[allow(dead_code)]
impl<T: GraphTransport> GraphClient<T> {
    pub async fn get(&self, uri: &str) -> Result<Value, GraphError> {
        let request = self.build(HttpMethod::Get, uri).operation("get");
        Ok(self.request(request).await?.into_value())
    }

    pub async fn get_all(&self, uri: &str) -> Result<Vec<Value>, GraphError> {
        let request = self
            .build(HttpMethod::Get, uri)
            .fetch_all(true)
            .operation("get_all");
        Ok(self.request(request).await?.into_items())
    }

    pub async fn post(&self, uri: &str, body: Value) -> Result<Value, GraphError> {
        let request = self.build(HttpMethod::Post, uri).body(body).operation("post");
        Ok(self.request(request).await?.into_value())
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Result<Value, GraphError> {
        let request = self.build(HttpMethod::Patch, uri).body(body).operation("patch");
        Ok(self.request(request).await?.into_value())
    }

    pub async fn put(&self, uri: &str, body: Value) -> Result<Value, GraphError> {
        let request = self.build(HttpMethod::Put, uri).body(body).operation("put");
        Ok(self.request(request).await?.into_value())
    }

    pub async fn delete(&self, uri: &str) -> Result<(), GraphError> {
        let request = self.build(HttpMethod::Delete, uri).operation("delete");
        self.request(request).await.map(|_| ())
    }
}
