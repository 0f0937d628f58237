//! Request and response types for the Graph request wrapper.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::error::GraphError;

/// Default content type for request bodies
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Default `$top` for paged requests
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// HTTP verbs accepted by Graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PATCH" => Ok(HttpMethod::Patch),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(GraphError::InvalidMethod(s.to_string())),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Graph API version segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    /// `v1.0`
    Stable,
    /// `beta`
    #[default]
    Preview,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::Stable => "v1.0",
            ApiVersion::Preview => "beta",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v1.0" | "stable" => Ok(ApiVersion::Stable),
            "beta" | "preview" => Ok(ApiVersion::Preview),
            other => Err(GraphError::InvalidApiVersion(other.to_string())),
        }
    }
}

/// Caller-supplied projection from a raw response to the part to return.
///
/// A projection that yields `None`, `null` or an empty string/array/object
/// is treated as absent, and the default envelope handling applies.
#[derive(Clone)]
pub struct Projection(Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>);

impl Projection {
    pub fn new(f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Project a top-level field, e.g. `members` for `groups/{id}?$expand=members`
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |response| response.get(&name).cloned())
    }

    pub(super) fn apply(&self, response: &Value) -> Option<Value> {
        (self.0)(response).filter(|v| !is_empty(v))
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Projection(..)")
    }
}

pub(super) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// A single Graph request.
///
/// Built with `GraphRequest::new(method, uri)` and the chained setters;
/// every field has the documented default.
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub api_version: ApiVersion,
    pub content_type: String,
    pub expand: Option<Projection>,
    pub page_size: i64,
    pub fetch_all: bool,
    /// Name of the invoking operation, attached to every log record
    pub operation: String,
}

impl GraphRequest {
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            body: None,
            headers: BTreeMap::new(),
            api_version: ApiVersion::default(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            expand: None,
            page_size: DEFAULT_PAGE_SIZE,
            fetch_all: false,
            operation: "graph_request".to_string(),
        }
    }

    #[cfg(test)]
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, uri)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn expand(mut self, projection: Projection) -> Self {
        self.expand = Some(projection);
        self
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn fetch_all(mut self, fetch_all: bool) -> Self {
        self.fetch_all = fetch_all;
        self
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }
}

/// Normalized result of a Graph request
#[derive(Debug, Clone, PartialEq)]
pub enum GraphResponse {
    /// One call: the projected field, the `value` envelope, or the raw body
    Single(Value),
    /// Paged GET: records from every page, in arrival order
    Collection(Vec<Value>),
}

impl GraphResponse {
    pub fn into_value(self) -> Value {
        match self {
            GraphResponse::Single(value) => value,
            GraphResponse::Collection(items) => Value::Array(items),
        }
    }

    /// Records of the response; a single non-array body is one record.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            GraphResponse::Single(Value::Array(items)) => items,
            GraphResponse::Single(Value::Null) => Vec::new(),
            GraphResponse::Single(value) => vec![value],
            GraphResponse::Collection(items) => items,
        }
    }
}

/// What the transport is asked to send
#[derive(Debug, Clone, PartialEq)]
pub struct TransportCall {
    pub method: HttpMethod,
    /// Absolute URI
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub content_type: String,
    pub body: Option<Value>,
}
