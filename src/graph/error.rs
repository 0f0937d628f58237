//! Error types for Graph requests.

use serde_json::Value;
use std::fmt;

/// Failure reported by the transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Graph answered with a non-success status
    #[error("Graph request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// The request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body was not valid JSON
    #[error("Failed to parse Graph response: {0}")]
    Decode(#[from] serde_json::Error),
    /// No usable access token
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),
}

impl TransportError {
    /// HTTP status code, if the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            TransportError::Decode(_) | TransportError::Unauthenticated(_) => None,
        }
    }

    /// Raw error payload returned by Graph, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            TransportError::Status { body, .. } if !body.trim().is_empty() => Some(body),
            _ => None,
        }
    }
}

/// Error payload returned by Graph
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    /// Parsed JSON, usually `{"error": {"code": .., "message": ..}}`
    Structured(Value),
    /// Body that did not parse as JSON
    Text(String),
}

impl ErrorDetail {
    /// Parse a payload as JSON, falling back to plain text.
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) if value.is_object() => ErrorDetail::Structured(value),
            _ => ErrorDetail::Text(body.trim().to_string()),
        }
    }

    /// Graph error code, e.g. `Request_ResourceNotFound`
    pub fn code(&self) -> Option<&str> {
        match self {
            ErrorDetail::Structured(value) => value.pointer("/error/code")?.as_str(),
            ErrorDetail::Text(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorDetail::Structured(value) => value.pointer("/error/message")?.as_str(),
            ErrorDetail::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Structured(value) => write!(f, "{}", value),
            ErrorDetail::Text(text) => f.write_str(text),
        }
    }
}

/// Error returned by `GraphClient::request`
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Unsupported HTTP method '{0}'; expected GET, POST, PATCH, PUT or DELETE")]
    InvalidMethod(String),
    #[error("Unsupported Graph API version '{0}'; expected v1.0 or beta")]
    InvalidApiVersion(String),
    #[error("Invalid request URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
    /// Transport failure; displays exactly as the transport error does
    #[error("{source}")]
    Remote {
        status: Option<u16>,
        detail: Option<ErrorDetail>,
        source: TransportError,
    },
}

impl GraphError {
    pub(super) fn remote(source: TransportError) -> Self {
        let status = source.status();
        let detail = source.body().map(ErrorDetail::parse);
        GraphError::Remote {
            status,
            detail,
            source,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GraphError::Remote { status, .. } => *status,
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            GraphError::Remote { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_detail_structured() {
        let detail = ErrorDetail::parse(
            r#"{"error":{"code":"Request_ResourceNotFound","message":"Resource 'x' does not exist."}}"#,
        );
        assert_eq!(detail.code(), Some("Request_ResourceNotFound"));
        assert_eq!(detail.message(), Some("Resource 'x' does not exist."));
    }

    #[test]
    fn test_error_detail_falls_back_to_text() {
        let detail = ErrorDetail::parse("<html>Bad Gateway</html>\n");
        assert_eq!(detail, ErrorDetail::Text("<html>Bad Gateway</html>".to_string()));
        assert_eq!(detail.code(), None);
        assert_eq!(detail.message(), Some("<html>Bad Gateway</html>"));
    }

    #[test]
    fn test_remote_error_keeps_transport_message() {
        let source = TransportError::Status {
            status: 403,
            body: json!({"error": {"code": "Authorization_RequestDenied"}}).to_string(),
        };
        let message = source.to_string();
        let err = GraphError::remote(source);

        assert_eq!(err.to_string(), message);
        assert_eq!(err.status(), Some(403));
        assert_eq!(
            err.detail().and_then(ErrorDetail::code),
            Some("Authorization_RequestDenied")
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_remote_error_without_body() {
        let err = GraphError::remote(TransportError::Unauthenticated("no token".to_string()));
        assert_eq!(err.status(), None);
        assert!(err.detail().is_none());
        assert_eq!(err.to_string(), "Not authenticated: no token");
    }
}
