//! Transport seam between the grouping store and the monitoring service.
//!
//! The store never talks HTTP directly. It builds [`ApiRequest`] values and
//! hands them to an [`ApiClient`], which the host application supplies (the
//! `regroup` binary uses a blocking `ureq` agent; tests use in-memory fakes).

use std::fmt;

use serde_json::Value;

/// HTTP verbs used by the grouping workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request against the service API.
///
/// `path` is relative to the API root (e.g. `/issues/42/hashes/`). Query
/// pairs keep their order and may repeat a key, which is how list values
/// such as `id=a&id=b` are sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Append one query pair.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append `key=value` once per value.
    #[must_use]
    pub fn query_list<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.query.push((key.to_string(), value.into()));
        }
        self
    }

    #[must_use]
    pub fn extend_query(mut self, pairs: &[(String, String)]) -> Self {
        self.query.extend(pairs.iter().cloned());
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// All values sent for `key`, in order.
    #[must_use]
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Decoded JSON body; `Value::Null` when the body was empty.
    pub body: Value,
    /// Raw `Link` header, used for cursor pagination.
    pub link: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            link: None,
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx status. `detail` is the service's `{"detail": ...}` message if present.
    #[error("HTTP {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    /// The body did not have the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The request could not be built from the inputs given.
    #[error("missing request parameter: {0}")]
    MissingParameter(&'static str),
}

impl ApiError {
    /// Build a status error, pulling `detail` out of a JSON error body.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value.get("detail").and_then(Value::as_str).map(str::to_string))
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            });
        Self::Status { status, detail }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Blocking request executor supplied by the host.
///
/// Implementations must be shareable across threads: a fetch runs each of its
/// descriptors on a separate worker.
pub trait ApiClient: Send + Sync {
    /// Execute `request`, returning the decoded body of a 2xx response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failures, non-2xx statuses, or bodies
    /// that are not JSON.
    fn request(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}
