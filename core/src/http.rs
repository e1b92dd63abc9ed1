//! HTTP transport types shared by the request builder and the dispatcher.
//!
//! # Design
//! Requests and responses are plain data. `RequestBuilder` produces
//! `HttpRequest` descriptors without touching the network, the dispatcher
//! decorates them with auth headers and hands them to a `Transport`, and the
//! transport reports back an `HttpResponse`. Keeping the descriptors inert
//! lets the batch endpoint re-encode them as embedded operations.
//!
//! Bodies are kept as `serde_json::Value` until the dispatcher serializes
//! them, so a batch can embed an op's body as a JSON object rather than as an
//! escaped string.

use serde_json::Value;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Wire name of the method, as used in request lines and batch ops.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute. `headers` is empty when the request leaves
/// `RequestBuilder`; the dispatcher attaches the session headers right
/// before transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub(crate) fn new(method: HttpMethod, url: String, body: Option<Value>) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body,
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status < 300
    }
}
