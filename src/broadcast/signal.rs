//! The unit of delivery work.
//!
//! An [`OutboundRequest`] is a fully-buffered description of one
//! replayed request. The body is a [`Bytes`] handle, so every endpoint's
//! request and every retry share the same buffer and each attempt gets a
//! fresh body via [`OutboundRequest::to_http`].

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use http_body_util::Full;

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl OutboundRequest {
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Upstream `host:port`, used in log lines.
    #[must_use]
    pub fn upstream(&self) -> &str {
        self.uri.authority().map_or("", |a| a.as_str())
    }

    /// Build a hyper request for one delivery attempt.
    #[must_use]
    pub fn to_http(&self) -> hyper::Request<Full<Bytes>> {
        let mut req = hyper::Request::new(Full::new(self.body.clone()));
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.headers_mut() = self.headers.clone();
        req
    }
}

/// One delivery of a broadcast to one endpoint, with its failure count.
///
/// `attempt` is only touched by the retry scheduler while the signal is
/// out of the queue.
#[derive(Debug, Clone)]
pub struct Signal {
    pub broadcast_id: Arc<str>,
    pub request: OutboundRequest,
    pub attempt: u32,
}

impl Signal {
    #[must_use]
    pub fn new(broadcast_id: Arc<str>, request: OutboundRequest) -> Self {
        Self {
            broadcast_id,
            request,
            attempt: 0,
        }
    }
}
