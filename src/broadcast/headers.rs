//! Header derivation for replayed signals.
//!
//! [`build_signal_headers`] copies the caller's headers verbatim,
//! including `Host`, drops hop-by-hop headers and `content-length`
//! (hyper recomputes it from the buffered body) and overwrites
//! `X-Forwarded-For` with the caller's socket address.

use std::net::SocketAddr;
use std::sync::LazyLock;

use http::{HeaderMap, HeaderName, HeaderValue};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

#[must_use]
pub fn build_signal_headers(original: &HeaderMap, remote_addr: &SocketAddr) -> HeaderMap {
    let mut headers = original.clone();

    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(hyper::header::CONTENT_LENGTH);

    match HeaderValue::from_str(&remote_addr.to_string()) {
        Ok(val) => {
            headers.insert("x-forwarded-for", val);
        }
        Err(e) => {
            tracing::warn!(remote_addr = %remote_addr, error = %e, "unusable remote address for x-forwarded-for");
        }
    }

    headers
}
