//! Broadcast ingress: the Axum fallback handler.
//!
//! Reads the inbound body once, snapshots the endpoint registry once,
//! derives one [`Signal`] per endpoint and enqueues them all, then
//! acknowledges the caller. The response says the broadcast was
//! accepted, never that it was delivered.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};

use super::errors::ErrorSink;
use super::headers::build_signal_headers;
use super::registry::Endpoint;
use super::signal::{OutboundRequest, Signal};
use crate::config::model::Scheme;
use crate::error::PurgecastError;
use crate::server::AppState;

pub const ACK_BODY: &str = "Broadcast accepted.";

/// The parts of an inbound request that are replayed to every endpoint.
pub struct Broadcast<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub body: &'a Bytes,
    pub remote_addr: SocketAddr,
    pub scheme: Scheme,
}

pub async fn broadcast_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = match Limited::new(body, state.max_body).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = PurgecastError::BodyRead { source: e };
            let message = err.to_string();
            tracing::warn!(
                method = %parts.method,
                uri = %parts.uri,
                remote_addr = %addr,
                error = %message,
                "rejecting broadcast"
            );
            state.errors.report(err);
            return (StatusCode::INTERNAL_SERVER_ERROR, message).into_response();
        }
    };

    let broadcast_id: Arc<str> = parts
        .headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from)
        .into();

    let endpoints = state.registry.read().await;

    tracing::debug!(
        broadcast_id = %broadcast_id,
        method = %parts.method,
        uri = %parts.uri,
        remote_addr = %addr,
        body_bytes = body.len(),
        endpoints = endpoints.len(),
        "broadcast received"
    );
    state.stats.received.fetch_add(1, Ordering::Relaxed);

    let broadcast = Broadcast {
        method: &parts.method,
        uri: &parts.uri,
        headers: &parts.headers,
        body: &body,
        remote_addr: addr,
        scheme: state.scheme,
    };
    let signals = build_signals(&broadcast, &broadcast_id, &endpoints, &state.errors);

    let mut enqueued = 0usize;
    for signal in signals {
        match state.queue.push(signal) {
            Ok(()) => {
                enqueued += 1;
                state.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                state.stats.dropped.fetch_add(1, Ordering::Relaxed);
                state.errors.report(e);
            }
        }
    }

    tracing::info!(
        broadcast_id = %broadcast_id,
        method = %parts.method,
        uri = %parts.uri,
        signals = enqueued,
        "broadcast enqueued"
    );

    (StatusCode::OK, ACK_BODY).into_response()
}

/// Derive one signal per endpoint. Endpoints whose request cannot be
/// built are reported to `errors` and skipped.
#[must_use]
pub fn build_signals(
    broadcast: &Broadcast<'_>,
    broadcast_id: &Arc<str>,
    endpoints: &[Endpoint],
    errors: &ErrorSink,
) -> Vec<Signal> {
    let headers = build_signal_headers(broadcast.headers, &broadcast.remote_addr);

    endpoints
        .iter()
        .filter_map(|endpoint| match signal_uri(broadcast.scheme, endpoint, broadcast.uri) {
            Ok(uri) => {
                let request = OutboundRequest::new(
                    broadcast.method.clone(),
                    uri,
                    headers.clone(),
                    broadcast.body.clone(),
                );
                Some(Signal::new(Arc::clone(broadcast_id), request))
            }
            Err(e) => {
                errors.report(PurgecastError::SignalBuild {
                    endpoint: endpoint.to_string(),
                    source: Box::new(e),
                });
                None
            }
        })
        .collect()
}

/// `{scheme}://{host}:{port}{path?query}` for one endpoint.
pub fn signal_uri(
    scheme: Scheme,
    endpoint: &Endpoint,
    inbound: &Uri,
) -> Result<Uri, axum::http::uri::InvalidUri> {
    let path_and_query = inbound.path_and_query().map_or("/", |pq| pq.as_str());
    format!("{scheme}://{}{path_and_query}", endpoint.authority()).parse()
}
