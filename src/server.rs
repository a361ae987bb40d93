//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the endpoint
//! registry, the producing end of the signal queue, the error sink,
//! stats and uptime), [`build_router`] for constructing the Axum router
//! with middleware layers, and [`shutdown_signal`] for SIGTERM / Ctrl+C
//! handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::broadcast::errors::ErrorSink;
use crate::broadcast::ingress::broadcast_handler;
use crate::broadcast::queue::SignalSender;
use crate::broadcast::registry::EndpointRegistry;
use crate::config::model::Scheme;
use crate::health::health_handler;

#[derive(Debug)]
pub struct Stats {
    /// Inbound broadcast requests accepted.
    pub received: AtomicU64,
    /// Signals pushed onto the queue by ingress.
    pub enqueued: AtomicU64,
    pub delivered: AtomicU64,
    /// Failed delivery attempts, retried or not.
    pub failed: AtomicU64,
    pub retried: AtomicU64,
    /// Signals abandoned: retry budget spent, queue full, or retry cap hit.
    pub dropped: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            enqueued: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }
}

pub struct AppState {
    pub registry: EndpointRegistry,
    pub queue: SignalSender,
    pub errors: ErrorSink,
    pub scheme: Scheme,
    pub source_name: String,
    pub start_time: Instant,
    pub stats: Arc<Stats>,
    /// Largest inbound body buffered for a broadcast, in bytes.
    pub max_body: usize,
}

/// Every request except `GET /health` is broadcast, whatever its method or path.
/// The body size limit is enforced by the broadcast handler itself, so an
/// oversized body is reported like any other unreadable body.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/health",
            get(health_handler).fallback(broadcast_handler),
        )
        .fallback(broadcast_handler)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
