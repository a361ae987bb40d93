//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, endpoint set metadata, signal queue depth, and
//! cumulative broadcast statistics.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub endpoints: EndpointsHealth,
    pub queue: QueueHealth,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct EndpointsHealth {
    pub source: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct QueueHealth {
    pub depth: usize,
    /// `None` for an unbounded queue.
    pub capacity: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub broadcasts_received: u64,
    pub signals_enqueued: u64,
    pub signals_delivered: u64,
    pub delivery_failures: u64,
    pub retries_scheduled: u64,
    pub signals_dropped: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = &state.stats;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        endpoints: EndpointsHealth {
            source: state.source_name.clone(),
            count: state.registry.len().await,
        },
        queue: QueueHealth {
            depth: state.queue.depth(),
            capacity: state.queue.capacity(),
        },
        stats: StatsResponse {
            broadcasts_received: stats.received.load(Ordering::Relaxed),
            signals_enqueued: stats.enqueued.load(Ordering::Relaxed),
            signals_delivered: stats.delivered.load(Ordering::Relaxed),
            delivery_failures: stats.failed.load(Ordering::Relaxed),
            retries_scheduled: stats.retried.load(Ordering::Relaxed),
            signals_dropped: stats.dropped.load(Ordering::Relaxed),
        },
    })
}
