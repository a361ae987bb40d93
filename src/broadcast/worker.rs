//! Delivery worker pool.
//!
//! A fixed number of [`DeliveryWorker`]s drain the shared queue for the
//! lifetime of the process. Each worker owns its own pooled hyper
//! client, so connection pools are per worker and workers share nothing
//! mutable. A response status in `400..=599` counts as a failure just
//! like a transport error; anything else is a delivery.
//!
//! **Shutdown behavior:** queued signals and waiting retries are
//! abandoned when the runtime stops. There is no drain.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::StatusCode;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::queue::SignalReceiver;
use super::retry::RetryScheduler;
use super::signal::{OutboundRequest, Signal};
use crate::config::model::{BroadcastSettings, TransportLimits};
use crate::server::Stats;

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Full<Bytes>>;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

#[must_use]
pub fn build_http_client(limits: &TransportLimits) -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();

    let mut builder = Client::builder(TokioExecutor::new());
    builder.pool_idle_timeout(POOL_IDLE_TIMEOUT);
    if let Some(idle) = limits.idle_per_host() {
        builder.pool_max_idle_per_host(idle);
    }
    builder.build(https)
}

#[must_use]
pub const fn is_failure_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 400..=599)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(StatusCode),
    /// Upstream answered with a status in `400..=599`.
    Rejected(StatusCode),
    /// No response obtained.
    Failed(String),
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(self, Self::Delivered(_))
    }
}

pub struct DeliveryWorker {
    id: usize,
    client: HttpClient,
    queue: SignalReceiver,
    retry: RetryScheduler,
    timeout: Option<Duration>,
    stats: Arc<Stats>,
}

impl DeliveryWorker {
    #[must_use]
    pub fn new(
        id: usize,
        settings: &BroadcastSettings,
        queue: SignalReceiver,
        retry: RetryScheduler,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            id,
            client: build_http_client(&settings.transport),
            queue,
            retry,
            timeout: settings.upstream_timeout,
            stats,
        }
    }

    pub async fn run(self) {
        tracing::debug!(worker = self.id, "delivery worker started");
        while let Some(signal) = self.queue.pop().await {
            self.process(signal).await;
        }
        tracing::debug!(worker = self.id, "delivery worker stopped, queue closed");
    }

    /// Deliver one signal and hand it to the retry scheduler on failure.
    pub async fn process(&self, signal: Signal) -> DeliveryOutcome {
        let outcome = self.deliver(&signal.request).await;

        let broadcast_id = Arc::clone(&signal.broadcast_id);
        let upstream = signal.request.upstream().to_string();
        let attempt = signal.attempt + 1;

        match &outcome {
            DeliveryOutcome::Delivered(status) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    worker = self.id,
                    broadcast_id = %broadcast_id,
                    upstream = %upstream,
                    status = status.as_u16(),
                    attempt,
                    "signal delivered"
                );
            }
            DeliveryOutcome::Rejected(status) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                let decision = self.retry.schedule(signal);
                tracing::warn!(
                    worker = self.id,
                    broadcast_id = %broadcast_id,
                    upstream = %upstream,
                    status = status.as_u16(),
                    attempt,
                    retry = ?decision,
                    "signal broadcast error: unusual status code"
                );
            }
            DeliveryOutcome::Failed(err) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                let decision = self.retry.schedule(signal);
                tracing::error!(
                    worker = self.id,
                    broadcast_id = %broadcast_id,
                    upstream = %upstream,
                    error = %err,
                    attempt,
                    retry = ?decision,
                    "signal broadcast error"
                );
            }
        }

        outcome
    }

    /// Execute one attempt. The response body is always drained so the
    /// connection can go back to the pool; drain errors are only logged.
    pub async fn deliver(&self, request: &OutboundRequest) -> DeliveryOutcome {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let send = self.client.request(request.to_http());

        let result = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, send).await {
                Ok(result) => result,
                Err(_) => {
                    return DeliveryOutcome::Failed(format!(
                        "request timed out after {}ms",
                        self.timeout.unwrap_or_default().as_millis()
                    ));
                }
            },
            None => send.await,
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => return DeliveryOutcome::Failed(error_chain(&e)),
        };

        let status = response.status();
        let drained = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, discard(response.into_body()))
                .await
                .unwrap_or_else(|_| Err("timed out".to_string())),
            None => discard(response.into_body()).await,
        };
        if let Err(e) = drained {
            tracing::error!(
                worker = self.id,
                upstream = %request.upstream(),
                error = %e,
                "error discarding response body for connection reuse"
            );
        }

        if is_failure_status(status) {
            DeliveryOutcome::Rejected(status)
        } else {
            DeliveryOutcome::Delivered(status)
        }
    }
}

async fn discard(mut body: Incoming) -> Result<(), String> {
    while let Some(frame) = body.frame().await {
        frame.map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// `Display` of an error followed by its sources, `: `-separated.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Start `settings.workers` workers (at least one) on the current runtime.
pub fn spawn_workers(
    settings: &BroadcastSettings,
    queue: &SignalReceiver,
    retry: &RetryScheduler,
    stats: &Arc<Stats>,
) -> Vec<JoinHandle<()>> {
    let count = settings.workers.max(1);
    tracing::info!(
        workers = count,
        upstream_timeout_ms = settings
            .upstream_timeout
            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        idle_per_host = settings.transport.idle_per_host(),
        "spawning delivery workers"
    );

    (0..count)
        .map(|id| {
            let worker = DeliveryWorker::new(
                id,
                settings,
                queue.clone(),
                retry.clone(),
                Arc::clone(stats),
            );
            tokio::spawn(worker.run())
        })
        .collect()
}
