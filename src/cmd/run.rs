//! `purgecast run` — start the broadcaster.
//!
//! Loads the initial endpoint set, starts the delivery workers and the
//! error logger, spawns the endpoint refresh loop for file sources, and
//! serves the broadcast ingress until SIGTERM / Ctrl+C.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::broadcast::errors::{error_channel, log_errors};
use crate::broadcast::queue::signal_queue;
use crate::broadcast::registry::EndpointRegistry;
use crate::broadcast::retry::RetryScheduler;
use crate::broadcast::worker::spawn_workers;
use crate::cli::RunArgs;
use crate::config::sources;
use crate::config::watch::endpoint_refresh_loop;
use crate::config::{EndpointSource, SourceVersion, StaticSource};
use crate::error::PurgecastError;
use crate::logging;
use crate::server::{self, AppState, Stats};

const AUTO_DETECT_CANDIDATES: [&str; 4] = [
    "endpoints.yaml",
    "endpoints.yml",
    "endpoints.json",
    "endpoints.toml",
];

#[allow(clippy::too_many_lines)]
pub async fn execute(args: RunArgs) -> Result<(), PurgecastError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    #[cfg(feature = "sentry-integration")]
    let _sentry_guard = args
        .sentry_dsn
        .as_ref()
        .map(|dsn| crate::sentry_integration::init(dsn, args.sentry_environment.as_deref()));

    let settings = args.broadcast_settings();
    let registry = EndpointRegistry::new();

    let (source_name, refresh) = match resolve_endpoint_source(&args).await? {
        Some((source, label)) => {
            let (endpoints, version) = source.load().await?;
            registry.replace(endpoints).await;
            (label, Some((source, version)))
        }
        None => {
            tracing::warn!(
                "no endpoint source configured, broadcasts will be acknowledged but not delivered"
            );
            ("none".to_string(), None)
        }
    };

    let stats = Arc::new(Stats::new());
    let (queue, receiver) = signal_queue(settings.queue_capacity);
    let (errors, error_rx) = error_channel();
    let error_logger = tokio::spawn(log_errors(error_rx));

    let retry = RetryScheduler::new(
        queue.clone(),
        settings.retry_backoff,
        settings.max_retries,
        settings.max_pending_retries,
        Arc::clone(&stats),
    );
    let workers = spawn_workers(&settings, &receiver, &retry, &stats);
    drop(receiver);

    let state = Arc::new(AppState {
        registry: registry.clone(),
        queue: queue.clone(),
        errors,
        scheme: settings.scheme,
        source_name: source_name.clone(),
        start_time: Instant::now(),
        stats,
        max_body: args.max_body,
    });

    // Shutdown signal: flipping shutdown_tx stops the refresh loop
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Static endpoints never change, so only file sources are polled.
    let refresh_handle = refresh
        .filter(|(_, version)| matches!(version, SourceVersion::Hash(_)))
        .map(|(source, version)| {
            tokio::spawn(endpoint_refresh_loop(
                source,
                registry.clone(),
                version,
                Duration::from_secs(args.poll_interval),
                shutdown_rx,
            ))
        });

    let router = server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let endpoint_count = registry.len().await;

    tracing::info!(
        addr = %addr,
        endpoints = endpoint_count,
        source = %source_name,
        workers = settings.workers,
        scheme = %settings.scheme,
        retry_backoff_ms = u64::try_from(settings.retry_backoff.as_millis()).unwrap_or(u64::MAX),
        max_retries = settings.max_retries,
        queue_capacity = settings.queue_capacity,
        "purgecast started"
    );

    let graceful_shutdown = async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful_shutdown)
    .await?;

    if let Some(handle) = refresh_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "endpoint refresh task failed");
        }
    }

    // Queued signals and pending retries are abandoned.
    for worker in &workers {
        worker.abort();
    }
    error_logger.abort();

    tracing::info!(abandoned = queue.depth(), "purgecast stopped");
    Ok(())
}

async fn resolve_endpoint_source(
    args: &RunArgs,
) -> Result<Option<(Box<dyn EndpointSource>, String)>, PurgecastError> {
    if let Some(path) = args.endpoints.as_deref() {
        return create_file_source(path).map(Some);
    }

    if !args.endpoint.is_empty() {
        let source = StaticSource::new(args.endpoint.clone());
        return Ok(Some((Box::new(source), "static".to_string())));
    }

    for name in &AUTO_DETECT_CANDIDATES {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected endpoints file");
            return create_file_source(&path).map(Some);
        }
    }

    Ok(None)
}

fn create_file_source(path: &Path) -> Result<(Box<dyn EndpointSource>, String), PurgecastError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let source = match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => sources::yaml::new(path.to_path_buf()),

        #[cfg(feature = "json")]
        "json" => sources::json::new(path.to_path_buf()),

        #[cfg(feature = "toml")]
        "toml" => sources::toml_source::new(path.to_path_buf()),

        other => return Err(PurgecastError::UnsupportedFormat(other.to_string())),
    };

    let label = format!("{} ({})", source.name(), source.path().display());
    Ok((Box::new(source), label))
}
