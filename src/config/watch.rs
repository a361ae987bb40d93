//! Polling loop that keeps the endpoint registry in sync with a source.
//!
//! On every tick the source is asked whether its content changed; if so
//! the whole set is reloaded and swapped into the registry in one
//! [`replace`](crate::broadcast::registry::EndpointRegistry::replace).
//! A failed reload keeps the current set.

use std::time::Duration;

use tokio::sync::watch;

use super::{EndpointSource, SourceVersion};
use crate::broadcast::registry::EndpointRegistry;

pub async fn endpoint_refresh_loop(
    source: Box<dyn EndpointSource>,
    registry: EndpointRegistry,
    mut version: SourceVersion,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("endpoint refresh loop shutting down");
                return;
            }
        }

        match source.has_changed(&version).await {
            Ok(true) => {
                tracing::info!(source = source.name(), "endpoint change detected, reloading");
                match source.load().await {
                    Ok((endpoints, new_version)) => {
                        registry.replace(endpoints).await;
                        version = new_version;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "endpoint reload failed, keeping current set");
                    }
                }
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "endpoint change check failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::broadcast::registry::Endpoint;
    use crate::error::PurgecastError;

    /// Serves the `n`-th endpoint set, where `n` advances on every load.
    struct SequenceSource {
        sets: Vec<Vec<Endpoint>>,
        loads: Arc<AtomicUsize>,
        fail_from: usize,
    }

    #[async_trait]
    impl EndpointSource for SequenceSource {
        fn name(&self) -> &'static str {
            "sequence"
        }

        async fn load(&self) -> Result<(Vec<Endpoint>, SourceVersion), PurgecastError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_from {
                return Err(PurgecastError::UnsupportedFormat("broken".into()));
            }
            let set = self.sets[n.min(self.sets.len() - 1)].clone();
            Ok((set, SourceVersion::Hash(n.to_string())))
        }

        async fn has_changed(&self, _current: &SourceVersion) -> Result<bool, PurgecastError> {
            Ok(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reloads_into_registry_on_change() {
        let registry = EndpointRegistry::new();
        let source = SequenceSource {
            sets: vec![vec![Endpoint::new("a", "80")], vec![Endpoint::new("b", "80")]],
            loads: Arc::new(AtomicUsize::new(0)),
            fail_from: usize::MAX,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(endpoint_refresh_loop(
            Box::new(source),
            registry.clone(),
            SourceVersion::Hash("initial".into()),
            Duration::from_secs(5),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(registry.read().await, vec![Endpoint::new("a", "80")]);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(registry.read().await, vec![Endpoint::new("b", "80")]);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reload_keeps_current_set() {
        let registry = EndpointRegistry::with_endpoints(vec![Endpoint::new("keep", "80")]);
        let source = SequenceSource {
            sets: vec![vec![]],
            loads: Arc::new(AtomicUsize::new(0)),
            fail_from: 0,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(endpoint_refresh_loop(
            Box::new(source),
            registry.clone(),
            SourceVersion::Static,
            Duration::from_secs(1),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(registry.read().await, vec![Endpoint::new("keep", "80")]);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
