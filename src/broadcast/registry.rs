//! The shared set of cache endpoints a broadcast fans out to.
//!
//! [`EndpointRegistry`] is a cheap-to-clone handle around a reader/writer
//! lock. Readers get an owned copy of the whole set, writers swap the
//! whole set at once, so a reader never sees a half-applied update and
//! nobody holds the lock across I/O.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

use crate::error::PurgecastError;

/// One backend instance eligible to receive broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Endpoint {
    pub host: String,

    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: String,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// `host:port`, with IPv6 literals bracketed so the result is a valid URI authority.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

/// Parses the `host:port` form used by `--endpoint`.
impl FromStr for Endpoint {
    type Err = PurgecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PurgecastError::InvalidEndpoint {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        if host.is_empty() {
            return Err(invalid("host is empty"));
        }
        if port.parse::<u16>().map_or(true, |p| p == 0) {
            return Err(invalid("port must be a number between 1 and 65535"));
        }

        Ok(Self::new(host, port))
    }
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
    })
}

#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Arc<RwLock<Vec<Endpoint>>>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_endpoints(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints: Arc::new(RwLock::new(endpoints)),
        }
    }

    /// Snapshot of the current set. The read lock is released before returning.
    pub async fn read(&self) -> Vec<Endpoint> {
        self.endpoints.read().await.clone()
    }

    /// Replace the whole set. Called by endpoint watchers only.
    pub async fn replace(&self, endpoints: Vec<Endpoint>) {
        let count = endpoints.len();
        *self.endpoints.write().await = endpoints;
        tracing::info!(endpoints = count, "endpoint set replaced");
    }

    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.endpoints.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_set(host: &str, count: usize) -> Vec<Endpoint> {
        (0..count)
            .map(|i| Endpoint::new(host, (8000 + i).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn starts_empty() {
        let registry = EndpointRegistry::new();
        assert!(registry.is_empty().await);
        assert!(registry.read().await.is_empty());
    }

    #[tokio::test]
    async fn replace_swaps_whole_set() {
        let registry = EndpointRegistry::with_endpoints(uniform_set("a", 2));
        registry.replace(uniform_set("b", 3)).await;

        let snapshot = registry.read().await;
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.iter().all(|e| e.host == "b"));
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_later_replacements() {
        let registry = EndpointRegistry::with_endpoints(uniform_set("a", 2));
        let before = registry.read().await;
        registry.replace(Vec::new()).await;

        assert_eq!(before.len(), 2);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_observe_a_mixed_set() {
        let registry = EndpointRegistry::with_endpoints(uniform_set("a", 3));

        let writer = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    let next = if i % 2 == 0 {
                        uniform_set("b", 5)
                    } else {
                        uniform_set("a", 3)
                    };
                    registry.replace(next).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..500 {
                    let snapshot = registry.read().await;
                    let host = snapshot[0].host.clone();
                    assert!(snapshot.iter().all(|e| e.host == host));
                    let expected = if host == "a" { 3 } else { 5 };
                    assert_eq!(snapshot.len(), expected);
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[test]
    fn parses_host_port() {
        let endpoint: Endpoint = "cache-0.varnish:8080".parse().unwrap();
        assert_eq!(endpoint, Endpoint::new("cache-0.varnish", "8080"));
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let endpoint: Endpoint = "[::1]:6081".parse().unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.authority(), "[::1]:6081");
    }

    #[test]
    fn rejects_missing_port() {
        assert!("cache-0".parse::<Endpoint>().is_err());
        assert!("cache-0:http".parse::<Endpoint>().is_err());
        assert!(":8080".parse::<Endpoint>().is_err());
    }

    #[test]
    fn port_deserializes_from_number_or_string() {
        let numeric: Endpoint = serde_json::from_str(r#"{"host": "a", "port": 8080}"#).unwrap();
        let text: Endpoint = serde_json::from_str(r#"{"host": "a", "port": "8080"}"#).unwrap();
        assert_eq!(numeric, text);
    }
}
