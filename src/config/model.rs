//! Data structures for the endpoints file and the broadcast settings.
//!
//! [`EndpointsFile`] is the serde document read by file sources.
//! [`BroadcastSettings`] is built once from CLI flags at startup and
//! shared read-only by ingress, workers and the retry scheduler.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::broadcast::registry::Endpoint;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointsFile {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection pool knobs for each worker's client. `None` keeps the
/// transport default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportLimits {
    pub max_conns_per_host: Option<usize>,
    pub max_idle_conns: Option<usize>,
    pub max_idle_conns_per_host: Option<usize>,
}

impl TransportLimits {
    /// Idle connections a worker's pool may keep per host.
    ///
    /// hyper's pool only has a per-host idle cap, so the total idle cap
    /// and the per-host connection cap both bound it from above.
    #[must_use]
    pub fn idle_per_host(&self) -> Option<usize> {
        [
            self.max_idle_conns_per_host,
            self.max_idle_conns,
            self.max_conns_per_host,
        ]
        .into_iter()
        .flatten()
        .min()
    }
}

#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    pub workers: usize,
    pub scheme: Scheme,
    pub transport: TransportLimits,
    pub upstream_timeout: Option<Duration>,
    pub retry_backoff: Duration,
    pub max_retries: u32,
    pub queue_capacity: Option<usize>,
    pub max_pending_retries: Option<usize>,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            scheme: Scheme::Http,
            transport: TransportLimits::default(),
            upstream_timeout: None,
            retry_backoff: Duration::from_secs(30),
            max_retries: 5,
            queue_capacity: None,
            max_pending_retries: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_per_host_defaults_to_none() {
        assert_eq!(TransportLimits::default().idle_per_host(), None);
    }

    #[test]
    fn idle_per_host_takes_tightest_limit() {
        let limits = TransportLimits {
            max_conns_per_host: Some(4),
            max_idle_conns: Some(100),
            max_idle_conns_per_host: Some(10),
        };
        assert_eq!(limits.idle_per_host(), Some(4));

        let limits = TransportLimits {
            max_idle_conns: Some(2),
            ..TransportLimits::default()
        };
        assert_eq!(limits.idle_per_host(), Some(2));
    }

    #[test]
    fn endpoints_file_defaults_to_empty() {
        let file: EndpointsFile = serde_json::from_str("{}").unwrap();
        assert!(file.endpoints.is_empty());
    }

    #[test]
    fn endpoints_file_rejects_unknown_fields() {
        let result = serde_json::from_str::<EndpointsFile>(
            r#"{"endpoints": [{"host": "a", "port": 80, "weight": 2}]}"#,
        );
        assert!(result.is_err());
    }
}
