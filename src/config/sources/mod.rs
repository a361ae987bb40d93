//! File-based [`EndpointSource`](super::EndpointSource) implementations.
//!
//! Provides YAML, JSON and TOML endpoints files gated by feature flags,
//! plus the [`parse_endpoints_str`] helper for format-specific
//! deserialization and [`sha256_hex`] for content versioning.

pub mod file_source;

#[cfg(feature = "yaml")]
pub mod yaml;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "toml")]
pub mod toml_source;

use sha2::{Digest, Sha256};

use crate::config::model::EndpointsFile;
use crate::error::PurgecastError;

/// Parse an endpoints document based on file extension.
pub fn parse_endpoints_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<EndpointsFile, PurgecastError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => {
            serde_yml::from_str(content).map_err(|e| PurgecastError::EndpointsParse {
                path: path_display.to_string(),
                source: Box::new(e),
            })
        }

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| PurgecastError::EndpointsParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| PurgecastError::EndpointsParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(PurgecastError::UnsupportedFormat(other.to_string())),
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        assert_eq!(sha256_hex(b"a"), sha256_hex(b"a"));
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
        assert_eq!(sha256_hex(b"").len(), 64);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = parse_endpoints_str("xml", "<endpoints/>", "endpoints.xml").unwrap_err();
        assert!(matches!(err, PurgecastError::UnsupportedFormat(ref f) if f == "xml"));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml_ports_may_be_numbers() {
        let file = parse_endpoints_str(
            "yaml",
            "endpoints:\n  - host: cache-0\n    port: 8080\n  - host: cache-1\n    port: \"8080\"\n",
            "endpoints.yaml",
        )
        .unwrap();
        assert_eq!(file.endpoints.len(), 2);
        assert_eq!(file.endpoints[0].port, "8080");
        assert_eq!(file.endpoints[1].port, "8080");
    }
}
