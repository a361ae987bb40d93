//! Endpoints file validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`EndpointsFile`] for
//! unusable hosts, out-of-range ports and duplicate entries. Returns a
//! list of [`ValidationError`] values with per-field suggestions. An
//! empty endpoint list is valid: broadcasts are then acknowledged with
//! nothing to deliver.

use std::collections::HashSet;

use super::model::EndpointsFile;
use crate::broadcast::registry::Endpoint;
use crate::error::ValidationError;

/// Validate a single endpoint host. Returns `Ok(())` or a human-readable error.
pub fn validate_host(host: &str) -> Result<(), String> {
    if host.is_empty() {
        return Err("host cannot be empty".into());
    }
    if host.contains("://") {
        return Err(format!("'{host}' looks like a URL, expected a bare host name"));
    }
    let candidate = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    url::Host::parse(&candidate)
        .map(|_| ())
        .map_err(|_| format!("'{host}' is not a valid host name or IP address"))
}

/// Validate a single endpoint port. Returns `Ok(())` or a human-readable error.
pub fn validate_port(port: &str) -> Result<(), String> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("'{port}' is not a port between 1 and 65535")),
        Ok(_) => Ok(()),
    }
}

pub fn validate(file: &EndpointsFile) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, endpoint) in file.endpoints.iter().enumerate() {
        let entry = format!("endpoints[{i}]");

        if let Err(msg) = validate_host(&endpoint.host) {
            errors.push(ValidationError {
                entry: entry.clone(),
                field: "host".into(),
                message: msg,
                suggestion: endpoint
                    .host
                    .split_once("://")
                    .map(|(_, rest)| format!("did you mean '{}'?", rest.trim_end_matches('/'))),
            });
        }

        if let Err(msg) = validate_port(&endpoint.port) {
            errors.push(ValidationError {
                entry: entry.clone(),
                field: "port".into(),
                message: msg,
                suggestion: None,
            });
        }

        if !seen.insert(endpoint) {
            errors.push(ValidationError {
                entry,
                field: "host".into(),
                message: format!("duplicate endpoint {endpoint}"),
                suggestion: None,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, endpoints: &[Endpoint]) -> String {
    let mut lines = vec![format!("  {} endpoints\n", endpoints.len())];
    lines.extend(endpoints.iter().map(|e| format!("  - {e}")));
    format!("{} is valid\n{}", path, lines.join("\n"))
}
