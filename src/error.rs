//! Unified error types for purgecast.
//!
//! Defines [`PurgecastError`] (the main crate error enum) and
//! [`ValidationError`] for endpoints file validation failures. Both use
//! `thiserror` for `Display` and `Error` derives. Errors raised while
//! broadcasting travel through the [`ErrorSink`](crate::broadcast::errors::ErrorSink)
//! rather than up the call stack.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub entry: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {} — {}", self.entry, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PurgecastError {
    #[error("Endpoints file not found: {}", path.display())]
    EndpointsFileNotFound { path: PathBuf },

    #[error("Endpoints parse error in {path}:\n  {source}")]
    EndpointsParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Endpoints validation failed:\n{}", format_errors(.errors))]
    EndpointsValidation { errors: Vec<ValidationError> },

    #[error("Unsupported endpoints format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid endpoint '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to read request body: {source}")]
    BodyRead {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to build signal for {endpoint}: {source}")]
    SignalBuild {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("signal queue is full (capacity {capacity}), signal for {endpoint} dropped")]
    QueueFull { capacity: usize, endpoint: String },

    #[error("signal queue is closed, signal for {endpoint} dropped")]
    QueueClosed { endpoint: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}
