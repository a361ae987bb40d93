//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate, health), and their associated argument
//! structs. Every `run` flag has an environment variable equivalent for
//! container deployments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::broadcast::registry::Endpoint;
use crate::config::model::{BroadcastSettings, Scheme, TransportLimits};

#[derive(Parser)]
#[command(
    name = "purgecast",
    version,
    about = "Fan-out broadcaster for cache invalidation requests",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        purgecast run -e endpoints.yaml              Broadcast to the endpoints in a file\n  \
        purgecast run --endpoint cache-0:8080        Broadcast to a fixed endpoint\n  \
        purgecast validate endpoints.yaml            Check an endpoints file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the broadcaster
    Run(Box<RunArgs>),

    /// Validate an endpoints file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        purgecast run                                         Auto-detect ./endpoints.yaml\n  \
        purgecast run -e endpoints.yaml --workers 4           Four delivery workers\n  \
        purgecast run --endpoint a:8080 --endpoint b:8080     Static endpoints\n  \
        purgecast run --max-retries 3 --retry-backoff-ms 500  Faster, shorter retries")]
pub struct RunArgs {
    /// Endpoints file path (.yaml, .json, .toml), polled for changes
    #[arg(short, long, env = "ENDPOINTS_FILE")]
    pub endpoints: Option<PathBuf>,

    /// Static endpoint as host:port (repeatable)
    #[arg(
        long = "endpoint",
        env = "ENDPOINTS",
        value_delimiter = ',',
        conflicts_with = "endpoints"
    )]
    pub endpoint: Vec<Endpoint>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 8090)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Observability --
    /// Sentry DSN (enables error tracking)
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_DSN", help_heading = "Observability")]
    pub sentry_dsn: Option<String>,

    /// Sentry environment tag
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_ENVIRONMENT", help_heading = "Observability")]
    pub sentry_environment: Option<String>,

    // -- Delivery --
    /// Number of delivery workers
    #[arg(
        long,
        env = "SIGNAL_WORKERS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..),
        help_heading = "Delivery"
    )]
    pub workers: u16,

    /// Scheme used to reach endpoints
    #[arg(
        long,
        env = "ENDPOINT_SCHEME",
        value_enum,
        default_value_t = Scheme::Http,
        help_heading = "Delivery"
    )]
    pub scheme: Scheme,

    /// Upstream request timeout in milliseconds (0 = none)
    #[arg(
        long,
        env = "UPSTREAM_REQUEST_TIMEOUT_MS",
        default_value_t = 0,
        help_heading = "Delivery"
    )]
    pub upstream_timeout_ms: u64,

    /// Delay before a failed signal is retried, in milliseconds
    #[arg(
        long,
        env = "RETRY_BACKOFF_MS",
        default_value_t = 30_000,
        help_heading = "Delivery"
    )]
    pub retry_backoff_ms: u64,

    /// Retries after the first failed delivery before a signal is dropped
    #[arg(
        long,
        env = "MAX_RETRIES",
        default_value_t = 5,
        help_heading = "Delivery"
    )]
    pub max_retries: u32,

    /// Signal queue capacity (unbounded when unset)
    #[arg(long, env = "SIGNAL_QUEUE_CAPACITY", help_heading = "Delivery")]
    pub queue_capacity: Option<usize>,

    /// Cap on retries waiting out their backoff (unbounded when unset)
    #[arg(long, env = "MAX_PENDING_RETRIES", help_heading = "Delivery")]
    pub max_pending_retries: Option<usize>,

    // -- Tuning --
    /// Caps idle pooled connections per endpoint for each worker; active connections are not capped (transport default when unset)
    #[arg(long, env = "MAX_CONNS_PER_HOST", help_heading = "Tuning")]
    pub max_conns_per_host: Option<usize>,

    /// Caps idle pooled connections per endpoint for each worker, like the other two limits (transport default when unset)
    #[arg(long, env = "MAX_IDLE_CONNS", help_heading = "Tuning")]
    pub max_idle_conns: Option<usize>,

    /// Max idle connections per endpoint for each worker (transport default when unset)
    #[arg(long, env = "MAX_IDLE_CONNS_PER_HOST", help_heading = "Tuning")]
    pub max_idle_conns_per_host: Option<usize>,

    /// Max inbound request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,

    /// Endpoints file refresh interval in seconds
    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..),
        help_heading = "Tuning"
    )]
    pub poll_interval: u64,
}

impl RunArgs {
    #[must_use]
    pub fn broadcast_settings(&self) -> BroadcastSettings {
        BroadcastSettings {
            workers: usize::from(self.workers),
            scheme: self.scheme,
            transport: TransportLimits {
                max_conns_per_host: self.max_conns_per_host,
                max_idle_conns: self.max_idle_conns,
                max_idle_conns_per_host: self.max_idle_conns_per_host,
            },
            upstream_timeout: (self.upstream_timeout_ms > 0)
                .then(|| Duration::from_millis(self.upstream_timeout_ms)),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_retries: self.max_retries,
            queue_capacity: self.queue_capacity,
            max_pending_retries: self.max_pending_retries,
        }
    }
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Endpoints file to validate
    #[arg(default_value = "endpoints.yaml")]
    pub endpoints: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:8090")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn run_args(args: &[&str]) -> RunArgs {
        let mut argv = vec!["purgecast", "run"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn unset_knobs_keep_defaults() {
        let settings = run_args(&[]).broadcast_settings();
        assert_eq!(settings.transport, TransportLimits::default());
        assert_eq!(settings.upstream_timeout, None);
        assert_eq!(settings.queue_capacity, None);
        assert_eq!(settings.max_pending_retries, None);
    }

    #[test]
    fn delivery_flags_map_to_settings() {
        let settings = run_args(&[
            "--workers",
            "4",
            "--scheme",
            "https",
            "--upstream-timeout-ms",
            "2500",
            "--retry-backoff-ms",
            "100",
            "--max-retries",
            "2",
            "--max-idle-conns-per-host",
            "8",
        ])
        .broadcast_settings();

        assert_eq!(settings.workers, 4);
        assert_eq!(settings.scheme, Scheme::Https);
        assert_eq!(settings.upstream_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(settings.retry_backoff, Duration::from_millis(100));
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.transport.max_idle_conns_per_host, Some(8));
    }

    #[test]
    fn endpoints_parse_from_flags() {
        let args = run_args(&["--endpoint", "a:8080", "--endpoint", "b:8081"]);
        assert_eq!(
            args.endpoint,
            vec![Endpoint::new("a", "8080"), Endpoint::new("b", "8081")]
        );
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(Cli::try_parse_from(["purgecast", "run", "--workers", "0"]).is_err());
    }

    #[test]
    fn static_endpoints_conflict_with_file() {
        assert!(Cli::try_parse_from([
            "purgecast",
            "run",
            "-e",
            "endpoints.yaml",
            "--endpoint",
            "a:80"
        ])
        .is_err());
    }

    #[test]
    fn connection_limits_describe_idle_pooling() {
        let cli = Cli::command();
        let run = cli.find_subcommand("run").unwrap();
        for id in ["max_conns_per_host", "max_idle_conns", "max_idle_conns_per_host"] {
            let help = run
                .get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_help())
                .unwrap()
                .to_string();
            assert!(help.contains("idle"), "{id}: {help}");
        }
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        assert!(Cli::try_parse_from(["purgecast", "run", "--endpoint", "nope"]).is_err());
    }
}
