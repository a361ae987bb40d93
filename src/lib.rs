//! Purgecast is a fan-out broadcaster for cache invalidation requests.
//!
//! Every inbound HTTP request is acknowledged immediately and copied
//! into one signal per registered endpoint. Signals travel through an
//! in-memory queue to a pool of delivery workers; failed deliveries are
//! retried after a fixed backoff until the retry budget is spent.
//!
//! # Architecture
//!
//! - [`broadcast`] -- Ingress handler, endpoint registry, signal queue,
//!   delivery workers, and retry scheduling.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate, health).
//! - [`config`] -- Endpoint sources, settings, validation, and the refresh
//!   loop via the [`EndpointSource`](config::EndpointSource) trait.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`server`] -- Axum router, shared application state, stats, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML endpoints file support _(enabled by default)_ |
//! | `json` | JSON endpoints file support |
//! | `toml` | TOML endpoints file support |
//! | `sentry-integration` | Sentry error tracking |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod broadcast;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod server;

#[cfg(feature = "sentry-integration")]
pub mod sentry_integration;
