//! The broadcast engine: fan-out, queueing, delivery and retry.
//!
//! Control flow: [`ingress`] reads an inbound request once, snapshots
//! the [`registry`] and pushes one [`signal::Signal`] per endpoint onto
//! the [`queue`]. [`worker`]s pop signals and deliver them with their own
//! HTTP client; failures go to the [`retry`] scheduler, which re-enqueues
//! after a fixed backoff until the retry budget is spent. Errors that
//! never reach a caller are reported through [`errors`].

pub mod errors;
pub mod headers;
pub mod ingress;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod signal;
pub mod worker;
