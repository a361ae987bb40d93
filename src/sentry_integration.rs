//! Optional Sentry error tracking integration.
//!
//! Initializes the Sentry SDK with the provided DSN and environment.
//! Errors drained from the broadcast error channel are captured once
//! this is initialized. The returned guard must be held for the
//! lifetime of the application.

pub fn init(dsn: &str, environment: Option<&str>) -> sentry::ClientInitGuard {
    let parsed_dsn = match dsn.parse() {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::warn!(error = %e, "invalid Sentry DSN, error tracking disabled");
            None
        }
    };

    sentry::init(sentry::ClientOptions {
        dsn: parsed_dsn,
        environment: environment.map(|e| e.to_string().into()),
        release: Some(env!("CARGO_PKG_VERSION").into()),
        ..Default::default()
    })
}

/// Report an error from the broadcast error channel.
pub fn capture(err: &crate::error::PurgecastError) {
    sentry::with_scope(
        |scope| scope.set_tag("component", "broadcast"),
        || {
            sentry::capture_error(err);
        },
    );
}
