//! Process-wide sink for errors that are handled where they occur but
//! still need to be surfaced.
//!
//! Ingress reports body-read failures and signal construction failures
//! here. Nothing reported to the sink influences retries.

use tokio::sync::mpsc;

use crate::error::PurgecastError;

#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::UnboundedSender<PurgecastError>,
}

#[must_use]
pub fn error_channel() -> (ErrorSink, mpsc::UnboundedReceiver<PurgecastError>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ErrorSink { tx }, rx)
}

impl ErrorSink {
    pub fn report(&self, err: PurgecastError) {
        if let Err(mpsc::error::SendError(err)) = self.tx.send(err) {
            // Consumer is gone (shutdown); keep the error visible anyway.
            tracing::error!(error = %err, "error reported after error channel closed");
        }
    }
}

/// Drain the error channel into the log (and Sentry when enabled).
pub async fn log_errors(mut rx: mpsc::UnboundedReceiver<PurgecastError>) {
    while let Some(err) = rx.recv().await {
        tracing::error!(error = %err, "broadcast error");

        #[cfg(feature = "sentry-integration")]
        crate::sentry_integration::capture(&err);
    }
    tracing::debug!("error channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reported_errors_reach_the_receiver_in_order() {
        let (sink, mut rx) = error_channel();
        sink.report(PurgecastError::UnsupportedFormat("xml".into()));
        sink.report(PurgecastError::QueueClosed {
            endpoint: "a:80".into(),
        });

        assert!(matches!(
            rx.recv().await,
            Some(PurgecastError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(PurgecastError::QueueClosed { .. })
        ));
    }

    #[tokio::test]
    async fn report_after_close_does_not_panic() {
        let (sink, rx) = error_channel();
        drop(rx);
        sink.report(PurgecastError::UnsupportedFormat("xml".into()));
    }
}
