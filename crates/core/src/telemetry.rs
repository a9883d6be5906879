//! Hand-off point for errors that have no caller to propagate to.

use tracing::error;

use crate::error::Error;

/// External collaborator that records structured errors.
pub trait ErrorReporter: Send + Sync {
    /// Record `err`, raised while doing `context`.
    fn report(&self, context: &str, err: &Error);
}

/// Reporter that writes to the `tracing` pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, err: &Error) {
        match err.code() {
            Some(code) => error!(%code, "{context}: {err}"),
            None => error!("{context}: {err}"),
        }
    }
}
