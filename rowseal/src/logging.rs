//! Pluggable lifecycle logging for the vault.

/// Receives lifecycle messages from the vault.
///
/// Implementations must not fail; the vault never looks at what they do.
pub trait EngineLogger: Send + Sync {
    /// An operation started or finished.
    fn info(&self, message: &str);

    /// Something succeeded with a caveat.
    fn warn(&self, message: &str);

    /// An operation failed.
    fn error(&self, message: &str);
}

/// Forwards to `tracing` under the `rowseal` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl EngineLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "rowseal", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "rowseal", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "rowseal", "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl EngineLogger for NoopLogger {
    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}
