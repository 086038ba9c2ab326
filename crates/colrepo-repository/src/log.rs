//! Lifecycle log sink.
//!
//! The repository reports what it is doing (setup, each operation starting
//! and ending, failures) to a [`RepositoryLog`]. The default [`NullLog`]
//! drops everything; [`TracingLog`] forwards to `tracing`. Statement-level
//! detail is always emitted as `tracing` events regardless of the sink.

use std::sync::Arc;

use tracing::{error, info, warn};

/// Sink for repository lifecycle messages.
pub trait RepositoryLog: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Drops every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLog;

impl RepositoryLog for NullLog {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Forwards messages to `tracing` under the `colrepo` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl RepositoryLog for TracingLog {
    fn info(&self, message: &str) {
        info!(target: "colrepo", "{message}");
    }

    fn warn(&self, message: &str) {
        warn!(target: "colrepo", "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "colrepo", "{message}");
    }
}

impl<L: RepositoryLog + ?Sized> RepositoryLog for Arc<L> {
    fn info(&self, message: &str) {
        (**self).info(message)
    }

    fn warn(&self, message: &str) {
        (**self).warn(message)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryLog;
    use super::*;

    #[test]
    fn null_log_accepts_everything() {
        let log = NullLog;
        log.info("a");
        log.warn("b");
        log.error("c");
    }

    #[test]
    fn shared_log_forwards() {
        let log = Arc::new(MemoryLog::default());
        let shared: Arc<dyn RepositoryLog> = log.clone();
        shared.info("started");
        shared.error("boom");
        assert_eq!(
            log.entries(),
            vec![("info", "started".to_string()), ("error", "boom".to_string())]
        );
    }
}
