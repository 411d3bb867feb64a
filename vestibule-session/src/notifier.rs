//! Fault reporting for contained backend failures.

use crate::error::BackendError;

/// Receives backend failures that the session store replaced with a fallback.
///
/// Called inline on the request path; implementations must not block.
pub trait FaultNotifier: Send + Sync {
    fn notify(&self, operation: &'static str, error: &BackendError);
}

/// Reports contained failures through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl FaultNotifier for LogNotifier {
    fn notify(&self, operation: &'static str, error: &BackendError) {
        tracing::error!(operation, error = %error, "Session backend failure contained");
    }
}
