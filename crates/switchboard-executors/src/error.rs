//! Routing-facing executor errors.

use switchboard_core::types::ExecutionLayer;

/// No usable executor for `(provider, layer)`.
///
/// Covers both "nothing registered" and "registered but not ready"; `reason`
/// says which, in words an operator can act on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Executor {provider}/{layer} not available: {reason}")]
pub struct ExecutorNotAvailable {
    pub provider: String,
    pub layer: ExecutionLayer,
    pub reason: String,
}

impl ExecutorNotAvailable {
    pub fn new(provider: impl Into<String>, layer: ExecutionLayer, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            layer,
            reason: reason.into(),
        }
    }
}
