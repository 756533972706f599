//! Executor trait: the capability every AI backend adapter exposes.
//!
//! A handle is registered per `(provider, layer)`; the router hands one back
//! and the dispatcher calls `execute`. Failures are reported inside the
//! returned [`ExecutionResult`], never as a Rust error.

use std::collections::HashMap;

use async_trait::async_trait;
use switchboard_core::types::{ExecutionLayer, ExecutionResult, Message};

/// Free-form per-call parameters (e.g. `{"user_id": "..."}` for CLI tools).
pub type ExecuteParams = HashMap<String, serde_json::Value>;

/// A backend that can answer a prompt.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `prompt`, optionally with prior conversation and extra parameters.
    async fn execute(
        &self,
        prompt: &str,
        history: Option<&[Message]>,
        params: Option<&ExecuteParams>,
    ) -> ExecutionResult;

    /// Liveness probe: credentials present, tool installed, target reachable.
    fn is_available(&self) -> bool;

    /// `"<provider>-<layer>"`, e.g. `"claude-cli"`.
    fn provider_name(&self) -> String;

    /// Forget any native session the backend keeps for `user_id`.
    async fn clear_session(&self, _user_id: &str) {}
}

/// Split `"<provider>-<layer>"` at the last hyphen.
///
/// Names without a hyphen, or with an unknown layer suffix, are treated as
/// the whole provider name on the API layer.
pub fn split_provider_name(name: &str) -> (String, ExecutionLayer) {
    if let Some((provider, layer)) = name.rsplit_once('-') {
        if let Ok(layer) = layer.parse::<ExecutionLayer>() {
            return (provider.to_string(), layer);
        }
    }
    (name.to_string(), ExecutionLayer::Api)
}
