//! Configuration schema.
//!
//! Hierarchy: `Config` → `RoutingConfig`, `SessionsConfig`, `DedupConfig`,
//! `ExecutorsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::ExecutionLayer;

/// Providers accepted as routing defaults.
pub const KNOWN_PROVIDERS: &[&str] = &["claude", "gemini", "openai"];

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.switchboard/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub routing: RoutingConfig,
    pub sessions: SessionsConfig,
    pub dedup: DedupConfig,
    pub executors: ExecutorsConfig,
}

/// Returned by [`Config::validate`] with every problem found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
pub struct ConfigError(pub Vec<String>);

impl Config {
    /// Check value ranges and enumerations. Reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let routing = &self.routing;
        if !KNOWN_PROVIDERS.contains(&routing.default_provider.as_str()) {
            errors.push(format!(
                "routing.defaultProvider must be one of: {}",
                KNOWN_PROVIDERS.join(", ")
            ));
        }
        if let Some(cli) = &routing.default_cli_provider {
            if !KNOWN_PROVIDERS.contains(&cli.as_str()) {
                errors.push(format!(
                    "routing.defaultCliProvider must be one of: {}",
                    KNOWN_PROVIDERS.join(", ")
                ));
            }
        }
        if routing.fallback == FallbackPolicy::Chain && routing.fallback_providers.is_empty() {
            errors.push("routing.fallbackProviders must not be empty when fallback is \"chain\"".into());
        }
        if let Some(classifier) = &routing.classifier {
            if classifier.prompt_template.trim().is_empty() {
                errors.push("routing.classifier.promptTemplate must not be empty".into());
            }
        }

        if self.sessions.max_messages == 0 {
            errors.push("sessions.maxMessages must be greater than 0".into());
        }
        if self.sessions.timeout_secs == 0 {
            errors.push("sessions.timeoutSecs must be greater than 0".into());
        }
        if self.sessions.lock_timeout_secs == 0 {
            errors.push("sessions.lockTimeoutSecs must be greater than 0".into());
        }
        if self.dedup.capacity == 0 {
            errors.push("dedup.capacity must be greater than 0".into());
        }

        for (i, cmd) in self.executors.commands.iter().enumerate() {
            if cmd.provider.trim().is_empty() {
                errors.push(format!("executors.commands[{i}].provider must not be empty"));
            }
            if cmd.program.trim().is_empty() {
                errors.push(format!("executors.commands[{i}].program must not be empty"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError(errors))
        }
    }
}

// ─────────────────────────────────────────────
// Routing
// ─────────────────────────────────────────────

/// What the router does when the implicit target is unavailable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Fail with the unavailable pair. No substitution.
    #[default]
    Strict,
    /// Try other layers/providers for implicit requests, logging each substitution.
    Chain,
}

/// Router defaults and strategy selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    /// Provider for implicit requests.
    pub default_provider: String,
    /// Layer for implicit requests without CLI intent.
    pub default_layer: ExecutionLayer,
    /// Provider for implicit requests with CLI intent (falls back to `default_provider`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_cli_provider: Option<String>,
    /// Consult the executor-backed intent classifier when one is configured.
    pub use_ai_intent_classification: bool,
    pub fallback: FallbackPolicy,
    /// Candidate providers tried in order under [`FallbackPolicy::Chain`].
    pub fallback_providers: Vec<String>,
    /// Language code (e.g. `"zh-CN"`) prepended as a reply instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_language: Option<String>,
    /// Executor-backed intent classifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_provider: "claude".to_string(),
            default_layer: ExecutionLayer::Api,
            default_cli_provider: None,
            use_ai_intent_classification: false,
            fallback: FallbackPolicy::Strict,
            fallback_providers: KNOWN_PROVIDERS.iter().map(|p| p.to_string()).collect(),
            response_language: None,
            classifier: None,
        }
    }
}

impl RoutingConfig {
    /// `"Please respond in <language>."`, or `None` if no language is set.
    pub fn language_instruction(&self) -> Option<String> {
        let code = self.response_language.as_deref()?.trim();
        if code.is_empty() {
            return None;
        }
        let name = match code {
            "zh-CN" => "中文（简体）",
            "zh-TW" => "中文（繁體）",
            "en-US" => "English",
            "en-GB" => "English (UK)",
            "ja-JP" => "日本語",
            "ko-KR" => "한국어",
            "fr-FR" => "Français",
            "de-DE" => "Deutsch",
            "es-ES" => "Español",
            "pt-BR" => "Português (Brasil)",
            other => other,
        };
        Some(format!("Please respond in {name}."))
    }
}

/// Which executor answers intent-classification prompts, and with what prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierConfig {
    pub provider: String,
    pub layer: ExecutionLayer,
    /// Prompt sent to the classifier; `{message}` is replaced by the user text.
    /// The reply must contain a JSON object with a boolean `needs_cli`.
    pub prompt_template: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            layer: ExecutionLayer::Api,
            prompt_template: String::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────

/// Session store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionsConfig {
    /// Path of the JSON session store (`~` is expanded).
    pub storage_path: String,
    /// Rotate once a session holds this many messages.
    pub max_messages: usize,
    /// Expire after this many idle seconds.
    pub timeout_secs: u64,
    /// Give up on the store lock after this many seconds.
    pub lock_timeout_secs: u64,
    /// Interval between background expiry sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            storage_path: "~/.switchboard/data/sessions.json".to_string(),
            max_messages: 50,
            timeout_secs: 86_400,
            lock_timeout_secs: 10,
            sweep_interval_secs: 3_600,
        }
    }
}

impl SessionsConfig {
    /// Storage path with `~` expanded.
    pub fn storage_path(&self) -> PathBuf {
        crate::utils::expand_home(&self.storage_path)
    }
}

// ─────────────────────────────────────────────
// Dedup
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DedupConfig {
    /// Number of message ids remembered.
    pub capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: crate::dedup::DEFAULT_DEDUP_CAPACITY,
        }
    }
}

// ─────────────────────────────────────────────
// Executors
// ─────────────────────────────────────────────

/// Executor bootstrap settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutorsConfig {
    /// Optional metadata bootstrap file (`{"executors": [...]}`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<String>,
    /// Process-backed executors to register at startup.
    pub commands: Vec<CommandExecutorConfig>,
}

/// An executor backed by an external program.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandExecutorConfig {
    pub provider: String,
    pub layer: ExecutionLayer,
    /// Display name; defaults to `"{provider} {layer}"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Program to run.
    pub program: String,
    /// Arguments; `{prompt}` is substituted, otherwise the prompt is appended.
    pub args: Vec<String>,
    /// Working directory. Must exist for the executor to be available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    pub timeout_secs: u64,
    /// Environment variables that must be set for the executor to be available.
    pub required_env: Vec<String>,
}

impl Default for CommandExecutorConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            layer: ExecutionLayer::Api,
            name: None,
            program: String::new(),
            args: Vec::new(),
            working_dir: None,
            timeout_secs: 120,
            required_env: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
