//! Config loader: reads `~/.switchboard/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.switchboard/config.json`
//! 3. Environment variables `SWITCHBOARD_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, FallbackPolicy};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given (or default) path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `SWITCHBOARD_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `SWITCHBOARD_ROUTING__DEFAULT_PROVIDER`
/// - `SWITCHBOARD_ROUTING__DEFAULT_LAYER`
/// - `SWITCHBOARD_ROUTING__DEFAULT_CLI_PROVIDER`
/// - `SWITCHBOARD_ROUTING__USE_AI_INTENT_CLASSIFICATION`
/// - `SWITCHBOARD_ROUTING__FALLBACK` (`strict` | `chain`)
/// - `SWITCHBOARD_ROUTING__RESPONSE_LANGUAGE`
/// - `SWITCHBOARD_SESSIONS__STORAGE_PATH`
/// - `SWITCHBOARD_SESSIONS__MAX_MESSAGES`
/// - `SWITCHBOARD_SESSIONS__TIMEOUT_SECS`
/// - `SWITCHBOARD_SESSIONS__LOCK_TIMEOUT_SECS`
/// - `SWITCHBOARD_SESSIONS__SWEEP_INTERVAL_SECS`
/// - `SWITCHBOARD_DEDUP__CAPACITY`
/// - `SWITCHBOARD_EXECUTORS__METADATA_PATH`
fn apply_env_overrides(mut config: Config) -> Config {
    // Routing
    if let Ok(val) = std::env::var("SWITCHBOARD_ROUTING__DEFAULT_PROVIDER") {
        config.routing.default_provider = val.trim().to_lowercase();
    }
    if let Ok(val) = std::env::var("SWITCHBOARD_ROUTING__DEFAULT_LAYER") {
        match val.parse() {
            Ok(layer) => config.routing.default_layer = layer,
            Err(e) => warn!("Ignoring SWITCHBOARD_ROUTING__DEFAULT_LAYER: {}", e),
        }
    }
    if let Ok(val) = std::env::var("SWITCHBOARD_ROUTING__DEFAULT_CLI_PROVIDER") {
        let val = val.trim().to_lowercase();
        config.routing.default_cli_provider = if val.is_empty() { None } else { Some(val) };
    }
    if let Ok(val) = std::env::var("SWITCHBOARD_ROUTING__USE_AI_INTENT_CLASSIFICATION") {
        config.routing.use_ai_intent_classification = parse_bool(&val);
    }
    if let Ok(val) = std::env::var("SWITCHBOARD_ROUTING__FALLBACK") {
        match val.trim().to_lowercase().as_str() {
            "strict" => config.routing.fallback = FallbackPolicy::Strict,
            "chain" => config.routing.fallback = FallbackPolicy::Chain,
            other => warn!("Ignoring SWITCHBOARD_ROUTING__FALLBACK={}", other),
        }
    }
    if let Ok(val) = std::env::var("SWITCHBOARD_ROUTING__RESPONSE_LANGUAGE") {
        config.routing.response_language = if val.trim().is_empty() { None } else { Some(val) };
    }

    // Sessions
    if let Ok(val) = std::env::var("SWITCHBOARD_SESSIONS__STORAGE_PATH") {
        config.sessions.storage_path = val;
    }
    if let Some(n) = env_number("SWITCHBOARD_SESSIONS__MAX_MESSAGES") {
        config.sessions.max_messages = n;
    }
    if let Some(n) = env_number("SWITCHBOARD_SESSIONS__TIMEOUT_SECS") {
        config.sessions.timeout_secs = n;
    }
    if let Some(n) = env_number("SWITCHBOARD_SESSIONS__LOCK_TIMEOUT_SECS") {
        config.sessions.lock_timeout_secs = n;
    }
    if let Some(n) = env_number("SWITCHBOARD_SESSIONS__SWEEP_INTERVAL_SECS") {
        config.sessions.sweep_interval_secs = n;
    }

    // Dedup
    if let Some(n) = env_number("SWITCHBOARD_DEDUP__CAPACITY") {
        config.dedup.capacity = n;
    }

    // Executors
    if let Ok(val) = std::env::var("SWITCHBOARD_EXECUTORS__METADATA_PATH") {
        config.executors.metadata_path = if val.trim().is_empty() { None } else { Some(val) };
    }

    config
}

/// A numeric override, or `None` if unset. Unparsable values are logged and ignored.
fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let val = std::env::var(key).ok()?;
    match val.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a number", key, val);
            None
        }
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionLayer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.sessions.max_messages, 50);
        assert_eq!(config.dedup.capacity, 1000);
    }

    #[test]
    fn test_routing_and_sessions_from_file() {
        let file = write_temp_json(
            r#"{
            "routing": {
                "defaultProvider": "gemini",
                "defaultCliProvider": "claude",
                "fallback": "chain"
            },
            "sessions": { "maxMessages": 20 }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.routing.default_provider, "gemini");
        assert_eq!(config.routing.default_cli_provider.as_deref(), Some("claude"));
        assert_eq!(config.routing.fallback, FallbackPolicy::Chain);
        assert_eq!(config.sessions.max_messages, 20);
        // Defaults preserved
        assert_eq!(config.sessions.timeout_secs, 86_400);
        assert_eq!(config.routing.default_layer, ExecutionLayer::Api);
    }

    #[test]
    fn test_unparsable_file_gives_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.routing.default_provider, "claude");
    }

    #[test]
    fn test_empty_object_keeps_section_defaults() {
        let file = write_temp_json("{}");
        let config = load_config_from_path(file.path());
        assert_eq!(config.sessions.lock_timeout_secs, 10);
    }

    #[test]
    fn test_load_command_executors() {
        let file = write_temp_json(
            r#"{
            "executors": {
                "commands": [
                    { "provider": "claude", "layer": "cli", "program": "claude",
                      "args": ["-p", "{prompt}"], "workingDir": "/tmp" }
                ]
            }
        }"#,
        );
        let config = load_config_from_path(file.path());
        let cmd = &config.executors.commands[0];
        assert_eq!(cmd.layer, ExecutionLayer::Cli);
        assert_eq!(cmd.args, vec!["-p", "{prompt}"]);
        assert_eq!(cmd.timeout_secs, 120);
        assert_eq!(cmd.working_dir.as_deref(), Some("/tmp"));
    }

    #[test]
    fn test_saved_config_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.routing.default_provider = "openai".to_string();
        config.sessions.max_messages = 7;

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.routing.default_provider, "openai");
        assert_eq!(reloaded.sessions.max_messages, 7);
    }

    #[test]
    fn test_saved_config_is_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw["sessions"].get("maxMessages").is_some());
        assert!(raw["sessions"].get("max_messages").is_none());
        assert_eq!(raw["routing"]["defaultLayer"], "api");
    }

    #[test]
    fn test_env_override_response_language() {
        std::env::set_var("SWITCHBOARD_ROUTING__RESPONSE_LANGUAGE", "en-US");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.routing.response_language.as_deref(), Some("en-US"));
        std::env::remove_var("SWITCHBOARD_ROUTING__RESPONSE_LANGUAGE");
    }

    #[test]
    fn test_env_override_classifier_toggle() {
        std::env::set_var("SWITCHBOARD_ROUTING__USE_AI_INTENT_CLASSIFICATION", "1");
        let config = apply_env_overrides(Config::default());
        assert!(config.routing.use_ai_intent_classification);
        std::env::remove_var("SWITCHBOARD_ROUTING__USE_AI_INTENT_CLASSIFICATION");
    }

    #[test]
    fn test_env_override_bad_layer_is_ignored() {
        std::env::set_var("SWITCHBOARD_ROUTING__DEFAULT_LAYER", "web");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.routing.default_layer, ExecutionLayer::Api);
        std::env::remove_var("SWITCHBOARD_ROUTING__DEFAULT_LAYER");
    }

    #[test]
    fn test_env_override_sweep_interval() {
        std::env::set_var("SWITCHBOARD_SESSIONS__SWEEP_INTERVAL_SECS", "60");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.sessions.sweep_interval_secs, 60);
        std::env::remove_var("SWITCHBOARD_SESSIONS__SWEEP_INTERVAL_SECS");
    }

    #[test]
    fn test_env_override_bad_number_is_ignored() {
        std::env::set_var("SWITCHBOARD_DEDUP__CAPACITY", "lots");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.dedup.capacity, 1000);
        std::env::remove_var("SWITCHBOARD_DEDUP__CAPACITY");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" YES "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }
}
