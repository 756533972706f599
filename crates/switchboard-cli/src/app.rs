//! Wiring: turn a loaded [`Config`] into a registry, router, and dispatcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use switchboard_core::config::{load_config, Config};
use switchboard_core::utils::expand_home;
use switchboard_core::SessionManager;
use switchboard_executors::{ExecutorRegistry, ProcessExecutor};
use switchboard_router::{
    Dispatcher, ExecutorIntentClassifier, RouteDefaults, RouterConfig, SmartRouter,
};

/// Load the config from `path` (or the default location) and validate it.
pub fn load_checked_config(path: Option<&Path>) -> Result<Config> {
    let config = load_config(path);
    config.validate()?;
    Ok(config)
}

/// Registry with bootstrap metadata and every configured process executor.
pub fn build_registry(config: &Config) -> Result<ExecutorRegistry> {
    let metadata_path: Option<PathBuf> = config
        .executors
        .metadata_path
        .as_deref()
        .map(expand_home);
    let mut registry = ExecutorRegistry::with_metadata_file(metadata_path.as_deref());

    for cmd in &config.executors.commands {
        let executor = ProcessExecutor::from_config(cmd)
            .with_context(|| format!("invalid executor command for {}/{}", cmd.provider, cmd.layer))?;

        // Bootstrap metadata wins over what the command can describe itself.
        let metadata = registry
            .get_executor_metadata(&cmd.provider, cmd.layer)
            .is_none()
            .then(|| executor.metadata());
        registry.register(&cmd.provider, cmd.layer, Arc::new(executor), metadata);
    }

    if registry.is_empty() {
        warn!("no executors configured; add entries under executors.commands");
    }
    Ok(registry)
}

/// Router over `registry`, with the executor-backed classifier if enabled.
pub fn build_router(config: &Config, registry: Arc<ExecutorRegistry>) -> SmartRouter {
    let routing = &config.routing;
    let mut router = SmartRouter::new(registry.clone(), RouterConfig::from_config(routing));

    if !routing.use_ai_intent_classification {
        return router;
    }
    let Some(classifier) = routing.classifier.as_ref().filter(|c| !c.prompt_template.is_empty()) else {
        warn!("AI intent classification enabled without routing.classifier.promptTemplate; using keywords");
        return router;
    };
    match registry.get_executor(&classifier.provider, classifier.layer) {
        Ok(executor) => {
            info!(
                provider = %classifier.provider,
                layer = %classifier.layer,
                "intent classifier enabled"
            );
            router = router.with_classifier(Arc::new(ExecutorIntentClassifier::new(
                executor,
                classifier.prompt_template.clone(),
                RouteDefaults::from_config(routing),
            )));
        }
        Err(e) => warn!("intent classifier unavailable, using keywords: {}", e),
    }
    router
}

/// Everything needed to answer messages.
pub fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let registry = Arc::new(build_registry(config)?);
    let router = build_router(config, registry);
    let sessions = Arc::new(SessionManager::from_config(&config.sessions));
    Ok(Dispatcher::from_config(config, router, sessions))
}

/// Fresh id for a message typed locally.
pub fn new_message_id() -> String {
    format!("local-{}", uuid::Uuid::new_v4())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::config::{ClassifierConfig, CommandExecutorConfig};
    use switchboard_core::types::ExecutionLayer;

    fn command(provider: &str, layer: ExecutionLayer, program: &str) -> CommandExecutorConfig {
        CommandExecutorConfig {
            provider: provider.into(),
            layer,
            program: program.into(),
            ..Default::default()
        }
    }

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.sessions.storage_path = dir.join("sessions.json").to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_load_checked_config_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"routing": {"defaultProvider": "mystery"}}"#).unwrap();
        let err = load_checked_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("defaultProvider"));
    }

    #[test]
    fn test_load_checked_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_checked_config(Some(&dir.path().join("none.json"))).unwrap();
        assert_eq!(config.routing.default_provider, "claude");
    }

    #[test]
    fn test_build_registry_registers_commands() {
        let mut config = Config::default();
        config.executors.commands = vec![
            command("claude", ExecutionLayer::Api, "echo"),
            command("gemini", ExecutionLayer::Cli, "gemini"),
        ];
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get_executor_metadata("claude", ExecutionLayer::Api).unwrap().name,
            "claude api"
        );
        assert!(registry.get_executor("gemini", ExecutionLayer::Cli).is_ok());
    }

    #[test]
    fn test_build_registry_keeps_bootstrap_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let meta = dir.path().join("executors.json");
        std::fs::write(
            &meta,
            r#"{"executors":[{"provider":"claude","layer":"api","name":"Claude API","priority":1}]}"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.executors.metadata_path = Some(meta.to_string_lossy().into_owned());
        config.executors.commands = vec![command("claude", ExecutionLayer::Api, "echo")];

        let registry = build_registry(&config).unwrap();
        let m = registry.get_executor_metadata("claude", ExecutionLayer::Api).unwrap();
        assert_eq!(m.name, "Claude API");
        assert_eq!(m.priority, 1);
    }

    #[test]
    fn test_build_registry_rejects_empty_program() {
        let mut config = Config::default();
        config.executors.commands = vec![command("claude", ExecutionLayer::Api, "")];
        assert!(build_registry(&config).is_err());
    }

    #[tokio::test]
    async fn test_build_router_without_classifier_executor() {
        let mut config = Config::default();
        config.routing.use_ai_intent_classification = true;
        config.routing.classifier = Some(ClassifierConfig {
            prompt_template: "Classify: {message}".into(),
            ..Default::default()
        });
        config.executors.commands = vec![command("claude", ExecutionLayer::Cli, "echo")];

        let registry = Arc::new(build_registry(&config).unwrap());
        let router = build_router(&config, registry);
        // Classifier executor (openai/api) is missing, so keywords decide.
        let target = router.implicit_target("查看代码").await;
        assert_eq!(target.layer, ExecutionLayer::Cli);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_dispatcher_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.executors.commands = vec![command("claude", ExecutionLayer::Api, "echo")];

        let dispatcher = build_dispatcher(&config).unwrap();
        let reply = dispatcher.handle("@claude ping", "u1", &new_message_id()).await.unwrap();
        assert_eq!(reply, "【使用 claude api 回答】\n\nping");
        assert!(dir.path().join("sessions.json").exists());
    }

    #[test]
    fn test_message_ids_are_unique() {
        assert_ne!(new_message_id(), new_message_id());
    }
}
