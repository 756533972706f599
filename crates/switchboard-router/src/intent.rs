//! Intent classification: decide where an implicit request should go.
//!
//! The router asks an [`IntentClassifier`] for a [`RouteTarget`]. The keyword
//! heuristic is always available; an executor-backed classifier can be
//! injected to let a model make the call instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use switchboard_core::config::RoutingConfig;
use switchboard_core::types::ExecutionLayer;
use switchboard_core::utils::truncate_string;
use switchboard_executors::Executor;

use crate::parser::detect_cli_keywords;

/// Placeholder replaced by the user's message in the classifier prompt.
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// Cached classifications kept before the cache is reset.
const CLASSIFICATION_CACHE_CAPACITY: usize = 512;

/// A `(provider, layer)` pair chosen for a request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RouteTarget {
    pub provider: String,
    pub layer: ExecutionLayer,
}

impl RouteTarget {
    pub fn new(provider: impl Into<String>, layer: ExecutionLayer) -> Self {
        Self {
            provider: provider.into(),
            layer,
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.layer)
    }
}

/// Where implicit requests land once CLI intent is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteDefaults {
    pub default_provider: String,
    pub default_layer: ExecutionLayer,
    pub default_cli_provider: Option<String>,
}

impl RouteDefaults {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            default_provider: config.default_provider.clone(),
            default_layer: config.default_layer,
            default_cli_provider: config.default_cli_provider.clone(),
        }
    }

    /// CLI default provider at `cli` if `needs_cli`, else the default pair.
    pub fn target(&self, needs_cli: bool) -> RouteTarget {
        if needs_cli {
            let provider = self
                .default_cli_provider
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(&self.default_provider);
            RouteTarget::new(provider, ExecutionLayer::Cli)
        } else {
            RouteTarget::new(self.default_provider.clone(), self.default_layer)
        }
    }
}

impl Default for RouteDefaults {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}

// ─────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────

/// Strategy that maps message text to a route target.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Classify `text`.
    async fn classify(&self, text: &str) -> Result<RouteTarget>;
}

// ─────────────────────────────────────────────
// KeywordClassifier
// ─────────────────────────────────────────────

/// CLI-intent keyword heuristic. Never fails.
#[derive(Clone, Debug, Default)]
pub struct KeywordClassifier {
    defaults: RouteDefaults,
}

impl KeywordClassifier {
    pub fn new(defaults: RouteDefaults) -> Self {
        Self { defaults }
    }

    /// Synchronous form of [`IntentClassifier::classify`].
    pub fn target_for(&self, text: &str) -> RouteTarget {
        self.defaults.target(detect_cli_keywords(text))
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, text: &str) -> Result<RouteTarget> {
        Ok(self.target_for(text))
    }
}

// ─────────────────────────────────────────────
// ExecutorIntentClassifier
// ─────────────────────────────────────────────

/// What the classifier executor must answer with.
#[derive(Debug, Deserialize)]
struct ClassificationReply {
    needs_cli: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    category: Option<String>,
}

/// Asks an executor whether a message needs a CLI tool.
///
/// The prompt template is operator-supplied; its reply must contain a JSON
/// object with a boolean `needs_cli`, bare or inside a fenced block.
/// Answers are cached per message text.
pub struct ExecutorIntentClassifier {
    executor: Arc<dyn Executor>,
    prompt_template: String,
    defaults: RouteDefaults,
    cache: Mutex<HashMap<String, bool>>,
}

impl ExecutorIntentClassifier {
    pub fn new(executor: Arc<dyn Executor>, prompt_template: impl Into<String>, defaults: RouteDefaults) -> Self {
        Self {
            executor,
            prompt_template: prompt_template.into(),
            defaults,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Forget cached classifications.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn render_prompt(&self, text: &str) -> String {
        if self.prompt_template.contains(MESSAGE_PLACEHOLDER) {
            self.prompt_template.replace(MESSAGE_PLACEHOLDER, text)
        } else {
            format!("{}\n\n{}", self.prompt_template, text)
        }
    }

    fn cached(&self, text: &str) -> Option<bool> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
            .copied()
    }

    fn remember(&self, text: &str, needs_cli: bool) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.len() >= CLASSIFICATION_CACHE_CAPACITY {
            cache.clear();
        }
        cache.insert(text.to_string(), needs_cli);
    }
}

#[async_trait]
impl IntentClassifier for ExecutorIntentClassifier {
    fn name(&self) -> &str {
        "executor"
    }

    async fn classify(&self, text: &str) -> Result<RouteTarget> {
        if let Some(needs_cli) = self.cached(text) {
            debug!(needs_cli, "using cached intent classification");
            return Ok(self.defaults.target(needs_cli));
        }

        let result = self.executor.execute(&self.render_prompt(text), None, None).await;
        if !result.success {
            bail!(
                "classifier {} failed: {}",
                self.executor.provider_name(),
                result.error_text()
            );
        }

        let reply = parse_classification(&result.stdout).with_context(|| {
            format!(
                "unparsable classifier reply: {}",
                truncate_string(&result.stdout, 200)
            )
        })?;
        info!(
            needs_cli = reply.needs_cli,
            confidence = reply.confidence.unwrap_or_default(),
            category = reply.category.as_deref().unwrap_or("-"),
            "intent classified"
        );

        self.remember(text, reply.needs_cli);
        Ok(self.defaults.target(reply.needs_cli))
    }
}

/// Pull the JSON object out of a model reply.
fn extract_json(reply: &str) -> Option<&str> {
    if let Some(start) = reply.find("```json") {
        let body = &reply[start + "```json".len()..];
        let end = body.find("```").unwrap_or(body.len());
        return Some(body[..end].trim());
    }
    if let Some(start) = reply.find("```") {
        let body = &reply[start + 3..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn parse_classification(reply: &str) -> Result<ClassificationReply> {
    let json = extract_json(reply).ok_or_else(|| anyhow!("no JSON object in reply"))?;
    Ok(serde_json::from_str(json)?)
}
