//! Smart router: pick the executor for a parsed command.
//!
//! Explicit prefixes are authoritative. Implicit requests go through the
//! intent classifier (keyword heuristic unless an executor-backed one is
//! enabled). Substituting another executor for an unavailable one happens
//! only under [`FallbackPolicy::Chain`], only for implicit requests, and is
//! always logged.

use std::sync::Arc;

use tracing::{debug, info, warn};

use switchboard_core::config::{FallbackPolicy, RoutingConfig};
use switchboard_core::types::ParsedCommand;
use switchboard_core::utils::truncate_string;
use switchboard_executors::{Executor, ExecutorNotAvailable, ExecutorRegistry};

use crate::intent::{IntentClassifier, KeywordClassifier, RouteDefaults, RouteTarget};

/// Router settings, derived from the `routing` config section.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub defaults: RouteDefaults,
    /// Consult the injected classifier for implicit requests.
    pub use_ai_intent_classification: bool,
    pub fallback: FallbackPolicy,
    /// Providers tried, in order, under [`FallbackPolicy::Chain`].
    pub fallback_providers: Vec<String>,
}

impl RouterConfig {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            defaults: RouteDefaults::from_config(config),
            use_ai_intent_classification: config.use_ai_intent_classification,
            fallback: config.fallback,
            fallback_providers: config.fallback_providers.clone(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}

/// A resolved route.
#[derive(Clone)]
pub struct Route {
    /// The pair that will answer.
    pub target: RouteTarget,
    /// The pair routing asked for before any fallback.
    pub preferred: RouteTarget,
    pub executor: Arc<dyn Executor>,
}

impl Route {
    /// Whether a fallback substituted a different pair.
    pub fn is_fallback(&self) -> bool {
        self.target != self.preferred
    }
}

// ─────────────────────────────────────────────
// SmartRouter
// ─────────────────────────────────────────────

pub struct SmartRouter {
    registry: Arc<ExecutorRegistry>,
    config: RouterConfig,
    keywords: KeywordClassifier,
    classifier: Option<Arc<dyn IntentClassifier>>,
}

impl SmartRouter {
    pub fn new(registry: Arc<ExecutorRegistry>, config: RouterConfig) -> Self {
        info!(
            default_provider = %config.defaults.default_provider,
            default_layer = %config.defaults.default_layer,
            default_cli_provider = config.defaults.default_cli_provider.as_deref().unwrap_or("-"),
            fallback = ?config.fallback,
            "smart router initialized"
        );
        Self {
            keywords: KeywordClassifier::new(config.defaults.clone()),
            registry,
            config,
            classifier: None,
        }
    }

    /// Inject the classifier used when AI intent classification is enabled.
    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The executor that should answer `parsed`.
    pub async fn route(&self, parsed: &ParsedCommand) -> Result<Arc<dyn Executor>, ExecutorNotAvailable> {
        Ok(self.resolve(parsed).await?.executor)
    }

    /// Like [`route`](Self::route), but also reports which pair was chosen.
    pub async fn resolve(&self, parsed: &ParsedCommand) -> Result<Route, ExecutorNotAvailable> {
        let preview = truncate_string(&parsed.message, 50);

        if parsed.explicit {
            let target = RouteTarget::new(parsed.provider.clone(), parsed.execution_layer);
            info!(target = %target, "routing explicit request");
            debug!(message = %preview, "explicit request");
            let executor = self
                .registry
                .get_executor(&target.provider, target.layer)
                .inspect_err(|e| warn!(reason = %e.reason, "explicit executor {} unavailable", target))?;
            return Ok(Route {
                preferred: target.clone(),
                target,
                executor,
            });
        }

        let preferred = self.implicit_target(&parsed.message).await;
        info!(target = %preferred, "routing implicit request");
        debug!(message = %preview, "implicit request");

        let first_err = match self.registry.get_executor(&preferred.provider, preferred.layer) {
            Ok(executor) => {
                return Ok(Route {
                    target: preferred.clone(),
                    preferred,
                    executor,
                })
            }
            Err(e) => e,
        };

        if self.config.fallback == FallbackPolicy::Strict {
            warn!(reason = %first_err.reason, "executor {} unavailable", preferred);
            return Err(first_err);
        }

        for candidate in self.fallback_candidates(&preferred) {
            if let Ok(executor) = self.registry.get_executor(&candidate.provider, candidate.layer) {
                warn!(
                    preferred = %preferred,
                    substitute = %candidate,
                    reason = %first_err.reason,
                    "falling back to another executor"
                );
                return Ok(Route {
                    target: candidate,
                    preferred,
                    executor,
                });
            }
        }

        warn!(reason = %first_err.reason, "no fallback available for {}", preferred);
        Err(first_err)
    }

    /// Target for an implicit request.
    ///
    /// Uses the injected classifier when enabled, falling back to the
    /// keyword heuristic if it fails.
    pub async fn implicit_target(&self, text: &str) -> RouteTarget {
        if self.config.use_ai_intent_classification {
            if let Some(classifier) = &self.classifier {
                match classifier.classify(text).await {
                    Ok(target) => {
                        debug!(classifier = classifier.name(), target = %target, "intent classified");
                        return target;
                    }
                    Err(e) => warn!(
                        classifier = classifier.name(),
                        "intent classification failed, using keywords: {:#}", e
                    ),
                }
            }
        }
        self.keywords.target_for(text)
    }

    /// Substitutes tried after `preferred`, in order, without repeats.
    fn fallback_candidates(&self, preferred: &RouteTarget) -> Vec<RouteTarget> {
        let other = preferred.layer.other();
        let mut out: Vec<RouteTarget> = vec![RouteTarget::new(preferred.provider.clone(), other)];
        for layer in [preferred.layer, other] {
            for provider in &self.config.fallback_providers {
                out.push(RouteTarget::new(provider.clone(), layer));
            }
        }

        let mut seen = vec![preferred.clone()];
        out.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(t.clone());
                true
            }
        });
        out
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
