//! Executor registry: `(provider, layer)` → handle, plus metadata.
//!
//! Handles and metadata are two independent maps over the same key: metadata
//! can be bootstrapped from a JSON file before any handle is registered, and
//! a handle can be registered without metadata.
//!
//! Availability probes are cached per key until
//! [`clear_availability_cache`](ExecutorRegistry::clear_availability_cache).

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use switchboard_core::types::{ExecutionLayer, ExecutorMetadata};

use crate::error::ExecutorNotAvailable;
use crate::traits::Executor;

type ExecutorKey = (String, ExecutionLayer);

/// Reason given when nothing is registered for a pair.
pub const NOT_REGISTERED_REASON: &str = "Executor not registered";

// ─────────────────────────────────────────────
// Bootstrap records
// ─────────────────────────────────────────────

/// One entry of the `executors` list in a bootstrap file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataRecord {
    provider: Option<String>,
    layer: Option<String>,
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    capabilities: Option<Vec<String>>,
    command_prefixes: Option<Vec<String>>,
    priority: Option<i32>,
    config_required: Option<Vec<String>>,
}

impl MetadataRecord {
    fn into_metadata(self) -> Result<ExecutorMetadata, String> {
        let provider = self
            .provider
            .filter(|p| !p.trim().is_empty())
            .ok_or("missing provider")?;
        let layer = self
            .layer
            .filter(|l| !l.trim().is_empty())
            .ok_or("missing layer")?
            .parse::<ExecutionLayer>()
            .map_err(|e| e.to_string())?;

        let mut meta = ExecutorMetadata::new(provider, layer);
        if let Some(name) = self.name {
            meta.name = name;
        }
        if let Some(version) = self.version {
            meta.version = version;
        }
        if let Some(description) = self.description {
            meta.description = description;
        }
        if let Some(priority) = self.priority {
            meta.priority = priority;
        }
        // An explicit `null` list means the default, not a bad record.
        meta.capabilities = self.capabilities.unwrap_or_default().into_iter().collect();
        meta.command_prefixes = self.command_prefixes.unwrap_or_default();
        meta.config_required = self.config_required.unwrap_or_default();
        Ok(meta)
    }
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Directory of executor handles and their metadata.
///
/// Registration takes `&mut self` and happens at startup; lookups take
/// `&self` and may run concurrently.
pub struct ExecutorRegistry {
    api_executors: HashMap<String, Arc<dyn Executor>>,
    cli_executors: HashMap<String, Arc<dyn Executor>>,
    metadata: HashMap<ExecutorKey, ExecutorMetadata>,
    availability: RwLock<HashMap<ExecutorKey, bool>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            api_executors: HashMap::new(),
            cli_executors: HashMap::new(),
            metadata: HashMap::new(),
            availability: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry, bootstrapping metadata from `path` if given.
    ///
    /// A missing or malformed file is logged and leaves the metadata empty.
    pub fn with_metadata_file(path: Option<&Path>) -> Self {
        let mut registry = Self::new();
        if let Some(path) = path {
            registry.load_metadata_file(path);
        }
        registry
    }

    // ── bootstrap ──────────────────────────────

    /// Merge metadata records from a JSON file. Returns how many were accepted.
    pub fn load_metadata_file(&mut self, path: &Path) -> usize {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read executor metadata {}: {}", path.display(), e);
                return 0;
            }
        };
        let doc: Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to parse executor metadata {}: {}", path.display(), e);
                return 0;
            }
        };
        let loaded = self.load_metadata_value(&doc);
        info!(loaded, "loaded executor metadata from {}", path.display());
        loaded
    }

    /// Merge metadata records from `{"executors": [...]}`.
    ///
    /// Each record is accepted or skipped on its own; a record needs a
    /// non-empty `provider` and a valid `layer`.
    pub fn load_metadata_value(&mut self, doc: &Value) -> usize {
        let Some(records) = doc.get("executors").and_then(Value::as_array) else {
            warn!("executor metadata has no \"executors\" list, ignoring");
            return 0;
        };

        let mut loaded = 0;
        for (i, raw) in records.iter().enumerate() {
            let record = match MetadataRecord::deserialize(raw) {
                Ok(r) => r,
                Err(e) => {
                    warn!(index = i, "skipping executor metadata record: {}", e);
                    continue;
                }
            };
            match record.into_metadata() {
                Ok(meta) => {
                    debug!(provider = %meta.provider, layer = %meta.layer, "loaded executor metadata");
                    self.metadata
                        .insert((meta.provider.clone(), meta.layer), meta);
                    loaded += 1;
                }
                Err(reason) => warn!(index = i, "skipping executor metadata record: {}", reason),
            }
        }
        loaded
    }

    // ── registration ───────────────────────────

    /// Register (or replace) the API-layer handle for `provider`.
    pub fn register_api_executor(
        &mut self,
        provider: &str,
        executor: Arc<dyn Executor>,
        metadata: Option<ExecutorMetadata>,
    ) {
        self.register(provider, ExecutionLayer::Api, executor, metadata);
    }

    /// Register (or replace) the CLI-layer handle for `provider`.
    pub fn register_cli_executor(
        &mut self,
        provider: &str,
        executor: Arc<dyn Executor>,
        metadata: Option<ExecutorMetadata>,
    ) {
        self.register(provider, ExecutionLayer::Cli, executor, metadata);
    }

    /// Register (or replace) the handle for `(provider, layer)`. Last write wins.
    pub fn register(
        &mut self,
        provider: &str,
        layer: ExecutionLayer,
        executor: Arc<dyn Executor>,
        metadata: Option<ExecutorMetadata>,
    ) {
        let replaced = self
            .pool_mut(layer)
            .insert(provider.to_string(), executor)
            .is_some();
        if let Some(meta) = metadata {
            self.metadata.insert((provider.to_string(), layer), meta);
        }
        info!(provider, layer = %layer, replaced, "registered executor");
    }

    // ── lookup ─────────────────────────────────

    /// The handle for `(provider, layer)`, if registered and available.
    pub fn get_executor(
        &self,
        provider: &str,
        layer: ExecutionLayer,
    ) -> Result<Arc<dyn Executor>, ExecutorNotAvailable> {
        let Some(executor) = self.pool(layer).get(provider) else {
            return Err(ExecutorNotAvailable::new(provider, layer, NOT_REGISTERED_REASON));
        };

        if !self.is_executor_available(provider, layer) {
            return Err(ExecutorNotAvailable::new(
                provider,
                layer,
                self.unavailable_reason(provider, layer),
            ));
        }

        Ok(executor.clone())
    }

    /// Whether `(provider, layer)` is registered and its probe says ready.
    ///
    /// The probe runs at most once per key until the cache is cleared.
    pub fn is_executor_available(&self, provider: &str, layer: ExecutionLayer) -> bool {
        let Some(executor) = self.pool(layer).get(provider) else {
            return false;
        };

        let key = (provider.to_string(), layer);
        if let Some(&cached) = self
            .availability
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return cached;
        }

        let mut cache = self
            .availability
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another caller may have probed while we waited for the write lock.
        if let Some(&cached) = cache.get(&key) {
            return cached;
        }
        let available = executor.is_available();
        debug!(provider, layer = %layer, available, "probed executor availability");
        cache.insert(key, available);
        available
    }

    /// Forget every cached availability result.
    pub fn clear_availability_cache(&self) {
        self.availability
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("cleared executor availability cache");
    }

    /// `"provider/layer"` for every available executor, optionally on one layer.
    pub fn list_available_executors(&self, layer: Option<ExecutionLayer>) -> BTreeSet<String> {
        let layers: Vec<ExecutionLayer> = match layer {
            Some(l) => vec![l],
            None => ExecutionLayer::ALL.to_vec(),
        };

        let mut out = BTreeSet::new();
        for layer in layers {
            for provider in self.pool(layer).keys() {
                if self.is_executor_available(provider, layer) {
                    out.insert(format!("{provider}/{layer}"));
                }
            }
        }
        out
    }

    /// Metadata for `(provider, layer)`, whether or not a handle is registered.
    pub fn get_executor_metadata(&self, provider: &str, layer: ExecutionLayer) -> Option<&ExecutorMetadata> {
        self.metadata.get(&(provider.to_string(), layer))
    }

    /// Registered handles on `layer`, sorted by provider name.
    pub fn executors(&self, layer: ExecutionLayer) -> Vec<(String, Arc<dyn Executor>)> {
        let mut out: Vec<(String, Arc<dyn Executor>)> = self
            .pool(layer)
            .iter()
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// All metadata entries, sorted by priority then provider.
    pub fn all_metadata(&self) -> Vec<&ExecutorMetadata> {
        let mut out: Vec<&ExecutorMetadata> = self.metadata.values().collect();
        out.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.provider.cmp(&b.provider))
                .then_with(|| a.layer.cmp(&b.layer))
        });
        out
    }

    /// Number of registered handles across both layers.
    pub fn len(&self) -> usize {
        self.api_executors.len() + self.cli_executors.len()
    }

    /// Whether no handle is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── internals ──────────────────────────────

    fn pool(&self, layer: ExecutionLayer) -> &HashMap<String, Arc<dyn Executor>> {
        match layer {
            ExecutionLayer::Api => &self.api_executors,
            ExecutionLayer::Cli => &self.cli_executors,
        }
    }

    fn pool_mut(&mut self, layer: ExecutionLayer) -> &mut HashMap<String, Arc<dyn Executor>> {
        match layer {
            ExecutionLayer::Api => &mut self.api_executors,
            ExecutionLayer::Cli => &mut self.cli_executors,
        }
    }

    fn unavailable_reason(&self, provider: &str, layer: ExecutionLayer) -> String {
        if let Some(meta) = self.get_executor_metadata(provider, layer) {
            if !meta.config_required.is_empty() {
                return format!(
                    "Missing required configuration: {}",
                    meta.config_required.join(", ")
                );
            }
        }
        match layer {
            ExecutionLayer::Api => "API key not configured or invalid".to_string(),
            ExecutionLayer::Cli => {
                "CLI tool not installed or target directory not accessible".to_string()
            }
        }
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
