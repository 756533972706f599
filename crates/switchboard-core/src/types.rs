//! Core types for Switchboard: conversation records, parsed commands,
//! executor metadata, and execution results.
//!
//! These are shared by every crate in the workspace. Timestamps are unix
//! seconds (`i64`) so the on-disk session store stays a plain JSON document.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Conversation messages
// ─────────────────────────────────────────────

/// Who authored a message in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// A single message in a session. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Unix seconds.
    pub timestamp: i64,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: crate::utils::unix_now(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// ─────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────

/// One user's active conversation.
///
/// The serialized shape is shared by the session store and archive files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque unique id (UUID v4).
    pub session_id: String,
    pub user_id: String,
    pub created_at: i64,
    pub last_active: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session for `user_id`, created and last active at `now`.
    pub fn new(user_id: impl Into<String>, now: i64) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            created_at: now,
            last_active: now,
            messages: Vec::new(),
        }
    }

    /// Idle for strictly longer than `timeout_secs`.
    pub fn is_expired(&self, timeout_secs: u64, now: i64) -> bool {
        let timeout = i64::try_from(timeout_secs).unwrap_or(i64::MAX);
        now.saturating_sub(self.last_active) > timeout
    }

    /// Message count has reached the rotation threshold.
    pub fn needs_rotation(&self, max_messages: usize) -> bool {
        self.messages.len() >= max_messages
    }
}

// ─────────────────────────────────────────────
// Execution layer
// ─────────────────────────────────────────────

/// How a provider is reached: direct vendor API, or an external CLI tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionLayer {
    Api,
    Cli,
}

impl ExecutionLayer {
    /// Both layers, `Api` first.
    pub const ALL: [ExecutionLayer; 2] = [ExecutionLayer::Api, ExecutionLayer::Cli];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionLayer::Api => "api",
            ExecutionLayer::Cli => "cli",
        }
    }

    /// The layer that is not `self`.
    pub fn other(&self) -> ExecutionLayer {
        match self {
            ExecutionLayer::Api => ExecutionLayer::Cli,
            ExecutionLayer::Cli => ExecutionLayer::Api,
        }
    }
}

impl fmt::Display for ExecutionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is neither `api` nor `cli`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown execution layer '{0}' (expected 'api' or 'cli')")]
pub struct ParseLayerError(pub String);

impl FromStr for ExecutionLayer {
    type Err = ParseLayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(ExecutionLayer::Api),
            "cli" => Ok(ExecutionLayer::Cli),
            _ => Err(ParseLayerError(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────
// Parsed command
// ─────────────────────────────────────────────

/// Result of parsing one inbound message. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub provider: String,
    pub execution_layer: ExecutionLayer,
    /// Text with the recognized prefix stripped (or the raw text if none).
    pub message: String,
    /// `true` when the user named the target with a prefix.
    pub explicit: bool,
}

// ─────────────────────────────────────────────
// Executor metadata
// ─────────────────────────────────────────────

/// Descriptive metadata for one `(provider, layer)` executor.
///
/// May exist without a registered handle (e.g. loaded from a bootstrap file).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorMetadata {
    pub name: String,
    pub provider: String,
    pub layer: ExecutionLayer,
    pub version: String,
    pub description: String,
    pub capabilities: BTreeSet<String>,
    pub command_prefixes: Vec<String>,
    /// Lower value means higher priority.
    pub priority: i32,
    pub config_required: Vec<String>,
}

impl ExecutorMetadata {
    pub const DEFAULT_VERSION: &'static str = "1.0.0";
    pub const DEFAULT_PRIORITY: i32 = 10;

    /// Metadata with every optional field at its default.
    pub fn new(provider: impl Into<String>, layer: ExecutionLayer) -> Self {
        let provider = provider.into();
        Self {
            name: format!("{provider} {layer}"),
            provider,
            layer,
            version: Self::DEFAULT_VERSION.to_string(),
            description: String::new(),
            capabilities: BTreeSet::new(),
            command_prefixes: Vec::new(),
            priority: Self::DEFAULT_PRIORITY,
            config_required: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config_required(mut self, keys: Vec<String>) -> Self {
        self.config_required = keys;
        self
    }
}

// ─────────────────────────────────────────────
// Execution result
// ─────────────────────────────────────────────

/// What an executor reports back for one `execute` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub error_message: Option<String>,
    /// Wall-clock seconds spent executing.
    pub execution_time: f64,
}

impl ExecutionResult {
    /// A successful run with the given output.
    pub fn ok(stdout: impl Into<String>, execution_time: f64) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            execution_time,
            ..Default::default()
        }
    }

    /// A failed run.
    pub fn failed(error: impl Into<String>, stderr: impl Into<String>, execution_time: f64) -> Self {
        Self {
            success: false,
            stderr: stderr.into(),
            error_message: Some(error.into()),
            execution_time,
            ..Default::default()
        }
    }

    /// Best human-readable description of a failure.
    pub fn error_text(&self) -> String {
        match &self.error_message {
            Some(msg) if !msg.is_empty() => msg.clone(),
            _ if !self.stderr.is_empty() => self.stderr.clone(),
            _ => "unknown error".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let msg = Message {
            role: Role::Assistant,
            content: "hi".into(),
            timestamp: 42,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
        assert_eq!(json["timestamp"], 42);
    }

    #[test]
    fn test_session_expiry_is_strict() {
        let session = Session::new("u1", 1_000);
        assert!(!session.is_expired(10, 1_010));
        assert!(session.is_expired(10, 1_011));
    }

    #[test]
    fn test_session_expiry_with_huge_timeout() {
        let session = Session::new("u1", 1_000);
        assert!(!session.is_expired(u64::MAX, 1_000));
        assert!(!session.is_expired(u64::MAX, i64::MAX));

        let ancient = Session {
            last_active: i64::MIN,
            ..Session::new("u1", 0)
        };
        assert!(ancient.is_expired(10, i64::MAX));
    }

    #[test]
    fn test_session_rotation_threshold() {
        let mut session = Session::new("u1", 0);
        for i in 0..4 {
            session.messages.push(Message::user(format!("m{i}")));
        }
        assert!(!session.needs_rotation(5));
        session.messages.push(Message::user("m4"));
        assert!(session.needs_rotation(5));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = Session::new("u1", 0);
        let b = Session::new("u1", 0);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_layer_parse_and_display() {
        assert_eq!("API".parse::<ExecutionLayer>().unwrap(), ExecutionLayer::Api);
        assert_eq!(" cli ".parse::<ExecutionLayer>().unwrap(), ExecutionLayer::Cli);
        assert!("web".parse::<ExecutionLayer>().is_err());
        assert_eq!(ExecutionLayer::Cli.to_string(), "cli");
        assert_eq!(ExecutionLayer::Api.other(), ExecutionLayer::Cli);
    }

    #[test]
    fn test_metadata_defaults() {
        let meta = ExecutorMetadata::new("gemini", ExecutionLayer::Api);
        assert_eq!(meta.name, "gemini api");
        assert_eq!(meta.version, "1.0.0");
        assert_eq!(meta.priority, 10);
        assert!(meta.capabilities.is_empty());
        assert!(meta.config_required.is_empty());
    }

    #[test]
    fn test_execution_result_error_text() {
        let r = ExecutionResult::failed("boom", "", 0.1);
        assert!(!r.success);
        assert_eq!(r.error_text(), "boom");

        let r = ExecutionResult {
            stderr: "stderr only".into(),
            ..Default::default()
        };
        assert_eq!(r.error_text(), "stderr only");

        let r = ExecutionResult::ok("fine", 0.0);
        assert!(r.success);
        assert_eq!(r.stdout, "fine");
    }
}
