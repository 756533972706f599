//! Switchboard Router: from raw chat text to a formatted executor reply.
//!
//! This crate contains:
//! - **parser**: `@provider` prefix table and CLI-intent keyword detection
//! - **intent**: pluggable intent classifiers (keyword heuristic, executor-backed)
//! - **router**: picks the `(provider, layer)` executor for a parsed command
//! - **formatter**: labels replies with the executor's display name
//! - **dispatcher**: dedup → parse → session command → route → execute → record

pub mod dispatcher;
pub mod formatter;
pub mod intent;
pub mod parser;
pub mod router;

pub use dispatcher::Dispatcher;
pub use formatter::ResponseFormatter;
pub use intent::{ExecutorIntentClassifier, IntentClassifier, KeywordClassifier, RouteDefaults, RouteTarget};
pub use parser::{detect_cli_keywords, CommandParser};
pub use router::{Route, RouterConfig, SmartRouter};
