//! Executor layer for Switchboard.
//!
//! # Architecture
//!
//! - [`traits::Executor`]: the handle every backend adapter implements
//! - [`registry::ExecutorRegistry`]: `(provider, layer)` → handle + metadata, with availability caching
//! - [`error::ExecutorNotAvailable`]: the single typed failure for unknown or unready pairs
//! - [`process::ProcessExecutor`]: adapter that runs a configured external program

pub mod error;
pub mod process;
pub mod registry;
pub mod traits;

// Re-export main types for convenience
pub use error::ExecutorNotAvailable;
pub use process::ProcessExecutor;
pub use registry::ExecutorRegistry;
pub use traits::{split_provider_name, ExecuteParams, Executor};
