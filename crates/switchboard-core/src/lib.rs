//! Switchboard core: shared types, configuration, message dedup, the
//! session store, the inbound/outbound bus, and the session expiry sweeper.

pub mod bus;
pub mod config;
pub mod dedup;
pub mod session;
pub mod sweeper;
pub mod types;
pub mod utils;

pub use dedup::DeduplicationCache;
pub use session::SessionManager;
