//! Session manager: in-memory map + write-through JSON store + archive.
//!
//! # Disk format
//!
//! - Store: one JSON document `{"sessions": {"<user_id>": Session}}` at the
//!   configured path (default `~/.switchboard/data/sessions.json`), guarded by
//!   the advisory lock `<store>.lock`.
//! - Archive: one JSON document per retired session under
//!   `<store dir>/archived_sessions/{user}_{session_id}_{unix_ts}.json`.

pub mod commands;
pub mod manager;
pub mod store;

pub use commands::{SessionCommand, SessionCommands};
pub use manager::{format_history, SessionInfo, SessionManager};
pub use store::{FileLock, SessionStore, StoreError};
