//! Per-user conversation sessions with write-through JSON persistence.
//!
//! Lifecycle per user: absent → active → (rotated | expired) → archived.
//! A session rotates once it holds `max_messages` messages and expires after
//! `timeout_secs` idle seconds; either way the old session is snapshotted to
//! the archive directory before a fresh one replaces it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SessionsConfig;
use crate::types::{Message, Role, Session};
use crate::utils;

use super::commands::{self, SessionCommand, SessionCommands};
use super::store::SessionStore;

/// Default rotation threshold.
pub const DEFAULT_MAX_MESSAGES: usize = 50;
/// Default idle timeout: one day.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 86_400;
/// Default store lock acquire timeout.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

// ─────────────────────────────────────────────
// SessionInfo
// ─────────────────────────────────────────────

/// Summary of one active session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub message_count: usize,
    pub created_at: i64,
    pub last_active: i64,
    pub age_seconds: i64,
}

impl SessionInfo {
    fn of(session: &Session, now: i64) -> Self {
        Self {
            session_id: session.session_id.clone(),
            message_count: session.messages.len(),
            created_at: session.created_at,
            last_active: session.last_active,
            age_seconds: now.saturating_sub(session.created_at),
        }
    }
}

// ─────────────────────────────────────────────
// SessionManager
// ─────────────────────────────────────────────

/// Owns every user's active session.
///
/// The in-memory map is authoritative. Each mutating call rewrites the whole
/// store while holding the map's write lock, so the file never goes backwards.
/// Persistence failures are logged and retried on the next mutation.
pub struct SessionManager {
    store: SessionStore,
    max_messages: usize,
    timeout_secs: u64,
    commands: SessionCommands,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionManager {
    /// Create a manager over the store at `storage_path`, loading existing sessions.
    ///
    /// A store that can't be read (lock timeout, corrupt JSON) is logged and
    /// treated as empty.
    pub fn new(
        storage_path: impl Into<PathBuf>,
        max_messages: usize,
        timeout_secs: u64,
        lock_timeout: Duration,
    ) -> Self {
        let store = SessionStore::new(storage_path, lock_timeout);
        let sessions = match store.load() {
            Ok(sessions) => {
                info!(
                    sessions = sessions.len(),
                    "loaded sessions from {}",
                    store.path().display()
                );
                sessions
            }
            Err(e) => {
                warn!("Failed to load sessions from {}: {}", store.path().display(), e);
                HashMap::new()
            }
        };

        Self {
            store,
            max_messages: max_messages.max(1),
            timeout_secs,
            commands: SessionCommands::default(),
            sessions: RwLock::new(sessions),
        }
    }

    /// Create a manager from the `sessions` config section.
    pub fn from_config(config: &SessionsConfig) -> Self {
        Self::new(
            config.storage_path(),
            config.max_messages,
            config.timeout_secs,
            Duration::from_secs(config.lock_timeout_secs),
        )
    }

    /// Replace the session command table.
    pub fn with_commands(mut self, commands: SessionCommands) -> Self {
        self.commands = commands;
        self
    }

    pub fn commands(&self) -> &SessionCommands {
        &self.commands
    }

    pub fn storage_path(&self) -> &std::path::Path {
        self.store.path()
    }

    pub fn archive_dir(&self) -> &std::path::Path {
        self.store.archive_dir()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    // ── lifecycle ──────────────────────────────

    /// Return the user's live session, rotating or replacing it if needed.
    ///
    /// A live session gets its `last_active` refreshed. Every call persists.
    pub fn get_or_create_session(&self, user_id: &str) -> Session {
        let now = utils::unix_now();
        let mut sessions = self.write_sessions();
        let session = self.ensure_session(&mut sessions, user_id, now).clone();
        self.persist(&sessions);
        session
    }

    /// Append a message to the user's (possibly fresh) session.
    pub fn add_message(&self, user_id: &str, role: Role, content: &str) {
        let now = utils::unix_now();
        let mut sessions = self.write_sessions();
        let session = self.ensure_session(&mut sessions, user_id, now);
        session.messages.push(Message {
            role,
            content: content.to_string(),
            timestamp: now,
        });
        session.last_active = now;
        debug!(
            user_id,
            role = %role,
            messages = session.messages.len(),
            "appended message"
        );
        self.persist(&sessions);
    }

    /// Trailing `max_messages` messages (all if `None` or `Some(0)`). Empty if no session.
    pub fn get_conversation_history(&self, user_id: &str, max_messages: Option<usize>) -> Vec<Message> {
        let sessions = self.read_sessions();
        let Some(session) = sessions.get(user_id) else {
            return Vec::new();
        };
        let messages = &session.messages;
        match max_messages {
            Some(n) if n > 0 && n < messages.len() => messages[messages.len() - n..].to_vec(),
            _ => messages.clone(),
        }
    }

    /// Archive the current session (if any) and start a fresh one.
    pub fn create_new_session(&self, user_id: &str) -> Session {
        let now = utils::unix_now();
        let mut sessions = self.write_sessions();
        if let Some(old) = sessions.remove(user_id) {
            self.archive(&old, now);
        }
        let session = Session::new(user_id, now);
        info!(user_id, session_id = %session.session_id, "created new session");
        sessions.insert(user_id.to_string(), session.clone());
        self.persist(&sessions);
        session
    }

    /// Archive and drop every expired session. Returns how many were removed.
    pub fn cleanup_expired_sessions(&self) -> usize {
        let now = utils::unix_now();
        let mut sessions = self.write_sessions();

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(self.timeout_secs, now))
            .map(|(user_id, _)| user_id.clone())
            .collect();

        for user_id in &expired {
            if let Some(old) = sessions.remove(user_id) {
                self.archive(&old, now);
            }
        }

        if !expired.is_empty() {
            info!(removed = expired.len(), "cleaned up expired sessions");
            self.persist(&sessions);
        }
        expired.len()
    }

    // ── inspection ─────────────────────────────

    /// Summary of the user's session, or `None` if there is none.
    pub fn get_session_info(&self, user_id: &str) -> Option<SessionInfo> {
        let now = utils::unix_now();
        self.read_sessions()
            .get(user_id)
            .map(|s| SessionInfo::of(s, now))
    }

    /// All active sessions, most recently active first.
    pub fn list_sessions(&self) -> Vec<(String, SessionInfo)> {
        let now = utils::unix_now();
        let mut out: Vec<(String, SessionInfo)> = self
            .read_sessions()
            .iter()
            .map(|(user_id, s)| (user_id.clone(), SessionInfo::of(s, now)))
            .collect();
        out.sort_by(|a, b| b.1.last_active.cmp(&a.1.last_active).then(a.0.cmp(&b.0)));
        out
    }

    /// Render recent history as a context block for a model prompt.
    ///
    /// Empty string when there is no history.
    pub fn format_history_for_ai(&self, user_id: &str, max_messages: Option<usize>) -> String {
        format_history(&self.get_conversation_history(user_id, max_messages))
    }

    // ── session commands ───────────────────────

    /// Which session command `text` is, if any.
    pub fn session_command(&self, text: &str) -> Option<SessionCommand> {
        self.commands.parse(text)
    }

    /// `true` iff the trimmed, case-folded text is exactly a command alias.
    pub fn is_session_command(&self, text: &str) -> bool {
        self.session_command(text).is_some()
    }

    /// Run a session command and return its reply, or `None` if `text` isn't one.
    pub fn handle_session_command(&self, user_id: &str, text: &str) -> Option<String> {
        let command = self.session_command(text)?;
        debug!(user_id, ?command, "handling session command");

        let reply = match command {
            SessionCommand::Help => self.commands.help_text.clone(),
            SessionCommand::New => {
                self.create_new_session(user_id);
                commands::NEW_SESSION_REPLY.to_string()
            }
            SessionCommand::Info => commands::render_info(self.get_session_info(user_id).as_ref()),
            SessionCommand::History => {
                commands::render_history(&self.get_conversation_history(user_id, None))
            }
        };
        Some(reply)
    }

    // ── internals ──────────────────────────────

    /// Ensure a live session for `user_id` in `sessions`, archiving a stale one.
    fn ensure_session<'a>(
        &self,
        sessions: &'a mut HashMap<String, Session>,
        user_id: &str,
        now: i64,
    ) -> &'a mut Session {
        let stale = match sessions.get(user_id) {
            Some(s) if s.is_expired(self.timeout_secs, now) => {
                info!(user_id, session_id = %s.session_id, "session expired");
                true
            }
            Some(s) if s.needs_rotation(self.max_messages) => {
                info!(
                    user_id,
                    session_id = %s.session_id,
                    messages = s.messages.len(),
                    "session reached message limit, rotating"
                );
                true
            }
            Some(_) => false,
            None => true,
        };

        if stale {
            if let Some(old) = sessions.remove(user_id) {
                self.archive(&old, now);
            }
            let fresh = Session::new(user_id, now);
            debug!(user_id, session_id = %fresh.session_id, "created session");
            sessions.insert(user_id.to_string(), fresh);
        }

        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id, now));
        if !stale {
            session.last_active = now;
        }
        session
    }

    fn archive(&self, session: &Session, now: i64) {
        if let Err(e) = self.store.archive(session, now) {
            warn!(
                user_id = %session.user_id,
                session_id = %session.session_id,
                "Failed to archive session: {}",
                e
            );
        }
    }

    fn persist(&self, sessions: &HashMap<String, Session>) {
        if let Err(e) = self.store.save(sessions) {
            warn!("Failed to persist sessions to {}: {}", self.store.path().display(), e);
        }
    }

    fn read_sessions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `"Previous conversation:\nUser: ...\nAssistant: ..."`, or `""` for no messages.
pub fn format_history(messages: &[Message]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let mut out = String::from("Previous conversation:");
    for msg in messages {
        let label = match msg.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        out.push('\n');
        out.push_str(label);
        out.push_str(": ");
        out.push_str(&msg.content);
    }
    out
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::FileLock;
    use std::fs;
    use tempfile::tempdir;

    fn make_manager_with(max_messages: usize, timeout_secs: u64) -> (SessionManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mgr = SessionManager::new(
            dir.path().join("sessions.json"),
            max_messages,
            timeout_secs,
            Duration::from_secs(2),
        );
        (mgr, dir)
    }

    fn make_manager() -> (SessionManager, tempfile::TempDir) {
        make_manager_with(DEFAULT_MAX_MESSAGES, DEFAULT_SESSION_TIMEOUT_SECS)
    }

    fn archived_files(mgr: &SessionManager) -> Vec<PathBuf> {
        match fs::read_dir(mgr.archive_dir()) {
            Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_get_or_create_new_session() {
        let (mgr, _dir) = make_manager();
        let session = mgr.get_or_create_session("u1");
        assert_eq!(session.user_id, "u1");
        assert!(session.messages.is_empty());
        assert_eq!(session.created_at, session.last_active);
    }

    #[test]
    fn test_get_or_create_returns_same_session() {
        let (mgr, _dir) = make_manager();
        let a = mgr.get_or_create_session("u1");
        let b = mgr.get_or_create_session("u1");
        assert_eq!(a.session_id, b.session_id);
    }

    #[test]
    fn test_add_message_and_history() {
        let (mgr, _dir) = make_manager();
        mgr.add_message("u1", Role::User, "hello");
        mgr.add_message("u1", Role::Assistant, "hi there!");

        let history = mgr.get_conversation_history("u1", None);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn test_history_trailing_window() {
        let (mgr, _dir) = make_manager();
        for i in 0..10 {
            mgr.add_message("u1", Role::User, &format!("msg {i}"));
        }

        let history = mgr.get_conversation_history("u1", Some(3));
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 7", "msg 8", "msg 9"]);

        assert_eq!(mgr.get_conversation_history("u1", Some(50)).len(), 10);
        // Zero means no limit.
        assert_eq!(mgr.get_conversation_history("u1", Some(0)).len(), 10);
    }

    #[test]
    fn test_unbounded_timeout_keeps_session() {
        let (mgr, _dir) = make_manager_with(50, u64::MAX);
        let first = mgr.get_or_create_session("u1");
        mgr.add_message("u1", Role::User, "hello");
        let second = mgr.get_or_create_session("u1");
        assert_eq!(first.session_id, second.session_id);
        assert_eq!(mgr.get_conversation_history("u1", None).len(), 1);
        assert!(archived_files(&mgr).is_empty());
    }

    #[test]
    fn test_history_for_unknown_user_is_empty() {
        let (mgr, _dir) = make_manager();
        assert!(mgr.get_conversation_history("nobody", None).is_empty());
        assert!(mgr.get_session_info("nobody").is_none());
    }

    #[test]
    fn test_users_are_isolated() {
        let (mgr, _dir) = make_manager();
        mgr.add_message("alice", Role::User, "a");
        mgr.add_message("bob", Role::User, "b");
        assert_eq!(mgr.get_conversation_history("alice", None)[0].content, "a");
        assert_eq!(mgr.get_conversation_history("bob", None)[0].content, "b");
    }

    #[test]
    fn test_rotation_archives_previous_session() {
        let (mgr, _dir) = make_manager_with(5, DEFAULT_SESSION_TIMEOUT_SECS);
        for i in 0..5 {
            mgr.add_message("u1", Role::User, &format!("m{i}"));
        }
        let before = mgr.get_or_create_session("u1");
        assert_eq!(before.messages.len(), 5);
        assert!(archived_files(&mgr).is_empty());

        mgr.add_message("u1", Role::User, "m5");

        let after = mgr.get_or_create_session("u1");
        assert_ne!(after.session_id, before.session_id);
        assert_eq!(after.messages.len(), 1);
        assert_eq!(after.messages[0].content, "m5");

        let archives = archived_files(&mgr);
        assert_eq!(archives.len(), 1);
        let name = archives[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("u1_{}_", before.session_id)));

        let content = fs::read_to_string(&archives[0]).unwrap();
        assert_eq!(content, serde_json::to_string_pretty(&before).unwrap());
    }

    #[test]
    fn test_expired_session_is_replaced() {
        let (mgr, _dir) = make_manager_with(DEFAULT_MAX_MESSAGES, 1);
        mgr.add_message("u1", Role::User, "old");
        let old = mgr.get_or_create_session("u1");

        std::thread::sleep(Duration::from_millis(2100));

        let fresh = mgr.get_or_create_session("u1");
        assert_ne!(fresh.session_id, old.session_id);
        assert!(fresh.messages.is_empty());

        let archives = archived_files(&mgr);
        assert_eq!(archives.len(), 1);
        let restored: Session = serde_json::from_str(&fs::read_to_string(&archives[0]).unwrap()).unwrap();
        assert_eq!(restored.session_id, old.session_id);
    }

    #[test]
    fn test_cleanup_expired_sessions() {
        let (mgr, _dir) = make_manager_with(DEFAULT_MAX_MESSAGES, 1);
        mgr.add_message("a", Role::User, "1");
        mgr.add_message("b", Role::User, "2");
        assert_eq!(mgr.cleanup_expired_sessions(), 0);

        std::thread::sleep(Duration::from_millis(2100));

        assert_eq!(mgr.cleanup_expired_sessions(), 2);
        assert!(mgr.list_sessions().is_empty());
        assert_eq!(archived_files(&mgr).len(), 2);
        assert_eq!(mgr.cleanup_expired_sessions(), 0);
    }

    #[test]
    fn test_create_new_session_archives_current() {
        let (mgr, _dir) = make_manager();
        mgr.add_message("u1", Role::User, "hello");
        let old = mgr.get_or_create_session("u1");

        let fresh = mgr.create_new_session("u1");
        assert_ne!(fresh.session_id, old.session_id);
        assert!(mgr.get_conversation_history("u1", None).is_empty());
        assert_eq!(archived_files(&mgr).len(), 1);
    }

    #[test]
    fn test_create_new_session_without_existing() {
        let (mgr, _dir) = make_manager();
        mgr.create_new_session("u1");
        assert!(archived_files(&mgr).is_empty());
        assert!(mgr.get_session_info("u1").is_some());
    }

    #[test]
    fn test_persistence_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let session_id = {
            let mgr = SessionManager::new(&path, 50, 3600, Duration::from_secs(2));
            mgr.add_message("u1", Role::User, "remember me");
            mgr.get_or_create_session("u1").session_id
        };

        let mgr = SessionManager::new(&path, 50, 3600, Duration::from_secs(2));
        let info = mgr.get_session_info("u1").unwrap();
        assert_eq!(info.session_id, session_id);
        assert_eq!(mgr.get_conversation_history("u1", None)[0].content, "remember me");
    }

    #[test]
    fn test_lock_timeout_keeps_memory_authoritative() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let mgr = SessionManager::new(&path, 50, 3600, Duration::from_millis(100));
        mgr.add_message("u1", Role::User, "first");

        {
            let _held = FileLock::acquire(&dir.path().join("sessions.json.lock"), Duration::from_secs(1)).unwrap();
            mgr.add_message("u1", Role::User, "while locked");
            assert_eq!(mgr.get_conversation_history("u1", None).len(), 2);
        }

        // Next mutation writes the full in-memory map.
        mgr.add_message("u1", Role::User, "after");
        let reloaded = SessionManager::new(&path, 50, 3600, Duration::from_secs(1));
        let contents: Vec<String> = reloaded
            .get_conversation_history("u1", None)
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "while locked", "after"]);
    }

    #[test]
    fn test_corrupt_store_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "garbage").unwrap();
        let mgr = SessionManager::new(&path, 50, 3600, Duration::from_secs(1));
        assert!(mgr.list_sessions().is_empty());
    }

    #[test]
    fn test_session_info() {
        let (mgr, _dir) = make_manager();
        mgr.add_message("u1", Role::User, "x");
        mgr.add_message("u1", Role::Assistant, "y");
        let info = mgr.get_session_info("u1").unwrap();
        assert_eq!(info.message_count, 2);
        assert!(info.age_seconds >= 0);
    }

    #[test]
    fn test_session_info_age_saturates() {
        let session = Session {
            created_at: i64::MIN,
            ..Session::new("u1", 0)
        };
        let info = SessionInfo::of(&session, i64::MAX);
        assert_eq!(info.age_seconds, i64::MAX);
    }

    #[test]
    fn test_format_history_for_ai() {
        let (mgr, _dir) = make_manager();
        assert_eq!(mgr.format_history_for_ai("u1", None), "");

        mgr.add_message("u1", Role::User, "What is Rust?");
        mgr.add_message("u1", Role::Assistant, "A language.");
        assert_eq!(
            mgr.format_history_for_ai("u1", None),
            "Previous conversation:\nUser: What is Rust?\nAssistant: A language."
        );
        assert_eq!(
            mgr.format_history_for_ai("u1", Some(1)),
            "Previous conversation:\nAssistant: A language."
        );
    }

    #[test]
    fn test_list_sessions() {
        let (mgr, _dir) = make_manager();
        mgr.add_message("a", Role::User, "1");
        mgr.add_message("b", Role::User, "2");
        let users: Vec<String> = mgr.list_sessions().into_iter().map(|(u, _)| u).collect();
        assert_eq!(users.len(), 2);
        assert!(users.contains(&"a".to_string()));
        assert!(users.contains(&"b".to_string()));
    }

    #[test]
    fn test_is_session_command() {
        let (mgr, _dir) = make_manager();
        assert!(mgr.is_session_command("/new"));
        assert!(mgr.is_session_command(" 帮助 "));
        assert!(!mgr.is_session_command("/newer"));
        assert!(!mgr.is_session_command("tell me about /new"));
    }

    #[test]
    fn test_handle_new_command() {
        let (mgr, _dir) = make_manager();
        mgr.add_message("u1", Role::User, "old");
        let reply = mgr.handle_session_command("u1", "/new").unwrap();
        assert_eq!(reply, commands::NEW_SESSION_REPLY);
        assert!(mgr.get_conversation_history("u1", None).is_empty());
    }

    #[test]
    fn test_handle_info_and_history_commands() {
        let (mgr, _dir) = make_manager();
        assert_eq!(
            mgr.handle_session_command("u1", "/session").unwrap(),
            commands::NO_SESSION_REPLY
        );
        assert_eq!(
            mgr.handle_session_command("u1", "历史记录").unwrap(),
            commands::NO_HISTORY_REPLY
        );

        mgr.add_message("u1", Role::User, "hello");
        let info = mgr.handle_session_command("u1", "会话信息").unwrap();
        assert!(info.contains("Messages: 1"));
        let history = mgr.handle_session_command("u1", "/HISTORY").unwrap();
        assert!(history.contains("1. 👤 User: hello"));
    }

    #[test]
    fn test_handle_help_and_non_command() {
        let (mgr, _dir) = make_manager();
        let help = mgr.handle_session_command("u1", "help").unwrap();
        assert_eq!(help, mgr.commands().help_text);
        assert!(mgr.handle_session_command("u1", "hello").is_none());
        // Help never creates a session.
        assert!(mgr.get_session_info("u1").is_none());
    }

    #[test]
    fn test_custom_command_table() {
        let dir = tempdir().unwrap();
        let mut table = SessionCommands::default();
        table.new.push("/reset".into());
        let mgr = SessionManager::new(dir.path().join("s.json"), 50, 3600, Duration::from_secs(1))
            .with_commands(table);
        assert!(mgr.is_session_command("/RESET"));
    }
}
