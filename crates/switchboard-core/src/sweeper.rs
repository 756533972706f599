//! Session sweeper: periodic archival of expired sessions.
//!
//! Runs beside the dispatcher. Each tick calls
//! [`SessionManager::cleanup_expired_sessions`] on the blocking pool, so the
//! store lock wait never stalls the async runtime. Both paths share one
//! `SessionManager`, and with it the same store lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::session::SessionManager;

/// Default interval: one hour.
pub const DEFAULT_SWEEP_INTERVAL_S: u64 = 60 * 60;

// ─────────────────────────────────────────────
// SessionSweeper
// ─────────────────────────────────────────────

/// Background task that expires idle sessions.
pub struct SessionSweeper {
    sessions: Arc<SessionManager>,
    /// Interval in seconds between sweeps.
    interval_s: u64,
    /// Shutdown signal.
    shutdown: Arc<Notify>,
}

impl SessionSweeper {
    /// Create a new sweeper. `interval_s` defaults to one hour.
    pub fn new(sessions: Arc<SessionManager>, interval_s: Option<u64>) -> Self {
        Self {
            sessions,
            interval_s: interval_s.unwrap_or(DEFAULT_SWEEP_INTERVAL_S).max(1),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run until `stop()` is called.
    pub async fn start(&self) {
        info!(interval_s = self.interval_s, "session sweeper started");

        loop {
            let sleep_duration = Duration::from_secs(self.interval_s);

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.sweep_now().await;
                }
                _ = self.shutdown.notified() => {
                    info!("session sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Stop the sweeper.
    pub fn stop(&self) {
        info!("stopping session sweeper");
        self.shutdown.notify_waiters();
    }

    /// Run one sweep immediately. Returns how many sessions were removed.
    pub async fn sweep_now(&self) -> usize {
        let sessions = self.sessions.clone();
        match tokio::task::spawn_blocking(move || sessions.cleanup_expired_sessions()).await {
            Ok(removed) => {
                if removed > 0 {
                    info!(removed, "sweep archived expired sessions");
                } else {
                    debug!("sweep: nothing expired");
                }
                removed
            }
            Err(e) => {
                error!(error = %e, "session sweep task failed");
                0
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
