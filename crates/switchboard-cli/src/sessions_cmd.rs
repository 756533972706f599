//! `switchboard sessions`: inspect and maintain the session store.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use switchboard_core::config::Config;
use switchboard_core::types::Role;
use switchboard_core::SessionManager;

use crate::helpers::{format_age, format_timestamp};

#[derive(Subcommand)]
pub enum SessionsCommands {
    /// List active sessions, most recent first
    List,

    /// Archive and remove every expired session now
    Cleanup,

    /// Show one user's session and history
    Show {
        /// User identifier
        user: String,
    },
}

/// Dispatch a sessions subcommand.
pub fn dispatch(action: SessionsCommands, config: &Config) -> Result<()> {
    let sessions = SessionManager::from_config(&config.sessions);
    match action {
        SessionsCommands::List => list(&sessions),
        SessionsCommands::Cleanup => cleanup(&sessions),
        SessionsCommands::Show { user } => show(&sessions, &user),
    }
    Ok(())
}

fn list(sessions: &SessionManager) {
    let all = sessions.list_sessions();
    println!();
    println!(
        "  {} ({})",
        "Sessions".bold(),
        sessions.storage_path().display().to_string().dimmed()
    );
    println!();

    if all.is_empty() {
        println!("  {}", "· no active sessions".dimmed());
        println!();
        return;
    }

    println!(
        "  {:<24} {:<10} {:>8} {:>6}  {}",
        "USER".bold(),
        "SESSION".bold(),
        "MSGS".bold(),
        "AGE".bold(),
        "LAST ACTIVE".bold()
    );
    for (user_id, info) in &all {
        let short: String = info.session_id.chars().take(8).collect();
        println!(
            "  {:<24} {:<10} {:>8} {:>6}  {}",
            user_id,
            short,
            info.message_count,
            format_age(info.age_seconds),
            format_timestamp(info.last_active)
        );
    }
    println!();
    println!("  {} session(s)", all.len());
    println!();
}

fn cleanup(sessions: &SessionManager) {
    let removed = sessions.cleanup_expired_sessions();
    if removed == 0 {
        println!("  {} no expired sessions", "✓".green());
    } else {
        println!(
            "  {} archived {} expired session(s) to {}",
            "✓".green(),
            removed,
            sessions.archive_dir().display()
        );
    }
}

fn show(sessions: &SessionManager, user: &str) {
    let Some(info) = sessions.get_session_info(user) else {
        println!("  {} no active session for {}", "·".dimmed(), user);
        return;
    };

    println!();
    println!("  {:<14} {}", "User:".bold(), user);
    println!("  {:<14} {}", "Session:".bold(), info.session_id);
    println!("  {:<14} {}", "Created:".bold(), format_timestamp(info.created_at));
    println!("  {:<14} {}", "Last active:".bold(), format_timestamp(info.last_active));
    println!("  {:<14} {}", "Messages:".bold(), info.message_count);
    println!();

    for msg in sessions.get_conversation_history(user, None) {
        let label = match msg.role {
            Role::User => "user".cyan(),
            Role::Assistant => "assistant".green(),
        };
        println!(
            "  {} {}: {}",
            format_timestamp(msg.timestamp).dimmed(),
            label,
            msg.content
        );
    }
    println!();
}
