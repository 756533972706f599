//! Switchboard CLI: entry point.
//!
//! # Commands
//!
//! - `switchboard chat [-m MESSAGE] [-u USER]`: single-shot or REPL
//! - `switchboard route TEXT`: dry-run routing for a message
//! - `switchboard sessions list|cleanup|show USER`: inspect the session store
//! - `switchboard executors`: registered executors and availability
//! - `switchboard status [--init]`: configuration and validation
//! - `switchboard gateway`: stdin/stdout transport with the session sweeper

mod app;
mod executors_cmd;
mod gateway;
mod helpers;
mod repl;
mod route_cmd;
mod sessions_cmd;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::app::{build_dispatcher, load_checked_config, new_message_id};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 📡 Switchboard: route chat messages to AI executors
#[derive(Parser)]
#[command(name = "switchboard", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.switchboard/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat through the dispatcher (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// User identifier the session is kept under
        #[arg(short, long, default_value = "cli")]
        user: String,
    },

    /// Show which executor a message would be routed to
    Route {
        /// Message text, including any @prefix
        text: String,
    },

    /// Inspect and maintain sessions
    Sessions {
        #[command(subcommand)]
        action: sessions_cmd::SessionsCommands,
    },

    /// List executors, their metadata and availability
    Executors,

    /// Show configuration and validation status
    Status {
        /// Write a default config if none exists
        #[arg(long, default_value_t = false)]
        init: bool,
    },

    /// Serve `user_id<TAB>text` lines from stdin until EOF or Ctrl+C
    Gateway,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Status { init } => status::run(config_path, init),
        Commands::Chat { message, user } => {
            let config = load_checked_config(config_path)?;
            let dispatcher = build_dispatcher(&config)?;
            match message {
                Some(msg) => {
                    info!(user = %user, "processing single message");
                    let reply = dispatcher.handle(&msg, &user, &new_message_id()).await;
                    helpers::print_response(reply.as_deref().unwrap_or_default());
                    Ok(())
                }
                None => repl::run(dispatcher, &user).await,
            }
        }
        Commands::Route { text } => {
            let config = load_checked_config(config_path)?;
            route_cmd::run(&config, &text).await
        }
        Commands::Sessions { action } => {
            let config = load_checked_config(config_path)?;
            sessions_cmd::dispatch(action, &config)
        }
        Commands::Executors => {
            let config = load_checked_config(config_path)?;
            executors_cmd::run(&config)
        }
        Commands::Gateway => {
            let config = load_checked_config(config_path)?;
            gateway::run(&config).await
        }
    }
}

/// Initialize tracing/logging. `RUST_LOG` wins when set.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("switchboard=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["switchboard", "route", "@code hi", "--logs", "-c", "/tmp/x.json"]).unwrap();
        assert!(cli.logs);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.json")));
        assert!(matches!(cli.command, Commands::Route { ref text } if text == "@code hi"));
    }

    #[test]
    fn parses_sessions_show() {
        let cli = Cli::try_parse_from(["switchboard", "sessions", "show", "ou_1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sessions {
                action: sessions_cmd::SessionsCommands::Show { ref user }
            } if user == "ou_1"
        ));
    }
}
