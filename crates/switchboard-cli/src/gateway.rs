//! Gateway command: a line-oriented stdin/stdout transport around the dispatcher.
//!
//! Each input line is `user_id<TAB>text`; each reply is printed as
//! `user_id<TAB>"json-escaped reply"` so multi-line answers stay on one line.
//!
//! Startup sequence:
//! 1. Load and validate config
//! 2. Build the dispatcher (registry, router, sessions)
//! 3. Create the message bus and the session sweeper
//! 4. Run: `tokio::select!` of dispatcher + reply printer + sweeper
//! 5. Stdin EOF drains the queue and exits; Ctrl+C stops immediately

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use switchboard_core::bus::{InboundMessage, MessageBus, OutboundMessage};
use switchboard_core::config::Config;
use switchboard_core::sweeper::SessionSweeper;

use crate::app::{build_dispatcher, new_message_id};

/// User id for lines without a `user_id<TAB>` prefix.
const DEFAULT_USER_ID: &str = "local";

/// Run the gateway until stdin closes or Ctrl+C.
pub async fn run(config: &Config) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let bus = Arc::new(MessageBus::new(100));
    let sweeper = SessionSweeper::new(
        dispatcher.sessions().clone(),
        Some(config.sessions.sweep_interval_secs),
    );

    info!(
        executors = dispatcher.router().registry().len(),
        store = %dispatcher.sessions().storage_path().display(),
        sweep_interval_s = config.sessions.sweep_interval_secs,
        "gateway starting"
    );
    eprintln!("📡 Switchboard gateway: reading `user_id<TAB>text` lines from stdin, Ctrl+C to stop");

    let reader = tokio::spawn(read_stdin(bus.clone()));

    tokio::select! {
        _ = dispatcher.run(&bus) => {
            info!("stdin closed, gateway draining");
        }
        _ = print_replies(&bus) => {}
        _ = sweeper.start() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
            bus.close_inbound();
        }
    }

    sweeper.stop();
    reader.abort();
    for reply in bus.drain_outbound().await {
        println!("{}", render_reply(&reply));
    }

    eprintln!("Gateway stopped. Goodbye!");
    Ok(())
}

/// Publish every stdin line as an inbound message, closing the bus at EOF.
async fn read_stdin(bus: Arc<MessageBus>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some((user_id, text)) = parse_line(&line) else {
                    continue;
                };
                let msg = InboundMessage::new(new_message_id(), user_id, user_id, text);
                debug!(user_id, "stdin message");
                if bus.publish_inbound(msg).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("failed to read stdin: {}", e);
                break;
            }
        }
    }
    bus.close_inbound();
}

async fn print_replies(bus: &MessageBus) {
    while let Some(reply) = bus.consume_outbound().await {
        println!("{}", render_reply(&reply));
    }
}

/// Split `user_id<TAB>text`. Blank lines are skipped.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    match line.split_once('\t') {
        Some((user, text)) if !user.trim().is_empty() => Some((user.trim(), text)),
        Some((_, text)) => Some((DEFAULT_USER_ID, text)),
        None => Some((DEFAULT_USER_ID, line)),
    }
}

fn render_reply(reply: &OutboundMessage) -> String {
    let content = serde_json::to_string(&reply.content).unwrap_or_else(|_| reply.content.clone());
    format!("{}\t{}", reply.chat_id, content)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
