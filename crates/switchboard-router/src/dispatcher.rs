//! Dispatcher: the single inbound entry point.
//!
//! Every user message goes through the same steps:
//! 1. Drop redelivered message ids
//! 2. Parse the `@provider` prefix
//! 3. Answer session commands (`/new`, `/history`, ...) directly
//! 4. Route to an executor and run it
//! 5. Record the exchange in the user's session
//!
//! Messages are handled one at a time; [`Dispatcher::run`] drives the
//! loop from a [`MessageBus`].

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tracing::{debug, error, info, warn};

use switchboard_core::bus::{InboundMessage, MessageBus, OutboundMessage};
use switchboard_core::config::Config;
use switchboard_core::session::SessionCommand;
use switchboard_core::types::{ExecutionLayer, Role};
use switchboard_core::utils::truncate_string;
use switchboard_core::{DeduplicationCache, SessionManager};
use switchboard_executors::{split_provider_name, ExecuteParams};

use crate::formatter::ResponseFormatter;
use crate::parser::CommandParser;
use crate::router::SmartRouter;

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

pub struct Dispatcher {
    dedup: Mutex<DeduplicationCache>,
    parser: CommandParser,
    router: SmartRouter,
    sessions: Arc<SessionManager>,
    formatter: ResponseFormatter,
    /// `"Please respond in <language>."`, prepended to every prompt when set.
    language_instruction: Option<String>,
}

impl Dispatcher {
    pub fn new(router: SmartRouter, sessions: Arc<SessionManager>) -> Self {
        Self {
            dedup: Mutex::new(DeduplicationCache::default()),
            parser: CommandParser::default(),
            router,
            sessions,
            formatter: ResponseFormatter::new(),
            language_instruction: None,
        }
    }

    /// Build with the dedup capacity and response language from `config`.
    pub fn from_config(config: &Config, router: SmartRouter, sessions: Arc<SessionManager>) -> Self {
        Self::new(router, sessions)
            .with_dedup_capacity(config.dedup.capacity)
            .with_language_instruction(config.routing.language_instruction())
    }

    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup = Mutex::new(DeduplicationCache::new(capacity));
        self
    }

    pub fn with_parser(mut self, parser: CommandParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_language_instruction(mut self, instruction: Option<String>) -> Self {
        self.language_instruction = instruction;
        self
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    pub fn router(&self) -> &SmartRouter {
        &self.router
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Handle one message. Returns the reply, or `None` for a duplicate.
    pub async fn handle(&self, raw_text: &str, user_id: &str, message_id: &str) -> Option<String> {
        {
            let mut dedup = self.dedup.lock().unwrap_or_else(PoisonError::into_inner);
            if dedup.is_processed(message_id) {
                return None;
            }
            dedup.mark_processed(message_id);
        }

        let parsed = self.parser.parse_command(raw_text);
        debug!(
            user_id,
            message_id,
            explicit = parsed.explicit,
            provider = %parsed.provider,
            layer = %parsed.execution_layer,
            "parsed message"
        );

        if let Some(command) = self.sessions.session_command(&parsed.message) {
            info!(user_id, ?command, "session command");
            let reply = self.sessions.handle_session_command(user_id, &parsed.message);
            if command == SessionCommand::New {
                self.clear_cli_sessions(user_id).await;
            }
            return reply;
        }

        let executor = match self.router.route(&parsed).await {
            Ok(e) => e,
            Err(e) => {
                error!(user_id, "routing failed: {}", e);
                return Some(self.formatter.format_routing_error(&e));
            }
        };

        let provider_name = executor.provider_name();
        let (provider, layer) = split_provider_name(&provider_name);
        let executor_name = self
            .router
            .registry()
            .get_executor_metadata(&provider, layer)
            .map(|m| m.name.clone());

        let prompt = match &self.language_instruction {
            Some(instruction) => format!("{instruction}\n\n{}", parsed.message),
            None => parsed.message.clone(),
        };

        let result = match layer {
            ExecutionLayer::Api => {
                let history = self.sessions.get_conversation_history(user_id, None);
                debug!(
                    executor = %provider_name,
                    history = history.len(),
                    prompt = %truncate_string(&prompt, 200),
                    "executing with history"
                );
                executor.execute(&prompt, Some(&history), None).await
            }
            ExecutionLayer::Cli => {
                let params: ExecuteParams =
                    [("user_id".to_string(), json!(user_id))].into_iter().collect();
                info!(
                    executor = %provider_name,
                    prompt = %truncate_string(&prompt, 200),
                    "executing with native session"
                );
                executor.execute(&prompt, None, Some(&params)).await
            }
        };

        if result.success {
            info!(
                user_id,
                message_id,
                executor = %provider_name,
                elapsed_s = result.execution_time,
                "message processed"
            );
        } else {
            warn!(
                user_id,
                message_id,
                executor = %provider_name,
                "executor failed: {}",
                result.error_text()
            );
        }

        let reply = self.formatter.format_result(&result, executor_name.as_deref());

        let recorded = if result.success {
            result.stdout.clone()
        } else {
            result.error_text()
        };
        self.sessions.add_message(user_id, Role::User, &parsed.message);
        self.sessions.add_message(user_id, Role::Assistant, &recorded);

        Some(reply)
    }

    /// Consume inbound messages until the bus closes, publishing each reply.
    pub async fn run(&self, bus: &MessageBus) {
        info!("dispatcher started, waiting for messages");
        while let Some(msg) = bus.consume_inbound().await {
            self.dispatch(bus, &msg).await;
        }
        info!("inbound channel closed, dispatcher exiting");
    }

    async fn dispatch(&self, bus: &MessageBus, msg: &InboundMessage) {
        let Some(reply) = self.handle(&msg.content, &msg.user_id, &msg.message_id).await else {
            return;
        };
        if let Err(e) = bus.publish_outbound(OutboundMessage::reply(msg, reply)).await {
            error!(error = %e, "failed to publish reply");
        }
    }

    /// Tell every CLI executor to drop its native session for `user_id`.
    async fn clear_cli_sessions(&self, user_id: &str) {
        for (provider, executor) in self.router.registry().executors(ExecutionLayer::Cli) {
            debug!(provider = %provider, user_id, "clearing CLI session");
            executor.clear_session(user_id).await;
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
