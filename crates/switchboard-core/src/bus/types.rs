//! Bus event types: messages flowing between a transport and the dispatcher.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A user message delivered by the chat transport.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Platform message id, used for deduplication.
    pub message_id: String,
    /// Sender identifier; sessions are keyed by this.
    pub user_id: String,
    /// Conversation the reply goes back to.
    pub chat_id: String,
    /// Raw text content.
    pub content: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
    /// Transport-specific metadata (e.g. chat type).
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    /// Create a new inbound message with minimal required fields.
    pub fn new(
        message_id: impl Into<String>,
        user_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        InboundMessage {
            message_id: message_id.into(),
            user_id: user_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

/// A reply for the transport to deliver.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    /// Target chat/conversation identifier.
    pub chat_id: String,
    /// Text content to send.
    pub content: String,
    /// Message id this replies to.
    pub reply_to: Option<String>,
    /// Transport-specific metadata, copied from the inbound message.
    pub metadata: HashMap<String, String>,
}

impl OutboundMessage {
    /// Create a new outbound message.
    pub fn new(chat_id: impl Into<String>, content: impl Into<String>) -> Self {
        OutboundMessage {
            chat_id: chat_id.into(),
            content: content.into(),
            reply_to: None,
            metadata: HashMap::new(),
        }
    }

    /// Build the reply to `inbound`, threading it to the original message.
    pub fn reply(inbound: &InboundMessage, content: impl Into<String>) -> Self {
        OutboundMessage {
            chat_id: inbound.chat_id.clone(),
            content: content.into(),
            reply_to: Some(inbound.message_id.clone()),
            metadata: inbound.metadata.clone(),
        }
    }
}
