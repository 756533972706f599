//! Message bus: bounded mpsc queues between the transport and the dispatcher.

pub mod queue;
pub mod types;

pub use queue::{BusClosed, MessageBus};
pub use types::{InboundMessage, OutboundMessage};
