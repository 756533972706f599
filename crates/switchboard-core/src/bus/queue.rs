//! Async message bus between a chat transport and the dispatcher.
//!
//! Uses tokio::sync::mpsc bounded channels. The inbound side can be closed
//! by the transport so the dispatcher drains what is queued and stops.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use super::types::{InboundMessage, OutboundMessage};

/// Returned when publishing to a closed side of the bus.
#[derive(Debug, thiserror::Error)]
#[error("message bus {0} side is closed")]
pub struct BusClosed(pub &'static str);

/// The message bus connecting transport ↔ dispatcher.
///
/// - The transport publishes to `inbound` (user messages arriving)
/// - The dispatcher consumes `inbound` one message at a time and publishes replies to `outbound`
/// - The transport consumes `outbound` and delivers replies
pub struct MessageBus {
    /// `None` once the inbound side is closed.
    inbound_tx: Mutex<Option<mpsc::Sender<InboundMessage>>>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: tokio::sync::Mutex<mpsc::Receiver<OutboundMessage>>,
}

impl MessageBus {
    /// Create a new message bus with the given buffer capacity.
    pub fn new(buffer_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer_size.max(1));

        MessageBus {
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            outbound_tx,
            outbound_rx: tokio::sync::Mutex::new(outbound_rx),
        }
    }

    /// Publish a user message (inbound).
    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<(), BusClosed> {
        let sender = self.inbound_sender().ok_or(BusClosed("inbound"))?;
        sender.send(msg).await.map_err(|_| BusClosed("inbound"))
    }

    /// Consume the next inbound message (waits until available).
    ///
    /// Returns `None` once the inbound side is closed and drained.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await
    }

    /// Stop accepting inbound messages. Already queued messages are still delivered.
    ///
    /// Clones handed out by [`inbound_sender`](Self::inbound_sender) keep the
    /// channel open until they are dropped.
    pub fn close_inbound(&self) {
        let mut tx = self.inbound_tx.lock().unwrap_or_else(PoisonError::into_inner);
        if tx.take().is_some() {
            debug!("inbound side of message bus closed");
        }
    }

    /// Publish a reply (outbound).
    pub async fn publish_outbound(&self, msg: OutboundMessage) -> Result<(), BusClosed> {
        self.outbound_tx
            .send(msg)
            .await
            .map_err(|_| BusClosed("outbound"))
    }

    /// Consume the next outbound message (waits until available).
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        rx.recv().await
    }

    /// Take every reply already queued, without waiting for more.
    pub async fn drain_outbound(&self) -> Vec<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// A clone of the inbound sender, or `None` once closed.
    pub fn inbound_sender(&self) -> Option<mpsc::Sender<InboundMessage>> {
        self.inbound_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
