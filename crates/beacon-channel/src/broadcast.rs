//! In-process transport backed by `tokio::sync::broadcast`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::TransportError;
use crate::transport::{ChannelTransport, MessageHandler, Subscription};

/// Broadcast transport for services sharing one process.
///
/// Each channel is a bounded broadcast ring created on first use. A
/// subscription that falls more than `capacity` messages behind loses the
/// overflow; the loss is logged and delivery resumes with the oldest
/// retained message.
#[derive(Debug)]
pub struct BroadcastTransport {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<Bytes>>>,
    closed: AtomicBool,
}

impl BroadcastTransport {
    /// Default per-channel ring capacity.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a transport whose channels buffer up to `capacity` messages
    /// per subscription.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Drops every channel, ending all live subscriptions with
    /// `TransportError::Disconnected`.
    ///
    /// The transport stays usable: the next publish or subscribe recreates
    /// the channel, the way a client reconnects after a dropped socket.
    pub fn disconnect(&self) {
        let dropped = {
            let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
            let dropped = channels.len();
            channels.clear();
            dropped
        };
        tracing::warn!(channels = dropped, "broadcast transport disconnected");
    }

    /// Shuts the transport down permanently.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        tracing::info!("broadcast transport closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .map_or(0, |tx| tx.receiver_count())
    }

    fn sender(&self, channel: &str) -> Result<broadcast::Sender<Bytes>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let tx = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(tx.clone())
    }
}

impl Default for BroadcastTransport {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl ChannelTransport for BroadcastTransport {
    async fn publish(&self, channel: &str, message: Bytes) -> Result<usize, TransportError> {
        let tx = self.sender(channel)?;
        match tx.send(message) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                tracing::debug!(channel, "no live subscribers, message dropped");
                Ok(0)
            }
        }
    }

    async fn subscribe(
        &self,
        channel: &str,
        handler: MessageHandler,
    ) -> Result<Subscription, TransportError> {
        let mut rx = self.sender(channel)?.subscribe();
        let name = channel.to_string();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => handler(message).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            channel = %name,
                            skipped,
                            "subscriber lagged behind, messages lost"
                        );
                    }
                    Err(RecvError::Closed) => {
                        return TransportError::Disconnected(name);
                    }
                }
            }
        });

        tracing::debug!(channel, "subscription established");
        Ok(Subscription::new(channel, task))
    }
}
