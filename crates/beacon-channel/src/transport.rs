//! The transport trait and subscription handle.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::error::TransportError;

/// Callback invoked once per message received on a live subscription.
///
/// Calls are sequential: the next message is not delivered until the
/// future returned for the previous one has completed.
pub type MessageHandler = Arc<dyn Fn(Bytes) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure as a [`MessageHandler`].
pub fn handler_fn<F, Fut>(f: F) -> MessageHandler
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |message| Box::pin(f(message)))
}

/// Best-effort, at-most-once broadcast primitive.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Hands `message` to every subscription currently live on `channel`.
    ///
    /// Returns the number of subscriptions the message was handed to. Zero
    /// is a success: the message is simply lost.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the transport cannot be reached.
    async fn publish(&self, channel: &str, message: Bytes) -> Result<usize, TransportError>;

    /// Starts delivering messages published on `channel` to `handler`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the subscription cannot be established.
    async fn subscribe(
        &self,
        channel: &str,
        handler: MessageHandler,
    ) -> Result<Subscription, TransportError>;
}

/// Handle to a live subscription.
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`]) stops
/// delivery.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    task: Option<JoinHandle<TransportError>>,
}

impl Subscription {
    /// Wraps the task driving a subscription. The task resolves with the
    /// error that ended the subscription.
    pub fn new(channel: impl Into<String>, task: JoinHandle<TransportError>) -> Self {
        Self {
            channel: channel.into(),
            task: Some(task),
        }
    }

    /// The channel this subscription listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether messages are still being delivered.
    pub fn is_live(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Waits until the subscription ends and returns the reason.
    ///
    /// Cancel-safe: if this future is dropped the subscription stays live.
    pub async fn closed(&mut self) -> TransportError {
        let Some(task) = self.task.as_mut() else {
            return TransportError::Closed;
        };
        let reason = match task.await {
            Ok(reason) => reason,
            Err(e) => TransportError::Disconnected(format!("{}: {}", self.channel, e)),
        };
        self.task = None;
        reason
    }

    /// Stops delivery immediately.
    pub fn unsubscribe(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}
