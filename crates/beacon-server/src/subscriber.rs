//! The long-lived subscriber that persists every received event.
//!
//! Delivery is at-most-once. Events published while the subscriber is
//! not subscribed are never seen, and an event whose insert fails is
//! dropped without retry. Both losses show up in the logs and in
//! [`SubscriberStats`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beacon_channel::{handler_fn, ChannelTransport, MessageHandler};
use beacon_eventlog::{EventLogStore, LogRecord};
use beacon_types::Event;
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::SubscriberConfig;
use crate::now_millis;

/// Connection state of the subscriber loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberState {
    /// Not subscribed; waiting to retry.
    Disconnected,
    /// Establishing a subscription.
    Connecting,
    /// Receiving messages.
    Subscribed,
    /// Shut down for good.
    Stopped,
}

/// Running totals of message handling outcomes.
#[derive(Debug, Default)]
pub struct SubscriberCounters {
    received: AtomicU64,
    persisted: AtomicU64,
    malformed: AtomicU64,
    dropped: AtomicU64,
}

/// A point-in-time copy of [`SubscriberCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubscriberStats {
    /// Messages delivered by the channel.
    pub received: u64,
    /// Events written to the log.
    pub persisted: u64,
    /// Messages discarded because they did not decode.
    pub malformed: u64,
    /// Valid events lost because the insert failed.
    pub dropped: u64,
}

impl SubscriberCounters {
    /// Reads all counters.
    pub fn snapshot(&self) -> SubscriberStats {
        SubscriberStats {
            received: self.received.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Exponential reconnection delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    /// Delays start at `initial` and double up to `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// The first delay.
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// The delay after `current`.
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl From<&SubscriberConfig> for Backoff {
    fn from(config: &SubscriberConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }
}

/// Subscribes to the event channel and writes each event to the log.
pub struct Subscriber {
    transport: Arc<dyn ChannelTransport>,
    channel: String,
    log: EventLogStore,
    backoff: Backoff,
    counters: Arc<SubscriberCounters>,
    state: watch::Sender<SubscriberState>,
}

impl Subscriber {
    /// A subscriber that has not started yet.
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        channel: impl Into<String>,
        log: EventLogStore,
        backoff: Backoff,
    ) -> Self {
        let (state, _) = watch::channel(SubscriberState::Disconnected);
        Self {
            transport,
            channel: channel.into(),
            log,
            backoff,
            counters: Arc::new(SubscriberCounters::default()),
            state,
        }
    }

    /// Observes state transitions.
    pub fn state(&self) -> watch::Receiver<SubscriberState> {
        self.state.subscribe()
    }

    /// Shared handle to the message counters.
    pub fn counters(&self) -> Arc<SubscriberCounters> {
        Arc::clone(&self.counters)
    }

    fn set_state(&self, state: SubscriberState) {
        self.state.send_replace(state);
    }

    /// Runs until `shutdown` is cancelled, resubscribing whenever the
    /// subscription is lost.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut delay = self.backoff.initial();

        while !shutdown.is_cancelled() {
            self.set_state(SubscriberState::Connecting);

            match self.transport.subscribe(&self.channel, self.handler()).await {
                Ok(mut subscription) => {
                    self.set_state(SubscriberState::Subscribed);
                    tracing::info!(channel = %self.channel, "subscribed to event channel");
                    delay = self.backoff.initial();

                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            subscription.unsubscribe();
                            break;
                        }
                        reason = subscription.closed() => {
                            tracing::warn!(
                                channel = %self.channel,
                                error = %reason,
                                "event subscription lost, events published until resubscription are not persisted"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        channel = %self.channel,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "failed to subscribe to event channel"
                    );
                }
            }

            self.set_state(SubscriberState::Disconnected);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.backoff.next(delay);
        }

        self.set_state(SubscriberState::Stopped);
        let stats = self.counters.snapshot();
        tracing::info!(
            received = stats.received,
            persisted = stats.persisted,
            malformed = stats.malformed,
            dropped = stats.dropped,
            "event subscriber stopped"
        );
    }

    fn handler(&self) -> MessageHandler {
        let log = self.log.clone();
        let counters = Arc::clone(&self.counters);
        handler_fn(move |message| {
            let log = log.clone();
            let counters = Arc::clone(&counters);
            async move {
                persist_message(&log, &counters, message).await;
            }
        })
    }
}

/// What happened to one received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Written to the log.
    Persisted,
    /// Did not decode and was discarded.
    Malformed,
    /// Decoded, but the insert failed and the event was lost.
    Dropped,
}

/// Decodes one message, stamps its receive time, and inserts it.
///
/// Never fails: every error is logged and counted.
pub async fn persist_message(
    log: &EventLogStore,
    counters: &SubscriberCounters,
    message: Bytes,
) -> MessageOutcome {
    counters.received.fetch_add(1, Ordering::Relaxed);

    let event = match Event::decode(&message) {
        Ok(event) => event,
        Err(e) => {
            counters.malformed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, bytes = message.len(), "discarding malformed event");
            return MessageOutcome::Malformed;
        }
    };

    let kind = event.kind();
    let record = LogRecord::new(event, now_millis());
    match log.insert(record).await {
        Ok(id) => {
            counters.persisted.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(id, event_type = kind.as_str(), "event persisted");
            MessageOutcome::Persisted
        }
        Err(e) => {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                event_type = kind.as_str(),
                error = %e,
                "failed to persist event, dropping it"
            );
            MessageOutcome::Dropped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_max() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        let first = backoff.initial();
        let second = backoff.next(first);
        let third = backoff.next(second);
        assert_eq!(first, Duration::from_millis(100));
        assert_eq!(second, Duration::from_millis(200));
        assert_eq!(third, Duration::from_millis(350));
        assert_eq!(backoff.next(third), Duration::from_millis(350));
    }

    #[test]
    fn backoff_never_has_max_below_initial() {
        let backoff = Backoff::new(Duration::from_millis(500), Duration::from_millis(10));
        assert_eq!(backoff.next(backoff.initial()), Duration::from_millis(500));
    }
}
