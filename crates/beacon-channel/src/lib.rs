//! Publish/subscribe channel transport for the Beacon pipeline.
//!
//! The transport is a pure relay: it owns no durable state, makes no
//! delivery guarantee, and never replays. A message published while no
//! subscription is live is gone. Durability belongs to whoever persists
//! what they receive.
//!
//! # Delivery contract
//!
//! - `publish` succeeds once the message is handed to the broadcast
//!   primitive, not once anyone has processed it.
//! - Messages from one publisher on one channel arrive in send order.
//! - A subscription sees only messages published while it is live
//!   (at-most-once). There is no acknowledgement and no redelivery.
//! - Connection loss ends a subscription with a [`TransportError`]; the
//!   transport does not reconnect on its own.
//!
//! Services receive a transport as an `Arc<dyn ChannelTransport>` so that
//! the in-process [`BroadcastTransport`] can be swapped for a networked one
//! without touching publishers or subscribers.

mod broadcast;
mod error;
mod transport;

pub use broadcast::BroadcastTransport;
pub use error::TransportError;
pub use transport::{handler_fn, ChannelTransport, MessageHandler, Subscription};
