//! Error types for the channel transport.

/// Connectivity failure on publish or subscribe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport was shut down and accepts no further calls.
    #[error("channel transport is closed")]
    Closed,

    /// The connection backing a channel was lost.
    #[error("channel transport disconnected from `{0}`")]
    Disconnected(String),

    /// The transport could not be reached.
    #[error("channel transport unavailable: {0}")]
    Unavailable(String),
}
