//! Error types for event construction and decoding.

use crate::event::EventKind;

/// Returned when an event cannot be built or decoded because it violates
/// the schema of its kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidEventError {
    /// A field that the kind requires is absent or blank.
    #[error("{kind} event is missing required field `{field}`")]
    MissingField {
        /// The kind whose schema was violated.
        kind: EventKind,
        /// The wire name of the missing field.
        field: &'static str,
    },

    /// The producing service id is blank.
    #[error("event is missing required field `serviceId`")]
    MissingOrigin,

    /// The occurrence timestamp is before the Unix epoch.
    #[error("event timestamp must not be negative, got {0}")]
    NegativeTimestamp(i64),

    /// The wire form could not be parsed at all.
    #[error("malformed event: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for InvalidEventError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
