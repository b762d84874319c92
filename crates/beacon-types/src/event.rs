//! Event kinds, kind-specific payloads, and the event envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InvalidEventError;
use crate::EpochMillis;

/// The closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Records were fetched from an upstream source.
    DataFetched,
    /// A file was uploaded by a client.
    FileUploaded,
    /// Records were written to a collection.
    DataInserted,
    /// A search query was executed.
    SearchPerformed,
    /// An operation failed.
    ErrorOccurred,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 5] = [
        Self::DataFetched,
        Self::FileUploaded,
        Self::DataInserted,
        Self::SearchPerformed,
        Self::ErrorOccurred,
    ];

    /// Returns the canonical wire label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataFetched => "DATA_FETCHED",
            Self::FileUploaded => "FILE_UPLOADED",
            Self::DataInserted => "DATA_INSERTED",
            Self::SearchPerformed => "SEARCH_PERFORMED",
            Self::ErrorOccurred => "ERROR_OCCURRED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = ParseEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DATA_FETCHED" => Ok(Self::DataFetched),
            "FILE_UPLOADED" => Ok(Self::FileUploaded),
            "DATA_INSERTED" => Ok(Self::DataInserted),
            "SEARCH_PERFORMED" => Ok(Self::SearchPerformed),
            "ERROR_OCCURRED" => Ok(Self::ErrorOccurred),
            _ => Err(ParseEventKindError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown event kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEventKindError(pub String);

impl std::fmt::Display for ParseEventKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for ParseEventKindError {}

/// Kind-specific event fields.
///
/// The `eventType` tag selects the variant on the wire. Optional fields are
/// omitted when unset so that a decoded event compares equal to the one
/// that was encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    /// Records were fetched from an upstream source.
    #[serde(rename_all = "camelCase")]
    DataFetched {
        /// Number of records fetched.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        record_count: Option<u64>,
        /// Where the records came from (usually a URL).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        /// Fetch duration in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },

    /// A file was uploaded by a client.
    #[serde(rename_all = "camelCase")]
    FileUploaded {
        /// Client-supplied file name.
        file_name: String,
        /// Size in bytes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_size: Option<u64>,
        /// MIME type reported by the client.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_type: Option<String>,
    },

    /// Records were written to a collection.
    #[serde(rename_all = "camelCase")]
    DataInserted {
        /// Target collection.
        collection_name: String,
        /// Number of records written.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        record_count: Option<u64>,
        /// Write duration in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },

    /// A search query was executed. An empty query means "match all".
    #[serde(rename_all = "camelCase")]
    SearchPerformed {
        /// The query string as submitted.
        query: String,
        /// Number of results on the returned page.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_count: Option<u64>,
        /// Requested page (1-indexed).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page: Option<u32>,
        /// Requested page size.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
        /// Search duration in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },

    /// An operation failed.
    #[serde(rename_all = "camelCase")]
    ErrorOccurred {
        /// The error message.
        error: String,
        /// Name of the operation that failed.
        context: String,
        /// Optional backtrace or stack text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

impl EventPayload {
    /// Builds a `DATA_FETCHED` payload. Every field is optional.
    pub fn data_fetched(
        record_count: Option<u64>,
        source: Option<String>,
        duration: Option<u64>,
    ) -> Self {
        Self::DataFetched {
            record_count,
            source,
            duration,
        }
    }

    /// Builds a `FILE_UPLOADED` payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventError::MissingField` if `file_name` is blank.
    pub fn file_uploaded(
        file_name: impl Into<String>,
        file_size: Option<u64>,
        file_type: Option<String>,
    ) -> Result<Self, InvalidEventError> {
        let payload = Self::FileUploaded {
            file_name: file_name.into(),
            file_size,
            file_type,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Builds a `DATA_INSERTED` payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventError::MissingField` if `collection_name` is blank.
    pub fn data_inserted(
        collection_name: impl Into<String>,
        record_count: Option<u64>,
        duration: Option<u64>,
    ) -> Result<Self, InvalidEventError> {
        let payload = Self::DataInserted {
            collection_name: collection_name.into(),
            record_count,
            duration,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Builds a `SEARCH_PERFORMED` payload. The query may be empty.
    pub fn search_performed(
        query: impl Into<String>,
        result_count: Option<u64>,
        page: Option<u32>,
        limit: Option<u32>,
        duration: Option<u64>,
    ) -> Self {
        Self::SearchPerformed {
            query: query.into(),
            result_count,
            page,
            limit,
            duration,
        }
    }

    /// Builds an `ERROR_OCCURRED` payload.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventError::MissingField` if `error` or `context` is
    /// blank.
    pub fn error_occurred(
        error: impl Into<String>,
        context: impl Into<String>,
        stack: Option<String>,
    ) -> Result<Self, InvalidEventError> {
        let payload = Self::ErrorOccurred {
            error: error.into(),
            context: context.into(),
            stack,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Returns the kind tag of this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DataFetched { .. } => EventKind::DataFetched,
            Self::FileUploaded { .. } => EventKind::FileUploaded,
            Self::DataInserted { .. } => EventKind::DataInserted,
            Self::SearchPerformed { .. } => EventKind::SearchPerformed,
            Self::ErrorOccurred { .. } => EventKind::ErrorOccurred,
        }
    }

    /// Checks that every field the kind requires is present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns the first missing field as `InvalidEventError::MissingField`.
    pub fn validate(&self) -> Result<(), InvalidEventError> {
        let kind = self.kind();
        let require = |value: &str, field: &'static str| {
            if value.trim().is_empty() {
                Err(InvalidEventError::MissingField { kind, field })
            } else {
                Ok(())
            }
        };

        match self {
            Self::DataFetched { .. } | Self::SearchPerformed { .. } => Ok(()),
            Self::FileUploaded { file_name, .. } => require(file_name, "fileName"),
            Self::DataInserted {
                collection_name, ..
            } => require(collection_name, "collectionName"),
            Self::ErrorOccurred { error, context, .. } => {
                require(error, "error")?;
                require(context, "context")
            }
        }
    }

    /// Record count carried by the payload, if any.
    pub fn record_count(&self) -> Option<u64> {
        match self {
            Self::DataFetched { record_count, .. } | Self::DataInserted { record_count, .. } => {
                *record_count
            }
            _ => None,
        }
    }

    /// Duration in milliseconds carried by the payload, if any.
    pub fn duration(&self) -> Option<u64> {
        match self {
            Self::DataFetched { duration, .. }
            | Self::DataInserted { duration, .. }
            | Self::SearchPerformed { duration, .. } => *duration,
            _ => None,
        }
    }

    /// File size in bytes carried by the payload, if any.
    pub fn file_size(&self) -> Option<u64> {
        match self {
            Self::FileUploaded { file_size, .. } => *file_size,
            _ => None,
        }
    }
}

/// An immutable record of something that happened in the system.
///
/// Construct through [`Event::new`] or [`Event::decode`]; both enforce the
/// kind schema, so an `Event` value is always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    payload: EventPayload,
    timestamp: EpochMillis,
    #[serde(rename = "serviceId")]
    origin_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, Value>,
}

impl Event {
    /// Builds a validated event.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventError` if the origin is blank, the timestamp is
    /// negative, or the payload is missing a required field.
    pub fn new(
        origin_id: impl Into<String>,
        timestamp: EpochMillis,
        payload: EventPayload,
        metadata: BTreeMap<String, Value>,
    ) -> Result<Self, InvalidEventError> {
        let event = Self {
            payload,
            timestamp,
            origin_id: origin_id.into(),
            metadata,
        };
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<(), InvalidEventError> {
        if self.origin_id.trim().is_empty() {
            return Err(InvalidEventError::MissingOrigin);
        }
        if self.timestamp < 0 {
            return Err(InvalidEventError::NegativeTimestamp(self.timestamp));
        }
        self.payload.validate()
    }

    /// The kind tag.
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Occurrence time on the producer side.
    pub fn timestamp(&self) -> EpochMillis {
        self.timestamp
    }

    /// Identifier of the producing service.
    pub fn origin_id(&self) -> &str {
        &self.origin_id
    }

    /// Kind-specific fields.
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Auxiliary key/value pairs.
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Converts the event into its flat wire map.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventError::Malformed` if serialization does not
    /// produce a JSON object.
    pub fn to_wire(&self) -> Result<Map<String, Value>, InvalidEventError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(InvalidEventError::Malformed(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Rebuilds an event from its flat wire map, ignoring unknown fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventError` if the map is not a well-formed event or
    /// violates its kind's schema.
    pub fn from_wire(map: Map<String, Value>) -> Result<Self, InvalidEventError> {
        let event: Self = serde_json::from_value(Value::Object(map))?;
        event.validate()?;
        Ok(event)
    }

    /// Encodes the event as JSON bytes for the channel.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventError::Malformed` if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, InvalidEventError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes JSON bytes received from the channel.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventError` if the bytes are not a valid event.
    pub fn decode(bytes: &[u8]) -> Result<Self, InvalidEventError> {
        let event: Self = serde_json::from_slice(bytes)?;
        event.validate()?;
        Ok(event)
    }
}
