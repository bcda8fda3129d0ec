/// Error types for observable collection operations.
///
/// Structural violations (double suppression, use after dispose, bad
/// arguments) are always surfaced synchronously as a `CollectionError`.
/// Faults raised by subscriber callbacks are wrapped in an [`ObserverFault`],
/// reported on the unhandled-error stream and, depending on configuration,
/// also returned to the caller that triggered the notification.
use crate::suppression::NotificationChannel;
use std::fmt;
use thiserror::Error;

/// The main error type for observable collection operations.
#[derive(Error, Debug)]
pub enum CollectionError {
    /// A required argument was out of its domain
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected
        reason: String,
    },

    /// The operation is not legal in the current state
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Why the operation was rejected
        reason: String,
    },

    /// A suppression scope is already open for this channel
    #[error("{channel} notifications are already suppressed")]
    AlreadySuppressed {
        /// The channel that was already suppressed
        channel: NotificationChannel,
    },

    /// The collection has been disposed
    #[error("The collection has been disposed")]
    Disposed,

    /// The collection is being disposed
    #[error("The collection is being disposed")]
    Disposing,

    /// Index outside of `0..len`
    #[error("Index {index} is out of range for length {len}")]
    IndexOutOfRange {
        /// The offending index
        index: usize,
        /// The length at the time of the call
        len: usize,
    },

    /// Key not present in a dictionary
    #[error("Key '{key}' not found")]
    KeyNotFound {
        /// Debug rendering of the key
        key: String,
    },

    /// Key already present in a dictionary
    #[error("Key '{key}' already exists")]
    KeyAlreadyExists {
        /// Debug rendering of the key
        key: String,
    },

    /// Some items of a bulk operation could not be applied.
    ///
    /// The items that did succeed are not rolled back.
    #[error(
        "{} item(s) of the batch could not be applied: {}",
        .failed.len(),
        .failed.join(", ")
    )]
    PartialBatch {
        /// Debug renderings of the keys that failed, in input order
        failed: Vec<String>,
    },

    /// A subscriber callback failed during delivery
    #[error(transparent)]
    ObserverFailed(#[from] ObserverFault),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CollectionError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        CollectionError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_operation(reason: impl Into<String>) -> Self {
        CollectionError::InvalidOperation {
            reason: reason.into(),
        }
    }

    pub(crate) fn key_not_found(key: &impl fmt::Debug) -> Self {
        CollectionError::KeyNotFound {
            key: format!("{:?}", key),
        }
    }

    pub(crate) fn partial_batch<K: fmt::Debug>(failed: &[K]) -> Self {
        CollectionError::PartialBatch {
            failed: failed.iter().map(|key| format!("{:?}", key)).collect(),
        }
    }

    pub(crate) fn key_already_exists(key: &impl fmt::Debug) -> Self {
        CollectionError::KeyAlreadyExists {
            key: format!("{:?}", key),
        }
    }

    /// True for the disposed / disposing lifecycle faults.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, CollectionError::Disposed | CollectionError::Disposing)
    }
}

/// Result type alias for observable collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// An error returned by a fallible subscriber callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ObserverError {
    message: String,
}

impl ObserverError {
    /// Create an observer error from any displayable message.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CollectionError> for ObserverError {
    fn from(err: CollectionError) -> Self {
        ObserverError::new(err)
    }
}

/// The stream a notification was being delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// The coalesced change-event stream.
    Changes,
    /// The reset-only stream.
    Resets,
    /// The count-change stream.
    Count,
    /// The legacy list-changed stream.
    ListChanged,
    /// The property-changed stream.
    PropertyChanged,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Changes => write!(f, "changes"),
            Stream::Resets => write!(f, "resets"),
            Stream::Count => write!(f, "count"),
            Stream::ListChanged => write!(f, "list-changed"),
            Stream::PropertyChanged => write!(f, "property-changed"),
        }
    }
}

/// A subscriber fault tagged with the stream it was raised on.
///
/// This is the payload of the unhandled-error stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Observer on the {stream} stream failed: {error}")]
pub struct ObserverFault {
    /// Stream being delivered when the callback failed.
    pub stream: Stream,
    /// The error the callback returned.
    #[source]
    pub error: ObserverError,
}
