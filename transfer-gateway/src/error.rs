//! Error types for the gateway

use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a live transfer attempt.
///
/// This is the only signal that sends a gateway down its fallback path. It is
/// deliberately opaque: timeouts, refused connections and protocol errors all
/// look the same to the gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Transfer failed: {reason}")]
pub struct TransferError {
    /// Human readable cause reported by the transport
    pub reason: String,
}

impl TransferError {
    /// Create a transfer error with the given cause
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed construction input or request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Live transfer failed
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Payload could not be converted to bytes
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Stored bytes could not be converted back to a payload
    #[error("Unserialization error: {0}")]
    Unserialize(String),

    /// Neither a fresh cache entry nor a default value is available
    #[error("No cached or default inbound data for gateway {gateway_id}")]
    InboundUnavailable {
        /// Gateway ID
        gateway_id: String,
    },

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more gateways failed while the queue runner drained them
    #[error("Queue run failed for gateways: {}", failed.join(", "))]
    QueueRun {
        /// IDs of the gateways whose drain failed
        failed: Vec<String>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True if this error is a live transfer failure
    pub fn is_transfer(&self) -> bool {
        matches!(self, Error::Transfer(_))
    }
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_is_distinct() {
        let err: Error = TransferError::new("connection refused").into();
        assert!(err.is_transfer());
        assert_eq!(err.to_string(), "Transfer failed: connection refused");

        assert!(!Error::Serialize("bad".to_string()).is_transfer());
        assert!(!Error::Storage("down".to_string()).is_transfer());
        assert!(!Error::InvalidArgument("empty".to_string()).is_transfer());
    }

    #[test]
    fn test_queue_run_message_lists_gateways() {
        let err = Error::QueueRun {
            failed: vec!["billing".to_string(), "geo".to_string()],
        };
        assert_eq!(err.to_string(), "Queue run failed for gateways: billing, geo");
    }
}
