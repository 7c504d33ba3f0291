/// Error types for the replication layer
use thiserror::Error;

/// Result type alias for network operations
pub type Result<T> = std::result::Result<T, NetError>;

/// Errors that can occur while exchanging messages with a peer
///
/// Every one of these marks the affected channel broken; nothing is retried.
#[derive(Debug, Error)]
pub enum NetError {
    /// Socket or stream failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream between frames
    #[error("Connection closed by peer")]
    Closed,

    /// A frame header announced a zero-length payload
    #[error("Empty frame")]
    EmptyFrame,

    /// A frame header announced more bytes than the configured maximum
    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge {
        /// Announced payload length
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// The payload is not a known message
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The message decoded but its contents are out of range
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Seat ids are 1 or 2 for guests
    #[error("Invalid seat id: {0}")]
    InvalidSeat(u8),

    /// Local-only messages never go on the wire
    #[error("Message is local-only and cannot be sent")]
    NotSendable,

    /// A send did not complete within the configured timeout
    #[error("Send timed out")]
    SendTimeout,

    /// The channel already faulted or was closed
    #[error("Channel is broken")]
    Broken,
}
