//! Ingestion error types

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Event channel closed
    #[error("channel closed for device {device}")]
    ChannelClosed {
        /// Device ID
        device: String,
    },

    /// Device not listening
    #[error("device {device} is not listening")]
    DeviceNotListening {
        /// Device ID
        device: String,
    },

    /// Device already listening
    #[error("device {device} is already listening")]
    AlreadyListening {
        /// Device ID
        device: String,
    },
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
