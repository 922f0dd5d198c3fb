//! Layered error definitions
//!
//! Categorized by source: config / decode / device / correlation / sink

use thiserror::Error;

/// Frame decode error.
///
/// Decode failures are expected in normal operation (split notifications,
/// vendor keep-alives); callers log them at debug level and drop the
/// offending bytes rather than propagating.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Header bytes did not match the expected magic
    #[error("bad frame header: got {found:02x?}")]
    BadHeader { found: [u8; 2] },

    /// Payload shorter than the fixed frame length
    #[error("frame too short: need {needed} bytes, got {got}")]
    TooShort { needed: usize, got: usize },

    /// Unknown frame discriminator / event code
    #[error("unknown frame discriminator: {code:#04x}")]
    BadDiscriminator { code: u8 },

    /// A field decoded to a value outside its valid range
    #[error("malformed field '{field}': {message}")]
    MalformedField {
        field: &'static str,
        message: String,
    },
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Decode Errors =====
    /// Wire frame decode error
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    // ===== Device Errors =====
    /// Device connection error
    #[error("device '{device}' connection error: {message}")]
    DeviceConnection { device: String, message: String },

    /// Device not present in the registry
    #[error("device not found: {device}")]
    DeviceNotFound { device: String },

    // ===== Correlation Errors =====
    /// Impact candidate buffer overflow
    #[error("impact buffer overflow for '{sensor}': depth={depth}, max={max}")]
    BufferOverflow {
        sensor: String,
        depth: usize,
        max: usize,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create device connection error
    pub fn device_connection(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceConnection {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
