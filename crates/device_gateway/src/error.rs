//! Device Gateway error types

use contracts::ContractError;
use thiserror::Error;

/// Device Gateway specific error
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Blueprint names no timer device
    #[error("blueprint has no timer device")]
    NoTimer,

    /// Device source build error
    #[error("failed to build source for device '{device_id}': {message}")]
    SourceBuildFailed { device_id: String, message: String },

    /// Replay recording load error
    #[error("failed to load replay recording '{path}': {message}")]
    ReplayLoadFailed { path: String, message: String },

    /// The timer source is gone and cannot be recovered
    #[error("timer device '{device_id}' lost: {message}")]
    TimerLost { device_id: String, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl GatewayError {
    /// Create a source build error
    pub fn source_build(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceBuildFailed {
            device_id: device_id.into(),
            message: message.into(),
        }
    }

    /// Create a replay load error
    pub fn replay_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReplayLoadFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a timer lost error
    pub fn timer_lost(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TimerLost {
            device_id: device_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, GatewayError>;
