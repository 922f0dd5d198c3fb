//! DeviceSource trait - Device notification source abstraction
//!
//! Defines a unified interface for notification sources, decoupling the
//! ingestion adapters from concrete transports. Simulated, replayed and
//! real (external transport) devices all implement the same surface.

use std::sync::Arc;

use crate::{DeviceRole, Notification};

/// Notification callback type
///
/// When a device produces a notification, it is delivered through this
/// callback. Uses `Arc` to allow callback sharing across contexts.
pub type NotificationCallback = Arc<dyn Fn(Notification) + Send + Sync>;

/// Device notification source trait
///
/// Abstracts the common behavior of simulated, replayed and real devices.
/// All notification sources implement this trait for use by the
/// ingestion pipeline.
pub trait DeviceSource: Send + Sync {
    /// Get device ID (hardware address or configured name)
    fn device_id(&self) -> &str;

    /// Get device role
    fn role(&self) -> DeviceRole;

    /// Register notification callback
    ///
    /// If already listening, repeated calls must be idempotent (no second
    /// callback is registered).
    fn listen(&self, callback: NotificationCallback);

    /// Stop producing notifications
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;

    /// Check if the source delivered everything it ever will
    ///
    /// A finished scripted sequence or a completed replay is exhausted,
    /// not lost: supervision must not attempt to reconnect it. Live
    /// transports never exhaust.
    fn is_exhausted(&self) -> bool {
        false
    }
}
