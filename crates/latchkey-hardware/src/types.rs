//! Common types shared across hardware device implementations.

use latchkey_core::DoorPosition;
use serde::{Deserialize, Serialize};

/// Generic device information.
///
/// Used for startup logging of which implementation backs each capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "Door strike", "Mock contact sensor").
    pub name: String,

    /// Backend identifier (e.g., "sysfs-gpio22", "noop").
    pub model: String,
}

impl DeviceInfo {
    /// Create a new DeviceInfo.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.model)
    }
}

/// Level of the contact sensor input.
///
/// The sensor follows the normally-closed convention: a closed door holds
/// the switch pressed, opening the door releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactLevel {
    /// Switch held (door closed).
    Pressed,
    /// Switch released (door open).
    Released,
}

impl ContactLevel {
    /// Door position implied by this level.
    #[must_use]
    pub fn door_position(self) -> DoorPosition {
        match self {
            Self::Pressed => DoorPosition::Closed,
            Self::Released => DoorPosition::Open,
        }
    }
}
