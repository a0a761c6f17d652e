//! Client device metadata attached to a session.

use serde::{Deserialize, Serialize};

/// Structured device description supplied by the client at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Device class, e.g. `"mobile"`, `"desktop"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Operating system name and version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Browser or app name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    /// App version when the client is a native app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Push notification token for the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
}
