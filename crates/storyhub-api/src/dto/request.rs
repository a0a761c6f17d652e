//! Request DTOs.

use serde::Deserialize;
use validator::Validate;

use storyhub_auth::OtpPurpose;
use storyhub_entity::session::DeviceInfo;

/// Credential login request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Account email.
    #[validate(email)]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
    /// Client device identifier.
    #[validate(length(min = 1, max = 256))]
    pub fingerprint: String,
    /// Optional device description.
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

/// Refresh token rotation request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Current refresh token.
    #[validate(length(min = 1))]
    pub refresh_token: String,
    /// Device identifier the session was created with.
    #[validate(length(min = 1, max = 256))]
    pub fingerprint: String,
}

/// Logout request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    /// Refresh token of the session to end.
    #[validate(length(min = 1))]
    pub refresh_token: String,
    /// End every session of the owner.
    #[serde(default)]
    pub all_devices: bool,
}

/// One-time passcode request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    /// Email address or mobile number.
    #[validate(length(min = 1, max = 320))]
    pub subject: String,
    /// What the code will authorize.
    pub purpose: OtpPurpose,
}

/// One-time passcode confirmation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OtpConfirmRequest {
    /// The code as typed.
    #[validate(length(min = 4, max = 10))]
    pub code: String,
    /// Email address or mobile number the code was sent to.
    #[validate(length(min = 1, max = 320))]
    pub subject: String,
    /// What the code authorizes.
    pub purpose: OtpPurpose,
    /// Device identifier for the session created on registration.
    #[serde(default)]
    #[validate(length(max = 256))]
    pub fingerprint: String,
    /// Optional device description.
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

/// QR pairing token request from the display side.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QrTokenRequest {
    /// Realtime socket the display is listening on.
    #[validate(length(min = 1, max = 128))]
    pub socket_id: String,
}

/// QR pairing completion from the scanning side.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QrLoginRequest {
    /// Token read from the QR code.
    #[validate(length(min = 1))]
    pub token: String,
    /// Device identifier bound to the new session.
    #[validate(length(min = 1, max = 256))]
    pub fingerprint: String,
    /// Optional description of the paired device.
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

/// Password reset link request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    /// Account email.
    #[validate(email)]
    pub email: String,
}

/// Password reset with a reset token.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Reset token.
    #[validate(length(min = 1))]
    pub token: String,
    /// Replacement password.
    #[validate(length(min = 1, max = 1024))]
    pub new_password: String,
}

/// Email confirmation with a confirmation token.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailRequest {
    /// Confirmation token.
    #[validate(length(min = 1))]
    pub token: String,
}

/// Device metadata update with a device update token.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeviceRequest {
    /// Device update token.
    #[validate(length(min = 1))]
    pub token: String,
    /// Replacement device description.
    pub device_info: DeviceInfo,
}
