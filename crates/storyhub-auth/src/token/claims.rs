//! Claims carried by every signed token class.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storyhub_entity::user::UserRole;

/// Discriminator embedded in the signed payload.
///
/// A codec only accepts tokens of its own type, so a token minted for one
/// purpose never verifies as another even if the secrets were shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Session-bound API access.
    Access,
    /// Refresh lineage. Refresh tokens are opaque, so no codec signs this type.
    Refresh,
    /// Password reset link.
    ResetPassword,
    /// Email confirmation link.
    EmailConfirm,
    /// Device metadata update grant.
    DeviceUpdate,
    /// QR pairing code.
    QrLogin,
}

impl TokenType {
    /// Return the type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::ResetPassword => "reset_password",
            Self::EmailConfirm => "email_confirm",
            Self::DeviceUpdate => "device_update",
            Self::QrLogin => "qr_login",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed token payload.
///
/// `token_type`, `iss`, `iat`, `exp`, and `jti` belong to the codec and are
/// stamped when signing; callers set the subject and the type-specific
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Token class.
    pub token_type: TokenType,
    /// Issuer.
    pub iss: String,
    /// Subject: a user id, or a socket id for QR pairing codes.
    pub sub: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
    /// Account email, for account tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Role at issuance, for access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<UserRole>,
    /// Bound session, for access and device-update tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// Waiting socket, for QR pairing codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
}

impl TokenClaims {
    /// Start a claim set for `subject`.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            token_type: TokenType::Access,
            iss: String::new(),
            sub: subject.into(),
            iat: 0,
            exp: 0,
            jti: Uuid::nil(),
            email: None,
            user_role: None,
            session_id: None,
            socket_id: None,
        }
    }

    /// Attach an email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attach a role.
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.user_role = Some(role);
        self
    }

    /// Bind to a session.
    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Bind to a waiting socket.
    pub fn with_socket(mut self, socket_id: impl Into<String>) -> Self {
        self.socket_id = Some(socket_id.into());
        self
    }

    /// Parse the subject as a user id.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}
