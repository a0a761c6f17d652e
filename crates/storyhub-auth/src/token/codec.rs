//! Per-class token signing and verification.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use storyhub_core::config::{AuthConfig, TokenClassConfig};
use storyhub_core::error::AppError;

use super::claims::{TokenClaims, TokenType};

/// Clock skew tolerated when checking `exp`.
const LEEWAY_SECONDS: u64 = 5;

/// Token codec failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Correctly signed, but past its expiry.
    #[error("token expired")]
    Expired,
    /// Malformed, tampered, wrong issuer, or wrong class.
    #[error("token invalid")]
    Invalid,
    /// The token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Signs and verifies tokens of a single class.
///
/// Each instance owns its secret, lifetime, issuer, and algorithm; nothing
/// is read from global state.
#[derive(Clone)]
pub struct TokenCodec {
    token_type: TokenType,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("token_type", &self.token_type)
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec for `token_type` from its class profile.
    ///
    /// Only HMAC algorithms are accepted.
    pub fn new(token_type: TokenType, config: &TokenClassConfig) -> Result<Self, AppError> {
        config.validate(token_type.as_str())?;
        let algorithm = Algorithm::from_str(&config.algorithm).map_err(|e| {
            AppError::configuration(format!("Unknown token algorithm '{}': {e}", config.algorithm))
        })?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AppError::configuration(format!(
                "Token class {token_type} must use an HMAC algorithm"
            )));
        }

        Ok(Self {
            token_type,
            algorithm,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            lifetime: Duration::from_secs(config.expires_in_seconds),
        })
    }

    /// The class this codec signs.
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// Lifetime of tokens minted by this codec.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign `claims`, stamping the class-owned fields at the current time.
    pub fn sign(&self, claims: TokenClaims) -> Result<String, TokenError> {
        self.sign_at(claims, Utc::now().timestamp())
    }

    /// Sign `claims` as if issued at `issued_at` (seconds since epoch).
    pub fn sign_at(&self, mut claims: TokenClaims, issued_at: i64) -> Result<String, TokenError> {
        claims.token_type = self.token_type;
        claims.iss = self.issuer.clone();
        claims.iat = issued_at;
        claims.exp = issued_at + self.lifetime.as_secs() as i64;
        if claims.jti.is_nil() {
            claims.jti = Uuid::new_v4();
        }

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, issuer, expiry, and class.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = LEEWAY_SECONDS;
        validation.set_issuer(&[self.issuer.as_str()]);

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        if claims.token_type != self.token_type {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }

    /// Read the claims without checking the signature or expiry.
    ///
    /// Only for error-path introspection, such as recovering the socket of
    /// an expired pairing code. Never authorize anything from the result.
    pub fn decode_unverified(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }
}

/// One codec per signed token class, built from `auth.tokens`.
#[derive(Debug, Clone)]
pub struct TokenCodecs {
    /// Session-bound access tokens.
    pub access: TokenCodec,
    /// Password reset links.
    pub reset_password: TokenCodec,
    /// Email confirmation links.
    pub email_confirm: TokenCodec,
    /// Device metadata update grants.
    pub device_update: TokenCodec,
    /// QR pairing codes.
    pub qr_login: TokenCodec,
    refresh_lifetime: Duration,
}

impl TokenCodecs {
    /// Build every codec. Fails on any invalid class profile.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AppError> {
        let tokens = &config.tokens;
        tokens.refresh.validate("refresh")?;
        Ok(Self {
            access: TokenCodec::new(TokenType::Access, &tokens.access)?,
            reset_password: TokenCodec::new(TokenType::ResetPassword, &tokens.reset_password)?,
            email_confirm: TokenCodec::new(TokenType::EmailConfirm, &tokens.email_confirm)?,
            device_update: TokenCodec::new(TokenType::DeviceUpdate, &tokens.device_update)?,
            qr_login: TokenCodec::new(TokenType::QrLogin, &tokens.qr_login)?,
            refresh_lifetime: Duration::from_secs(tokens.refresh.expires_in_seconds),
        })
    }

    /// Lifetime of a session, carried by its refresh token.
    pub fn refresh_lifetime(&self) -> Duration {
        self.refresh_lifetime
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    fn codec(token_type: TokenType, secret: &str) -> TokenCodec {
        let config = TokenClassConfig {
            secret: secret.to_string(),
            expires_in_seconds: 60,
            issuer: "storyhub-test".to_string(),
            algorithm: "HS256".to_string(),
        };
        TokenCodec::new(token_type, &config).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let codec = codec(TokenType::QrLogin, "qr-secret");
        let token = codec.sign(TokenClaims::new("socket-1").with_socket("socket-1")).unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.token_type, TokenType::QrLogin);
        assert_eq!(claims.socket_id.as_deref(), Some("socket-1"));
        assert_eq!(claims.iss, "storyhub-test");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_expired_is_distinct_from_invalid() {
        let codec = codec(TokenType::QrLogin, "qr-secret");
        let stale = codec
            .sign_at(TokenClaims::new("socket-1"), Utc::now().timestamp() - 3600)
            .unwrap();
        assert_eq!(codec.verify(&stale), Err(TokenError::Expired));
        assert_eq!(codec.verify("not-a-token"), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = codec(TokenType::QrLogin, "secret-a");
        let verifier = codec(TokenType::QrLogin, "secret-b");
        let token = issuer.sign(TokenClaims::new("socket-1")).unwrap();
        assert_eq!(verifier.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_class_confusion_rejected_even_with_shared_secret() {
        let reset = codec(TokenType::ResetPassword, "shared");
        let access = codec(TokenType::Access, "shared");
        let token = reset.sign(TokenClaims::new(Uuid::new_v4().to_string())).unwrap();
        assert_eq!(access.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let codec = codec(TokenType::Access, "secret");
        let token = codec.sign(TokenClaims::new("user-1")).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut claims = codec.decode_unverified(&token).unwrap();
        claims.sub = "user-2".to_string();
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        assert_eq!(codec.verify(&parts.join(".")), Err(TokenError::Invalid));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let codec = codec(TokenType::Access, "secret");
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let mut claims = TokenClaims::new("user-1");
        claims.exp = Utc::now().timestamp() + 600;
        claims.iss = "storyhub-test".to_string();
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        assert_eq!(
            codec.verify(&format!("{header}.{payload}.")),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_decode_unverified_reads_expired_token() {
        let codec = codec(TokenType::QrLogin, "qr-secret");
        let stale = codec
            .sign_at(
                TokenClaims::new("socket-9").with_socket("socket-9"),
                Utc::now().timestamp() - 3600,
            )
            .unwrap();
        let claims = codec.decode_unverified(&stale).unwrap();
        assert_eq!(claims.socket_id.as_deref(), Some("socket-9"));
    }

    #[test]
    fn test_asymmetric_algorithm_rejected_at_construction() {
        let config = TokenClassConfig {
            secret: "secret".to_string(),
            expires_in_seconds: 60,
            issuer: "storyhub".to_string(),
            algorithm: "RS256".to_string(),
        };
        assert!(TokenCodec::new(TokenType::Access, &config).is_err());
    }
}
