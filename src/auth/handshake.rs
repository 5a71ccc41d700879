//! Connection handshake verification.
//!
//! The WebSocket upgrade carries `?userId=` (trusted deployments) or
//! `?token=` (JWT deployments). A `HandshakeVerifier` turns that into the
//! connection's user identity.

use serde::Deserialize;

use crate::auth::jwt;
use crate::error::ChatError;

/// Query parameters presented on `GET /ws`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

pub trait HandshakeVerifier: Send + Sync {
    /// Resolve the handshake to a user identity or refuse it.
    fn verify(&self, handshake: &Handshake) -> Result<String, ChatError>;
}

/// Trusts the `userId` supplied by the client. Token verification is expected
/// to happen upstream (gateway or identity service).
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedHandshake;

impl HandshakeVerifier for TrustedHandshake {
    fn verify(&self, handshake: &Handshake) -> Result<String, ChatError> {
        handshake
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ChatError::Authentication("Missing user identity".to_string()))
    }
}

/// Requires an HS256 token and takes the identity from its `sub` claim.
#[derive(Clone)]
pub struct JwtHandshake {
    secret: Vec<u8>,
}

impl JwtHandshake {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl HandshakeVerifier for JwtHandshake {
    fn verify(&self, handshake: &Handshake) -> Result<String, ChatError> {
        let token = handshake
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ChatError::Authentication("Missing token".to_string()))?;

        let claims = jwt::validate_access_token(&self.secret, token).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ChatError::Authentication("Token expired".to_string())
                }
                _ => ChatError::Authentication("Token invalid".to_string()),
            }
        })?;

        if claims.sub.trim().is_empty() {
            return Err(ChatError::Authentication("Token has no subject".to_string()));
        }
        Ok(claims.sub)
    }
}
