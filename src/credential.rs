//! Durable credential and JWT claim decoding.
//!
//! DESIGN
//! ======
//! The client never verifies token signatures; that is the backend's job.
//! It only reads the payload segment to learn the user id and the expiry, so
//! it can refresh before the first request bounces with a 401.
//!
//! STORAGE FORMAT
//! ==============
//! A credential is stored as `{"token": "...", "user": {...}}`. A stored value
//! that is not a JSON object is taken as a bare token string.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Denormalized user snapshot carried alongside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserRef {
    #[must_use]
    pub fn from_id(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: None, email: None }
    }
}

/// Decoded JWT payload fields the client cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "_id")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl Claims {
    /// The user id, whichever claim the backend put it in.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.object_id.as_deref())
            .or(self.sub.as_deref())
    }

    /// Whether the token has expired at `now` (Unix seconds).
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp <= now
    }
}

/// Bearer token plus optional user snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>, user: Option<UserRef>) -> Self {
        Self { token: token.into(), user }
    }

    /// Decode the token's payload segment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedCredential`] if the token is not a
    /// three-segment JWT with a base64url JSON payload carrying `exp`.
    pub fn claims(&self) -> Result<Claims, ClientError> {
        decode_claims(&self.token)
    }

    /// The user this credential speaks for: the snapshot when present,
    /// otherwise the id from the token's claims.
    #[must_use]
    pub fn user_ref(&self, claims: &Claims) -> Option<UserRef> {
        match (&self.user, claims.user_id()) {
            (Some(user), _) => Some(user.clone()),
            (None, Some(id)) => Some(UserRef::from_id(id)),
            (None, None) => None,
        }
    }

    /// Serialize for the credential store.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] if serialization fails.
    pub fn to_stored(&self) -> Result<String, ClientError> {
        serde_json::to_string(self).map_err(|e| ClientError::Storage(e.to_string()))
    }

    /// Parse a value read back from the credential store.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedCredential`] for an empty value or a
    /// JSON object that is not a credential.
    pub fn from_stored(raw: &str) -> Result<Self, ClientError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClientError::MalformedCredential("empty stored credential".into()));
        }
        if trimmed.starts_with('{') {
            return serde_json::from_str(trimmed).map_err(|e| ClientError::MalformedCredential(e.to_string()));
        }
        // A JSON string literal is still a bare token.
        let token = serde_json::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_owned());
        Ok(Self::new(token, None))
    }
}

/// Decode the claims of a JWT without verifying its signature.
///
/// # Errors
///
/// Returns [`ClientError::MalformedCredential`] when the token shape, the
/// base64url payload, or the JSON claims are invalid.
pub fn decode_claims(token: &str) -> Result<Claims, ClientError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ClientError::MalformedCredential("token is not a three-part JWT".into()));
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClientError::MalformedCredential(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::MalformedCredential(format!("invalid claims: {e}")))
}

/// Current Unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
#[path = "credential_test.rs"]
mod tests;
