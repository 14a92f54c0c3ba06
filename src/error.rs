//! Client error taxonomy.
//!
//! DESIGN
//! ======
//! Every fallible operation in the crate returns [`ClientError`]. Backend
//! responses are classified by status in [`classify_status`] so the session
//! layer can tell an expired credential (which triggers the refresh cascade)
//! apart from failures that are only reported to the caller.

/// Errors produced by session, storage, and backend operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend rejected the credential (401).
    #[error("not authorized: {message}")]
    Unauthorized { message: String },

    /// The backend rejected the caller's input (400/422), or a draft failed
    /// local validation before being sent.
    #[error("invalid input: {message}")]
    Validation { message: String },

    /// The caller may not touch this resource (403).
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// The resource does not exist (404).
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Any other non-success status.
    #[error("server error: status {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The stored or issued token could not be decoded.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// The credential store could not be read or written.
    #[error("credential storage failed: {0}")]
    Storage(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// An authenticated operation was attempted without a session.
    #[error("not logged in")]
    NotLoggedIn,
}

impl ClientError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_TRANSPORT",
            Self::Unauthorized { .. } => "E_UNAUTHORIZED",
            Self::Validation { .. } => "E_VALIDATION",
            Self::Forbidden { .. } => "E_FORBIDDEN",
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::Server { .. } => "E_SERVER",
            Self::Decode(_) => "E_DECODE",
            Self::MalformedCredential(_) => "E_MALFORMED_CREDENTIAL",
            Self::Storage(_) => "E_STORAGE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::NotLoggedIn => "E_NOT_LOGGED_IN",
        }
    }

    /// Whether a caller could reasonably try the same request again.
    ///
    /// Nothing in the crate retries on its own; this is advisory.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server { status: 429 | 500..=599, .. })
    }

    /// Whether this error means the credential is no longer accepted.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Build a local validation error.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

// =============================================================================
// STATUS CLASSIFICATION
// =============================================================================

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Pull a human-readable message out of an error response body.
///
/// The backend answers `{"message": "..."}`; some routes use `{"error": "..."}`.
/// Falls back to the raw body, then to `fallback`.
pub(crate) fn extract_message(body: &str, fallback: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.error) {
            if !message.trim().is_empty() {
                return message;
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') || trimmed.starts_with('<') {
        fallback.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Map a non-success HTTP status and its body to a [`ClientError`].
pub(crate) fn classify_status(status: u16, body: &str) -> ClientError {
    match status {
        401 => ClientError::Unauthorized { message: extract_message(body, "session expired") },
        400 | 422 => ClientError::Validation { message: extract_message(body, "request rejected") },
        403 => ClientError::Forbidden { message: extract_message(body, "not allowed") },
        404 => ClientError::NotFound { message: extract_message(body, "not found") },
        _ => ClientError::Server { status, message: extract_message(body, "request failed") },
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
