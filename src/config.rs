//! Client configuration parsed from environment variables.

use std::path::PathBuf;

use crate::error::ClientError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_AUTH_PREFIX: &str = "/api/users";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const CREDENTIAL_DIR: &str = ".recipebox";
const CREDENTIAL_FILE: &str = "credential.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin, without trailing slash.
    pub api_url: String,
    /// Route prefix for register/login/refresh/logout/profile.
    pub auth_prefix: String,
    /// File backing the durable credential store.
    pub credential_path: PathBuf,
    pub timeouts: Timeouts,
    /// Fetch the profile snapshot after a successful `initialize()`.
    pub fetch_profile: bool,
}

impl ClientConfig {
    /// Build typed config from process environment variables.
    ///
    /// Optional:
    /// - `RECIPEBOX_API_URL`: default `http://127.0.0.1:5000`
    /// - `RECIPEBOX_AUTH_PREFIX`: `/api/users` (default) or `/api/auth`
    /// - `RECIPEBOX_CREDENTIAL_PATH`: default `$HOME/.recipebox/credential.json`
    /// - `RECIPEBOX_REQUEST_TIMEOUT_SECS`: default 30
    /// - `RECIPEBOX_CONNECT_TIMEOUT_SECS`: default 10
    /// - `RECIPEBOX_FETCH_PROFILE`: default true
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] when a value is present but invalid.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] when a value is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let api_url = parse_api_url(lookup("RECIPEBOX_API_URL").as_deref())?;
        let auth_prefix = parse_auth_prefix(lookup("RECIPEBOX_AUTH_PREFIX").as_deref())?;
        let credential_path = match lookup("RECIPEBOX_CREDENTIAL_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
            _ => default_credential_path(lookup("HOME").as_deref()),
        };
        let timeouts = Timeouts {
            request_secs: parse_u64(&lookup, "RECIPEBOX_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_u64(&lookup, "RECIPEBOX_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        let fetch_profile = match lookup("RECIPEBOX_FETCH_PROFILE") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ClientError::ConfigParse(format!("invalid RECIPEBOX_FETCH_PROFILE: {raw}")))?,
            None => true,
        };

        Ok(Self { api_url, auth_prefix, credential_path, timeouts, fetch_profile })
    }
}

fn parse_api_url(raw: Option<&str>) -> Result<String, ClientError> {
    let url = raw.map_or(DEFAULT_API_URL, str::trim).trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_owned())
    } else {
        Err(ClientError::ConfigParse(format!("RECIPEBOX_API_URL must be http(s): {url}")))
    }
}

fn parse_auth_prefix(raw: Option<&str>) -> Result<String, ClientError> {
    let prefix = raw.map_or(DEFAULT_AUTH_PREFIX, str::trim).trim_end_matches('/');
    if prefix.starts_with('/') && prefix.len() > 1 {
        Ok(prefix.to_owned())
    } else {
        Err(ClientError::ConfigParse(format!("RECIPEBOX_AUTH_PREFIX must start with '/': {prefix}")))
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64, ClientError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ClientError::ConfigParse(format!("invalid {key}: {raw}"))),
        None => Ok(default),
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_credential_path(home: Option<&str>) -> PathBuf {
    let base = home.filter(|h| !h.is_empty()).map_or_else(|| PathBuf::from("."), PathBuf::from);
    base.join(CREDENTIAL_DIR).join(CREDENTIAL_FILE)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
