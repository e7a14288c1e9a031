//! Client configuration and endpoint construction.

use std::time::Duration;

use admission::{PolicyError, RatePolicy};
use serde::Deserialize;
use thiserror::Error;

/// Default Bot API server.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Default per-request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A bot token.
///
/// The token is part of every request URL, so it is never printed: `Debug`
/// shows a placeholder and there is no `Display` impl.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct BotToken(String);

impl BotToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building request URLs.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for BotToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BotToken(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Errors detected while validating a [`ClientConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("bot token is missing or empty")]
    EmptyToken,

    #[error("api_url must start with http:// or https:// (got '{0}')")]
    InvalidApiUrl(String),

    #[error("request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Everything needed to build a [`crate::Bot`].
///
/// Every field except `token` has a default, so a configuration file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub token: BotToken,
    /// Base URL of the Bot API server, without a trailing slash.
    pub api_url: String,
    pub request_timeout_secs: u64,
    /// Route calls to the platform's test environment.
    pub test_environment: bool,
    pub rate: RatePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: BotToken::default(),
            api_url: DEFAULT_API_URL.to_owned(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            test_environment: false,
            rate: RatePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: BotToken::new(token),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks the configuration can produce a working client.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        if !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://")) {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.rate.validate()?;
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            api_url: self.api_url.trim_end_matches('/').to_owned(),
            token: self.token.clone(),
            test_environment: self.test_environment,
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Builds the URLs a bot talks to. URLs embed the token; never log them.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    api_url: String,
    token: BotToken,
    test_environment: bool,
}

impl Endpoint {
    /// `<api_url>/bot<token>/<method>`, with `/test` before the method in the
    /// test environment.
    pub fn method_url(&self, method: &str) -> String {
        let environment = if self.test_environment { "/test" } else { "" };
        format!(
            "{}/bot{}{}/{}",
            self.api_url,
            self.token.expose(),
            environment,
            method
        )
    }

    /// Download URL for a `file_path` returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_url,
            self.token.expose(),
            file_path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("api_url", &self.api_url)
            .field("token", &self.token)
            .field("test_environment", &self.test_environment)
            .finish()
    }
}
