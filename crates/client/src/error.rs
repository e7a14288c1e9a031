//! Client construction errors.
//!
//! Failures of individual calls are [`botapi::BotError`]s; this type only
//! covers building a [`crate::Bot`].

use thiserror::Error;

use crate::ConfigError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid client configuration: {0}")]
    Config(#[from] ConfigError),

    /// The underlying HTTP client could not be built (TLS backend, proxy
    /// settings).
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
