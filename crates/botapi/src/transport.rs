//! Port through which encoded requests reach the platform.
//!
//! The `client` crate implements [`HttpTransport`] over HTTPS; tests
//! substitute in-memory implementations. Implementations only move bytes:
//! admission control and envelope decoding stay in the dispatcher.

use async_trait::async_trait;

use crate::{EncodedRequest, TransportError};

/// Raw HTTP response: status plus body bytes.
///
/// The platform sends an envelope on error statuses too (400, 403, 429), so
/// a non-2xx status is not a transport failure by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one encoded request and returns the raw response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POSTs `request` to the operation's endpoint.
    ///
    /// Returns `Err` only when no HTTP response was obtained (connection,
    /// timeout, IO).
    async fn post(&self, request: EncodedRequest) -> Result<HttpResponse, TransportError>;
}
