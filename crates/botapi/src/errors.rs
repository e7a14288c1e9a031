//! Error taxonomy and retry-policy types for Bot API calls.
//!
//! Every dispatched call ends in exactly one of: a decoded result, or one
//! [`BotError`]. Nothing is swallowed and nothing is retried implicitly; the
//! caller consults [`BotError::retry_policy`] to decide whether re-submitting
//! is safe.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ChatId;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// ## Rules
///
/// - `Retryable` errors: transport failures, timeouts, rate-limit responses,
///   server-side (5xx) API errors.
/// - `NonRetryable` errors: validation and authorisation failures (4xx),
///   decode and encode failures, cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (taken
    /// from the `retry_after` response parameter).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without changing the request.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Transport failures
// ---------------------------------------------------------------------------

/// Classification of a failed HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established.
    Connect,
    /// The request or response exceeded the configured timeout.
    Timeout,
    /// The server answered with a non-success status and no decodable envelope.
    Status(u16),
    /// Reading or writing the body failed.
    Io,
    /// Any other client-side failure (request building, TLS, redirects).
    Other,
}

/// The HTTP exchange itself failed; no envelope was received.
///
/// The message never contains the request URL, because the URL embeds the
/// bot token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error ({kind:?}): {message}")]
pub struct TransportError {
    /// What went wrong.
    pub kind: TransportErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl TransportError {
    /// Creates a [`TransportError`].
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Decode failures
// ---------------------------------------------------------------------------

/// The response (or a variant-typed value inside it) did not match the
/// expected shape.
///
/// Always a contract mismatch between this client and the platform; never
/// retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The body was not a valid `{ok, ...}` envelope.
    #[error("malformed response envelope: {0}")]
    Envelope(String),

    /// `ok` was `true` but no `result` was present.
    #[error("response envelope reported success without a result")]
    MissingResult,

    /// The `result` did not decode into the method's response type.
    #[error("result does not match the expected type: {0}")]
    Result(String),

    /// No concrete shape of a variant family matched the value.
    #[error("value matches no known {family} shape (found {found})")]
    UnknownVariant {
        /// Name of the variant family (e.g. `"ReplyMarkup"`).
        family: &'static str,
        /// Short description of the offending value.
        found: String,
    },
}

// ---------------------------------------------------------------------------
// Call-level errors
// ---------------------------------------------------------------------------

/// Every way a dispatched Bot API call can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BotError {
    /// Connection, IO, timeout or bare HTTP status failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The envelope or a variant shape inside it could not be parsed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The request value could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// The platform answered `ok: false` with a code other than 429.
    #[error("Bot API error {code}: {description}")]
    Api {
        /// The platform's `error_code`.
        code: i64,
        /// The platform's `description`.
        description: String,
        /// Set when a group was upgraded to a supergroup; re-address the
        /// request to this chat.
        migrate_to_chat_id: Option<ChatId>,
    },

    /// The platform answered `ok: false` with code 429.
    #[error("rate limited, retry after {}s: {description}", retry_after.as_secs())]
    RateLimited {
        /// How long the platform asked the caller to wait.
        retry_after: Duration,
        /// The platform's `description`.
        description: String,
    },

    /// The caller's cancellation signal fired during admission or in flight.
    #[error("call cancelled")]
    Cancelled,
}

impl BotError {
    /// Returns whether re-submitting the same request is reasonable.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            BotError::Transport(_) => RetryPolicy::Retryable { after: None },
            BotError::RateLimited { retry_after, .. } => RetryPolicy::Retryable {
                after: Some(*retry_after),
            },
            BotError::Api { code, .. } if *code >= 500 => RetryPolicy::Retryable { after: None },
            BotError::Api { .. }
            | BotError::Decode(_)
            | BotError::Encode(_)
            | BotError::Cancelled => RetryPolicy::NonRetryable,
        }
    }

    /// Returns the back-off hint carried by a [`BotError::RateLimited`].
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BotError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_retryable_after_hint() {
        let err = BotError::RateLimited {
            retry_after: Duration::from_secs(5),
            description: "Too Many Requests".into(),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(5))
            }
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn client_side_api_errors_are_not_retryable() {
        let err = BotError::Api {
            code: 400,
            description: "Bad Request: chat not found".into(),
            migrate_to_chat_id: None,
        };
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);

        let err = BotError::Api {
            code: 502,
            description: "Bad Gateway".into(),
            migrate_to_chat_id: None,
        };
        assert!(err.retry_policy().is_retryable());
    }

    #[test]
    fn transport_is_retryable_and_decode_is_not() {
        let transport = BotError::from(TransportError::new(TransportErrorKind::Timeout, "timed out"));
        assert!(transport.retry_policy().is_retryable());

        let decode = BotError::from(DecodeError::MissingResult);
        assert_eq!(decode.retry_policy(), RetryPolicy::NonRetryable);
        assert_eq!(BotError::Cancelled.retry_policy(), RetryPolicy::NonRetryable);
    }
}
