//! The `{ok, ...}` envelope wrapping every Bot API response.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{BotError, ChatId, DecodeError};

/// HTTP-style code the platform uses for flood control.
pub const RATE_LIMITED_CODE: i64 = 429;

/// Back-off used when a 429 carries no usable `retry_after` hint.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Extra information attached to some failed responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before repeating a rate-limited request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// The group was migrated to a supergroup with this id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
}

/// A raw response envelope; `result` stays undecoded until the caller names
/// the expected type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ResponseParameters>,
}

impl ResponseEnvelope {
    /// Parses an envelope from a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(body).map_err(|e| DecodeError::Envelope(e.to_string()))
    }

    /// Decodes the result as `T`, or maps a failure envelope to a typed error.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, BotError> {
        if self.ok {
            let result = self.result.ok_or(DecodeError::MissingResult)?;
            return serde_json::from_value(result)
                .map_err(|e| BotError::Decode(DecodeError::Result(e.to_string())));
        }

        let description = self.description.unwrap_or_default();
        let parameters = self.parameters.unwrap_or_default();
        let code = self.error_code.unwrap_or_default();

        if code == RATE_LIMITED_CODE {
            let retry_after = match parameters.retry_after {
                Some(secs) => Duration::from_secs(secs),
                None => {
                    let parsed = retry_after_from_description(&description);
                    debug!(parsed = ?parsed, "rate limit response carries no retry_after parameter");
                    parsed.map(Duration::from_secs).unwrap_or(DEFAULT_RETRY_AFTER)
                }
            };
            return Err(BotError::RateLimited {
                retry_after,
                description,
            });
        }

        Err(BotError::Api {
            code,
            description,
            migrate_to_chat_id: parameters.migrate_to_chat_id.map(ChatId::Id),
        })
    }
}

/// Extracts `N` from descriptions such as `"Too Many Requests: retry after 5"`.
fn retry_after_from_description(description: &str) -> Option<u64> {
    let (_, tail) = description.rsplit_once("retry after ")?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, ObjectOrTrue};

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, BotError> {
        ResponseEnvelope::from_slice(body.as_bytes())?.into_result()
    }

    #[test]
    fn rate_limit_maps_to_typed_error() {
        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 5","parameters":{"retry_after":5}}"#;
        let err = decode::<bool>(body).unwrap_err();
        assert_eq!(
            err,
            BotError::RateLimited {
                retry_after: Duration::from_secs(5),
                description: "Too Many Requests: retry after 5".into(),
            }
        );
    }

    #[test]
    fn rate_limit_without_parameters_reads_description() {
        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 12"}"#;
        let err = decode::<bool>(body).unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));

        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests"}"#;
        let err = decode::<bool>(body).unwrap_err();
        assert_eq!(err.retry_after(), Some(DEFAULT_RETRY_AFTER));
    }

    #[test]
    fn api_errors_carry_code_and_migration() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: group chat was upgraded to a supergroup chat","parameters":{"migrate_to_chat_id":-1001234}}"#;
        let err = decode::<bool>(body).unwrap_err();
        assert_eq!(
            err,
            BotError::Api {
                code: 400,
                description: "Bad Request: group chat was upgraded to a supergroup chat".into(),
                migrate_to_chat_id: Some(ChatId::Id(-1_001_234)),
            }
        );
    }

    #[test]
    fn edit_results_decode_both_cases() {
        let confirmed = decode::<ObjectOrTrue<Message>>(r#"{"ok":true,"result":true}"#).unwrap();
        assert_eq!(confirmed, ObjectOrTrue::Confirmed);

        let body = r#"{"ok":true,"result":{"message_id":1,"date":0,"chat":{"id":9,"type":"private"}}}"#;
        let object = decode::<ObjectOrTrue<Message>>(body).unwrap();
        let message = object.into_object().unwrap();
        assert_eq!(message.message_id.get(), 1);
        assert_eq!(message.chat.id, 9);
    }

    #[test]
    fn success_without_result_is_a_decode_error() {
        let err = decode::<bool>(r#"{"ok":true}"#).unwrap_err();
        assert_eq!(err, BotError::Decode(DecodeError::MissingResult));
    }

    #[test]
    fn mismatched_result_is_a_decode_error() {
        let err = decode::<ObjectOrTrue<Message>>(r#"{"ok":true,"result":false}"#).unwrap_err();
        assert!(matches!(err, BotError::Decode(DecodeError::Result(_))));

        let err = ResponseEnvelope::from_slice(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }
}
