//! Courier transport dispatcher.
//!
//! [`Bot`] sequences one Bot API call end to end. It waits for capacity from
//! an [`admission::Scheduler`], then encodes the request with
//! [`botapi::encode`] and sends the body through an
//! [`botapi::HttpTransport`]. Finally it decodes the response envelope into
//! the method's typed result or a [`botapi::BotError`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTPS transport ([`ReqwestTransport`]), client
//! configuration and the dispatcher live here. Wire shapes and the error
//! taxonomy come from `botapi`; pacing comes from `admission`.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`bot`] | `Bot`, the per-call state machine |
//! | [`config`] | `ClientConfig`, `BotToken`, `Endpoint`, `ConfigError` |
//! | [`http`] | `ReqwestTransport` |
//! | [`retry`] | Opt-in re-submission after `RateLimited` |
//! | [`error`] | `ClientError` |

pub mod bot;
pub mod config;
pub mod error;
pub mod http;
pub mod retry;

pub use bot::Bot;
pub use config::{BotToken, ClientConfig, ConfigError, Endpoint};
pub use error::ClientError;
pub use http::ReqwestTransport;
pub use retry::{retry_rate_limited, RetryConfig};
