//! Bot API domain for Courier.
//!
//! This crate contains every wire shape, newtype identifier, variant family
//! and error type used by the client. Infrastructure crates implement the
//! [`HttpTransport`] port defined here; they never reshape requests or
//! responses themselves.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies. It
//! defines *what* goes over the wire; the `client` crate defines *how* it is
//! sent, and the `admission` crate decides *when*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ChatId`, `MessageId`, `Destination`, etc.) |
//! | [`types`] | Platform objects and closed variant families (`ReplyMarkup`, `ChatMember`, etc.) |
//! | [`files`] | `InputFile` references and uploads |
//! | [`variant`] | Structural variant probing and `ObjectOrTrue` |
//! | [`request`] | `Method` trait and the JSON / multipart encoder |
//! | [`envelope`] | The `{ok, ...}` response envelope |
//! | [`errors`] | `BotError` taxonomy and `RetryPolicy` |
//! | [`transport`] | `HttpTransport` port |
//! | [`methods`] | Request structs for a representative set of operations |

pub mod envelope;
pub mod errors;
pub mod files;
pub mod identifiers;
pub mod methods;
pub mod request;
pub mod transport;
pub mod types;
pub mod variant;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use envelope::{ResponseEnvelope, ResponseParameters};
pub use errors::{BotError, DecodeError, RetryPolicy, TransportError, TransportErrorKind};
pub use files::{File, InputFile, Upload};
pub use identifiers::{
    CallId, ChatId, Destination, FileId, InlineMessageId, MessageId, ParseChatIdError, UserId,
};
pub use request::{encode, EncodedRequest, Method, Part, PartContent, RequestBody};
pub use transport::{HttpResponse, HttpTransport};
pub use types::{
    BotCommand, BotCommandScope, Chat, ChatMember, ChatType, ForceReply, InaccessibleMessage,
    InlineKeyboardButton, InlineKeyboardMarkup, InputMedia, KeyboardButton,
    MaybeInaccessibleMessage, MenuButton, Message, MessageEntity, ParseMode, ReactionType,
    ReplyKeyboardMarkup, ReplyKeyboardRemove, ReplyMarkup, ReplyParameters, User, WebAppInfo,
};
pub use variant::ObjectOrTrue;
