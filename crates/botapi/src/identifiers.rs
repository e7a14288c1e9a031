//! Newtype identifiers for Bot API objects.
//!
//! Every platform object that has an identity is represented as a distinct
//! newtype wrapping a primitive. This prevents accidentally interchanging, for
//! example, a [`MessageId`] with a [`UserId`] even though both are `i64` on the
//! wire.
//!
//! [`ChatId`] is the exception: the platform accepts either a numeric id or a
//! public `@username`, so it is a closed two-case enum rather than a newtype.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for i64-wrapped newtypes (platform-assigned integers).
// Generates: struct (Copy), new(), get(), Display, From<i64>.
// ---------------------------------------------------------------------------
macro_rules! int_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: platform-integer-backed
// ---------------------------------------------------------------------------

int_id! {
    /// Identifies a message within a single chat.
    ///
    /// Message ids are only unique per chat; pair with a [`ChatId`] to address
    /// a message globally.
    MessageId
}

int_id! {
    /// Identifies a user or bot account.
    UserId
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a file stored on the platform's servers.
    ///
    /// Can be reused to send the same file again without re-uploading it.
    FileId
}

string_id! {
    /// Identifies a message sent via inline mode (no chat is attached).
    InlineMessageId
}

// ---------------------------------------------------------------------------
// Chat addressing
// ---------------------------------------------------------------------------

/// Addresses a chat: either its numeric id or a public `@username`.
///
/// Numeric ids for groups, supergroups and channels are negative; private
/// chats carry the (positive) id of the user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    /// Numeric chat identifier.
    Id(i64),
    /// Public username including the leading `@` (e.g. `"@channelname"`).
    Username(String),
}

impl ChatId {
    /// Returns `true` if this chat is a group, supergroup or channel.
    ///
    /// Username addressing is only possible for public groups and channels,
    /// so it always counts as group-like.
    pub fn is_group_like(&self) -> bool {
        match self {
            ChatId::Id(id) => *id < 0,
            ChatId::Username(_) => true,
        }
    }
}

impl From<i64> for ChatId {
    fn from(value: i64) -> Self {
        ChatId::Id(value)
    }
}

impl From<UserId> for ChatId {
    fn from(value: UserId) -> Self {
        ChatId::Id(value.get())
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{id}"),
            ChatId::Username(name) => write!(f, "{name}"),
        }
    }
}

/// Error returned when a string is neither an integer nor an `@username`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid chat id '{0}': expected an integer or an @username")]
pub struct ParseChatIdError(String);

impl FromStr for ChatId {
    type Err = ParseChatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.parse::<i64>() {
            return Ok(ChatId::Id(id));
        }
        match s.strip_prefix('@') {
            Some(name) if !name.is_empty() => Ok(ChatId::Username(s.to_owned())),
            _ => Err(ParseChatIdError(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Admission keys
// ---------------------------------------------------------------------------

/// The capacity pool an outbound call is charged against.
///
/// Account-scoped operations (`getMe`, `setMyCommands`, ...) draw only from
/// the global pool; everything addressed at a chat also draws from that
/// chat's pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Global-only; no per-destination pool is touched.
    Account,
    /// A specific chat.
    Chat(ChatId),
}

impl From<ChatId> for Destination {
    fn from(value: ChatId) -> Self {
        Destination::Chat(value)
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Account => write!(f, "none"),
            Destination::Chat(chat) => write!(f, "{chat}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single dispatched call.
///
/// Generated fresh for every call and recorded on its tracing span, so the
/// admission wait, the HTTP exchange and the decode step can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(Uuid);

impl CallId {
    /// Generates a new random call identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_parses_numbers_and_usernames() {
        assert_eq!("-1001".parse::<ChatId>(), Ok(ChatId::Id(-1001)));
        assert_eq!(
            "@news".parse::<ChatId>(),
            Ok(ChatId::Username("@news".to_owned()))
        );
        assert!("news".parse::<ChatId>().is_err());
        assert!("@".parse::<ChatId>().is_err());
    }

    #[test]
    fn chat_id_serializes_untagged() {
        assert_eq!(serde_json::to_string(&ChatId::Id(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&ChatId::Username("@news".into())).unwrap(),
            "\"@news\""
        );
    }

    #[test]
    fn group_classification() {
        assert!(ChatId::Id(-100).is_group_like());
        assert!(!ChatId::Id(100).is_group_like());
        assert!(ChatId::Username("@news".into()).is_group_like());
    }

    #[test]
    fn account_destination_displays_sentinel() {
        assert_eq!(Destination::Account.to_string(), "none");
        assert_eq!(Destination::Chat(ChatId::Id(7)).to_string(), "7");
    }
}
