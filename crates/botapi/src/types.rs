//! Platform object types and closed variant families.
//!
//! Plain objects (users, chats, messages) are ordinary serde structs. Fields
//! whose value is one of a fixed set of shapes are closed enums:
//!
//! | Family | Discriminator |
//! |--------|---------------|
//! | [`ReplyMarkup`] | structural: `inline_keyboard` / `keyboard` / `remove_keyboard` / `force_reply` |
//! | [`ChatMember`] | tag `status` |
//! | [`BotCommandScope`] | tag `type` |
//! | [`MenuButton`] | tag `type` |
//! | [`ReactionType`] | tag `type` |
//! | [`InputMedia`] | tag `type` |
//! | [`MaybeInaccessibleMessage`] | structural: `date == 0` marks the inaccessible shape |
//!
//! Optional fields follow the omit-if-zero rule described in
//! [`crate::request`]: `false`, `0`, empty strings and empty containers are
//! never written.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::request::{is_false, is_none_or_empty};
use crate::variant::{decode_shape, describe, probe_shape};
use crate::{ChatId, DecodeError, InputFile, MessageId, UserId};

// ---------------------------------------------------------------------------
// Users and chats
// ---------------------------------------------------------------------------

/// A user or bot account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// Kind of chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// A chat as embedded in messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Chat {
    /// Returns the id in the form accepted by requests.
    pub fn chat_id(&self) -> ChatId {
        ChatId::Id(self.id)
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// How the platform should interpret formatting in message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseMode {
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
    /// Legacy Markdown; kept for backward compatibility only.
    Markdown,
}

/// A formatting span inside message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: u32,
    pub length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    /// Unix time the message was sent; `0` for messages the bot can no longer see.
    pub date: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_message: Option<Box<MaybeInaccessibleMessage>>,
}

impl Message {
    /// Send time as a UTC timestamp, or `None` when the platform withheld it.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        if self.date == 0 {
            return None;
        }
        DateTime::from_timestamp(self.date, 0)
    }
}

/// A message the bot can no longer read; only its location survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InaccessibleMessage {
    pub chat: Chat,
    pub message_id: MessageId,
    /// Always `0`.
    pub date: i64,
}

/// A message that may or may not still be visible to the bot.
///
/// The platform marks the inaccessible shape with `date == 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MaybeInaccessibleMessage {
    Accessible(Box<Message>),
    Inaccessible(InaccessibleMessage),
}

impl MaybeInaccessibleMessage {
    pub fn chat(&self) -> &Chat {
        match self {
            MaybeInaccessibleMessage::Accessible(message) => &message.chat,
            MaybeInaccessibleMessage::Inaccessible(message) => &message.chat,
        }
    }

    pub fn message_id(&self) -> MessageId {
        match self {
            MaybeInaccessibleMessage::Accessible(message) => message.message_id,
            MaybeInaccessibleMessage::Inaccessible(message) => message.message_id,
        }
    }

    /// The full message, if the bot can still see it.
    pub fn accessible(&self) -> Option<&Message> {
        match self {
            MaybeInaccessibleMessage::Accessible(message) => Some(&**message),
            MaybeInaccessibleMessage::Inaccessible(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for MaybeInaccessibleMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value.get("date").and_then(Value::as_i64) {
            Some(0) => decode_shape::<D, _>(value).map(MaybeInaccessibleMessage::Inaccessible),
            Some(_) => decode_shape::<D, Message>(value)
                .map(|message| MaybeInaccessibleMessage::Accessible(Box::new(message))),
            None => Err(D::Error::custom(DecodeError::UnknownVariant {
                family: "MaybeInaccessibleMessage",
                found: describe(&value),
            })),
        }
    }
}

/// Identifies the message a new message replies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyParameters {
    pub message_id: MessageId,
    /// Set when replying to a message in a different chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_sending_without_reply: bool,
}

impl ReplyParameters {
    /// Replies to `message_id` in the same chat.
    pub fn to(message_id: MessageId) -> Self {
        Self {
            message_id,
            chat_id: None,
            allow_sending_without_reply: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Reply markup
// ---------------------------------------------------------------------------

/// One button of an inline keyboard. Exactly one action field should be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_inline_query: Option<String>,
}

impl InlineKeyboardButton {
    /// A button that sends `data` back to the bot in a callback query.
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
            switch_inline_query: None,
        }
    }

    /// A button that opens `url`.
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
            switch_inline_query: None,
        }
    }
}

/// Keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// One button of a custom reply keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub request_contact: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub request_location: bool,
}

/// Custom keyboard replacing the user's text keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_persistent: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub resize_keyboard: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub one_time_keyboard: bool,
    #[serde(default, skip_serializing_if = "is_none_or_empty")]
    pub input_field_placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selective: bool,
}

/// Removes the custom keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyKeyboardRemove {
    /// Always `true`; its presence is what identifies this shape.
    pub remove_keyboard: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selective: bool,
}

impl Default for ReplyKeyboardRemove {
    fn default() -> Self {
        Self {
            remove_keyboard: true,
            selective: false,
        }
    }
}

/// Asks the client to show a reply interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceReply {
    /// Always `true`; its presence is what identifies this shape.
    pub force_reply: bool,
    #[serde(default, skip_serializing_if = "is_none_or_empty")]
    pub input_field_placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selective: bool,
}

impl Default for ForceReply {
    fn default() -> Self {
        Self {
            force_reply: true,
            input_field_placeholder: None,
            selective: false,
        }
    }
}

/// The `reply_markup` field: one of four concrete shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    InlineKeyboard(InlineKeyboardMarkup),
    ReplyKeyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
    ForceReply(ForceReply),
}

#[derive(Clone, Copy)]
enum ReplyMarkupShape {
    InlineKeyboard,
    ReplyKeyboard,
    Remove,
    ForceReply,
}

impl<'de> Deserialize<'de> for ReplyMarkup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let shape = probe_shape(
            &value,
            "ReplyMarkup",
            &[
                ("inline_keyboard", ReplyMarkupShape::InlineKeyboard),
                ("keyboard", ReplyMarkupShape::ReplyKeyboard),
                ("remove_keyboard", ReplyMarkupShape::Remove),
                ("force_reply", ReplyMarkupShape::ForceReply),
            ],
        )
        .map_err(D::Error::custom)?;

        match shape {
            ReplyMarkupShape::InlineKeyboard => {
                decode_shape::<D, _>(value).map(ReplyMarkup::InlineKeyboard)
            }
            ReplyMarkupShape::ReplyKeyboard => {
                decode_shape::<D, _>(value).map(ReplyMarkup::ReplyKeyboard)
            }
            ReplyMarkupShape::Remove => decode_shape::<D, _>(value).map(ReplyMarkup::Remove),
            ReplyMarkupShape::ForceReply => decode_shape::<D, _>(value).map(ReplyMarkup::ForceReply),
        }
    }
}

impl From<InlineKeyboardMarkup> for ReplyMarkup {
    fn from(value: InlineKeyboardMarkup) -> Self {
        ReplyMarkup::InlineKeyboard(value)
    }
}

impl From<ReplyKeyboardMarkup> for ReplyMarkup {
    fn from(value: ReplyKeyboardMarkup) -> Self {
        ReplyMarkup::ReplyKeyboard(value)
    }
}

impl From<ReplyKeyboardRemove> for ReplyMarkup {
    fn from(value: ReplyKeyboardRemove) -> Self {
        ReplyMarkup::Remove(value)
    }
}

impl From<ForceReply> for ReplyMarkup {
    fn from(value: ForceReply) -> Self {
        ReplyMarkup::ForceReply(value)
    }
}

// ---------------------------------------------------------------------------
// Chat members
// ---------------------------------------------------------------------------

/// A chat member, discriminated by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatMember {
    #[serde(rename = "creator")]
    Owner {
        user: User,
        #[serde(default)]
        is_anonymous: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_title: Option<String>,
    },
    Administrator {
        user: User,
        #[serde(default)]
        can_be_edited: bool,
        #[serde(default)]
        is_anonymous: bool,
        #[serde(default)]
        can_manage_chat: bool,
        #[serde(default)]
        can_delete_messages: bool,
        #[serde(default)]
        can_restrict_members: bool,
        #[serde(default)]
        can_promote_members: bool,
        #[serde(default)]
        can_invite_users: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_title: Option<String>,
    },
    Member {
        user: User,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        until_date: Option<i64>,
    },
    Restricted {
        user: User,
        #[serde(default)]
        is_member: bool,
        #[serde(default)]
        can_send_messages: bool,
        /// Unix time the restriction lifts; `0` means forever.
        #[serde(default)]
        until_date: i64,
    },
    Left {
        user: User,
    },
    #[serde(rename = "kicked")]
    Banned {
        user: User,
        /// Unix time the ban lifts; `0` means forever.
        #[serde(default)]
        until_date: i64,
    },
}

impl ChatMember {
    /// The user this membership record describes.
    pub fn user(&self) -> &User {
        match self {
            ChatMember::Owner { user, .. }
            | ChatMember::Administrator { user, .. }
            | ChatMember::Member { user, .. }
            | ChatMember::Restricted { user, .. }
            | ChatMember::Left { user }
            | ChatMember::Banned { user, .. } => user,
        }
    }

    /// Returns `true` if the user currently belongs to the chat.
    pub fn is_present(&self) -> bool {
        match self {
            ChatMember::Owner { .. } | ChatMember::Administrator { .. } | ChatMember::Member { .. } => {
                true
            }
            ChatMember::Restricted { is_member, .. } => *is_member,
            ChatMember::Left { .. } | ChatMember::Banned { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands and menu buttons
// ---------------------------------------------------------------------------

/// A bot command shown in the client's command menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

/// Which users a command list applies to, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BotCommandScope {
    Default,
    AllPrivateChats,
    AllGroupChats,
    AllChatAdministrators,
    Chat { chat_id: ChatId },
    ChatAdministrators { chat_id: ChatId },
    ChatMember { chat_id: ChatId, user_id: UserId },
}

/// A Web App launched from a button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppInfo {
    pub url: String,
}

/// The bot's menu button in a private chat, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MenuButton {
    Commands,
    WebApp { text: String, web_app: WebAppInfo },
    Default,
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// A reaction on a message, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactionType {
    Emoji { emoji: String },
    CustomEmoji { custom_emoji_id: String },
    Paid,
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// One item of a media group or an edited media message, discriminated by
/// `type`.
///
/// Serialize-only: media descriptors are never returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputMedia {
    Photo {
        media: InputFile,
        #[serde(skip_serializing_if = "is_none_or_empty")]
        caption: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        parse_mode: Option<ParseMode>,
        #[serde(skip_serializing_if = "is_false")]
        has_spoiler: bool,
    },
    Video {
        media: InputFile,
        #[serde(skip_serializing_if = "is_none_or_empty")]
        caption: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        parse_mode: Option<ParseMode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u32>,
        #[serde(skip_serializing_if = "is_false")]
        supports_streaming: bool,
    },
    Animation {
        media: InputFile,
        #[serde(skip_serializing_if = "is_none_or_empty")]
        caption: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        parse_mode: Option<ParseMode>,
    },
    Audio {
        media: InputFile,
        #[serde(skip_serializing_if = "is_none_or_empty")]
        caption: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        parse_mode: Option<ParseMode>,
        #[serde(skip_serializing_if = "is_none_or_empty")]
        performer: Option<String>,
        #[serde(skip_serializing_if = "is_none_or_empty")]
        title: Option<String>,
    },
    Document {
        media: InputFile,
        #[serde(skip_serializing_if = "is_none_or_empty")]
        caption: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        parse_mode: Option<ParseMode>,
        #[serde(skip_serializing_if = "is_false")]
        disable_content_type_detection: bool,
    },
}

impl InputMedia {
    /// A photo with no caption.
    pub fn photo(media: InputFile) -> Self {
        InputMedia::Photo {
            media,
            caption: None,
            parse_mode: None,
            has_spoiler: false,
        }
    }

    /// A document with no caption.
    pub fn document(media: InputFile) -> Self {
        InputMedia::Document {
            media,
            caption: None,
            parse_mode: None,
            disable_content_type_detection: false,
        }
    }

    /// The file this item sends.
    pub fn media(&self) -> &InputFile {
        match self {
            InputMedia::Photo { media, .. }
            | InputMedia::Video { media, .. }
            | InputMedia::Animation { media, .. }
            | InputMedia::Audio { media, .. }
            | InputMedia::Document { media, .. } => media,
        }
    }
}
