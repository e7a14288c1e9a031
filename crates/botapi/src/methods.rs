//! Request structs for a representative set of operations.
//!
//! Each struct serializes to the operation's request fields and implements
//! [`Method`] to name its endpoint, response type, destination and weight.
//! Constructors take the required fields; optional fields are public and
//! default to their zero value, which the encoder omits.

use serde::Serialize;

use crate::request::{is_false, is_none_or_empty};
use crate::{
    BotCommand, BotCommandScope, ChatId, ChatMember, Destination, File, FileId, InlineMessageId,
    InputFile, InputMedia, MenuButton, Message, MessageEntity, MessageId, Method, ObjectOrTrue,
    ParseMode, ReactionType, ReplyMarkup, ReplyParameters, Upload, User, UserId,
};

// ---------------------------------------------------------------------------
// Account-scoped
// ---------------------------------------------------------------------------

/// Returns the bot's own user record.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GetMe;

impl Method for GetMe {
    type Response = User;
    const NAME: &'static str = "getMe";

    fn destination(&self) -> Destination {
        Destination::Account
    }
}

/// Resolves a file id to a downloadable path.
#[derive(Debug, Clone, Serialize)]
pub struct GetFile {
    pub file_id: FileId,
}

impl Method for GetFile {
    type Response = File;
    const NAME: &'static str = "getFile";

    fn destination(&self) -> Destination {
        Destination::Account
    }
}

/// Replaces the bot's command list for a scope and language.
#[derive(Debug, Clone, Serialize)]
pub struct SetMyCommands {
    pub commands: Vec<BotCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<BotCommandScope>,
    #[serde(skip_serializing_if = "is_none_or_empty")]
    pub language_code: Option<String>,
}

impl SetMyCommands {
    pub fn new(commands: Vec<BotCommand>) -> Self {
        Self {
            commands,
            scope: None,
            language_code: None,
        }
    }
}

impl Method for SetMyCommands {
    type Response = bool;
    const NAME: &'static str = "setMyCommands";

    fn destination(&self) -> Destination {
        Destination::Account
    }
}

/// Changes the menu button of one private chat, or the default button.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetChatMenuButton {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_button: Option<MenuButton>,
}

impl Method for SetChatMenuButton {
    type Response = bool;
    const NAME: &'static str = "setChatMenuButton";

    fn destination(&self) -> Destination {
        match self.chat_id {
            Some(id) => Destination::Chat(ChatId::Id(id)),
            None => Destination::Account,
        }
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Looks up one member of a chat.
///
/// Reads do not post anything into the chat, so only the global pool is
/// charged.
#[derive(Debug, Clone, Serialize)]
pub struct GetChatMember {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

impl Method for GetChatMember {
    type Response = ChatMember;
    const NAME: &'static str = "getChatMember";

    fn destination(&self) -> Destination {
        Destination::Account
    }
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

/// Sends a text message.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_notification: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub protect_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<ReplyParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendMessage {
    pub fn new(chat_id: impl Into<ChatId>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            message_thread_id: None,
            parse_mode: None,
            entities: Vec::new(),
            disable_notification: false,
            protect_content: false,
            reply_parameters: None,
            reply_markup: None,
        }
    }
}

impl Method for SendMessage {
    type Response = Message;
    const NAME: &'static str = "sendMessage";

    fn destination(&self) -> Destination {
        Destination::Chat(self.chat_id.clone())
    }
}

/// Sends a general file.
#[derive(Debug, Clone, Serialize)]
pub struct SendDocument {
    pub chat_id: ChatId,
    pub document: InputFile,
    #[serde(skip_serializing_if = "is_none_or_empty")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_notification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl SendDocument {
    pub fn new(chat_id: impl Into<ChatId>, document: InputFile) -> Self {
        Self {
            chat_id: chat_id.into(),
            document,
            caption: None,
            parse_mode: None,
            disable_notification: false,
            reply_markup: None,
        }
    }
}

impl Method for SendDocument {
    type Response = Message;
    const NAME: &'static str = "sendDocument";

    fn destination(&self) -> Destination {
        Destination::Chat(self.chat_id.clone())
    }

    fn uploads(&self) -> Vec<&Upload> {
        self.document.as_upload().into_iter().collect()
    }
}

/// Sends 2–10 photos, videos, documents or audios as an album.
///
/// Every item is a separate message on the platform, so the call weighs as
/// many units as it has items.
#[derive(Debug, Clone, Serialize)]
pub struct SendMediaGroup {
    pub chat_id: ChatId,
    pub media: Vec<InputMedia>,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_notification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<ReplyParameters>,
}

impl SendMediaGroup {
    pub fn new(chat_id: impl Into<ChatId>, media: Vec<InputMedia>) -> Self {
        Self {
            chat_id: chat_id.into(),
            media,
            disable_notification: false,
            reply_parameters: None,
        }
    }
}

impl Method for SendMediaGroup {
    type Response = Vec<Message>;
    const NAME: &'static str = "sendMediaGroup";

    fn destination(&self) -> Destination {
        Destination::Chat(self.chat_id.clone())
    }

    fn weight(&self) -> u32 {
        u32::try_from(self.media.len()).unwrap_or(u32::MAX).max(1)
    }

    fn uploads(&self) -> Vec<&Upload> {
        self.media.iter().filter_map(|m| m.media().as_upload()).collect()
    }
}

// ---------------------------------------------------------------------------
// Editing and reacting
// ---------------------------------------------------------------------------

/// Which message an edit applies to.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EditTarget {
    /// A message in a chat the bot can see.
    Chat { chat_id: ChatId, message_id: MessageId },
    /// A message sent via inline mode.
    Inline { inline_message_id: InlineMessageId },
}

/// Edits the text of a message.
///
/// Returns the edited message for chat targets and a bare `true` for inline
/// targets.
#[derive(Debug, Clone, Serialize)]
pub struct EditMessageText {
    #[serde(flatten)]
    pub target: EditTarget,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

impl EditMessageText {
    pub fn new(target: EditTarget, text: impl Into<String>) -> Self {
        Self {
            target,
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }
}

impl Method for EditMessageText {
    type Response = ObjectOrTrue<Message>;
    const NAME: &'static str = "editMessageText";

    fn destination(&self) -> Destination {
        match &self.target {
            EditTarget::Chat { chat_id, .. } => Destination::Chat(chat_id.clone()),
            EditTarget::Inline { .. } => Destination::Account,
        }
    }
}

/// Sets the bot's reactions on a message.
#[derive(Debug, Clone, Serialize)]
pub struct SetMessageReaction {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reaction: Vec<ReactionType>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_big: bool,
}

impl Method for SetMessageReaction {
    type Response = bool;
    const NAME: &'static str = "setMessageReaction";

    fn destination(&self) -> Destination {
        Destination::Chat(self.chat_id.clone())
    }
}

/// Deletes several messages from one chat.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteMessages {
    pub chat_id: ChatId,
    pub message_ids: Vec<MessageId>,
}

impl Method for DeleteMessages {
    type Response = bool;
    const NAME: &'static str = "deleteMessages";

    fn destination(&self) -> Destination {
        Destination::Chat(self.chat_id.clone())
    }

    fn weight(&self) -> u32 {
        u32::try_from(self.message_ids.len()).unwrap_or(u32::MAX).max(1)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::request::{encode, RequestBody};

    fn body_json<M: Method>(method: &M) -> serde_json::Value {
        match encode(method).unwrap().body {
            RequestBody::Json(bytes) => serde_json::from_slice(&bytes).unwrap(),
            RequestBody::Multipart(_) => panic!("expected JSON"),
        }
    }

    #[test]
    fn batch_methods_weigh_their_items() {
        let group = SendMediaGroup::new(
            ChatId::Id(5),
            vec![
                InputMedia::photo(InputFile::url("https://example.com/1.png")),
                InputMedia::photo(InputFile::url("https://example.com/2.png")),
                InputMedia::photo(InputFile::url("https://example.com/3.png")),
            ],
        );
        assert_eq!(group.weight(), 3);

        let delete = DeleteMessages {
            chat_id: ChatId::Id(5),
            message_ids: vec![MessageId::new(1), MessageId::new(2)],
        };
        assert_eq!(delete.weight(), 2);
        assert_eq!(SendMessage::new(ChatId::Id(5), "x").weight(), 1);
    }

    #[test]
    fn account_scoped_methods_use_the_global_sentinel() {
        assert_eq!(GetMe.destination(), Destination::Account);
        assert_eq!(SetMyCommands::new(vec![]).destination(), Destination::Account);
        assert_eq!(SetChatMenuButton::default().destination(), Destination::Account);
        assert_eq!(
            SetChatMenuButton {
                chat_id: Some(3),
                menu_button: None
            }
            .destination(),
            Destination::Chat(ChatId::Id(3))
        );
    }

    #[test]
    fn edit_target_flattens_into_the_request() {
        let edit = EditMessageText::new(
            EditTarget::Chat {
                chat_id: ChatId::Id(9),
                message_id: MessageId::new(4),
            },
            "updated",
        );
        assert_eq!(
            body_json(&edit),
            json!({"chat_id": 9, "message_id": 4, "text": "updated"})
        );
        assert_eq!(edit.destination(), Destination::Chat(ChatId::Id(9)));

        let inline = EditMessageText::new(
            EditTarget::Inline {
                inline_message_id: InlineMessageId::new("AAE").unwrap(),
            },
            "updated",
        );
        assert_eq!(
            body_json(&inline),
            json!({"inline_message_id": "AAE", "text": "updated"})
        );
        assert_eq!(inline.destination(), Destination::Account);
    }

    #[test]
    fn commands_carry_their_scope_variant() {
        let mut commands = SetMyCommands::new(vec![BotCommand {
            command: "start".into(),
            description: "Start the bot".into(),
        }]);
        commands.scope = Some(BotCommandScope::AllPrivateChats);
        assert_eq!(
            body_json(&commands),
            json!({
                "commands": [{"command": "start", "description": "Start the bot"}],
                "scope": {"type": "all_private_chats"}
            })
        );
    }
}
