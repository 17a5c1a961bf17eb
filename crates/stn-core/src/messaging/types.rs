use crate::domain::{ChatId, MessageId, MessageRef, UserId};

/// Rendering mode of an outgoing text message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Plain,
    MarkdownV2,
    Html,
}

/// Kind of the chat a forwarded message originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Chats whose administrators can manage a subscription through a forward.
    pub fn is_managed(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup | ChatKind::Channel)
    }
}

/// Transport-agnostic incoming update, produced by the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Message(IncomingMessage),
    Callback(CallbackQuery),
}

/// A chat message as seen by the bot loop.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub from: Option<UserId>,
    pub text: Option<String>,
    pub forwarded_from: Option<ForwardSource>,
}

/// Origin chat of a forwarded message.
#[derive(Clone, Debug)]
pub struct ForwardSource {
    pub chat_id: ChatId,
    pub kind: ChatKind,
    pub title: String,
    pub handle: String,
}

/// A slash command split into name and raw argument text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandText {
    pub name: String,
    pub args: String,
}

impl CommandText {
    /// Parse `/cmd@botname arg1 ...`; `None` when the text is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }
        let mut parts = text.splitn(2, char::is_whitespace);
        let first = parts.next().unwrap_or("").trim();
        let args = parts.next().unwrap_or("").trim().to_string();

        let name = first
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or("")
            .to_lowercase();
        if name.is_empty() {
            return None;
        }

        Some(Self { name, args })
    }
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub callback_id: String,
    pub data: String,
    /// Message carrying the pressed button, when Telegram still has it.
    pub message: Option<MessageRef>,
}

/// Inline keyboard (buttons) attached to a prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub buttons: Vec<InlineButton>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn new(buttons: Vec<InlineButton>) -> Self {
        Self { buttons }
    }
}
