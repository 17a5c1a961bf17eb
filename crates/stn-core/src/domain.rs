/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric, unique per chat only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl UserId {
    /// Private chats share their id with the user that owns them.
    pub fn as_chat(self) -> ChatId {
        ChatId(self.0)
    }
}

/// Durable binding of a chat to its current credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub chat_id: ChatId,
    /// 32 lowercase hex characters presented by external senders.
    pub public_id: String,
    /// 64 hex characters (32 bytes), always paired with `public_id`.
    pub symmetric_key: String,
    pub receive_enabled: bool,
    pub display_name: String,
    pub handle: String,
}

impl Subscription {
    pub fn apply_profile(&mut self, profile: &ChatProfile) {
        self.display_name = profile.display_name.clone();
        self.handle = profile.handle.clone();
    }
}

/// Server-hosted rendering of a delivered message. Insert-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Article {
    pub article_id: String,
    pub raw_content: String,
}

/// Chat metadata as reported by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatProfile {
    pub display_name: String,
    pub handle: String,
}
