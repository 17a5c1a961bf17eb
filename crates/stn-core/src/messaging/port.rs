use async_trait::async_trait;

use crate::{
    domain::{ChatId, ChatProfile, MessageRef, UserId},
    messaging::types::{InlineKeyboard, ParseMode},
    Result,
};

/// Outbound side of the chat transport.
///
/// Every failure is reported as `Error::External`.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str, mode: ParseMode) -> Result<MessageRef>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageRef>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: ParseMode,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    async fn chat_profile(&self, chat_id: ChatId) -> Result<ChatProfile>;

    async fn chat_administrators(&self, chat_id: ChatId) -> Result<Vec<UserId>>;

    /// User id of the bot account itself.
    fn bot_user_id(&self) -> UserId;
}
