//! Telegram adapter (teloxide).
//!
//! Implements the `stn-core` MessagingPort over the Bot API and feeds incoming
//! updates into the bot controller.

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{Chat, InlineKeyboardButton, InlineKeyboardMarkup, InputFile},
};
use tokio::time::sleep;
use tracing::warn;

pub mod handlers;
pub mod router;

use stn_core::{
    domain::{ChatId, ChatProfile, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, ParseMode},
    },
    Result,
};

/// Build a bot client, optionally pointed at a self-hosted Bot API server.
pub fn build_bot(token: &str, api_url: Option<&str>) -> Result<Bot> {
    let bot = Bot::new(token);
    match api_url {
        Some(raw) => {
            let url = reqwest::Url::parse(raw)
                .map_err(|e| Error::Config(format!("invalid TELEGRAM_API_URL {raw:?}: {e}")))?;
            Ok(bot.set_api_url(url))
        }
        None => Ok(bot),
    }
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    me: UserId,
}

impl TelegramMessenger {
    /// Resolve the bot's own user id with `getMe`.
    pub async fn connect(bot: Bot) -> Result<Self> {
        let me = bot.get_me().await.map_err(Self::map_err)?;
        tracing::info!(username = %me.username(), "connected to telegram");
        let me = UserId(me.user.id.0 as i64);
        Ok(Self { bot, me })
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn tg_parse_mode(mode: ParseMode) -> Option<teloxide::types::ParseMode> {
        match mode {
            ParseMode::Plain => None,
            ParseMode::MarkdownV2 => Some(teloxide::types::ParseMode::MarkdownV2),
            ParseMode::Html => Some(teloxide::types::ParseMode::Html),
        }
    }

    fn sent(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    warn!(retry_after = ?d, "telegram flood control, retrying");
                    sleep(d).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

/// Display name and handle of a chat.
///
/// Groups and channels report their title; private chats the user's full name.
pub fn chat_profile_of(chat: &Chat) -> ChatProfile {
    let display_name = match chat.title() {
        Some(title) => title.to_string(),
        None => [chat.first_name(), chat.last_name()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
    };
    ChatProfile {
        display_name,
        handle: chat.username().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str, mode: ParseMode) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                let req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
                match Self::tg_parse_mode(mode) {
                    Some(pm) => req.parse_mode(pm),
                    None => req,
                }
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                let file = InputFile::memory(bytes.clone()).file_name(file_name.to_string());
                self.bot.send_document(Self::tg_chat(chat_id), file)
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: ParseMode,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .buttons
            .into_iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label, b.callback_data)])
            .collect();
        let markup = InlineKeyboardMarkup::new(rows);

        let msg = self
            .with_retry(|| {
                let req = self
                    .bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
                    .reply_markup(markup.clone());
                match Self::tg_parse_mode(mode) {
                    Some(pm) => req.parse_mode(pm),
                    None => req,
                }
            })
            .await?;
        Ok(Self::sent(chat_id, &msg))
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn chat_profile(&self, chat_id: ChatId) -> Result<ChatProfile> {
        let chat = self
            .with_retry(|| self.bot.get_chat(Self::tg_chat(chat_id)))
            .await?;
        Ok(chat_profile_of(&chat))
    }

    async fn chat_administrators(&self, chat_id: ChatId) -> Result<Vec<UserId>> {
        let members = self
            .with_retry(|| self.bot.get_chat_administrators(Self::tg_chat(chat_id)))
            .await?;
        Ok(members
            .into_iter()
            .map(|m| UserId(m.user.id.0 as i64))
            .collect())
    }

    fn bot_user_id(&self) -> UserId {
        self.me
    }
}
