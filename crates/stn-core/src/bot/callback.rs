//! Forwarded-channel prompts and the inline-button callbacks they produce.

use tracing::{info, warn};

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{
        CallbackQuery, ForwardSource, IncomingMessage, InlineButton, InlineKeyboard, ParseMode,
    },
};

use super::{replies, Controller};

/// Registry operation carried by a prompt button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Subscribe,
    Unsubscribe,
    Regenerate,
    Info,
}

impl CallbackAction {
    /// Button order in the prompt, one per row.
    pub const ALL: [CallbackAction; 4] = [
        CallbackAction::Subscribe,
        CallbackAction::Unsubscribe,
        CallbackAction::Regenerate,
        CallbackAction::Info,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CallbackAction::Subscribe => "subscribe",
            CallbackAction::Unsubscribe => "unsubscribe",
            CallbackAction::Regenerate => "regenerate",
            CallbackAction::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    pub fn label(self) -> &'static str {
        match self {
            CallbackAction::Subscribe => "Subscribe",
            CallbackAction::Unsubscribe => "Unsubscribe",
            CallbackAction::Regenerate => "Regenerate",
            CallbackAction::Info => "Info",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("expected 4 fields, got {0}")]
    FieldCount(usize),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("invalid {0}")]
    Number(&'static str),
}

/// Payload of a prompt button: `"<action> <target chat> <origin chat> <origin message>"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallbackToken {
    pub action: CallbackAction,
    /// Chat whose subscription the action operates on.
    pub target_chat: ChatId,
    /// Chat the forward was posted in; receives the replies.
    pub origin_chat: ChatId,
    /// The forwarded message that triggered the prompt.
    pub origin_message: MessageId,
}

impl CallbackToken {
    pub fn encode(&self) -> String {
        format!(
            "{} {} {} {}",
            self.action.as_str(),
            self.target_chat.0,
            self.origin_chat.0,
            self.origin_message.0
        )
    }

    pub fn decode(data: &str) -> Result<Self, TokenError> {
        let fields: Vec<&str> = data.split(' ').collect();
        let [action, target, origin, message] = fields.as_slice() else {
            return Err(TokenError::FieldCount(fields.len()));
        };

        let action = CallbackAction::parse(action)
            .ok_or_else(|| TokenError::UnknownAction(action.to_string()))?;
        let target_chat = target
            .parse::<i64>()
            .map_err(|_| TokenError::Number("target chat id"))?;
        let origin_chat = origin
            .parse::<i64>()
            .map_err(|_| TokenError::Number("origin chat id"))?;
        let origin_message = message
            .parse::<i32>()
            .map_err(|_| TokenError::Number("origin message id"))?;

        Ok(Self {
            action,
            target_chat: ChatId(target_chat),
            origin_chat: ChatId(origin_chat),
            origin_message: MessageId(origin_message),
        })
    }

    fn origin(&self) -> MessageRef {
        MessageRef {
            chat_id: self.origin_chat,
            message_id: self.origin_message,
        }
    }
}

fn prompt_keyboard(source: ChatId, origin: MessageRef) -> InlineKeyboard {
    InlineKeyboard::new(
        CallbackAction::ALL
            .into_iter()
            .map(|action| InlineButton {
                label: action.label().to_string(),
                callback_data: CallbackToken {
                    action,
                    target_chat: source,
                    origin_chat: origin.chat_id,
                    origin_message: origin.message_id,
                }
                .encode(),
            })
            .collect(),
    )
}

impl Controller {
    /// Both the bot and the forwarding user must administer the source chat.
    pub(super) async fn handle_forward(&self, msg: &IncomingMessage, source: &ForwardSource) {
        info!(
            chat_id = msg.chat_id.0,
            source_chat = source.chat_id.0,
            "forwarded channel message"
        );

        let admins = match self.messenger.chat_administrators(source.chat_id).await {
            Ok(admins) => admins,
            Err(e) => {
                warn!(source_chat = source.chat_id.0, error = %e, "admin lookup failed");
                self.reply(msg.chat_id, replies::ADMIN_LOOKUP_FAILED).await;
                return;
            }
        };

        if !admins.contains(&self.messenger.bot_user_id()) {
            self.reply(msg.chat_id, replies::BOT_NOT_ADMIN).await;
            return;
        }
        if !msg.from.is_some_and(|u| admins.contains(&u)) {
            info!(source_chat = source.chat_id.0, "forwarding user is not a channel admin");
            self.reply(msg.chat_id, replies::NOT_CHANNEL_ADMIN).await;
            return;
        }

        let origin = MessageRef {
            chat_id: msg.chat_id,
            message_id: msg.message_id,
        };
        let sent = self
            .messenger
            .send_inline_keyboard(
                msg.chat_id,
                &replies::forward_prompt(source),
                ParseMode::MarkdownV2,
                prompt_keyboard(source.chat_id, origin),
            )
            .await;
        match sent {
            Ok(prompt) => self.pending.insert(origin, prompt.message_id).await,
            Err(e) => {
                warn!(chat_id = msg.chat_id.0, error = %e, "failed to send prompt");
                self.reply(msg.chat_id, replies::PROMPT_FAILED).await;
            }
        }
    }

    pub(super) async fn handle_callback(&self, q: &CallbackQuery) {
        let token = match CallbackToken::decode(&q.data) {
            Ok(token) => token,
            Err(e) => {
                warn!(data = %q.data, error = %e, "malformed callback data");
                if let Some(m) = q.message {
                    self.reply(m.chat_id, replies::BAD_CALLBACK).await;
                }
                self.answer(&q.callback_id, Some(replies::BAD_CALLBACK)).await;
                return;
            }
        };

        info!(
            action = token.action.as_str(),
            target_chat = token.target_chat.0,
            origin_chat = token.origin_chat.0,
            "callback"
        );
        self.perform(token.action, token.target_chat, token.origin_chat)
            .await;

        // Without a recorded mapping (restart, eviction) the pressed message is the prompt.
        let prompt = match self.pending.take(token.origin()).await {
            Some(message_id) => Some(MessageRef {
                chat_id: token.origin_chat,
                message_id,
            }),
            None => q.message,
        };
        if let Some(prompt) = prompt {
            if let Err(e) = self.messenger.delete_message(prompt).await {
                warn!(chat_id = prompt.chat_id.0, error = %e, "failed to delete prompt");
                self.reply(token.origin_chat, replies::PROMPT_DELETE_FAILED)
                    .await;
            }
        }

        self.answer(&q.callback_id, None).await;
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.messenger.answer_callback_query(callback_id, text).await {
            warn!(error = %e, "failed to answer callback query");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> CallbackToken {
        CallbackToken {
            action: CallbackAction::Regenerate,
            target_chat: ChatId(-1001234567890),
            origin_chat: ChatId(42),
            origin_message: MessageId(77),
        }
    }

    #[test]
    fn wire_format_is_four_space_separated_fields() {
        assert_eq!(token().encode(), "regenerate -1001234567890 42 77");
    }

    #[test]
    fn decode_inverts_encode() {
        for action in CallbackAction::ALL {
            let t = CallbackToken { action, ..token() };
            let s = t.encode();
            assert_eq!(CallbackToken::decode(&s).unwrap(), t);
            assert_eq!(CallbackToken::decode(&s).unwrap().encode(), s);
        }
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert_eq!(
            CallbackToken::decode("regenerate 1 2"),
            Err(TokenError::FieldCount(3))
        );
        assert_eq!(
            CallbackToken::decode("regenerate 1 2 3 4"),
            Err(TokenError::FieldCount(5))
        );
        assert_eq!(CallbackToken::decode(""), Err(TokenError::FieldCount(1)));
    }

    #[test]
    fn bad_fields_are_rejected() {
        assert_eq!(
            CallbackToken::decode("delete 1 2 3"),
            Err(TokenError::UnknownAction("delete".to_string()))
        );
        assert!(matches!(
            CallbackToken::decode("info x 2 3"),
            Err(TokenError::Number(_))
        ));
        assert!(matches!(
            CallbackToken::decode("info 1 2 99999999999"),
            Err(TokenError::Number(_))
        ));
    }

    #[test]
    fn prompt_has_one_button_per_action() {
        let origin = MessageRef {
            chat_id: ChatId(42),
            message_id: MessageId(77),
        };
        let kb = prompt_keyboard(ChatId(-100), origin);
        let labels: Vec<_> = kb.buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Subscribe", "Unsubscribe", "Regenerate", "Info"]);
        assert_eq!(kb.buttons[1].callback_data, "unsubscribe -100 42 77");
    }
}
