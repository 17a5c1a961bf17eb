//! Bot side: slash commands and the forwarded-channel prompt flow.
//!
//! The update loop feeds every update to [`Controller::handle`] one at a time.
//! Nothing here returns an error; failures become chat replies and log lines.

use std::{sync::Arc, time::Duration};

use tracing::{error, warn};

use crate::{
    domain::{ChatId, ChatProfile},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{CommandText, IncomingMessage, IncomingUpdate, ParseMode},
    },
    registry::Registry,
};

pub mod callback;
pub mod commands;
pub mod pending;
pub mod replies;

pub use callback::{CallbackAction, CallbackToken, TokenError};
pub use commands::{BotCommand, COMMAND_MENU};
pub use pending::PendingPrompts;

#[derive(Clone, Debug)]
pub struct BotSettings {
    /// Base URL shown in help text.
    pub public_url: String,
    pub version: String,
    pub prompt_ttl: Duration,
    pub max_pending_prompts: usize,
}

pub struct Controller {
    registry: Arc<Registry>,
    messenger: Arc<dyn MessagingPort>,
    pending: PendingPrompts,
    public_url: String,
    version: String,
}

impl Controller {
    pub fn new(
        registry: Arc<Registry>,
        messenger: Arc<dyn MessagingPort>,
        settings: BotSettings,
    ) -> Self {
        Self {
            registry,
            messenger,
            pending: PendingPrompts::new(settings.max_pending_prompts, settings.prompt_ttl),
            public_url: settings.public_url,
            version: settings.version,
        }
    }

    pub fn pending(&self) -> &PendingPrompts {
        &self.pending
    }

    pub async fn handle(&self, update: IncomingUpdate) {
        match update {
            IncomingUpdate::Message(msg) => self.handle_message(&msg).await,
            IncomingUpdate::Callback(q) => self.handle_callback(&q).await,
        }
    }

    async fn handle_message(&self, msg: &IncomingMessage) {
        if let Some(source) = msg.forwarded_from.as_ref().filter(|s| s.kind.is_managed()) {
            self.handle_forward(msg, source).await;
        }
        if let Some(cmd) = msg.text.as_deref().and_then(CommandText::parse) {
            self.handle_command(msg, &cmd).await;
        }
    }

    /// Run a registry action on `target`, replying to `reply_to`.
    async fn perform(&self, action: CallbackAction, target: ChatId, reply_to: ChatId) {
        let reply = match action {
            CallbackAction::Unsubscribe => match self.registry.disable(target).await {
                Ok(_) => Ok(Reply::plain(replies::UNSUBSCRIBED)),
                Err(Error::NotSubscribed) => Ok(Reply::plain(replies::NOT_SUBSCRIBED)),
                Err(e) => Err(e),
            },
            CallbackAction::Subscribe => match self.profile(target).await {
                Some(profile) => self
                    .registry
                    .get_or_create(target, &profile)
                    .await
                    .map(|i| Reply::markdown(replies::subscribed(&i.subscription, i.created))),
                None => Ok(Reply::plain(replies::CHAT_INFO_FAILED)),
            },
            CallbackAction::Regenerate => match self.profile(target).await {
                Some(profile) => self
                    .registry
                    .regenerate(target, &profile)
                    .await
                    .map(|i| Reply::markdown(replies::regenerated(&i.subscription, i.created))),
                None => Ok(Reply::plain(replies::CHAT_INFO_FAILED)),
            },
            CallbackAction::Info => match self.profile(target).await {
                Some(profile) => self.registry.describe(target, &profile).await.map(|s| {
                    Reply::markdown(match s {
                        Some(sub) => replies::info(&sub),
                        None => replies::info_not_subscribed(target),
                    })
                }),
                None => Ok(Reply::plain(replies::CHAT_INFO_FAILED)),
            },
        };

        let reply = reply.unwrap_or_else(|e| {
            error!(
                action = action.as_str(),
                target_chat = target.0,
                error = %e,
                "registry operation failed"
            );
            match e {
                Error::Entropy(_) => Reply::plain(replies::KEYGEN_FAILED),
                _ => Reply::plain(replies::INTERNAL_ERROR),
            }
        });
        self.send(reply_to, &reply.text, reply.mode).await;
    }

    async fn profile(&self, chat_id: ChatId) -> Option<ChatProfile> {
        match self.messenger.chat_profile(chat_id).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(chat_id = chat_id.0, error = %e, "failed to get chat information");
                None
            }
        }
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        self.send(chat_id, text, ParseMode::Plain).await;
    }

    async fn reply_markdown(&self, chat_id: ChatId, text: &str) {
        self.send(chat_id, text, ParseMode::MarkdownV2).await;
    }

    async fn send(&self, chat_id: ChatId, text: &str, mode: ParseMode) {
        if let Err(e) = self.messenger.send_text(chat_id, text, mode).await {
            warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
        }
    }
}

struct Reply {
    text: String,
    mode: ParseMode,
}

impl Reply {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            mode: ParseMode::Plain,
        }
    }

    fn markdown(text: String) -> Self {
        Self {
            text,
            mode: ParseMode::MarkdownV2,
        }
    }
}
