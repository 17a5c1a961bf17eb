use tracing::{info, warn};

use crate::{
    domain::{ChatId, UserId},
    messaging::types::{CommandText, IncomingMessage},
};

use super::{callback::CallbackAction, replies, Controller};

/// Command list registered with the transport at startup.
pub const COMMAND_MENU: [(&str, &str); 7] = [
    ("start", "Start the bot"),
    ("subscribe", "Subscribe to receive messages"),
    ("unsubscribe", "Unsubscribe from receiving messages"),
    ("regenerate", "Regenerate UUID and AES key"),
    ("info", "Get your chat ID, UUID and AES key"),
    ("help", "Get help"),
    ("version", "Get version"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Subscribe,
    Unsubscribe,
    Regenerate,
    Info,
    Version,
    Unknown,
}

impl BotCommand {
    pub fn parse(name: &str) -> Self {
        match name {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "subscribe" => BotCommand::Subscribe,
            "unsubscribe" => BotCommand::Unsubscribe,
            "regenerate" => BotCommand::Regenerate,
            "info" => BotCommand::Info,
            "version" => BotCommand::Version,
            _ => BotCommand::Unknown,
        }
    }

    fn action(self) -> Option<CallbackAction> {
        match self {
            BotCommand::Subscribe => Some(CallbackAction::Subscribe),
            BotCommand::Unsubscribe => Some(CallbackAction::Unsubscribe),
            BotCommand::Regenerate => Some(CallbackAction::Regenerate),
            BotCommand::Info => Some(CallbackAction::Info),
            _ => None,
        }
    }
}

/// Numeric argument names the target chat; anything else means the current chat.
fn target_chat(args: &str, current: ChatId) -> ChatId {
    match args.trim().parse::<i64>() {
        Ok(id) if id != 0 => ChatId(id),
        _ => current,
    }
}

enum Authorization {
    Allowed,
    Denied,
    LookupFailed,
}

impl Controller {
    pub(super) async fn handle_command(&self, msg: &IncomingMessage, cmd: &CommandText) {
        let command = BotCommand::parse(&cmd.name);
        let target = target_chat(&cmd.args, msg.chat_id);
        info!(
            chat_id = msg.chat_id.0,
            target_chat = target.0,
            command = %cmd.name,
            "command"
        );

        match self.authorize_manager(target, msg.from).await {
            Authorization::Allowed => {}
            Authorization::Denied => {
                info!(target_chat = target.0, "command from non-admin");
                self.reply(msg.chat_id, replies::NOT_MANAGER).await;
                return;
            }
            Authorization::LookupFailed => {
                self.reply(msg.chat_id, replies::ADMIN_LOOKUP_FAILED).await;
                return;
            }
        }

        if let Some(action) = command.action() {
            self.perform(action, target, msg.chat_id).await;
            return;
        }
        match command {
            BotCommand::Start | BotCommand::Help => self.send_help(target, msg.chat_id).await,
            BotCommand::Version => {
                self.reply(msg.chat_id, &replies::version(&self.version))
                    .await
            }
            _ => self.reply(msg.chat_id, replies::UNKNOWN_COMMAND).await,
        }
    }

    /// The user manages `target` if it is their own private chat or they administer it.
    async fn authorize_manager(&self, target: ChatId, user: Option<UserId>) -> Authorization {
        let Some(user) = user else {
            return Authorization::Denied;
        };
        if user.as_chat() == target {
            return Authorization::Allowed;
        }
        match self.messenger.chat_administrators(target).await {
            Ok(admins) if admins.contains(&user) => Authorization::Allowed,
            Ok(_) => Authorization::Denied,
            Err(e) => {
                warn!(target_chat = target.0, error = %e, "admin lookup failed");
                Authorization::LookupFailed
            }
        }
    }

    async fn send_help(&self, target: ChatId, reply_to: ChatId) {
        let current = match self.registry.current(target).await {
            Ok(current) => current,
            Err(e) => {
                warn!(target_chat = target.0, error = %e, "registry lookup failed");
                None
            }
        };
        let text = replies::help(
            &self.public_url,
            current.as_ref().map(|s| s.public_id.as_str()),
        );
        self.reply_markdown(reply_to, &text).await;
    }
}
