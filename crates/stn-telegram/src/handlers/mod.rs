//! Update endpoints: translate teloxide updates into core updates and hand them to the controller.

use std::sync::Arc;

use teloxide::{prelude::*, types::Chat};

use stn_core::{
    bot::Controller,
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::{self, ChatKind, ForwardSource, IncomingMessage, IncomingUpdate},
};

use crate::chat_profile_of;

pub async fn handle_message(msg: Message, controller: Arc<Controller>) -> ResponseResult<()> {
    controller
        .handle(IncomingUpdate::Message(incoming_message(&msg)))
        .await;
    Ok(())
}

pub async fn handle_callback(q: CallbackQuery, controller: Arc<Controller>) -> ResponseResult<()> {
    controller
        .handle(IncomingUpdate::Callback(incoming_callback(&q)))
        .await;
    Ok(())
}

pub fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_channel() {
        ChatKind::Channel
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Private
    }
}

fn message_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
    }
}

pub fn incoming_message(msg: &Message) -> IncomingMessage {
    let forwarded_from = msg.forward_from_chat().map(|chat| {
        let profile = chat_profile_of(chat);
        ForwardSource {
            chat_id: ChatId(chat.id.0),
            kind: chat_kind(chat),
            title: profile.display_name,
            handle: profile.handle,
        }
    });
    IncomingMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        from: msg.from().map(|u| UserId(u.id.0 as i64)),
        text: msg.text().map(str::to_string),
        forwarded_from,
    }
}

pub fn incoming_callback(q: &CallbackQuery) -> types::CallbackQuery {
    types::CallbackQuery {
        callback_id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
        message: q.message.as_ref().map(message_ref),
    }
}
