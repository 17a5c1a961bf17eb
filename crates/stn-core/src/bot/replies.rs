//! Reply texts. Functions return MarkdownV2; constants are sent as plain text.

use crate::{
    domain::{ChatId, Subscription},
    formatting::{code_inline, escape_text},
    messaging::types::ForwardSource,
};

pub const ADMIN_LOOKUP_FAILED: &str = "Failed to get chat administrators";
pub const BOT_NOT_ADMIN: &str = "Please add me as an administrator to the channel";
pub const NOT_CHANNEL_ADMIN: &str = "Only the administrator of the channel can use this command";
pub const NOT_MANAGER: &str = "Only the administrator of the channel/group can use this command";
pub const CHAT_INFO_FAILED: &str = "Failed to get chat information";
pub const KEYGEN_FAILED: &str = "Failed to generate AES key";
pub const INTERNAL_ERROR: &str = "Something went wrong, please try again later";
pub const UNSUBSCRIBED: &str = "Unsubscribed";
pub const NOT_SUBSCRIBED: &str = "Invalid UUID or not subscribed";
pub const PROMPT_FAILED: &str = "Failed to send inline keyboard";
pub const PROMPT_DELETE_FAILED: &str = "Failed to delete inline keyboard";
pub const BAD_CALLBACK: &str = "Failed to read button data";

pub const UNKNOWN_COMMAND: &str = "I don't know that command\n\n\
Use /subscribe to subscribe to receive messages\n\n\
Use /unsubscribe to unsubscribe from receiving messages\n\n\
Use /regenerate to regenerate UUID and AES key";

pub fn version(version: &str) -> String {
    format!("Version: {version}")
}

fn code_or_dash(value: &str) -> String {
    if value.is_empty() {
        escape_text("-")
    } else {
        code_inline(value)
    }
}

fn credentials(sub: &Subscription) -> String {
    format!(
        "Your UUID: {}\n\nYour AES key: {}",
        code_inline(&sub.public_id),
        code_inline(&sub.symmetric_key)
    )
}

fn details(sub: &Subscription) -> String {
    format!(
        "Your chat ID: {}\n\nYour username: {}\n\nYour nickname: {}\n\n{}",
        code_inline(&sub.chat_id.0.to_string()),
        code_or_dash(&sub.handle),
        code_or_dash(&sub.display_name),
        credentials(sub)
    )
}

pub fn subscribed(sub: &Subscription, created: bool) -> String {
    let header = if created {
        "Subscribed"
    } else {
        "You are already subscribed"
    };
    format!("{}\n\n{}", escape_text(header), details(sub))
}

pub fn regenerated(sub: &Subscription, created: bool) -> String {
    let header = if created { "Subscribed" } else { "Regenerated" };
    format!("{}\n\n{}", escape_text(header), credentials(sub))
}

pub fn info(sub: &Subscription) -> String {
    let flag = if sub.receive_enabled {
        "You are subscribed to receive messages"
    } else {
        "You are not subscribed to receive messages"
    };
    format!("{}\n\n{}", details(sub), escape_text(flag))
}

pub fn info_not_subscribed(chat_id: ChatId) -> String {
    format!(
        "Your chat ID: {}\n\n{}\n\n{}",
        code_inline(&chat_id.0.to_string()),
        escape_text("You are not subscribed to receive messages"),
        escape_text("Use /subscribe to subscribe to receive messages")
    )
}

pub fn forward_prompt(source: &ForwardSource) -> String {
    format!(
        "Channel name: {}\n\nChannel id: {}\n\nChannel username: {}\n\nChoose an option:",
        code_or_dash(&source.title),
        code_inline(&source.chat_id.0.to_string()),
        code_or_dash(&source.handle)
    )
}

/// Usage text with the endpoints spelled out for `public_id` (or a placeholder).
pub fn help(public_url: &str, public_id: Option<&str>) -> String {
    let id = public_id.unwrap_or("<UUID>");
    let endpoint = |suffix: &str| code_inline(&format!("{public_url}/api/{id}/{suffix}"));

    let mut out = String::new();
    out.push_str(&format!(
        "Please see {} for more information\n\n",
        code_inline(public_url)
    ));
    out.push_str(&escape_text(
        "Here are the available commands:\n\n\
         - /subscribe: Subscribe to receive messages\n\
         - /unsubscribe: Unsubscribe from receiving messages\n\
         - /regenerate: Regenerate UUID and AES key\n\
         - /info: Get your chat ID, UUID and AES key\n\n\
         After subscribing, you will receive a UUID and an AES key which can be used \
         to send messages to this chat.\n\n\
         Here are the available endpoints and how to use them:\n\n",
    ));

    out.push_str(&format!(
        "*JSON endpoint*\nPOST to {} with body {}\n\n",
        endpoint("json"),
        code_inline(r#"{"encrypted": false, "format": "plain", "msg": "<message>"}"#)
    ));
    out.push_str(&format!(
        "*GET endpoint*\nGET {}\n\n",
        code_inline(&format!(
            "{public_url}/api/{id}/get?msg=<message>&encrypted=<true/false>&format=<format>"
        ))
    ));
    out.push_str(&format!(
        "*Form endpoint*\nPOST to {} with form fields {}\n\n",
        endpoint("form"),
        code_inline("msg, encrypted, format")
    ));
    out.push_str(&format!(
        "*File endpoint*\nPOST to {} with multipart fields {}\n\n",
        endpoint("file"),
        code_inline("file, caption")
    ));
    out.push_str(&escape_text(
        "Formats: markdown, in-app-html, server-html, plain. \
         Encrypted messages are base64(IV || AES-256-CBC ciphertext) under your AES key.",
    ));
    out
}
