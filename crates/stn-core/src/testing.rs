//! In-process fakes for the transport port, shared by the workspace's tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, ChatProfile, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, ParseMode},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentText {
    pub chat_id: ChatId,
    pub text: String,
    pub mode: ParseMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentDocument {
    pub chat_id: ChatId,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentKeyboard {
    pub message: MessageRef,
    pub text: String,
    pub keyboard: InlineKeyboard,
}

#[derive(Default)]
struct State {
    next_message_id: i32,
    texts: Vec<SentText>,
    documents: Vec<SentDocument>,
    keyboards: Vec<SentKeyboard>,
    deleted: Vec<MessageRef>,
    answered: Vec<(String, Option<String>)>,
    admins: HashMap<i64, Vec<UserId>>,
    profiles: HashMap<i64, ChatProfile>,
    failing_admin_lookups: HashSet<i64>,
    fail_profiles: bool,
    fail_deletes: bool,
}

/// Messenger fake that records every outbound call.
pub struct RecordingMessenger {
    me: UserId,
    state: Mutex<State>,
}

impl RecordingMessenger {
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            state: Mutex::new(State {
                next_message_id: 1000,
                ..State::default()
            }),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn set_admins(&self, chat_id: ChatId, admins: Vec<UserId>) {
        self.with(|s| {
            s.admins.insert(chat_id.0, admins);
        });
    }

    pub fn set_profile(&self, chat_id: ChatId, profile: ChatProfile) {
        self.with(|s| {
            s.profiles.insert(chat_id.0, profile);
        });
    }

    pub fn fail_admin_lookup(&self, chat_id: ChatId) {
        self.with(|s| {
            s.failing_admin_lookups.insert(chat_id.0);
        });
    }

    pub fn fail_profiles(&self) {
        self.with(|s| s.fail_profiles = true);
    }

    pub fn fail_deletes(&self) {
        self.with(|s| s.fail_deletes = true);
    }

    pub fn sent_texts(&self) -> Vec<SentText> {
        self.with(|s| s.texts.clone())
    }

    pub fn texts_to(&self, chat_id: ChatId) -> Vec<String> {
        self.with(|s| {
            s.texts
                .iter()
                .filter(|t| t.chat_id == chat_id)
                .map(|t| t.text.clone())
                .collect()
        })
    }

    pub fn documents(&self) -> Vec<SentDocument> {
        self.with(|s| s.documents.clone())
    }

    pub fn keyboards(&self) -> Vec<SentKeyboard> {
        self.with(|s| s.keyboards.clone())
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.with(|s| s.deleted.clone())
    }

    pub fn answered(&self) -> Vec<(String, Option<String>)> {
        self.with(|s| s.answered.clone())
    }

    fn next_ref(s: &mut State, chat_id: ChatId) -> MessageRef {
        s.next_message_id += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(s.next_message_id),
        }
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str, mode: ParseMode) -> Result<MessageRef> {
        Ok(self.with(|s| {
            s.texts.push(SentText {
                chat_id,
                text: text.to_string(),
                mode,
            });
            Self::next_ref(s, chat_id)
        }))
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageRef> {
        Ok(self.with(|s| {
            s.documents.push(SentDocument {
                chat_id,
                file_name: file_name.to_string(),
                bytes,
            });
            Self::next_ref(s, chat_id)
        }))
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        _mode: ParseMode,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        Ok(self.with(|s| {
            let message = Self::next_ref(s, chat_id);
            s.keyboards.push(SentKeyboard {
                message,
                text: text.to_string(),
                keyboard,
            });
            message
        }))
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with(|s| {
            if s.fail_deletes {
                return Err(Error::External("message to delete not found".to_string()));
            }
            s.deleted.push(msg);
            Ok(())
        })
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with(|s| {
            s.answered
                .push((callback_id.to_string(), text.map(str::to_string)));
        });
        Ok(())
    }

    async fn chat_profile(&self, chat_id: ChatId) -> Result<ChatProfile> {
        self.with(|s| {
            if s.fail_profiles {
                return Err(Error::External("chat not found".to_string()));
            }
            Ok(s.profiles.get(&chat_id.0).cloned().unwrap_or_default())
        })
    }

    async fn chat_administrators(&self, chat_id: ChatId) -> Result<Vec<UserId>> {
        self.with(|s| {
            if s.failing_admin_lookups.contains(&chat_id.0) {
                return Err(Error::External("member list is inaccessible".to_string()));
            }
            Ok(s.admins.get(&chat_id.0).cloned().unwrap_or_default())
        })
    }

    fn bot_user_id(&self) -> UserId {
        self.me
    }
}
