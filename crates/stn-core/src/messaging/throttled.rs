use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, ChatProfile, MessageRef, UserId},
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, ParseMode},
    },
    Result,
};

/// Spacing applied to outbound Bot API calls.
#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Between any two calls.
    pub global_min_interval: Duration,
    /// Between two calls that touch the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),
            per_chat_min_interval: Duration::from_millis(1050),
        }
    }
}

/// Per-chat slots are dropped once they lie in the past and the map has grown this large.
const CHAT_SLOT_PRUNE_THRESHOLD: usize = 4096;

/// Next free send slot, globally and per chat.
#[derive(Debug)]
struct Schedule {
    cfg: ThrottleConfig,
    next_global: Instant,
    next_per_chat: HashMap<ChatId, Instant>,
}

impl Schedule {
    fn new(cfg: ThrottleConfig, now: Instant) -> Self {
        Self {
            cfg,
            next_global: now,
            next_per_chat: HashMap::new(),
        }
    }

    /// Book the next global slot and, for chat-bound calls, the next slot of that chat.
    /// Returns how long the caller must wait until both are open.
    fn reserve(&mut self, chat: Option<ChatId>, now: Instant) -> Duration {
        let global_start = self.next_global.max(now);
        self.next_global = global_start + self.cfg.global_min_interval;

        let mut start = global_start;
        if let Some(chat) = chat {
            if self.next_per_chat.len() >= CHAT_SLOT_PRUNE_THRESHOLD {
                self.next_per_chat.retain(|_, next| *next > now);
            }
            let next = self.next_per_chat.entry(chat).or_insert(now);
            let chat_start = (*next).max(now);
            *next = chat_start + self.cfg.per_chat_min_interval;
            start = start.max(chat_start);
        }
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces outbound calls.
///
/// Many ingestion requests for the same chat can arrive in parallel; this keeps the
/// resulting sends under Telegram's flood limits. Read-only lookups (chat info, admin
/// lists) only take the global slot.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    schedule: Mutex<Schedule>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            schedule: Mutex::new(Schedule::new(cfg, Instant::now())),
        }
    }

    async fn wait_turn(&self, chat: Option<ChatId>) {
        let wait = self.schedule.lock().await.reserve(chat, Instant::now());
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        self.wait_turn(Some(chat_id)).await;
    }

    async fn throttle_global(&self) {
        self.wait_turn(None).await;
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str, mode: ParseMode) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_text(chat_id, text, mode).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_document(chat_id, file_name, bytes).await
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        mode: ParseMode,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner
            .send_inline_keyboard(chat_id, text, mode, keyboard)
            .await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.throttle_chat(msg.chat_id).await;
        self.inner.delete_message(msg).await
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        // No chat_id available here; apply global throttling only.
        self.throttle_global().await;
        self.inner.answer_callback_query(callback_id, text).await
    }

    async fn chat_profile(&self, chat_id: ChatId) -> Result<ChatProfile> {
        self.throttle_global().await;
        self.inner.chat_profile(chat_id).await
    }

    async fn chat_administrators(&self, chat_id: ChatId) -> Result<Vec<UserId>> {
        self.throttle_global().await;
        self.inner.chat_administrators(chat_id).await
    }

    fn bot_user_id(&self) -> UserId {
        self.inner.bot_user_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMessenger;

    #[test]
    fn schedule_spaces_same_chat_but_not_others() {
        let now = Instant::now();
        let mut schedule = Schedule::new(ThrottleConfig::default(), now);
        assert_eq!(schedule.reserve(Some(ChatId(1)), now), Duration::ZERO);
        assert!(schedule.reserve(Some(ChatId(1)), now) >= Duration::from_millis(1050));
        assert!(schedule.reserve(Some(ChatId(2)), now) < Duration::from_millis(1050));
    }

    #[tokio::test(start_paused = true)]
    async fn second_send_to_same_chat_waits() {
        let inner = Arc::new(RecordingMessenger::new(UserId(1)));
        let throttled = ThrottledMessenger::new(inner.clone(), ThrottleConfig::default());

        let start = Instant::now();
        throttled
            .send_text(ChatId(5), "a", ParseMode::Plain)
            .await
            .unwrap();
        throttled
            .send_text(ChatId(5), "b", ParseMode::Plain)
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(1050));
        assert_eq!(inner.sent_texts().len(), 2);
    }
}
