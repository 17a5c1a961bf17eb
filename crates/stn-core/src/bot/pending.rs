use std::{collections::HashMap, time::Duration};

use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use crate::domain::{ChatId, MessageId, MessageRef};

#[derive(Clone, Copy, Debug)]
struct Entry {
    prompt: MessageId,
    created: Instant,
}

/// Forwarded message -> prompt message, for prompts still awaiting a button press.
///
/// Bounded: the oldest entry is evicted when full, and entries older than `ttl`
/// are swept on every access.
pub struct PendingPrompts {
    inner: Mutex<HashMap<(ChatId, MessageId), Entry>>,
    capacity: usize,
    ttl: Duration,
}

impl PendingPrompts {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub async fn insert(&self, origin: MessageRef, prompt: MessageId) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();
        sweep(&mut map, now, self.ttl);

        let key = (origin.chat_id, origin.message_id);
        if !map.contains_key(&key) && map.len() >= self.capacity {
            if let Some(oldest) = map
                .iter()
                .min_by_key(|(_, e)| e.created)
                .map(|(k, _)| *k)
            {
                debug!(chat_id = oldest.0 .0, "evicting oldest pending prompt");
                map.remove(&oldest);
            }
        }
        map.insert(
            key,
            Entry {
                prompt,
                created: now,
            },
        );
    }

    /// Remove and return the prompt recorded for `origin`.
    pub async fn take(&self, origin: MessageRef) -> Option<MessageId> {
        let mut map = self.inner.lock().await;
        sweep(&mut map, Instant::now(), self.ttl);
        map.remove(&(origin.chat_id, origin.message_id))
            .map(|e| e.prompt)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sweep(map: &mut HashMap<(ChatId, MessageId), Entry>, now: Instant, ttl: Duration) {
    map.retain(|_, e| now.saturating_duration_since(e.created) < ttl);
}
