//! Identity registry: subscription records keyed by chat and by public id.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::{
    credentials,
    domain::{ChatId, ChatProfile, Subscription},
    errors::Error,
    store::SubscriptionStore,
    Result,
};

/// Idle slots are dropped once the map reaches this many chats.
const CHAT_SLOT_PRUNE_THRESHOLD: usize = 1024;

/// Per-chat async locks serializing the registry's read-then-write sequences.
pub struct ChatLocks {
    by_chat: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
    prune_threshold: usize,
}

impl Default for ChatLocks {
    fn default() -> Self {
        Self::with_prune_threshold(CHAT_SLOT_PRUNE_THRESHOLD)
    }
}

impl ChatLocks {
    fn with_prune_threshold(prune_threshold: usize) -> Self {
        Self {
            by_chat: Mutex::new(HashMap::new()),
            prune_threshold,
        }
    }

    pub async fn lock(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut by_chat = self.by_chat.lock().await;
            if by_chat.len() >= self.prune_threshold && !by_chat.contains_key(&chat_id) {
                // A count of one means only the map holds the slot: no guard, no waiter.
                by_chat.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            by_chat.entry(chat_id).or_default().clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.by_chat.lock().await.len()
    }
}

/// Result of a credential-issuing operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issued {
    pub subscription: Subscription,
    /// True when no record existed for the chat before the call.
    pub created: bool,
}

pub struct Registry {
    store: Arc<dyn SubscriptionStore>,
    locks: ChatLocks,
}

impl Registry {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self {
            store,
            locks: ChatLocks::default(),
        }
    }

    /// Idempotent subscribe: re-enables and refreshes an existing record, or creates one.
    pub async fn get_or_create(&self, chat_id: ChatId, profile: &ChatProfile) -> Result<Issued> {
        let _guard = self.locks.lock(chat_id).await;

        if let Some(mut sub) = self.store.find_by_chat(chat_id).await? {
            sub.apply_profile(profile);
            sub.receive_enabled = true;
            self.store.save(&sub).await?;
            return Ok(Issued {
                subscription: sub,
                created: false,
            });
        }

        let sub = fresh_subscription(chat_id, profile)?;
        self.store.insert(&sub).await?;
        info!(chat_id = chat_id.0, "subscription created");
        Ok(Issued {
            subscription: sub,
            created: true,
        })
    }

    /// Always issues a new public id / key pair; keeps `receive_enabled` of an existing record.
    pub async fn regenerate(&self, chat_id: ChatId, profile: &ChatProfile) -> Result<Issued> {
        let _guard = self.locks.lock(chat_id).await;

        let public_id = credentials::new_public_id()?;
        let symmetric_key = credentials::new_symmetric_key()?;

        match self.store.find_by_chat(chat_id).await? {
            Some(mut sub) => {
                sub.public_id = public_id;
                sub.symmetric_key = symmetric_key;
                sub.apply_profile(profile);
                self.store.save(&sub).await?;
                info!(chat_id = chat_id.0, "credentials regenerated");
                Ok(Issued {
                    subscription: sub,
                    created: false,
                })
            }
            None => {
                let sub = Subscription {
                    chat_id,
                    public_id,
                    symmetric_key,
                    receive_enabled: true,
                    display_name: profile.display_name.clone(),
                    handle: profile.handle.clone(),
                };
                self.store.insert(&sub).await?;
                info!(chat_id = chat_id.0, "subscription created by regenerate");
                Ok(Issued {
                    subscription: sub,
                    created: true,
                })
            }
        }
    }

    /// Stop accepting ingestion for the chat. `Error::NotSubscribed` when there is no record.
    pub async fn disable(&self, chat_id: ChatId) -> Result<Subscription> {
        let _guard = self.locks.lock(chat_id).await;

        let Some(mut sub) = self.store.find_by_chat(chat_id).await? else {
            return Err(Error::NotSubscribed);
        };
        sub.receive_enabled = false;
        self.store.save(&sub).await?;
        info!(chat_id = chat_id.0, "subscription disabled");
        Ok(sub)
    }

    /// Current record with its display fields refreshed from `profile`.
    pub async fn describe(
        &self,
        chat_id: ChatId,
        profile: &ChatProfile,
    ) -> Result<Option<Subscription>> {
        let _guard = self.locks.lock(chat_id).await;

        let Some(mut sub) = self.store.find_by_chat(chat_id).await? else {
            return Ok(None);
        };
        if sub.display_name != profile.display_name || sub.handle != profile.handle {
            sub.apply_profile(profile);
            self.store.save(&sub).await?;
        }
        Ok(Some(sub))
    }

    /// Current record without touching it (help text).
    pub async fn current(&self, chat_id: ChatId) -> Result<Option<Subscription>> {
        self.store.find_by_chat(chat_id).await
    }

    /// Ingestion lookup. Never refreshes display fields.
    pub async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Subscription>> {
        if !credentials::is_well_formed_public_id(public_id) {
            return Ok(None);
        }
        self.store.find_by_public_id(public_id).await
    }
}

fn fresh_subscription(chat_id: ChatId, profile: &ChatProfile) -> Result<Subscription> {
    Ok(Subscription {
        chat_id,
        public_id: credentials::new_public_id()?,
        symmetric_key: credentials::new_symmetric_key()?,
        receive_enabled: true,
        display_name: profile.display_name.clone(),
        handle: profile.handle.clone(),
    })
}
