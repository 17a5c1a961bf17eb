//! Persistent record store ports.

pub mod memory;

use async_trait::async_trait;

use crate::{
    domain::{Article, ChatId, Subscription},
    Result,
};

/// Subscription records, unique by chat id and by public id.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_by_chat(&self, chat_id: ChatId) -> Result<Option<Subscription>>;

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Subscription>>;

    /// Fails with `Error::Store` when the chat id or public id already exists.
    async fn insert(&self, sub: &Subscription) -> Result<()>;

    /// Overwrite the record for `sub.chat_id`; fails when there is none.
    async fn save(&self, sub: &Subscription) -> Result<()>;
}

/// Insert-only archive of server-rendered messages.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fails with `Error::Store` when the article id already exists.
    async fn create_article(&self, article: &Article) -> Result<()>;

    async fn get_article(&self, article_id: &str) -> Result<Option<Article>>;
}
