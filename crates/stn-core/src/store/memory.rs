use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{Article, ChatId, Subscription},
    errors::Error,
    store::{ArticleStore, SubscriptionStore},
    Result,
};

#[derive(Default)]
struct Tables {
    subscriptions: HashMap<ChatId, Subscription>,
    articles: HashMap<String, Article>,
}

/// Process-lifetime store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find_by_chat(&self, chat_id: ChatId) -> Result<Option<Subscription>> {
        Ok(self.tables.lock().await.subscriptions.get(&chat_id).cloned())
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Subscription>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .values()
            .find(|s| s.public_id == public_id)
            .cloned())
    }

    async fn insert(&self, sub: &Subscription) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.subscriptions.contains_key(&sub.chat_id) {
            return Err(Error::Store(format!(
                "subscription for chat {} already exists",
                sub.chat_id.0
            )));
        }
        if public_id_taken(&tables, sub) {
            return Err(Error::Store("public id already in use".to_string()));
        }
        tables.subscriptions.insert(sub.chat_id, sub.clone());
        Ok(())
    }

    async fn save(&self, sub: &Subscription) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if public_id_taken(&tables, sub) {
            return Err(Error::Store("public id already in use".to_string()));
        }
        match tables.subscriptions.get_mut(&sub.chat_id) {
            Some(existing) => {
                *existing = sub.clone();
                Ok(())
            }
            None => Err(Error::Store(format!(
                "no subscription for chat {}",
                sub.chat_id.0
            ))),
        }
    }
}

fn public_id_taken(tables: &Tables, sub: &Subscription) -> bool {
    tables
        .subscriptions
        .values()
        .any(|s| s.public_id == sub.public_id && s.chat_id != sub.chat_id)
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn create_article(&self, article: &Article) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.articles.contains_key(&article.article_id) {
            return Err(Error::Store(format!(
                "article {} already exists",
                article.article_id
            )));
        }
        tables
            .articles
            .insert(article.article_id.clone(), article.clone());
        Ok(())
    }

    async fn get_article(&self, article_id: &str) -> Result<Option<Article>> {
        Ok(self.tables.lock().await.articles.get(article_id).cloned())
    }
}
