//! SQLite-backed subscription and article stores.

pub mod migrations;
mod queries;

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode};
use tracing::info;

use stn_core::{
    domain::{Article, ChatId, Subscription},
    store::{ArticleStore, SubscriptionStore},
    Error, Result,
};

pub(crate) fn db_err(e: rusqlite::Error) -> Error {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => Error::Store(format!("duplicate record: {e}")),
        _ => Error::Store(e.to_string()),
    }
}

struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    fn new(conn: Connection) -> Result<Self> {
        migrations::run(&conn).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Store(format!("database lock poisoned: {e}")))?;
        f(&conn)
    }
}

/// Both store ports over one SQLite connection.
///
/// Queries run on the blocking pool so HTTP handlers never stall the runtime.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        let db = Database::new(conn)?;
        info!("database opened at {}", path.display());
        Ok(Self { db: Arc::new(db) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Ok(Self {
            db: Arc::new(Database::new(conn)?),
        })
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| Error::Store(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStore {
    async fn find_by_chat(&self, chat_id: ChatId) -> Result<Option<Subscription>> {
        self.run(move |conn| queries::subscription_by_chat(conn, chat_id))
            .await
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Subscription>> {
        let public_id = public_id.to_string();
        self.run(move |conn| queries::subscription_by_public_id(conn, &public_id))
            .await
    }

    async fn insert(&self, sub: &Subscription) -> Result<()> {
        let sub = sub.clone();
        self.run(move |conn| queries::insert_subscription(conn, &sub))
            .await
    }

    async fn save(&self, sub: &Subscription) -> Result<()> {
        let sub = sub.clone();
        self.run(move |conn| queries::update_subscription(conn, &sub))
            .await
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn create_article(&self, article: &Article) -> Result<()> {
        let article = article.clone();
        self.run(move |conn| queries::insert_article(conn, &article))
            .await
    }

    async fn get_article(&self, article_id: &str) -> Result<Option<Article>> {
        let article_id = article_id.to_string();
        self.run(move |conn| queries::article_by_id(conn, &article_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(chat: i64, public_id: &str) -> Subscription {
        Subscription {
            chat_id: ChatId(chat),
            public_id: public_id.to_string(),
            symmetric_key: "00".repeat(32),
            receive_enabled: true,
            display_name: "Ops".to_string(),
            handle: "ops".to_string(),
        }
    }

    #[tokio::test]
    async fn subscription_lookup_by_both_keys() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&sub(-100, "a".repeat(32).as_str())).await.unwrap();

        let by_chat = store.find_by_chat(ChatId(-100)).await.unwrap().unwrap();
        let by_id = store.find_by_public_id(&"a".repeat(32)).await.unwrap().unwrap();
        assert_eq!(by_chat, by_id);
        assert!(store.find_by_chat(ChatId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_chat_or_public_id_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&sub(1, "x")).await.unwrap();
        assert!(matches!(store.insert(&sub(1, "y")).await, Err(Error::Store(_))));
        assert!(matches!(store.insert(&sub(2, "x")).await, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn save_overwrites_credentials_and_flag() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&sub(1, "old")).await.unwrap();

        let mut updated = sub(1, "new");
        updated.receive_enabled = false;
        store.save(&updated).await.unwrap();

        assert!(store.find_by_public_id("old").await.unwrap().is_none());
        let found = store.find_by_chat(ChatId(1)).await.unwrap().unwrap();
        assert_eq!(found.public_id, "new");
        assert!(!found.receive_enabled);
    }

    #[tokio::test]
    async fn save_without_record_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(store.save(&sub(1, "x")).await, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn articles_are_insert_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let article = Article {
            article_id: "art-1".to_string(),
            raw_content: "# Hello".to_string(),
        };
        store.create_article(&article).await.unwrap();
        assert!(store.create_article(&article).await.is_err());
        assert_eq!(store.get_article("art-1").await.unwrap(), Some(article));
        assert!(store.get_article("missing").await.unwrap().is_none());
    }
}
