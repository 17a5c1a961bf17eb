use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use stn_core::{
    domain::{Article, ChatId, Subscription},
    Error, Result,
};

use crate::db_err;

const SUBSCRIPTION_COLUMNS: &str =
    "chat_id, public_id, symmetric_key, receive_enabled, display_name, handle";

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        chat_id: ChatId(row.get(0)?),
        public_id: row.get(1)?,
        symmetric_key: row.get(2)?,
        receive_enabled: row.get(3)?,
        display_name: row.get(4)?,
        handle: row.get(5)?,
    })
}

pub(crate) fn subscription_by_chat(conn: &Connection, chat_id: ChatId) -> Result<Option<Subscription>> {
    conn.query_row(
        &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE chat_id = ?1"),
        [chat_id.0],
        subscription_from_row,
    )
    .optional()
    .map_err(db_err)
}

pub(crate) fn subscription_by_public_id(
    conn: &Connection,
    public_id: &str,
) -> Result<Option<Subscription>> {
    conn.query_row(
        &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE public_id = ?1"),
        [public_id],
        subscription_from_row,
    )
    .optional()
    .map_err(db_err)
}

pub(crate) fn insert_subscription(conn: &Connection, sub: &Subscription) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO subscriptions
            (chat_id, public_id, symmetric_key, receive_enabled, display_name, handle, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            sub.chat_id.0,
            sub.public_id,
            sub.symmetric_key,
            sub.receive_enabled,
            sub.display_name,
            sub.handle,
            now
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

pub(crate) fn update_subscription(conn: &Connection, sub: &Subscription) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE subscriptions
             SET public_id = ?2, symmetric_key = ?3, receive_enabled = ?4,
                 display_name = ?5, handle = ?6, updated_at = ?7
             WHERE chat_id = ?1",
            params![
                sub.chat_id.0,
                sub.public_id,
                sub.symmetric_key,
                sub.receive_enabled,
                sub.display_name,
                sub.handle,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(db_err)?;
    if changed == 0 {
        return Err(Error::Store(format!(
            "no subscription for chat {}",
            sub.chat_id.0
        )));
    }
    Ok(())
}

pub(crate) fn insert_article(conn: &Connection, article: &Article) -> Result<()> {
    conn.execute(
        "INSERT INTO articles (article_id, raw_content, created_at) VALUES (?1, ?2, ?3)",
        params![article.article_id, article.raw_content, Utc::now().to_rfc3339()],
    )
    .map_err(db_err)?;
    Ok(())
}

pub(crate) fn article_by_id(conn: &Connection, article_id: &str) -> Result<Option<Article>> {
    conn.query_row(
        "SELECT article_id, raw_content FROM articles WHERE article_id = ?1",
        [article_id],
        |row| {
            Ok(Article {
                article_id: row.get(0)?,
                raw_content: row.get(1)?,
            })
        },
    )
    .optional()
    .map_err(db_err)
}
