use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS subscriptions (
            chat_id          INTEGER PRIMARY KEY,
            public_id        TEXT NOT NULL UNIQUE,
            symmetric_key    TEXT NOT NULL,
            receive_enabled  INTEGER NOT NULL DEFAULT 1,
            display_name     TEXT NOT NULL DEFAULT '',
            handle           TEXT NOT NULL DEFAULT '',
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS articles (
            article_id   TEXT PRIMARY KEY,
            raw_content  TEXT NOT NULL,
            created_at   TEXT NOT NULL
        );
        ",
    )?;

    info!("database migrations complete");
    Ok(())
}
