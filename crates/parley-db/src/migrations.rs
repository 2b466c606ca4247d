use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, conversations, messages)");
        conn.execute_batch(
            "
            -- Backing table for the user directory lookup; participants are not
            -- foreign keys so another directory can be plugged in
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY,
                first_name  TEXT NOT NULL,
                last_name   TEXT NOT NULL,
                handle      TEXT NOT NULL UNIQUE,
                avatar_url  TEXT
            );

            -- One row per unordered pair; low/high ordering makes (A,B) and (B,A) collide
            CREATE TABLE conversations (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                low_user_id       INTEGER NOT NULL,
                high_user_id      INTEGER NOT NULL,
                created_at        TEXT NOT NULL,
                last_activity_at  TEXT NOT NULL,
                CHECK (low_user_id < high_user_id),
                CHECK (last_activity_at >= created_at),
                UNIQUE (low_user_id, high_user_id)
            );

            CREATE INDEX idx_conversations_high
                ON conversations(high_user_id);

            CREATE TABLE messages (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id  INTEGER NOT NULL REFERENCES conversations(id),
                sender_id        INTEGER NOT NULL,
                body             TEXT NOT NULL CHECK (length(body) BETWEEN 1 AND 1000),
                sent_at          TEXT NOT NULL,
                is_read          INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_messages_timeline
                ON messages(conversation_id, sent_at, id);

            CREATE INDEX idx_messages_unread
                ON messages(conversation_id, is_read);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
