use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use parley_types::models::{
    Conversation, ConversationId, Message, MessageId, PublicProfile, UserId,
};

use crate::Database;
use crate::models::{ConversationRow, MessageRow, UserRow, decode_timestamp, encode_timestamp};
use crate::repository::{ConversationStore, InsertOutcome, MessageStore, NewMessage, ReadReceipt};

/// Ids bound per statement when expanding `IN (...)` lists.
const ID_CHUNK: usize = 500;

const CONVERSATION_COLUMNS: &str = "id, low_user_id, high_user_id, created_at, last_activity_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, body, sent_at, is_read";

impl Database {
    // -- Users --

    pub fn create_user(&self, profile: &PublicProfile) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, first_name, last_name, handle, avatar_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    profile.id.0,
                    profile.first_name,
                    profile.last_name,
                    profile.handle,
                    profile.avatar_url
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: UserId) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn user_exists(&self, id: UserId) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id.0], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }
}

impl ConversationStore for Database {
    fn find_conversation(&self, id: ConversationId) -> Result<Option<Conversation>> {
        self.with_conn(|conn| query_conversation_by_id(conn, id))
    }

    fn find_conversation_by_pair(&self, low: UserId, high: UserId) -> Result<Option<Conversation>> {
        self.with_conn(|conn| query_conversation_by_pair(conn, low, high))
    }

    fn insert_conversation(
        &self,
        low: UserId,
        high: UserId,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        // Hand back what a later read will see, not the caller's finer `now`.
        let stamp = encode_timestamp(now);
        let now = decode_timestamp(&stamp)?;

        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO conversations (low_user_id, high_user_id, created_at, last_activity_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![low.0, high.0, stamp],
            );

            match inserted {
                Ok(_) => Ok(InsertOutcome::Created(Conversation {
                    id: ConversationId(conn.last_insert_rowid()),
                    low_user_id: low,
                    high_user_id: high,
                    created_at: now,
                    last_activity_at: now,
                })),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    debug!("Conversation ({}, {}) already exists, fetching it", low, high);
                    let existing = query_conversation_by_pair(conn, low, high)?.ok_or_else(|| {
                        anyhow!("conversation ({}, {}) conflicted but is not readable", low, high)
                    })?;
                    Ok(InsertOutcome::AlreadyExists(existing))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn touch_activity(&self, id: ConversationId, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE conversations
                 SET last_activity_at = MAX(last_activity_at, ?2)
                 WHERE id = ?1",
                params![id.0, encode_timestamp(at)],
            )?;
            Ok(updated > 0)
        })
    }

    fn list_conversations_for_user(&self, user: UserId) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS}
                 FROM conversations
                 WHERE low_user_id = ?1 OR high_user_id = ?1
                 ORDER BY last_activity_at DESC, id DESC"
            ))?;

            let rows = stmt
                .query_map([user.0], conversation_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(Conversation::try_from).collect()
        })
    }

    fn conversation_ids_for_user(&self, user: UserId) -> Result<Vec<ConversationId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM conversations WHERE low_user_id = ?1 OR high_user_id = ?1",
            )?;
            let ids = stmt
                .query_map([user.0], |row| row.get(0).map(ConversationId))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }
}

impl MessageStore for Database {
    fn insert_message(&self, message: NewMessage<'_>) -> Result<Message> {
        let stamp = encode_timestamp(message.sent_at);
        let sent_at = decode_timestamp(&stamp)?;

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (conversation_id, sender_id, body, sent_at, is_read)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![message.conversation_id.0, message.sender_id.0, message.body, stamp],
            )?;

            Ok(Message {
                id: MessageId(conn.last_insert_rowid()),
                conversation_id: message.conversation_id,
                sender_id: message.sender_id,
                body: message.body.to_string(),
                sent_at,
                is_read: false,
            })
        })
    }

    fn count_messages(&self, conversation_id: ConversationId) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                [conversation_id.0],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    fn list_messages(
        &self,
        conversation_id: ConversationId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.with_conn(|conn| query_messages(conn, conversation_id, offset, limit))
    }

    fn mark_read(&self, ids: &[MessageId], reader: UserId) -> Result<Vec<ReadReceipt>> {
        let mut ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn_mut(|conn| {
            let mut receipts = Vec::new();
            for chunk in ids.chunks(ID_CHUNK) {
                let sql = format!(
                    "UPDATE messages SET is_read = 1
                     WHERE id IN ({})
                       AND is_read = 0
                       AND sender_id != ?1
                       AND conversation_id IN (
                           SELECT id FROM conversations
                           WHERE low_user_id = ?1 OR high_user_id = ?1
                       )
                     RETURNING id, conversation_id",
                    placeholders(2, chunk.len())
                );

                let mut stmt = conn.prepare(&sql)?;
                let bound = std::iter::once(reader.0).chain(chunk.iter().copied());
                let flipped = stmt
                    .query_map(params_from_iter(bound), |row| {
                        Ok(ReadReceipt {
                            message_id: MessageId(row.get(0)?),
                            conversation_id: ConversationId(row.get(1)?),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                receipts.extend(flipped);
            }
            Ok(receipts)
        })
    }

    fn count_unread(&self, user: UserId, conversation_ids: &[ConversationId]) -> Result<u64> {
        if conversation_ids.is_empty() {
            return Ok(0);
        }

        self.with_conn(|conn| {
            let mut total = 0u64;
            for chunk in conversation_ids.chunks(ID_CHUNK) {
                let sql = format!(
                    "SELECT COUNT(*) FROM messages
                     WHERE is_read = 0
                       AND sender_id != ?1
                       AND conversation_id IN ({})",
                    placeholders(2, chunk.len())
                );
                let bound = std::iter::once(user.0).chain(chunk.iter().map(|id| id.0));
                let count: i64 = conn.query_row(&sql, params_from_iter(bound), |row| row.get(0))?;
                total += count as u64;
            }
            Ok(total)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: UserId) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, handle, avatar_url FROM users WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id.0], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                handle: row.get(3)?,
                avatar_url: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_conversation_by_id(conn: &Connection, id: ConversationId) -> Result<Option<Conversation>> {
    let row = conn
        .query_row(
            &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
            [id.0],
            conversation_row,
        )
        .optional()?;

    row.map(Conversation::try_from).transpose()
}

fn query_conversation_by_pair(
    conn: &Connection,
    low: UserId,
    high: UserId,
) -> Result<Option<Conversation>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE low_user_id = ?1 AND high_user_id = ?2"
            ),
            [low.0, high.0],
            conversation_row,
        )
        .optional()?;

    row.map(Conversation::try_from).transpose()
}

fn query_messages(
    conn: &Connection,
    conversation_id: ConversationId,
    offset: u64,
    limit: u32,
) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages
         WHERE conversation_id = ?1
         ORDER BY sent_at ASC, id ASC
         LIMIT ?2 OFFSET ?3"
    ))?;

    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(params![conversation_id.0, limit, offset], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                sender_id: row.get(2)?,
                body: row.get(3)?,
                sent_at: row.get(4)?,
                is_read: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(Message::try_from).collect()
}

fn conversation_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        low_user_id: row.get(1)?,
        high_user_id: row.get(2)?,
        created_at: row.get(3)?,
        last_activity_at: row.get(4)?,
    })
}

/// `?first, ?first+1, ...` for `count` parameters.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
