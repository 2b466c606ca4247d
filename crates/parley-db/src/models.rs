//! Database row types. These map directly to SQLite rows and are converted
//! into the parley-types models at the repository boundary.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use parley_types::models::{
    Conversation, ConversationId, Message, MessageId, PublicProfile, UserId,
};

pub struct UserRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub handle: String,
    pub avatar_url: Option<String>,
}

pub struct ConversationRow {
    pub id: i64,
    pub low_user_id: i64,
    pub high_user_id: i64,
    pub created_at: String,
    pub last_activity_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub sent_at: String,
    pub is_read: bool,
}

impl From<UserRow> for PublicProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            handle: row.handle,
            avatar_url: row.avatar_url,
        }
    }
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = anyhow::Error;

    fn try_from(row: ConversationRow) -> Result<Self> {
        Ok(Self {
            id: ConversationId(row.id),
            low_user_id: UserId(row.low_user_id),
            high_user_id: UserId(row.high_user_id),
            created_at: decode_timestamp(&row.created_at)
                .with_context(|| format!("conversation {} created_at", row.id))?,
            last_activity_at: decode_timestamp(&row.last_activity_at)
                .with_context(|| format!("conversation {} last_activity_at", row.id))?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Self {
            id: MessageId(row.id),
            conversation_id: ConversationId(row.conversation_id),
            sender_id: UserId(row.sender_id),
            sent_at: decode_timestamp(&row.sent_at)
                .with_context(|| format!("message {} sent_at", row.id))?,
            body: row.body,
            is_read: row.is_read,
        })
    }
}

/// Fixed-width RFC 3339 with microseconds, so text order is time order.
pub fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("corrupt timestamp '{}'", raw))?;
    Ok(parsed.with_timezone(&Utc))
}
