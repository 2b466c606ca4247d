//! Repository traits for the two entities the messaging core persists.
//!
//! `Database` implements both; the messaging components only see these
//! traits, so tests can wrap or replace the store.

use anyhow::Result;
use chrono::{DateTime, Utc};

use parley_types::models::{Conversation, ConversationId, Message, MessageId, UserId};

/// Result of inserting a conversation for a canonical pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// This call created the row.
    Created(Conversation),
    /// The pair was already taken; carries the row that holds it.
    AlreadyExists(Conversation),
}

impl InsertOutcome {
    #[cfg(test)]
    pub fn into_inner(self) -> Conversation {
        match self {
            Self::Created(c) | Self::AlreadyExists(c) => c,
        }
    }
}

pub trait ConversationStore: Send + Sync {
    fn find_conversation(&self, id: ConversationId) -> Result<Option<Conversation>>;

    fn find_conversation_by_pair(&self, low: UserId, high: UserId) -> Result<Option<Conversation>>;

    /// Insert `(low, high)` with both timestamps set to `now`. A uniqueness
    /// conflict on the pair is reported as `AlreadyExists`, not as an error.
    fn insert_conversation(
        &self,
        low: UserId,
        high: UserId,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome>;

    /// Advance `last_activity_at` to `at`. Never moves it backwards.
    /// Returns `false` when no conversation has this id.
    fn touch_activity(&self, id: ConversationId, at: DateTime<Utc>) -> Result<bool>;

    /// All conversations of `user`, most recent activity first, ties broken
    /// by id descending.
    fn list_conversations_for_user(&self, user: UserId) -> Result<Vec<Conversation>>;

    fn conversation_ids_for_user(&self, user: UserId) -> Result<Vec<ConversationId>>;
}

#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: &'a str,
    pub sent_at: DateTime<Utc>,
}

/// A message that `mark_read` flipped from unread to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReceipt {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
}

pub trait MessageStore: Send + Sync {
    fn insert_message(&self, message: NewMessage<'_>) -> Result<Message>;

    fn count_messages(&self, conversation_id: ConversationId) -> Result<u64>;

    /// Messages ordered by `(sent_at, id)` ascending.
    fn list_messages(
        &self,
        conversation_id: ConversationId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Message>>;

    /// Flip `is_read` on the given ids where the message is unread, was not
    /// sent by `reader`, and belongs to a conversation `reader` is part of.
    /// Unknown ids are skipped.
    fn mark_read(&self, ids: &[MessageId], reader: UserId) -> Result<Vec<ReadReceipt>>;

    /// Unread messages addressed to `user` within `conversation_ids`.
    fn count_unread(&self, user: UserId, conversation_ids: &[ConversationId]) -> Result<u64>;
}
