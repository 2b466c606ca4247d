use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

numeric_id!(
    /// Identity of a user in the external user directory. Ordering is numeric
    /// and drives pair canonicalization.
    UserId
);
numeric_id!(ConversationId);
numeric_id!(
    /// Assigned by storage, strictly increasing. Breaks ties between messages
    /// sharing a `sent_at`.
    MessageId
);

/// Public display fields of a user. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub handle: String,
    pub avatar_url: Option<String>,
}

/// A pairwise conversation, stored with `low_user_id < high_user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub low_user_id: UserId,
    pub high_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.low_user_id == user_id || self.high_user_id == user_id
    }

    /// The participant that is not `user_id`, or `None` if `user_id` is not
    /// part of this conversation.
    pub fn other_participant(&self, user_id: UserId) -> Option<UserId> {
        if self.low_user_id == user_id {
            Some(self.high_user_id)
        } else if self.high_user_id == user_id {
            Some(self.low_user_id)
        } else {
            None
        }
    }

    pub fn participants(&self) -> [UserId; 2] {
        [self.low_user_id, self.high_user_id]
    }
}

/// A conversation together with both participants' public profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub low_user: PublicProfile,
    pub high_user: PublicProfile,
}

/// One entry of a user's conversation list, seen from that user's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationView {
    pub conversation_id: ConversationId,
    pub other_participant: PublicProfile,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub is_read: bool,
}

/// A message with its sender's public profile attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: PublicProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Offset-based pagination metadata. `page` is 1-based and `page_size`
    /// must be non-zero.
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        let size = u64::from(page_size);
        let total_pages = total.div_ceil(size);
        Self {
            page,
            page_size,
            total,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            has_next: u64::from(page) * size < total,
            has_prev: page > 1,
        }
    }

    /// Rows to skip before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<MessageView>,
    pub pagination: Pagination,
}
