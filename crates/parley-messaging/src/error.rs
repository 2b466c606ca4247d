use thiserror::Error;

use parley_types::models::{ConversationId, UserId};

/// Why a message body was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BodyProblem {
    #[error("body is empty")]
    Empty,
    #[error("body contains a NUL character")]
    ContainsNul,
    #[error("body is {len} characters, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("user {0} cannot start a conversation with themself")]
    InvalidPair(UserId),

    #[error("unknown participant {0}")]
    UnknownParticipant(UserId),

    #[error("conversation {0} not found")]
    ConversationNotFound(ConversationId),

    #[error("user {user} is not a participant of conversation {conversation}")]
    NotAParticipant {
        conversation: ConversationId,
        user: UserId,
    },

    #[error("user {user} may not access conversation {conversation}")]
    Forbidden {
        conversation: ConversationId,
        user: UserId,
    },

    #[error("invalid message body: {0}")]
    InvalidBody(BodyProblem),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl MessagingError {
    /// Stable machine-readable code, one per variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPair(_) => "invalid_pair",
            Self::UnknownParticipant(_) => "unknown_participant",
            Self::ConversationNotFound(_) => "conversation_not_found",
            Self::NotAParticipant { .. } => "not_a_participant",
            Self::Forbidden { .. } => "forbidden",
            Self::InvalidBody(_) => "invalid_body",
            Self::Storage(_) => "internal",
        }
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
