use serde::{Deserialize, Serialize};

use crate::models::{ConversationId, MessageId, UserId};

// -- Auth --

/// Bearer token claims. Tokens are issued elsewhere; this service only
/// verifies them and trusts `sub` as the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Decimal user id.
    pub sub: String,
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: UserId, exp: usize) -> Self {
        Self {
            sub: user_id.to_string(),
            exp,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok().map(UserId)
    }
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConversationRequest {
    pub participant_id: UserId,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Either a single id or a list of ids on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkReadRequest {
    pub message_ids: OneOrMany<MessageId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

#[derive(Debug, Deserialize)]
pub struct UnreadQuery {
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
