use serde::{Deserialize, Serialize};

use crate::models::{ConversationDetail, ConversationId, MessageId, MessageView, UserId};

/// Events handed to the live-socket layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// A conversation was created for a pair that had none
    ConversationCreate { conversation: ConversationDetail },

    /// A new message was appended
    MessageCreate { message: MessageView },

    /// The reader marked messages in one conversation as read
    MessagesRead {
        conversation_id: ConversationId,
        reader_id: UserId,
        message_ids: Vec<MessageId>,
    },
}

impl GatewayEvent {
    /// The conversation this event belongs to.
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            Self::ConversationCreate { conversation } => conversation.conversation.id,
            Self::MessageCreate { message } => message.message.conversation_id,
            Self::MessagesRead { conversation_id, .. } => *conversation_id,
        }
    }
}

/// An event together with the users it should reach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub audience: Vec<UserId>,
    pub event: GatewayEvent,
}

impl Delivery {
    pub fn is_for(&self, user_id: UserId) -> bool {
        self.audience.contains(&user_id)
    }
}
