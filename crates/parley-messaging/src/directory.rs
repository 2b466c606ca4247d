//! Canonical one-per-pair conversations and per-user activity listings.

use std::sync::Arc;

use tracing::{debug, warn};

use parley_db::{ConversationStore, InsertOutcome};
use parley_types::events::{Delivery, GatewayEvent};
use parley_types::models::{
    Conversation, ConversationDetail, ConversationId, ConversationView, PublicProfile, UserId,
};

use crate::clock::Clock;
use crate::error::{MessagingError, MessagingResult};
use crate::notify::Notifier;
use crate::users::UserDirectory;

/// Order a pair as `(low, high)`. Rejects a user paired with themself.
pub fn canonical_pair(a: UserId, b: UserId) -> MessagingResult<(UserId, UserId)> {
    if a == b {
        return Err(MessagingError::InvalidPair(a));
    }
    Ok((a.min(b), a.max(b)))
}

pub struct ConversationDirectory {
    store: Arc<dyn ConversationStore>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl ConversationDirectory {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            users,
            clock,
            notifier,
        }
    }

    /// Return the conversation between `a` and `b`, creating it on first
    /// contact. Concurrent callers for the same pair, in either argument
    /// order, all get the same row.
    pub fn get_or_create(&self, a: UserId, b: UserId) -> MessagingResult<ConversationDetail> {
        let (low, high) = canonical_pair(a, b)?;

        for id in [low, high] {
            if !self.users.exists(id)? {
                return Err(MessagingError::UnknownParticipant(id));
            }
        }

        if let Some(existing) = self.store.find_conversation_by_pair(low, high)? {
            return self.detail(existing);
        }

        match self.store.insert_conversation(low, high, self.clock.now())? {
            InsertOutcome::Created(conversation) => {
                debug!("Created conversation {} for ({}, {})", conversation.id, low, high);
                let detail = self.detail(conversation)?;
                self.notifier.notify(Delivery {
                    audience: vec![low, high],
                    event: GatewayEvent::ConversationCreate {
                        conversation: detail.clone(),
                    },
                });
                Ok(detail)
            }
            InsertOutcome::AlreadyExists(conversation) => {
                debug!(
                    "Conversation for ({}, {}) was created concurrently, using {}",
                    low, high, conversation.id
                );
                self.detail(conversation)
            }
        }
    }

    /// Conversations of `user_id`, most recently active first. Each entry
    /// shows the other participant.
    pub fn list_for_user(&self, user_id: UserId) -> MessagingResult<Vec<ConversationView>> {
        self.store
            .list_conversations_for_user(user_id)?
            .into_iter()
            .map(|conversation| -> MessagingResult<ConversationView> {
                let other = conversation.other_participant(user_id).ok_or_else(|| {
                    anyhow::anyhow!(
                        "conversation {} listed for non-participant {}",
                        conversation.id,
                        user_id
                    )
                })?;
                Ok(ConversationView {
                    conversation_id: conversation.id,
                    other_participant: self.profile(other)?,
                    created_at: conversation.created_at,
                    last_activity_at: conversation.last_activity_at,
                })
            })
            .collect()
    }

    /// Move the conversation's activity timestamp to now.
    pub fn touch_activity(&self, conversation_id: ConversationId) -> MessagingResult<()> {
        if self.store.touch_activity(conversation_id, self.clock.now())? {
            Ok(())
        } else {
            Err(MessagingError::ConversationNotFound(conversation_id))
        }
    }

    pub fn find(&self, conversation_id: ConversationId) -> MessagingResult<Option<Conversation>> {
        Ok(self.store.find_conversation(conversation_id)?)
    }

    /// Like [`find`](Self::find), but a missing row is an error.
    pub fn require(&self, conversation_id: ConversationId) -> MessagingResult<Conversation> {
        self.find(conversation_id)?
            .ok_or(MessagingError::ConversationNotFound(conversation_id))
    }

    pub fn conversation_ids_for(&self, user_id: UserId) -> MessagingResult<Vec<ConversationId>> {
        Ok(self.store.conversation_ids_for_user(user_id)?)
    }

    /// Public profile of a participant.
    pub fn profile(&self, user_id: UserId) -> MessagingResult<PublicProfile> {
        match self.users.public_profile(user_id)? {
            Some(profile) => Ok(profile),
            None => {
                warn!("Participant {} has no directory entry", user_id);
                Err(MessagingError::UnknownParticipant(user_id))
            }
        }
    }

    fn detail(&self, conversation: Conversation) -> MessagingResult<ConversationDetail> {
        let low_user = self.profile(conversation.low_user_id)?;
        let high_user = self.profile(conversation.high_user_id)?;
        Ok(ConversationDetail {
            conversation,
            low_user,
            high_user,
        })
    }
}
