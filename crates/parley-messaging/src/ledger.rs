//! Append-only message timelines, pagination and read state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use parley_db::{MessageStore, NewMessage};
use parley_types::events::{Delivery, GatewayEvent};
use parley_types::models::{
    Conversation, ConversationId, Message, MessageId, MessagePage, MessageView, Pagination,
    PublicProfile, UserId,
};

use crate::clock::Clock;
use crate::directory::ConversationDirectory;
use crate::error::{BodyProblem, MessagingError, MessagingResult};
use crate::notify::Notifier;

/// Longest accepted body, counted in characters after trimming.
pub const MAX_BODY_CHARS: usize = 1000;

pub const MAX_PAGE_SIZE: u32 = 100;

/// Trim `body` and check it is between 1 and [`MAX_BODY_CHARS`] characters.
/// NUL is refused: SQLite's `length()` stops counting at it.
pub fn validate_body(body: &str) -> MessagingResult<&str> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(MessagingError::InvalidBody(BodyProblem::Empty));
    }
    if trimmed.contains('\0') {
        return Err(MessagingError::InvalidBody(BodyProblem::ContainsNul));
    }
    let len = trimmed.chars().count();
    if len > MAX_BODY_CHARS {
        return Err(MessagingError::InvalidBody(BodyProblem::TooLong {
            len,
            max: MAX_BODY_CHARS,
        }));
    }
    Ok(trimmed)
}

pub struct MessageLedger {
    store: Arc<dyn MessageStore>,
    directory: Arc<ConversationDirectory>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl MessageLedger {
    pub fn new(
        store: Arc<dyn MessageStore>,
        directory: Arc<ConversationDirectory>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            notifier,
        }
    }

    /// Append a message and then advance the conversation's activity.
    ///
    /// The message is the unit of success: if the activity touch fails
    /// afterwards it is logged and the message is still returned.
    pub fn append(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        body: &str,
    ) -> MessagingResult<Message> {
        let body = validate_body(body)?;
        let conversation = self.directory.require(conversation_id)?;
        if !conversation.has_participant(sender_id) {
            return Err(MessagingError::NotAParticipant {
                conversation: conversation_id,
                user: sender_id,
            });
        }

        let message = self.store.insert_message(NewMessage {
            conversation_id,
            sender_id,
            body,
            sent_at: self.clock.now(),
        })?;
        debug!("Message {} appended to conversation {}", message.id, conversation_id);

        if let Err(e) = self.directory.touch_activity(conversation_id) {
            warn!(
                "Message {} stored but activity of conversation {} not updated: {}",
                message.id, conversation_id, e
            );
        }

        self.publish_created(&conversation, &message);
        Ok(message)
    }

    /// One page of the conversation, oldest first. `page` is 1-based; values
    /// below 1 mean the first page and `page_size` is clamped to
    /// `1..=MAX_PAGE_SIZE`.
    pub fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
        page: u32,
        page_size: u32,
        caller_id: UserId,
    ) -> MessagingResult<MessagePage> {
        let conversation = self.directory.require(conversation_id)?;
        if !conversation.has_participant(caller_id) {
            return Err(MessagingError::Forbidden {
                conversation: conversation_id,
                user: caller_id,
            });
        }

        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let total = self.store.count_messages(conversation_id)?;
        let pagination = Pagination::new(page, page_size, total);

        if pagination.offset() >= total {
            return Ok(MessagePage {
                messages: vec![],
                pagination,
            });
        }

        let rows = self
            .store
            .list_messages(conversation_id, pagination.offset(), page_size)?;

        let mut senders: HashMap<UserId, PublicProfile> = HashMap::new();
        let mut messages = Vec::with_capacity(rows.len());
        for message in rows {
            let sender = match senders.get(&message.sender_id) {
                Some(profile) => profile.clone(),
                None => {
                    let profile = self.directory.profile(message.sender_id)?;
                    senders.insert(message.sender_id, profile.clone());
                    profile
                }
            };
            messages.push(MessageView { message, sender });
        }

        Ok(MessagePage {
            messages,
            pagination,
        })
    }

    /// Mark messages addressed to `reader_id` as read. Ids that are unknown,
    /// already read, sent by the reader or outside the reader's conversations
    /// are skipped. Returns how many messages changed.
    pub fn mark_read(
        &self,
        message_ids: &[MessageId],
        reader_id: UserId,
    ) -> MessagingResult<usize> {
        let receipts = self.store.mark_read(message_ids, reader_id)?;
        let updated = receipts.len();

        let mut by_conversation: BTreeMap<ConversationId, Vec<MessageId>> = BTreeMap::new();
        for receipt in receipts {
            by_conversation
                .entry(receipt.conversation_id)
                .or_default()
                .push(receipt.message_id);
        }

        for (conversation_id, message_ids) in by_conversation {
            match self.directory.find(conversation_id) {
                Ok(Some(conversation)) => self.notifier.notify(Delivery {
                    audience: conversation.participants().to_vec(),
                    event: GatewayEvent::MessagesRead {
                        conversation_id,
                        reader_id,
                        message_ids,
                    },
                }),
                Ok(None) => {}
                Err(e) => warn!("Skipping read notification for {}: {}", conversation_id, e),
            }
        }

        Ok(updated)
    }

    /// Unread messages addressed to `user_id`, in one conversation or across
    /// all of theirs.
    pub fn unread_count(
        &self,
        user_id: UserId,
        conversation_id: Option<ConversationId>,
    ) -> MessagingResult<u64> {
        let scope = match conversation_id {
            Some(id) => {
                let conversation = self.directory.require(id)?;
                if !conversation.has_participant(user_id) {
                    return Err(MessagingError::Forbidden {
                        conversation: id,
                        user: user_id,
                    });
                }
                vec![id]
            }
            None => self.directory.conversation_ids_for(user_id)?,
        };

        Ok(self.store.count_unread(user_id, &scope)?)
    }

    fn publish_created(&self, conversation: &Conversation, message: &Message) {
        match self.directory.profile(message.sender_id) {
            Ok(sender) => self.notifier.notify(Delivery {
                audience: conversation.participants().to_vec(),
                event: GatewayEvent::MessageCreate {
                    message: MessageView {
                        message: message.clone(),
                        sender,
                    },
                },
            }),
            Err(e) => warn!("Skipping notification for message {}: {}", message.id, e),
        }
    }
}
