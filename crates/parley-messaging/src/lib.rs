//! Direct-messaging core: pairwise conversations and their message ledgers.
//!
//! [`ConversationDirectory`] owns conversation rows. [`MessageLedger`] owns
//! message rows and calls back into the directory to advance activity after
//! each append. Callers are trusted; authentication happens upstream.

pub mod clock;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod users;

pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::ConversationDirectory;
pub use error::{BodyProblem, MessagingError, MessagingResult};
pub use ledger::MessageLedger;
pub use notify::{NoopNotifier, Notifier};
pub use users::UserDirectory;

use std::sync::Arc;

use parley_db::{ConversationStore, Database, MessageStore};

/// Both components wired to the same clock and notifier.
pub struct Messaging {
    pub conversations: Arc<ConversationDirectory>,
    pub messages: MessageLedger,
}

impl Messaging {
    pub fn new(
        conversation_store: Arc<dyn ConversationStore>,
        message_store: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let conversations = Arc::new(ConversationDirectory::new(
            conversation_store,
            users,
            clock.clone(),
            notifier.clone(),
        ));
        let messages = MessageLedger::new(message_store, conversations.clone(), clock, notifier);
        Self {
            conversations,
            messages,
        }
    }

    /// Everything backed by one SQLite database, which also serves as the
    /// user directory.
    pub fn from_database(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(db.clone(), db.clone(), db, clock, notifier)
    }
}
