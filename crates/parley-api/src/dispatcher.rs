use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use parley_messaging::Notifier;
use parley_types::events::Delivery;

/// Fans messaging events out to whatever live transport subscribes.
/// Subscribers filter by [`Delivery::is_for`].
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<Delivery>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.inner.broadcast_tx.subscribe()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for Dispatcher {
    fn notify(&self, delivery: Delivery) {
        let conversation_id = delivery.event.conversation_id();
        if self.inner.broadcast_tx.send(delivery).is_err() {
            trace!("No live subscribers for conversation {} event", conversation_id);
        }
    }
}
