use parley_types::events::Delivery;

/// Receives live events after the durable write they describe has
/// succeeded. Delivery is best effort and must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, delivery: Delivery);
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _delivery: Delivery) {}
}
