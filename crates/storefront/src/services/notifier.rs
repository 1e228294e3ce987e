//! Cart-changed notifications.
//!
//! Every successful cart mutation publishes a [`CartChanged`] on the
//! application's [`CartNotifier`]. Observers call [`CartNotifier::subscribe`]
//! and stop observing by dropping the receiver. Browsers get the same signal
//! through the `HX-Trigger: cart-updated` response header.

use rust_decimal::Decimal;
use tokio::sync::broadcast;

use tienda_core::Cart;

/// Header value that tells HTMX listeners the cart changed.
pub const HX_CART_UPDATED: &str = "cart-updated";

const CHANNEL_CAPACITY: usize = 256;

/// What happened to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Added,
    Removed,
    /// Guest cart merged into the persisted cart after login.
    Synced,
    /// Guest cart dropped (logout or completed payment).
    Cleared,
}

impl CartAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Synced => "synced",
            Self::Cleared => "cleared",
        }
    }
}

/// A cart mutation, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartChanged {
    pub action: CartAction,
    pub quantity: u32,
    pub total: Decimal,
}

impl CartChanged {
    #[must_use]
    pub fn new(action: CartAction, cart: &Cart) -> Self {
        Self {
            action,
            quantity: cart.quantity,
            total: cart.total,
        }
    }
}

/// Publish/subscribe channel for [`CartChanged`] events.
#[derive(Clone)]
pub struct CartNotifier {
    sender: broadcast::Sender<CartChanged>,
}

impl Default for CartNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CartNotifier {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Register an observer. Dropping the receiver unregisters it.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartChanged> {
        self.sender.subscribe()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Deliver `event` to every observer; returns how many received it.
    ///
    /// Publishing with no observers is not an error.
    pub fn publish(&self, event: CartChanged) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

/// Log every cart change (and leave a Sentry breadcrumb) until shutdown.
pub fn spawn_activity_log(notifier: &CartNotifier) -> tokio::task::JoinHandle<()> {
    let mut receiver = notifier.subscribe();

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::debug!(
                        action = event.action.as_str(),
                        quantity = event.quantity,
                        total = %event.total,
                        "Cart changed"
                    );
                    crate::error::add_breadcrumb("cart", event.action.as_str(), None);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Cart activity log lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
