//! Change feed: a multi-subscriber registry of value-update handlers.
//!
//! [`ChangeFeed`] is the delivery mechanism behind every storage's
//! `subscribe` operation. It is lazy and append-only: a subscriber sees only
//! values published after its subscription. Replay of the current value at
//! subscribe time is the *storage*'s job (it knows where the value lives),
//! not the feed's.
//!
//! Handlers are invoked synchronously, in subscription order, with no feed
//! lock held — a handler may subscribe, cancel, or publish on the same feed
//! without deadlocking.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Boxed value-update handler.
///
/// Boxed (rather than generic) so `subscribe` stays object-safe on
/// `Arc<dyn Storage>`.
pub type ValueHandler<T> = Box<dyn Fn(T) + Send + Sync>;

type Handlers<T> = Mutex<BTreeMap<u64, Arc<dyn Fn(T) + Send + Sync>>>;

/// Multi-subscriber feed of value updates.
///
/// Each subscriber receives every value published after its subscription,
/// independently of other subscribers. Cancelling one subscription never
/// affects another.
pub struct ChangeFeed<T> {
    handlers: Arc<Handlers<T>>,
    next_id: AtomicU64,
}

impl<T> ChangeFeed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Delivers `value` to every current subscriber, in subscription order.
    ///
    /// The handler list is cloned out of the lock before invocation, so
    /// handlers may re-enter the feed.
    pub fn publish(&self, value: &T) {
        let handlers: Vec<Arc<dyn Fn(T) + Send + Sync>> =
            self.handlers.lock().values().cloned().collect();
        for handler in handlers {
            handler(value.clone());
        }
    }

    /// Registers `handler` for all *subsequent* publishes (no replay).
    ///
    /// Dropping the returned [`Subscription`] removes exactly this handler.
    pub fn subscribe_raw(&self, handler: ValueHandler<T>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().insert(id, Arc::from(handler));

        let handlers: Weak<Handlers<T>> = Arc::downgrade(&self.handlers);
        Subscription::new(move || {
            if let Some(handlers) = handlers.upgrade() {
                handlers.lock().remove(&id);
            }
        })
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl<T> Default for ChangeFeed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation handle for one feed subscription.
///
/// Delivery to the associated handler stops when the handle is dropped or
/// [`cancel`](Subscription::cancel)led. Other subscribers are unaffected.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancels the subscription explicitly. Equivalent to dropping it.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
