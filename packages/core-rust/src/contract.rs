//! The storage contract: get/set a single typed value plus a change feed.
//!
//! Every backend adapter, the type-erased wrapper, and the composition
//! engine all implement [`Storage`]. The contract is deliberately fail-soft:
//! a backend that cannot produce a value (missing file, absent credential,
//! undecodable bytes) reports the [empty value](crate::StorageValue::empty),
//! never an error. Presence or absence is the only externally visible
//! signal.

use crate::feed::{Subscription, ValueHandler};
use crate::value::StorageValue;

/// A single-slot reactive value store.
///
/// Used as `Arc<dyn Storage<T>>`; all methods take `&self` and the handler
/// is boxed to keep the trait object-safe.
pub trait Storage<T: StorageValue>: Send + Sync {
    /// Returns the current value, or [`T::empty()`](StorageValue::empty)
    /// when the backend holds nothing (or cannot read what it holds).
    fn get(&self) -> T;

    /// Persists `value`. After return, any `get` observes it, modulo the
    /// backend's own durability guarantees. Write failures degrade softly:
    /// they are logged, never surfaced.
    fn set(&self, value: T);

    /// Registers `handler` to receive the current value immediately, then
    /// every subsequent value on change.
    ///
    /// Returns a cancellation handle; dropping it stops delivery to this
    /// handler only. Any number of independent subscribers is supported.
    fn subscribe(&self, handler: ValueHandler<T>) -> Subscription;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// Verifies `Arc<dyn Storage<T>>` compiles (object safety).
    #[test]
    fn storage_is_object_safe() {
        fn _assert_object_safe(_: &Arc<dyn Storage<String>>) {}
    }
}
