//! Volatile in-memory storage.
//!
//! The simplest adapter: a value behind an `RwLock` plus a change feed.
//! Also serves as the synthesized fallback member when a composition is
//! constructed with an empty member list.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::contract::Storage;
use crate::erased::{AnyStorage, IntoAnyStorage};
use crate::feed::{ChangeFeed, Subscription, ValueHandler};
use crate::value::StorageValue;

/// In-memory storage. Clones share the same slot.
pub struct MemoryStorage<T: StorageValue> {
    inner: Arc<MemoryInner<T>>,
}

struct MemoryInner<T: StorageValue> {
    value: RwLock<T>,
    feed: ChangeFeed<T>,
}

impl<T: StorageValue> MemoryStorage<T> {
    /// Creates a storage holding the empty value.
    #[must_use]
    pub fn new() -> Self {
        Self::with_value(T::empty())
    }

    /// Creates a storage holding `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                value: RwLock::new(value),
                feed: ChangeFeed::new(),
            }),
        }
    }
}

impl<T: StorageValue> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StorageValue> Clone for MemoryStorage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: StorageValue> Storage<T> for MemoryStorage<T> {
    fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    fn set(&self, value: T) {
        {
            *self.inner.value.write() = value.clone();
        }
        // Lock released before notifying: handlers may call back into get().
        self.inner.feed.publish(&value);
    }

    fn subscribe(&self, handler: ValueHandler<T>) -> Subscription {
        handler(self.get());
        self.inner.feed.subscribe_raw(handler)
    }
}

impl<T: StorageValue> IntoAnyStorage<T> for MemoryStorage<T> {
    fn into_any(self) -> AnyStorage<T> {
        AnyStorage::erase(self)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn starts_empty() {
        let storage = MemoryStorage::<String>::new();
        assert!(storage.get().is_empty());
    }

    #[test]
    fn set_then_get_round_trip() {
        let storage = MemoryStorage::<Option<i32>>::new();
        storage.set(Some(5));
        assert_eq!(storage.get(), Some(5));
    }

    #[test]
    fn clones_observe_the_same_slot() {
        let storage = MemoryStorage::with_value(1_i64);
        let alias = storage.clone();

        alias.set(2);
        assert_eq!(storage.get(), 2);
    }

    #[test]
    fn subscribe_replays_current_value_then_streams_updates() {
        let storage = MemoryStorage::with_value("a".to_string());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let _sub = storage.subscribe(Box::new(move |v| {
            seen_clone.lock().push(v);
        }));
        storage.set("b".to_string());
        storage.set("c".to_string());

        assert_eq!(*seen.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn handler_can_read_back_during_notification() {
        let storage = MemoryStorage::<i32>::new();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let inner = storage.clone();
        let observed_clone = Arc::clone(&observed);
        let _sub = storage.subscribe(Box::new(move |v| {
            // get() from inside the handler must not deadlock.
            observed_clone.lock().push((v, inner.get()));
        }));
        storage.set(9);

        assert_eq!(*observed.lock(), vec![(0, 0), (9, 9)]);
    }
}
