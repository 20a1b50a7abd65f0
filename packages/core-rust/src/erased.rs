//! Type erasure over the storage contract.
//!
//! [`AnyStorage`] hides the concrete backend type so heterogeneous backends
//! can sit in one homogeneous member list, while preserving the contract and
//! the wrapped instance's identity. Erasure is idempotent: converting an
//! `AnyStorage` via [`IntoAnyStorage`] returns it unchanged, so nothing ever
//! double-wraps.

use std::fmt;
use std::sync::Arc;

use crate::contract::Storage;
use crate::feed::{Subscription, ValueHandler};
use crate::value::StorageValue;

/// A type-erased storage handle.
///
/// Cheap to clone; clones share the underlying backend. Identity is
/// reference identity of that backend ([`ptr_eq`](AnyStorage::ptr_eq)).
pub struct AnyStorage<T: StorageValue> {
    inner: Arc<dyn Storage<T>>,
}

impl<T: StorageValue> AnyStorage<T> {
    /// Erases a concrete backend.
    ///
    /// Prefer [`IntoAnyStorage::into_any`] at call sites: it is a no-op on
    /// an already-erased storage, while `erase` always allocates a wrapper.
    pub fn erase<S>(storage: S) -> Self
    where
        S: Storage<T> + 'static,
    {
        Self {
            inner: Arc::new(storage),
        }
    }

    /// Wraps an existing shared trait object without re-allocating.
    #[must_use]
    pub fn from_arc(inner: Arc<dyn Storage<T>>) -> Self {
        Self { inner }
    }

    /// Whether `self` and `other` observe the same underlying backend.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: StorageValue> Clone for AnyStorage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: StorageValue> fmt::Debug for AnyStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyStorage")
            .field("backend", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

impl<T: StorageValue> Storage<T> for AnyStorage<T> {
    fn get(&self) -> T {
        self.inner.get()
    }

    fn set(&self, value: T) {
        self.inner.set(value);
    }

    fn subscribe(&self, handler: ValueHandler<T>) -> Subscription {
        self.inner.subscribe(handler)
    }
}

/// Conversion into the erased representation.
///
/// Implemented by every backend (allocating one wrapper) and by
/// [`AnyStorage`] itself (returning `self` unchanged).
pub trait IntoAnyStorage<T: StorageValue> {
    /// Converts `self` into an [`AnyStorage`].
    fn into_any(self) -> AnyStorage<T>;
}

impl<T: StorageValue> IntoAnyStorage<T> for AnyStorage<T> {
    fn into_any(self) -> AnyStorage<T> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryStorage;

    #[test]
    fn erased_storage_forwards_contract() {
        let memory = MemoryStorage::with_value("hello".to_string());
        let erased = memory.clone().into_any();

        assert_eq!(erased.get(), "hello");
        erased.set("world".to_string());
        assert_eq!(memory.get(), "world");
    }

    #[test]
    fn erasure_is_idempotent() {
        let erased = MemoryStorage::<String>::new().into_any();
        let again = erased.clone().into_any();
        assert!(erased.ptr_eq(&again));
    }

    #[test]
    fn clones_share_identity_but_distinct_backends_do_not() {
        let a = MemoryStorage::<i32>::new().into_any();
        let b = MemoryStorage::<i32>::new().into_any();

        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn subscription_through_erasure_replays_and_updates() {
        let erased = MemoryStorage::with_value(1_i32).into_any();
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));

        let seen_clone = std::sync::Arc::clone(&seen);
        let _sub = erased.subscribe(Box::new(move |v| {
            seen_clone.lock().push(v);
        }));
        erased.set(2);

        assert_eq!(*seen.lock(), vec![1, 2]);
    }
}
