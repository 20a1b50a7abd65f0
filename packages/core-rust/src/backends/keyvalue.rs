//! Key-value store adapter.
//!
//! [`KvStore`] is the backing store: a shared, cloneable map of JSON values
//! keyed by string, optionally persisted as a single JSON document. It has
//! its own store-wide change feed, so a write made through *any* handle —
//! including one completely outside a [`KeyValueStorage`] — is observable.
//!
//! [`KeyValueStorage`] binds one `(store, key)` pair to the storage
//! contract and derives its change feed from the store's feed filtered to
//! its key. That is what lets a composition react to external mutations of
//! the backing store.

use std::collections::HashMap;
use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::{fmt, fs};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::contract::Storage;
use crate::erased::{AnyStorage, IntoAnyStorage};
use crate::feed::{ChangeFeed, Subscription, ValueHandler};
use crate::value::StorageValue;

/// A mutation of one key in a [`KvStore`].
///
/// Removals are published with a `Null` value.
#[derive(Clone, Debug)]
pub struct KvChange {
    /// The mutated key.
    pub key: String,
    /// The new raw value (`Null` when the key was removed).
    pub value: serde_json::Value,
}

/// Shared in-process key-value store with change notification.
///
/// Clones share the same map; mutations through any clone are delivered on
/// the store-wide feed. With [`open`](KvStore::open) the map is additionally
/// persisted to disk as one JSON document after every mutation (fail-soft:
/// persistence errors are logged and the in-memory state stays current).
#[derive(Clone)]
pub struct KvStore {
    inner: Arc<KvInner>,
}

struct KvInner {
    entries: RwLock<HashMap<String, serde_json::Value>>,
    feed: ChangeFeed<KvChange>,
    path: Option<PathBuf>,
}

impl KvStore {
    /// Creates an empty, purely in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(KvInner {
                entries: RwLock::new(HashMap::new()),
                feed: ChangeFeed::new(),
                path: None,
            }),
        }
    }

    /// Opens a store persisted at `path`, loading whatever is already there.
    ///
    /// A missing or undecodable document yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to decode key-value document; starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read key-value document; starting empty"
                );
                HashMap::new()
            }
        };
        Self {
            inner: Arc::new(KvInner {
                entries: RwLock::new(entries),
                feed: ChangeFeed::new(),
                path: Some(path),
            }),
        }
    }

    /// Returns the raw value stored under `key`, if any.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.entries.read().get(key).cloned()
    }

    /// Stores `value` under `key` and notifies subscribers.
    pub fn set_value(&self, key: &str, value: serde_json::Value) {
        {
            self.inner
                .entries
                .write()
                .insert(key.to_string(), value.clone());
        }
        self.persist();
        self.inner.feed.publish(&KvChange {
            key: key.to_string(),
            value,
        });
    }

    /// Removes `key` and notifies subscribers with a `Null` value.
    pub fn remove(&self, key: &str) {
        {
            self.inner.entries.write().remove(key);
        }
        self.persist();
        self.inner.feed.publish(&KvChange {
            key: key.to_string(),
            value: serde_json::Value::Null,
        });
    }

    /// Subscribes to every mutation of the store (no replay).
    pub fn subscribe(&self, handler: Box<dyn Fn(KvChange) + Send + Sync>) -> Subscription {
        self.inner.feed.subscribe_raw(handler)
    }

    fn persist(&self) {
        let Some(path) = &self.inner.path else {
            return;
        };
        let snapshot = self.inner.entries.read().clone();
        let result = serde_json::to_vec(&snapshot).map_err(|err| {
            tracing::warn!(path = %path.display(), error = %err, "failed to encode key-value document");
        });
        let Ok(bytes) = result else { return };
        let staged = path.with_extension("tmp");
        if let Err(err) = fs::write(&staged, &bytes).and_then(|()| fs::rename(&staged, path)) {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to persist key-value document; in-memory state unchanged"
            );
        }
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvStore")
            .field("len", &self.inner.entries.read().len())
            .field("path", &self.inner.path)
            .finish()
    }
}

/// Storage bound to a single key of a [`KvStore`].
pub struct KeyValueStorage<T: StorageValue> {
    store: KvStore,
    key: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> KeyValueStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    /// Binds `key` of `store` to the storage contract.
    pub fn new(store: KvStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _value: PhantomData,
        }
    }

    /// The bound key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn decode(key: &str, raw: Option<serde_json::Value>) -> T {
        match raw {
            None | Some(serde_json::Value::Null) => T::empty(),
            Some(raw) => serde_json::from_value(raw).unwrap_or_else(|err| {
                tracing::warn!(
                    key,
                    error = %err,
                    "failed to decode stored value; treating as absent"
                );
                T::empty()
            }),
        }
    }
}

impl<T: StorageValue> Clone for KeyValueStorage<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: StorageValue> fmt::Debug for KeyValueStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueStorage")
            .field("key", &self.key)
            .finish()
    }
}

impl<T> Storage<T> for KeyValueStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    fn get(&self) -> T {
        Self::decode(&self.key, self.store.value(&self.key))
    }

    fn set(&self, value: T) {
        match serde_json::to_value(&value) {
            Ok(raw) => self.store.set_value(&self.key, raw),
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "failed to encode value; key left unchanged"
                );
            }
        }
    }

    fn subscribe(&self, handler: ValueHandler<T>) -> Subscription {
        handler(self.get());
        let key = self.key.clone();
        self.store.subscribe(Box::new(move |change| {
            if change.key == key {
                handler(Self::decode(&key, Some(change.value)));
            }
        }))
    }
}

impl<T> IntoAnyStorage<T> for KeyValueStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    fn into_any(self) -> AnyStorage<T> {
        AnyStorage::erase(self)
    }
}
