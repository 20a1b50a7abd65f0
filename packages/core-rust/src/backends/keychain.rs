//! Secure-credential storage over the OS keychain.
//!
//! The value is kept as a JSON string in one credential entry, addressed by
//! service and account. An absent credential reads as the empty value;
//! setting the empty value deletes the credential. Keychain status errors
//! degrade to the empty value — availability of the platform credential
//! service is never the caller's problem at read time.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::contract::Storage;
use crate::erased::{AnyStorage, IntoAnyStorage};
use crate::error::StorageError;
use crate::feed::{ChangeFeed, Subscription, ValueHandler};
use crate::value::StorageValue;

/// Storage backed by one OS keychain credential.
///
/// The change feed reflects writes made through this storage; mutations via
/// other keychain clients are not watched.
pub struct KeychainStorage<T: StorageValue> {
    inner: Arc<KeychainInner<T>>,
}

struct KeychainInner<T: StorageValue> {
    entry: keyring::Entry,
    service: String,
    account: String,
    feed: ChangeFeed<T>,
}

impl<T> KeychainStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    /// Opens (or prepares) the credential for `service`/`account`.
    ///
    /// Fails only when the platform rejects the service/account pair — a
    /// configuration error, not a missing value.
    pub fn new(service: &str, account: &str) -> Result<Self, StorageError> {
        let entry = keyring::Entry::new(service, account)?;
        Ok(Self {
            inner: Arc::new(KeychainInner {
                entry,
                service: service.to_string(),
                account: account.to_string(),
                feed: ChangeFeed::new(),
            }),
        })
    }
}

impl<T: StorageValue> Clone for KeychainStorage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: StorageValue> fmt::Debug for KeychainStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeychainStorage")
            .field("service", &self.inner.service)
            .field("account", &self.inner.account)
            .finish()
    }
}

impl<T> Storage<T> for KeychainStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    fn get(&self) -> T {
        match self.inner.entry.get_password() {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(
                    service = %self.inner.service,
                    account = %self.inner.account,
                    error = %err,
                    "failed to decode keychain value; treating as absent"
                );
                T::empty()
            }),
            Err(keyring::Error::NoEntry) => T::empty(),
            Err(err) => {
                tracing::warn!(
                    service = %self.inner.service,
                    account = %self.inner.account,
                    error = %err,
                    "keychain read failed; treating as absent"
                );
                T::empty()
            }
        }
    }

    fn set(&self, value: T) {
        if value.is_empty() {
            // Empty is "absent": drop the credential instead of storing it.
            match self.inner.entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(err) => {
                    tracing::warn!(
                        service = %self.inner.service,
                        account = %self.inner.account,
                        error = %err,
                        "failed to delete keychain credential"
                    );
                }
            }
        } else {
            match serde_json::to_string(&value) {
                Ok(raw) => {
                    if let Err(err) = self.inner.entry.set_password(&raw) {
                        tracing::warn!(
                            service = %self.inner.service,
                            account = %self.inner.account,
                            error = %err,
                            "keychain write failed; subscribers notified anyway"
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        service = %self.inner.service,
                        account = %self.inner.account,
                        error = %err,
                        "failed to encode value; credential left unchanged"
                    );
                }
            }
        }
        self.inner.feed.publish(&value);
    }

    fn subscribe(&self, handler: ValueHandler<T>) -> Subscription {
        handler(self.get());
        self.inner.feed.subscribe_raw(handler)
    }
}

impl<T> IntoAnyStorage<T> for KeychainStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    fn into_any(self) -> AnyStorage<T> {
        AnyStorage::erase(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies the adapter erases like every other backend (compile test;
    /// exercising a real credential service needs a platform session).
    #[test]
    fn keychain_storage_is_erasable() {
        fn _assert_erasable(storage: KeychainStorage<Option<String>>) -> AnyStorage<Option<String>> {
            storage.into_any()
        }
    }
}
