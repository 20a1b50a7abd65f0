//! Strata Core — reactive tiered single-value storage.
//!
//! One contract ([`Storage`]): get/set a single typed value plus a
//! subscribable change feed. Interchangeable backends implement it —
//! volatile memory, a JSON file, a shared key-value store, and (behind the
//! `keychain` feature) the OS credential store. The centerpiece is the
//! composition engine ([`CompositeStorage`]): it binds several backends
//! into one logical value that stays consistent across all tiers, relays
//! external changes without feedback loops, and lazily backfills faster
//! tiers from whichever tier actually held the value.
//!
//! ```
//! use strata_core::{combine, MemoryStorage, Storage};
//!
//! let session = MemoryStorage::<Option<u64>>::new();
//! let persisted = MemoryStorage::with_value(Some(42));
//!
//! let storage = combine(session.clone(), persisted);
//! assert_eq!(storage.get(), Some(42)); // resolved from the second tier
//! assert_eq!(session.get(), Some(42)); // ...and reconciled into the first
//! ```
//!
//! Failure policy: backends fail *soft*. A missing file, absent credential,
//! or undecodable document reads as the type's empty value; no contract
//! operation returns an error.

pub mod backends;
pub mod combine;
pub mod composite;
pub mod contract;
pub mod erased;
pub mod error;
pub mod feed;
pub mod value;

pub use backends::{FileStorage, KeyValueStorage, KvChange, KvStore, MemoryStorage};
pub use combine::{combine, combine3, combine4, zip};
pub use composite::CompositeStorage;
pub use contract::Storage;
pub use erased::{AnyStorage, IntoAnyStorage};
pub use error::StorageError;
pub use feed::{ChangeFeed, Subscription, ValueHandler};
pub use value::StorageValue;

#[cfg(feature = "keychain")]
pub use backends::KeychainStorage;
