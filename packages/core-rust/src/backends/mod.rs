//! Backend adapters: concrete implementations of the storage contract.
//!
//! Each adapter is independently correct in isolation and fails soft: any
//! I/O or decode failure is logged and degraded to the empty value. The
//! composition engine treats them uniformly through
//! [`AnyStorage`](crate::AnyStorage).

pub mod file;
pub mod keyvalue;
pub mod memory;

#[cfg(feature = "keychain")]
pub mod keychain;

pub use file::FileStorage;
pub use keyvalue::{KeyValueStorage, KvChange, KvStore};
pub use memory::MemoryStorage;

#[cfg(feature = "keychain")]
pub use keychain::KeychainStorage;
