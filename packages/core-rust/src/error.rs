//! Internal error taxonomy for backend adapters.
//!
//! The storage contract itself never surfaces errors — adapters recover from
//! every failure by degrading to the empty value (see the crate docs).
//! [`StorageError`] exists for the adapters' internal plumbing and for the
//! few fallible *constructors* (e.g. opening a keychain entry), where a bad
//! configuration is a programming error rather than a missing value.

use thiserror::Error;

/// Failure inside a backend adapter.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The value could not be encoded for persistence.
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    /// Persisted bytes could not be decoded into the value type.
    #[error("failed to decode stored value: {0}")]
    Decode(#[source] serde_json::Error),

    /// The platform credential store rejected the operation.
    #[cfg(feature = "keychain")]
    #[error("keychain access failed: {0}")]
    Keychain(#[from] keyring::Error),
}
