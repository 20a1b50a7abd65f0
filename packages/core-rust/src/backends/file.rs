//! File-backed storage: one JSON document per path.
//!
//! Reads fail soft — a missing file, unreadable file, or undecodable
//! document is reported as the empty value. Writes go through a sibling
//! temp file and a rename so a crash mid-write cannot leave a truncated
//! document behind.
//!
//! The change feed reflects writes made through this storage; external
//! edits to the file are not watched.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fmt, fs};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::contract::Storage;
use crate::erased::{AnyStorage, IntoAnyStorage};
use crate::error::StorageError;
use crate::feed::{ChangeFeed, Subscription, ValueHandler};
use crate::value::StorageValue;

/// Storage persisting its value as a JSON document at a fixed path.
pub struct FileStorage<T: StorageValue> {
    inner: Arc<FileInner<T>>,
}

struct FileInner<T: StorageValue> {
    path: PathBuf,
    feed: ChangeFeed<T>,
}

impl<T> FileStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    /// Creates a storage backed by the document at `path`.
    ///
    /// The file is not created until the first `set`; until then the
    /// storage reads as empty.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileInner {
                path: path.into(),
                feed: ChangeFeed::new(),
            }),
        }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn try_read(&self) -> Result<Option<T>, StorageError> {
        let bytes = match fs::read(&self.inner.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value = serde_json::from_slice(&bytes).map_err(StorageError::Decode)?;
        Ok(Some(value))
    }

    fn try_write(&self, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value).map_err(StorageError::Encode)?;
        if let Some(parent) = self.inner.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Write-then-rename keeps the document intact if the write dies.
        let staged = self.inner.path.with_extension("tmp");
        fs::write(&staged, &bytes)?;
        fs::rename(&staged, &self.inner.path)?;
        Ok(())
    }
}

impl<T: StorageValue> Clone for FileStorage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: StorageValue> fmt::Debug for FileStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.inner.path)
            .finish()
    }
}

impl<T> Storage<T> for FileStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    fn get(&self) -> T {
        match self.try_read() {
            Ok(Some(value)) => value,
            Ok(None) => T::empty(),
            Err(err) => {
                tracing::warn!(
                    path = %self.inner.path.display(),
                    error = %err,
                    "failed to read stored value; treating as absent"
                );
                T::empty()
            }
        }
    }

    fn set(&self, value: T) {
        if let Err(err) = self.try_write(&value) {
            tracing::warn!(
                path = %self.inner.path.display(),
                error = %err,
                "failed to persist value; subscribers notified anyway"
            );
        }
        self.inner.feed.publish(&value);
    }

    fn subscribe(&self, handler: ValueHandler<T>) -> Subscription {
        handler(self.get());
        self.inner.feed.subscribe_raw(handler)
    }
}

impl<T> IntoAnyStorage<T> for FileStorage<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    fn into_any(self) -> AnyStorage<T> {
        AnyStorage::erase(self)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde::Deserialize;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
    }

    impl StorageValue for Profile {
        fn empty() -> Self {
            Self {
                name: String::new(),
                age: 0,
            }
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::<Option<i32>>::new(dir.path().join("missing.json"));
        assert_eq!(storage.get(), None);
    }

    #[test]
    fn set_then_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("value.json"));

        storage.set(Some(42));
        assert_eq!(storage.get(), Some(42));
    }

    #[test]
    fn value_survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        FileStorage::new(&path).set(Profile {
            name: "ada".to_string(),
            age: 36,
        });

        let reopened = FileStorage::<Profile>::new(&path);
        assert_eq!(reopened.get().name, "ada");
        assert_eq!(reopened.get().age, 36);
    }

    #[test]
    fn corrupt_document_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, b"not json {{{").unwrap();

        let storage = FileStorage::<Option<String>>::new(&path);
        assert_eq!(storage.get(), None);
    }

    #[test]
    fn missing_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c/value.json");

        let storage = FileStorage::new(&path);
        storage.set(Some(1_u8));

        assert!(path.exists());
        assert_eq!(storage.get(), Some(1));
    }

    #[test]
    fn subscribe_replays_then_streams() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::<Option<i32>>::new(dir.path().join("v.json"));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let _sub = storage.subscribe(Box::new(move |v| {
            seen_clone.lock().push(v);
        }));
        storage.set(Some(3));

        assert_eq!(*seen.lock(), vec![None, Some(3)]);
    }
}
