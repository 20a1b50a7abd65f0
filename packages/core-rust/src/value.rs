//! Empty-value contract for storable types.
//!
//! Every value type that flows through a [`Storage`](crate::Storage) must
//! have a canonical "empty" representation. The empty value is the sentinel
//! for "not present in this tier": backends return it instead of raising
//! errors, and the composition engine uses it to decide which tier actually
//! holds a value.

/// A value that can live in a storage tier.
///
/// `empty()` is the canonical absent representation (the nil/zero state).
/// Presence is always detected by comparison against it, never by error
/// handling.
pub trait StorageValue: Clone + PartialEq + Send + Sync + 'static {
    /// The canonical "absent" value for this type.
    fn empty() -> Self;

    /// Whether this value is the absent sentinel.
    fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

impl<T> StorageValue for Option<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn empty() -> Self {
        None
    }

    fn is_empty(&self) -> bool {
        self.is_none()
    }
}

impl StorageValue for String {
    fn empty() -> Self {
        String::new()
    }

    fn is_empty(&self) -> bool {
        str::is_empty(self)
    }
}

impl<T> StorageValue for Vec<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn empty() -> Self {
        Vec::new()
    }

    fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

macro_rules! impl_storage_value_zero {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StorageValue for $ty {
                fn empty() -> Self {
                    0
                }
            }
        )*
    };
}

impl_storage_value_zero!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_empty_is_none() {
        assert_eq!(<Option<i32> as StorageValue>::empty(), None);
        assert!(Option::<i32>::None.is_empty());
        assert!(!Some(0).is_empty());
    }

    #[test]
    fn string_empty_is_blank() {
        assert_eq!(String::empty(), "");
        assert!(String::new().is_empty());
        assert!(!StorageValue::is_empty(&"x".to_string()));
    }

    #[test]
    fn vec_empty_is_zero_length() {
        assert_eq!(Vec::<u8>::empty(), Vec::<u8>::new());
        assert!(StorageValue::is_empty(&Vec::<u8>::new()));
        assert!(!StorageValue::is_empty(&vec![1_u8]));
    }

    #[test]
    fn integers_use_zero_as_empty() {
        assert_eq!(i64::empty(), 0);
        assert!(StorageValue::is_empty(&0_u32));
        assert!(!StorageValue::is_empty(&7_i32));
    }
}
