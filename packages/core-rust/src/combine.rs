//! Ergonomic constructors for compositions.
//!
//! Thin assembly layer with no logic of its own: every helper reduces to
//! [`CompositeStorage::new`] over the erased member list. Arguments are
//! taken through [`IntoAnyStorage`], so concrete backends, already-erased
//! storages, and other compositions mix freely.

use crate::composite::CompositeStorage;
use crate::erased::{AnyStorage, IntoAnyStorage};
use crate::value::StorageValue;

/// Composes two storages, `a` as tier 0.
pub fn combine<T, A, B>(a: A, b: B) -> CompositeStorage<T>
where
    T: StorageValue,
    A: IntoAnyStorage<T>,
    B: IntoAnyStorage<T>,
{
    zip(vec![a.into_any(), b.into_any()])
}

/// Composes three storages, `a` as tier 0.
pub fn combine3<T, A, B, C>(a: A, b: B, c: C) -> CompositeStorage<T>
where
    T: StorageValue,
    A: IntoAnyStorage<T>,
    B: IntoAnyStorage<T>,
    C: IntoAnyStorage<T>,
{
    zip(vec![a.into_any(), b.into_any(), c.into_any()])
}

/// Composes four storages, `a` as tier 0.
pub fn combine4<T, A, B, C, D>(a: A, b: B, c: C, d: D) -> CompositeStorage<T>
where
    T: StorageValue,
    A: IntoAnyStorage<T>,
    B: IntoAnyStorage<T>,
    C: IntoAnyStorage<T>,
    D: IntoAnyStorage<T>,
{
    zip(vec![a.into_any(), b.into_any(), c.into_any(), d.into_any()])
}

/// Composes an arbitrary-length member list (tier 0 first).
#[must_use]
pub fn zip<T: StorageValue>(members: Vec<AnyStorage<T>>) -> CompositeStorage<T> {
    CompositeStorage::new(members)
}

#[cfg(test)]
mod tests {
    use crate::backends::MemoryStorage;
    use crate::contract::Storage;

    use super::*;

    #[test]
    fn combine_orders_tiers_first_argument_first() {
        let fast = MemoryStorage::<String>::new();
        let slow = MemoryStorage::with_value("stored".to_string());

        let composite = combine(fast.clone(), slow);

        assert_eq!(composite.member_count(), 2);
        assert_eq!(composite.get(), "stored");
        // Tier 0 was reconciled from the slower tier.
        assert_eq!(fast.get(), "stored");
    }

    #[test]
    fn combine3_and_combine4_wire_all_members() {
        let composite = combine3(
            MemoryStorage::<Option<i32>>::new(),
            MemoryStorage::new(),
            MemoryStorage::new(),
        );
        assert_eq!(composite.member_count(), 3);

        let composite = combine4(
            MemoryStorage::<Option<i32>>::new(),
            MemoryStorage::new(),
            MemoryStorage::new(),
            MemoryStorage::new(),
        );
        assert_eq!(composite.member_count(), 4);
    }

    #[test]
    fn zip_accepts_mixed_and_already_erased_members() {
        let erased = MemoryStorage::<Option<i32>>::new().into_any();
        let composite = zip(vec![erased, MemoryStorage::new().into_any()]);

        composite.set(Some(1));
        assert_eq!(composite.get(), Some(1));
    }

    #[test]
    fn helpers_accept_compositions_as_members() {
        let inner = combine(
            MemoryStorage::<Option<i32>>::new(),
            MemoryStorage::new(),
        );
        let outer = combine(MemoryStorage::new(), inner);

        outer.set(Some(2));
        assert_eq!(outer.get(), Some(2));
    }
}
