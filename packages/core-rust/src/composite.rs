//! The composition engine: N backends, one logical value.
//!
//! [`CompositeStorage`] owns an ordered list of type-erased members sharing
//! a single logical value. Tier 0 is consulted first on read and backfilled
//! last. The engine keeps the tiers consistent in three ways:
//!
//! - **on construction** it resolves the first non-empty member value and
//!   writes it into every member that disagrees;
//! - **on write** it broadcasts to every member before publishing on its
//!   own feed;
//! - **on a member-originated change** it relays the value to every *other*
//!   member under a reentrancy guard, so each external change makes exactly
//!   one propagation round-trip and never feeds back.
//!
//! A composition is itself a [`Storage`], so compositions nest and
//! recombine freely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backends::MemoryStorage;
use crate::contract::Storage;
use crate::erased::{AnyStorage, IntoAnyStorage};
use crate::feed::{ChangeFeed, Subscription, ValueHandler};
use crate::value::StorageValue;

/// Coordinating storage over an ordered, fixed member list.
///
/// Clones share the same coordination state. Propagation ends when the last
/// clone is dropped (the member subscriptions are released with it); the
/// member backends themselves live on independently.
pub struct CompositeStorage<T: StorageValue> {
    shared: Arc<CompositeShared<T>>,
}

struct CompositeShared<T: StorageValue> {
    /// Members in tier order. Fixed at construction.
    members: Vec<AnyStorage<T>>,
    /// Cached logical value, replayed to new subscribers.
    value: Mutex<T>,
    /// Reentrancy guard: set while this composition is writing to members,
    /// so their feed echoes are not treated as new incoming changes.
    syncing: AtomicBool,
    feed: ChangeFeed<T>,
    member_subscriptions: Mutex<Vec<Subscription>>,
}

impl<T: StorageValue> CompositeStorage<T> {
    /// Builds a composition over `members` (tier 0 first).
    ///
    /// An empty list is repaired by synthesizing a single volatile
    /// in-memory member, so the composition always works. The shared value
    /// resolves to the first non-empty member value in tier order, and
    /// members still holding the empty value are reconciled to it before
    /// change propagation starts.
    #[must_use]
    pub fn new(members: Vec<AnyStorage<T>>) -> Self {
        let members = if members.is_empty() {
            tracing::warn!(
                "composition constructed with no members; synthesizing a volatile in-memory member"
            );
            vec![MemoryStorage::new().into_any()]
        } else {
            members
        };

        let initial = members
            .iter()
            .map(Storage::get)
            .find(|value| !value.is_empty())
            .unwrap_or_else(T::empty);

        // Reconcile before subscribing: these writes cannot echo because no
        // member subscription exists yet. Only tiers that lack a value are
        // filled; a tier holding a different non-empty value keeps it until
        // the next write.
        if !initial.is_empty() {
            for member in &members {
                if member.get().is_empty() {
                    member.set(initial.clone());
                }
            }
        }

        let shared = Arc::new(CompositeShared {
            members,
            value: Mutex::new(initial),
            syncing: AtomicBool::new(false),
            feed: ChangeFeed::new(),
            member_subscriptions: Mutex::new(Vec::new()),
        });

        let subscriptions = shared
            .members
            .iter()
            .enumerate()
            .map(|(tier, member)| {
                let weak = Arc::downgrade(&shared);
                let replay_seen = AtomicBool::new(false);
                member.subscribe(Box::new(move |value| {
                    // The first emission is the subscribe-time replay of the
                    // member's current value; only genuine updates propagate.
                    if !replay_seen.swap(true, Ordering::SeqCst) {
                        return;
                    }
                    if let Some(shared) = weak.upgrade() {
                        shared.on_member_change(tier, value);
                    }
                }))
            })
            .collect();
        *shared.member_subscriptions.lock() = subscriptions;

        Self { shared }
    }

    /// Number of members (after any defensive repair).
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.shared.members.len()
    }
}

impl<T: StorageValue> CompositeShared<T> {
    /// Relays a member-originated change to every other member.
    fn on_member_change(&self, origin: usize, value: T) {
        // An emission observed while syncing is the echo of a write this
        // composition itself performed; exactly one round-trip per change.
        if self.syncing.swap(true, Ordering::SeqCst) {
            return;
        }
        for (tier, member) in self.members.iter().enumerate() {
            if tier != origin {
                member.set(value.clone());
            }
        }
        *self.value.lock() = value.clone();
        self.syncing.store(false, Ordering::SeqCst);
        tracing::debug!(origin, members = self.members.len(), "relayed member change");
        self.feed.publish(&value);
    }
}

impl<T: StorageValue> Clone for CompositeStorage<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: StorageValue> Storage<T> for CompositeStorage<T> {
    /// First non-empty member value in tier order wins.
    ///
    /// When the value is found below tier 0, the earlier tiers are lazily
    /// backfilled with it (in reverse order), so future reads resolve at
    /// tier 0.
    fn get(&self) -> T {
        let found = self.shared.members.iter().enumerate().find_map(|(tier, member)| {
            let value = member.get();
            (!value.is_empty()).then_some((tier, value))
        });
        let Some((tier, value)) = found else {
            return T::empty();
        };

        if tier > 0 {
            // Guarded like a propagation: the backfill writes would
            // otherwise echo back through the member feeds.
            let was_syncing = self.shared.syncing.swap(true, Ordering::SeqCst);
            for earlier in (0..tier).rev() {
                self.shared.members[earlier].set(value.clone());
            }
            if !was_syncing {
                self.shared.syncing.store(false, Ordering::SeqCst);
            }
            tracing::debug!(found_tier = tier, "backfilled earlier tiers");
        }

        value
    }

    /// Broadcasts to every member, then publishes exactly once on the
    /// composition's own feed. All members observe the new value before
    /// `set` returns; the composition's subscribers observe it after all
    /// members.
    fn set(&self, value: T) {
        // The broadcast is unconditional (it originates from the public
        // API, not from a member feed), but the guard is held while it runs
        // so each member's echo is suppressed.
        let was_syncing = self.shared.syncing.swap(true, Ordering::SeqCst);
        for member in &self.shared.members {
            member.set(value.clone());
        }
        if !was_syncing {
            self.shared.syncing.store(false, Ordering::SeqCst);
        }
        *self.shared.value.lock() = value.clone();
        self.shared.feed.publish(&value);
    }

    fn subscribe(&self, handler: ValueHandler<T>) -> Subscription {
        // Release the value lock before the replay call: the handler may
        // re-enter the composition (set locks the same mutex).
        let current = self.shared.value.lock().clone();
        handler(current);
        self.shared.feed.subscribe_raw(handler)
    }
}

impl<T: StorageValue> IntoAnyStorage<T> for CompositeStorage<T> {
    fn into_any(self) -> AnyStorage<T> {
        AnyStorage::erase(self)
    }
}
