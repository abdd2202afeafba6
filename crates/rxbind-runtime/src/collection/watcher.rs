//! Identity-keyed, reference-counted item subscriptions.
//!
//! A list may hold the same item several times. Its property streams are
//! subscribed once, on the first occurrence, and released when the last
//! occurrence leaves.
//!
//! The table is an arena: identity maps to a slot index, a slot holds the
//! refcount and the subscription, and freed slots are recycled.

use std::sync::Arc;

use ahash::AHashMap;
use rxbind_core::{Observable, PropertyChange, ReactiveObject, Subscription};

/// Identity of a tracked item: two handles with the same key are the same
/// item, regardless of value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(pub usize);

impl ItemKey {
    /// Key of the allocation behind `arc`.
    #[must_use]
    pub fn of_arc<U: ?Sized>(arc: &Arc<U>) -> Self {
        Self(Arc::as_ptr(arc).cast::<()>() as usize)
    }
}

/// The before/after property streams of an item.
#[derive(Debug, Clone)]
pub struct PropertyStreams {
    pub changing: Observable<PropertyChange>,
    pub changed: Observable<PropertyChange>,
}

/// Something a [`ReactiveList`](super::ReactiveList) can hold.
///
/// `same_item` decides what `remove`, `index_of` and `contains` consider
/// equal. Items with a [`tracking_key`](Self::tracking_key) take part in
/// change tracking; those that also expose
/// [`property_streams`](Self::property_streams) have their property changes
/// forwarded by the list.
pub trait ListItem: Clone + Send + Sync + 'static {
    fn same_item(&self, other: &Self) -> bool;

    fn tracking_key(&self) -> Option<ItemKey> {
        None
    }

    fn property_streams(&self) -> Option<PropertyStreams> {
        None
    }
}

impl<U> ListItem for Arc<U>
where
    U: ReactiveObject + ?Sized + 'static,
{
    fn same_item(&self, other: &Self) -> bool {
        ItemKey::of_arc(self) == ItemKey::of_arc(other)
    }

    fn tracking_key(&self) -> Option<ItemKey> {
        Some(ItemKey::of_arc(self))
    }

    fn property_streams(&self) -> Option<PropertyStreams> {
        Some(PropertyStreams {
            changing: self.property_changing(),
            changed: self.property_changed(),
        })
    }
}

macro_rules! value_items {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ListItem for $ty {
                fn same_item(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

value_items!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, String,
    &'static str,
);

struct RefcountWatch {
    refcount: usize,
    subscription: Subscription,
}

/// Arena of watched items.
///
/// Subscriptions handed back by [`release`](Self::release) and friends must
/// be dropped by the caller after it lets go of whatever lock guards the
/// table.
#[derive(Default)]
pub(crate) struct WatcherTable {
    index: AHashMap<ItemKey, usize>,
    slots: Vec<Option<RefcountWatch>>,
    free: Vec<usize>,
}

impl WatcherTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bump the refcount of an already watched item. Returns `false` if the
    /// item is not watched yet.
    pub(crate) fn add_ref(&mut self, key: ItemKey) -> bool {
        match self.slot_mut(key) {
            Some(watch) => {
                watch.refcount += 1;
                true
            }
            None => false,
        }
    }

    /// Start watching `key` with a freshly made subscription, or bump its
    /// refcount if someone else registered it in the meantime. In the latter
    /// case the redundant subscription is handed back.
    pub(crate) fn insert_or_add_ref(
        &mut self,
        key: ItemKey,
        subscription: Subscription,
    ) -> Option<Subscription> {
        if self.add_ref(key) {
            return Some(subscription);
        }
        let watch = RefcountWatch {
            refcount: 1,
            subscription,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(watch);
                slot
            }
            None => {
                self.slots.push(Some(watch));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, slot);
        None
    }

    /// Drop one reference. Returns the subscription when the last one goes.
    pub(crate) fn release(&mut self, key: ItemKey) -> Option<Subscription> {
        let slot = *self.index.get(&key)?;
        let watch = self.slots[slot].as_mut()?;
        watch.refcount -= 1;
        if watch.refcount > 0 {
            return None;
        }
        self.index.remove(&key);
        self.free.push(slot);
        self.slots[slot].take().map(|w| w.subscription)
    }

    /// Forget every item. Returns all subscriptions.
    pub(crate) fn release_all(&mut self) -> Vec<Subscription> {
        self.index.clear();
        self.free.clear();
        self.slots
            .drain(..)
            .flatten()
            .map(|w| w.subscription)
            .collect()
    }

    pub(crate) fn refcount(&self, key: ItemKey) -> usize {
        self.index
            .get(&key)
            .and_then(|&slot| self.slots[slot].as_ref())
            .map_or(0, |w| w.refcount)
    }

    /// Number of distinct watched items.
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    fn slot_mut(&mut self, key: ItemKey) -> Option<&mut RefcountWatch> {
        let slot = *self.index.get(&key)?;
        self.slots[slot].as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_sub(count: &Arc<AtomicUsize>) -> Subscription {
        let count = Arc::clone(count);
        Subscription::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn shared_item_keeps_one_subscription() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut table = WatcherTable::new();
        let key = ItemKey(1);
        assert!(!table.add_ref(key));
        assert!(table.insert_or_add_ref(key, counting_sub(&released)).is_none());
        assert!(table.add_ref(key));
        assert_eq!(table.refcount(key), 2);

        assert!(table.release(key).is_none());
        assert_eq!(table.refcount(key), 1);
        let last = table.release(key);
        assert!(last.is_some());
        drop(last);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(table.refcount(key), 0);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn racing_registration_returns_spare() {
        let mut table = WatcherTable::new();
        let key = ItemKey(7);
        assert!(table.insert_or_add_ref(key, Subscription::empty()).is_none());
        assert!(table.insert_or_add_ref(key, Subscription::empty()).is_some());
        assert_eq!(table.refcount(key), 2);
    }

    #[test]
    fn slots_are_recycled() {
        let mut table = WatcherTable::new();
        table.insert_or_add_ref(ItemKey(1), Subscription::empty());
        drop(table.release(ItemKey(1)));
        table.insert_or_add_ref(ItemKey(2), Subscription::empty());
        assert_eq!(table.slots.len(), 1);
        assert_eq!(table.refcount(ItemKey(2)), 1);
    }

    #[test]
    fn release_unknown_is_noop() {
        let mut table = WatcherTable::new();
        assert!(table.release(ItemKey(3)).is_none());
    }

    #[test]
    fn release_all_returns_every_subscription() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut table = WatcherTable::new();
        for k in 0..4 {
            table.insert_or_add_ref(ItemKey(k), counting_sub(&released));
        }
        table.add_ref(ItemKey(0));
        drop(table.release_all());
        assert_eq!(released.load(Ordering::SeqCst), 4);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn value_items_compare_by_value() {
        assert!(3u32.same_item(&3));
        assert!(String::from("a").same_item(&"a".to_string()));
        assert_eq!(5i64.tracking_key(), None);
    }
}
