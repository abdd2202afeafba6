//! The observable list engine.
//!
//! Every mutation is announced twice: a `changing` descriptor before the
//! sequence is touched and a matching `changed` descriptor after. No lock is
//! held while either is delivered, so subscribers may read the list (and the
//! derived count streams do).
//!
//! # Invariants
//!
//! 1. For each mutation, `changing` precedes `changed` on the calling thread.
//! 2. After a changing/changed pair completes, `len()` reflects the change.
//! 3. While change tracking is on, the watcher refcount of every keyed item
//!    equals its number of occurrences in the list.
//! 4. While notifications are suppressed, no granular notification is
//!    emitted; the outermost scope publishes one reset if anything changed.
//!
//! # Bulk operations
//!
//! `add_range`, `insert_range`, `remove_range` and `remove_all` pick a
//! strategy from the share of the list they touch (see
//! [`ListConfig::should_reset`]): a single reset, one range pair, or the
//! single-item path per element.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use rxbind_core::sync::{lock, read, write};
use rxbind_core::{Observable, PropertyChange, Sink, Subject, Subscription};

use super::change::{CollectionChange, ItemChange, ListError, MoveInfo};
use super::config::ListConfig;
use super::suppress::{SuppressionGuard, SuppressionHost, Suppressor};
use super::watcher::{ListItem, WatcherTable};
use crate::Result;

/// Property raised when the length changes.
pub const COUNT_PROPERTY: &str = "Count";
/// Property raised when the list becomes empty or stops being empty.
pub const IS_EMPTY_PROPERTY: &str = "IsEmpty";
/// Property raised on every structural change when
/// [`ListConfig::item_indexer_echo`] is on.
pub const INDEXER_PROPERTY: &str = "Item[]";

#[derive(Default)]
struct EchoState {
    changing_count: Option<usize>,
    changed_count: Option<usize>,
    empty: Option<bool>,
}

fn remember<V: PartialEq>(slot: &mut Option<V>, value: V) -> bool {
    if slot.as_ref() == Some(&value) {
        false
    } else {
        *slot = Some(value);
        true
    }
}

struct ListCore<T> {
    this: Weak<Self>,
    items: RwLock<Vec<T>>,
    watchers: Mutex<WatcherTable>,
    tracking: AtomicBool,
    suppressor: Suppressor,
    changing: Subject<CollectionChange<T>>,
    changed: Subject<CollectionChange<T>>,
    before_added: Subject<T>,
    added: Subject<T>,
    before_removed: Subject<T>,
    removed: Subject<T>,
    before_moved: Subject<MoveInfo<T>>,
    moved: Subject<MoveInfo<T>>,
    item_changing: Subject<ItemChange<T>>,
    item_changed: Subject<ItemChange<T>>,
    property_changing: Subject<PropertyChange>,
    property_changed: Subject<PropertyChange>,
    echo: Mutex<EchoState>,
    reset_subscribers: Arc<AtomicUsize>,
    config: ListConfig,
}

impl<T: ListItem> ListCore<T> {
    fn new(this: &Weak<Self>, items: Vec<T>, config: ListConfig) -> Self {
        Self {
            this: this.clone(),
            items: RwLock::new(items),
            watchers: Mutex::new(WatcherTable::new()),
            tracking: AtomicBool::new(false),
            suppressor: Suppressor::new(),
            changing: Subject::new(),
            changed: Subject::new(),
            before_added: Subject::new(),
            added: Subject::new(),
            before_removed: Subject::new(),
            removed: Subject::new(),
            before_moved: Subject::new(),
            moved: Subject::new(),
            item_changing: Subject::new(),
            item_changed: Subject::new(),
            property_changing: Subject::new(),
            property_changed: Subject::new(),
            echo: Mutex::new(EchoState::default()),
            reset_subscribers: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    fn notifications_enabled(&self) -> bool {
        !self.suppressor.is_suppressed()
    }

    fn len(&self) -> usize {
        read(&self.items).len()
    }

    fn item_at(&self, index: usize) -> Result<T> {
        let items = read(&self.items);
        items.get(index).cloned().ok_or(ListError::IndexOutOfRange {
            index,
            len: items.len(),
        })
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> Result<R>) -> Result<R> {
        f(&mut write(&self.items))
    }

    fn emit_changing(&self, change: &CollectionChange<T>) {
        self.changing.next(change.clone());
        let count = self.len();
        let count_moved = remember(&mut lock(&self.echo).changing_count, count);
        if count_moved {
            self.property_changing
                .next(PropertyChange::new(COUNT_PROPERTY));
        }
        if self.config.item_indexer_echo {
            self.property_changing
                .next(PropertyChange::new(INDEXER_PROPERTY));
        }
    }

    fn emit_changed(&self, change: CollectionChange<T>) {
        self.changed.next(change);
        let count = self.len();
        let (count_moved, empty_moved) = {
            let mut echo = lock(&self.echo);
            (
                remember(&mut echo.changed_count, count),
                remember(&mut echo.empty, count == 0),
            )
        };
        if count_moved {
            self.property_changed.next(PropertyChange::new(COUNT_PROPERTY));
        }
        if empty_moved {
            self.property_changed
                .next(PropertyChange::new(IS_EMPTY_PROPERTY));
        }
        if self.config.item_indexer_echo {
            self.property_changed
                .next(PropertyChange::new(INDEXER_PROPERTY));
        }
    }

    // -- change tracking ----------------------------------------------------

    fn tracking_enabled(&self) -> bool {
        self.tracking.load(Ordering::Acquire)
    }

    fn track(&self, item: &T) {
        if !self.tracking_enabled() {
            return;
        }
        let Some(key) = item.tracking_key() else {
            return;
        };
        if lock(&self.watchers).add_ref(key) {
            return;
        }
        // Subscribing may call back into the list; do it unlocked.
        let subscription = self.watch(item);
        let spare = lock(&self.watchers).insert_or_add_ref(key, subscription);
        drop(spare);
    }

    fn untrack(&self, item: &T) {
        if !self.tracking_enabled() {
            return;
        }
        let Some(key) = item.tracking_key() else {
            return;
        };
        let released = lock(&self.watchers).release(key);
        drop(released);
    }

    fn untrack_all(&self) {
        let released = lock(&self.watchers).release_all();
        drop(released);
    }

    fn watch(&self, item: &T) -> Subscription {
        let Some(streams) = item.property_streams() else {
            return Subscription::empty();
        };
        Subscription::from_many(vec![
            self.forward(item, &streams.changing, &self.item_changing),
            self.forward(item, &streams.changed, &self.item_changed),
        ])
    }

    fn forward(
        &self,
        item: &T,
        stream: &Observable<PropertyChange>,
        target: &Subject<ItemChange<T>>,
    ) -> Subscription {
        let core = self.this.clone();
        let target = target.clone();
        let sender = item.clone();
        stream.subscribe(move |property| {
            if core.upgrade().is_some_and(|c| c.notifications_enabled()) {
                target.next(ItemChange {
                    sender: sender.clone(),
                    property,
                });
            }
        })
    }
}

impl<T: ListItem> SuppressionHost for ListCore<T> {
    fn suppressor(&self) -> &Suppressor {
        &self.suppressor
    }

    fn publish_reset(&self) {
        let change = CollectionChange::reset();
        self.emit_changing(&change);
        self.emit_changed(change);
    }

    fn reset_subscribers(&self) -> usize {
        self.reset_subscribers.load(Ordering::Acquire)
    }
}

fn checked_insert<T>(items: &mut Vec<T>, index: usize, item: T) -> Result<()> {
    if index > items.len() {
        return Err(ListError::IndexOutOfRange {
            index,
            len: items.len(),
        });
    }
    items.insert(index, item);
    Ok(())
}

fn checked_remove<T>(items: &mut Vec<T>, index: usize) -> Result<T> {
    if index >= items.len() {
        return Err(ListError::IndexOutOfRange {
            index,
            len: items.len(),
        });
    }
    Ok(items.remove(index))
}

fn checked_move<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<()> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(ListError::IndexOutOfRange { index, len });
        }
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

fn checked_range(index: usize, count: usize, len: usize) -> Result<Range<usize>> {
    index
        .checked_add(count)
        .filter(|&end| end <= len)
        .map(|end| index..end)
        .ok_or(ListError::RangeOutOfBounds { index, count, len })
}

/// An ordered list that announces its changes.
///
/// Cloning yields another handle to the same list.
pub struct ReactiveList<T> {
    core: Arc<ListCore<T>>,
}

impl<T> Clone for ReactiveList<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: ListItem + fmt::Debug> fmt::Debug for ReactiveList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(read(&self.core.items).iter()).finish()
    }
}

impl<T: ListItem> Default for ReactiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ListItem> FromIterator<T> for ReactiveList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter, ListConfig::default())
    }
}

impl<T: ListItem> From<Vec<T>> for ReactiveList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_items(items, ListConfig::default())
    }
}

impl<T: ListItem> ReactiveList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ListConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ListConfig) -> Self {
        Self::from_items(Vec::new(), config)
    }

    /// Create a list holding `items`. Nothing is announced.
    pub fn from_items(items: impl IntoIterator<Item = T>, config: ListConfig) -> Self {
        let items: Vec<T> = items.into_iter().collect();
        let tracking = config.change_tracking;
        let list = Self {
            core: Arc::new_cyclic(|this| ListCore::new(this, items, config)),
        };
        if tracking {
            list.set_change_tracking(true);
        }
        list
    }

    /// The configuration this list was built with.
    #[must_use]
    pub fn config(&self) -> &ListConfig {
        &self.core.config
    }

    // -- reads --------------------------------------------------------------

    #[must_use]
    pub fn len(&self) -> usize {
        self.core.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        read(&self.core.items).get(index).cloned()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        read(&self.core.items).clone()
    }

    /// Borrow the contents.
    ///
    /// The list is read-locked for the duration of `f`; mutating it from
    /// inside `f` deadlocks.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&read(&self.core.items))
    }

    /// Position of the first occurrence of `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        read(&self.core.items)
            .iter()
            .position(|candidate| candidate.same_item(item))
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    // -- single-item mutations ----------------------------------------------

    /// Insert `item` at `index` (`0..=len`).
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(ListError::IndexOutOfRange { index, len });
        }
        self.insert_item(index, item)
    }

    /// Append `item`.
    pub fn push(&self, item: T) {
        let index = self.len();
        if let Err(error) = self.insert_item(index, item) {
            tracing::warn!(%error, "list shrank while push was announcing its change");
        }
    }

    /// Remove and return the item at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        self.core.item_at(index)?;
        self.remove_item(index)
    }

    /// Remove the first occurrence of `item`. Returns whether it was found.
    pub fn remove(&self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => self.remove_item(index).is_ok(),
            None => false,
        }
    }

    /// Move the item at `from` so that it ends up at `to`.
    ///
    /// Announced as a single move, never as a remove plus an insert.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        let core = &self.core;
        let item = core.item_at(from)?;
        let len = self.len();
        if to >= len {
            return Err(ListError::IndexOutOfRange { index: to, len });
        }

        if !core.notifications_enabled() {
            core.mutate(|items| checked_move(items, from, to))?;
            core.suppressor.mark_dirty();
            return Ok(());
        }

        let change = CollectionChange::moved(item.clone(), to, from);
        let info = MoveInfo {
            moved_items: vec![item],
            from,
            to,
        };
        core.emit_changing(&change);
        core.before_moved.next(info.clone());
        core.mutate(|items| checked_move(items, from, to))?;
        core.emit_changed(change);
        core.moved.next(info);
        Ok(())
    }

    /// Replace the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: T) -> Result<T> {
        let core = &self.core;
        let old = core.item_at(index)?;
        let replace = |items: &mut Vec<T>| -> Result<T> {
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(ListError::IndexOutOfRange { index, len })?;
            Ok(std::mem::replace(slot, item.clone()))
        };

        if !core.notifications_enabled() {
            let previous = core.mutate(replace)?;
            core.suppressor.mark_dirty();
            core.track(&item);
            core.untrack(&previous);
            return Ok(previous);
        }

        let change = CollectionChange::replace(item.clone(), old, index);
        core.emit_changing(&change);
        let previous = core.mutate(replace)?;
        core.track(&item);
        core.untrack(&previous);
        core.emit_changed(change);
        Ok(previous)
    }

    /// Remove everything. Announced as a reset.
    pub fn clear(&self) {
        let core = &self.core;
        if !core.notifications_enabled() {
            write(&core.items).clear();
            core.suppressor.mark_dirty();
            core.untrack_all();
            return;
        }
        let change = CollectionChange::reset();
        core.emit_changing(&change);
        write(&core.items).clear();
        core.emit_changed(change);
        core.untrack_all();
    }

    fn insert_item(&self, index: usize, item: T) -> Result<()> {
        let core = &self.core;
        if !core.notifications_enabled() {
            core.mutate(|items| checked_insert(items, index, item.clone()))?;
            core.suppressor.mark_dirty();
            core.track(&item);
            return Ok(());
        }

        let change = CollectionChange::add(vec![item.clone()], index);
        core.emit_changing(&change);
        core.before_added.next(item.clone());
        core.mutate(|items| checked_insert(items, index, item.clone()))?;
        core.emit_changed(change);
        core.added.next(item.clone());
        core.track(&item);
        Ok(())
    }

    fn remove_item(&self, index: usize) -> Result<T> {
        let core = &self.core;
        if !core.notifications_enabled() {
            let removed = core.mutate(|items| checked_remove(items, index))?;
            core.suppressor.mark_dirty();
            core.untrack(&removed);
            return Ok(removed);
        }

        let item = core.item_at(index)?;
        let change = CollectionChange::remove(vec![item.clone()], index);
        core.emit_changing(&change);
        core.before_removed.next(item);
        let removed = core.mutate(|items| checked_remove(items, index))?;
        core.emit_changed(change);
        core.removed.next(removed.clone());
        core.untrack(&removed);
        Ok(removed)
    }

    // -- bulk mutations -----------------------------------------------------

    /// Suppress granular notifications if a bulk edit touching `affected`
    /// items is large enough to be announced as a reset.
    fn bulk_scope(&self, affected: usize) -> Option<SuppressionGuard> {
        let len = self.len();
        let reset = self.core.config.should_reset(affected, len);
        let strategy = if reset {
            "reset"
        } else if self.core.config.range_notifications {
            "range"
        } else {
            "per-item"
        };
        tracing::debug!(affected, len, strategy, "bulk list operation");
        reset.then(|| self.suppress_change_notifications())
    }

    /// Append every item.
    pub fn add_range(&self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        let _scope = self.bulk_scope(items.len());
        let core = &self.core;

        if !core.notifications_enabled() {
            write(&core.items).extend(items.iter().cloned());
            core.suppressor.mark_dirty();
            for item in &items {
                core.track(item);
            }
        } else if core.config.range_notifications {
            let change = CollectionChange::add(items.clone(), self.len());
            core.emit_changing(&change);
            for item in &items {
                core.before_added.next(item.clone());
            }
            write(&core.items).extend(items.iter().cloned());
            core.emit_changed(change);
            for item in &items {
                core.added.next(item.clone());
            }
            for item in &items {
                core.track(item);
            }
        } else {
            for item in items {
                self.push(item);
            }
        }
    }

    /// Insert every item starting at `index` (`0..=len`), keeping their order.
    pub fn insert_range(&self, index: usize, items: impl IntoIterator<Item = T>) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(ListError::IndexOutOfRange { index, len });
        }
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }
        let _scope = self.bulk_scope(items.len());
        let core = &self.core;
        let splice = |list: &mut Vec<T>| -> Result<()> {
            if index > list.len() {
                return Err(ListError::IndexOutOfRange {
                    index,
                    len: list.len(),
                });
            }
            list.splice(index..index, items.iter().cloned());
            Ok(())
        };

        if !core.notifications_enabled() {
            core.mutate(splice)?;
            core.suppressor.mark_dirty();
            for item in &items {
                core.track(item);
            }
        } else if core.config.range_notifications {
            let change = CollectionChange::add(items.clone(), index);
            core.emit_changing(&change);
            for item in &items {
                core.before_added.next(item.clone());
            }
            core.mutate(splice)?;
            core.emit_changed(change);
            for item in &items {
                core.added.next(item.clone());
            }
            for item in &items {
                core.track(item);
            }
        } else {
            for (offset, item) in items.into_iter().enumerate() {
                self.insert_item(index + offset, item)?;
            }
        }
        Ok(())
    }

    /// Remove `count` items starting at `index`, returning them.
    pub fn remove_range(&self, index: usize, count: usize) -> Result<Vec<T>> {
        let core = &self.core;
        let removed: Vec<T> = {
            let items = read(&core.items);
            let range = checked_range(index, count, items.len())?;
            items[range].to_vec()
        };
        if removed.is_empty() {
            return Ok(removed);
        }
        let _scope = self.bulk_scope(count);
        let drain = |items: &mut Vec<T>| -> Result<()> {
            let range = checked_range(index, count, items.len())?;
            items.drain(range);
            Ok(())
        };

        if !core.notifications_enabled() {
            core.mutate(drain)?;
            core.suppressor.mark_dirty();
            for item in &removed {
                core.untrack(item);
            }
        } else if core.config.range_notifications {
            let change = CollectionChange::remove(removed.clone(), index);
            core.emit_changing(&change);
            for item in &removed {
                core.before_removed.next(item.clone());
            }
            core.mutate(drain)?;
            core.emit_changed(change);
            for item in &removed {
                core.untrack(item);
            }
            for item in &removed {
                core.removed.next(item.clone());
            }
        } else {
            // Every removal shifts the rest down into `index`.
            for _ in 0..count {
                self.remove_item(index)?;
            }
        }
        Ok(removed)
    }

    /// Remove the first occurrence of each of `items`. Returns how many were
    /// found.
    pub fn remove_all(&self, items: &[T]) -> usize {
        let _scope = self.bulk_scope(items.len());
        let mut found = 0;
        for item in items {
            if self.remove(item) {
                found += 1;
            }
        }
        found
    }

    // -- ordering -----------------------------------------------------------

    /// Sort, then announce a reset.
    pub fn sort(&self)
    where
        T: Ord,
    {
        self.sort_by(T::cmp);
    }

    /// Sort with a comparator, then announce a reset.
    ///
    /// The comparator runs on a snapshot with the list unlocked, so it may
    /// read the list. A mutation made meanwhile by another thread is
    /// overwritten when the sorted snapshot is stored.
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> CmpOrdering) {
        let mut items = self.to_vec();
        items.sort_by(compare);
        self.store_sorted(items);
    }

    /// Sort by a key, then announce a reset. The key function runs with the
    /// list unlocked, as in [`sort_by`](Self::sort_by).
    pub fn sort_by_key<K: Ord>(&self, key: impl FnMut(&T) -> K) {
        let mut items = self.to_vec();
        items.sort_by_key(key);
        self.store_sorted(items);
    }

    /// Sort the items in `range` with a comparator, then announce a reset.
    /// The comparator runs with the list unlocked, as in
    /// [`sort_by`](Self::sort_by).
    pub fn sort_range_by(
        &self,
        range: Range<usize>,
        compare: impl FnMut(&T, &T) -> CmpOrdering,
    ) -> Result<()> {
        let mut items = self.to_vec();
        let count = range.end.saturating_sub(range.start);
        let range = checked_range(range.start, count, items.len())?;
        items[range].sort_by(compare);
        self.store_sorted(items);
        Ok(())
    }

    fn store_sorted(&self, items: Vec<T>) {
        *write(&self.core.items) = items;
        self.reset();
    }

    // -- notification control -----------------------------------------------

    /// Announce a reset without touching the contents.
    ///
    /// Inside a suppression scope this only marks the scope dirty; the scope
    /// publishes the reset when it closes.
    pub fn reset(&self) {
        if self.core.notifications_enabled() {
            self.core.publish_reset();
        } else {
            self.core.suppressor.mark_dirty();
        }
    }

    /// Withhold granular notifications until the returned guard (and every
    /// other live guard) is dropped.
    pub fn suppress_change_notifications(&self) -> SuppressionGuard {
        let host: Arc<dyn SuppressionHost> = self.core.clone();
        SuppressionGuard::acquire(host)
    }

    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.core.notifications_enabled()
    }

    /// Turn item property tracking on or off.
    ///
    /// Turning it on watches every current item; turning it off releases
    /// every watch.
    pub fn set_change_tracking(&self, enabled: bool) {
        let was = self.core.tracking.swap(enabled, Ordering::AcqRel);
        if was == enabled {
            return;
        }
        if enabled {
            for item in self.to_vec() {
                self.core.track(&item);
            }
        } else {
            self.core.untrack_all();
        }
    }

    #[must_use]
    pub fn change_tracking_enabled(&self) -> bool {
        self.core.tracking_enabled()
    }

    // -- streams ------------------------------------------------------------

    /// Descriptors emitted before each change.
    #[must_use]
    pub fn changing(&self) -> Observable<CollectionChange<T>> {
        self.core.changing.observable()
    }

    /// Descriptors emitted after each change.
    #[must_use]
    pub fn changed(&self) -> Observable<CollectionChange<T>> {
        self.core.changed.observable()
    }

    #[must_use]
    pub fn before_items_added(&self) -> Observable<T> {
        self.core.before_added.observable()
    }

    #[must_use]
    pub fn items_added(&self) -> Observable<T> {
        self.core.added.observable()
    }

    #[must_use]
    pub fn before_items_removed(&self) -> Observable<T> {
        self.core.before_removed.observable()
    }

    #[must_use]
    pub fn items_removed(&self) -> Observable<T> {
        self.core.removed.observable()
    }

    #[must_use]
    pub fn before_items_moved(&self) -> Observable<MoveInfo<T>> {
        self.core.before_moved.observable()
    }

    #[must_use]
    pub fn items_moved(&self) -> Observable<MoveInfo<T>> {
        self.core.moved.observable()
    }

    /// Property-changing events raised by tracked items, delivered on the
    /// configured scheduler.
    #[must_use]
    pub fn item_changing(&self) -> Observable<ItemChange<T>> {
        self.core
            .item_changing
            .observable()
            .observe_on(Arc::clone(&self.core.config.scheduler))
    }

    /// Property-changed events raised by tracked items, delivered on the
    /// configured scheduler.
    #[must_use]
    pub fn item_changed(&self) -> Observable<ItemChange<T>> {
        self.core
            .item_changed
            .observable()
            .observe_on(Arc::clone(&self.core.config.scheduler))
    }

    /// Property-changing events of the list itself (`Count`, `Item[]`).
    #[must_use]
    pub fn property_changing(&self) -> Observable<PropertyChange> {
        self.core.property_changing.observable()
    }

    /// Property-changed events of the list itself (`Count`, `IsEmpty`,
    /// `Item[]`).
    #[must_use]
    pub fn property_changed(&self) -> Observable<PropertyChange> {
        self.core.property_changed.observable()
    }

    /// Length before each change, skipping repeats.
    #[must_use]
    pub fn count_changing(&self) -> Observable<usize> {
        let core = Arc::downgrade(&self.core);
        self.core
            .changing
            .observable()
            .map(move |_| core.upgrade().map_or(0, |c| c.len()))
            .distinct_until_changed()
    }

    /// Length after each change, skipping repeats.
    #[must_use]
    pub fn count_changed(&self) -> Observable<usize> {
        let core = Arc::downgrade(&self.core);
        self.core
            .changed
            .observable()
            .map(move |_| core.upgrade().map_or(0, |c| c.len()))
            .distinct_until_changed()
    }

    /// Emptiness after each change, skipping repeats.
    #[must_use]
    pub fn is_empty_changed(&self) -> Observable<bool> {
        self.count_changed()
            .map(|count| count == 0)
            .distinct_until_changed()
    }

    /// Fires after every reset. Subscribers are counted; see
    /// [`reset_subscriber_count`](Self::reset_subscriber_count).
    #[must_use]
    pub fn should_reset(&self) -> Observable<()> {
        let counter = Arc::clone(&self.core.reset_subscribers);
        let resets = self
            .core
            .changed
            .observable()
            .filter(|change| change.is_reset())
            .map(|_| ());
        Observable::create(move |sink: Sink<()>| {
            counter.fetch_add(1, Ordering::AcqRel);
            let upstream = resets.subscribe_notifications(move |n| sink(n));
            let counter = Arc::clone(&counter);
            Subscription::new(move || {
                drop(upstream);
                counter.fetch_sub(1, Ordering::AcqRel);
            })
        })
    }

    // -- diagnostics --------------------------------------------------------

    /// Watcher refcount of `item`; 0 when untracked.
    #[must_use]
    pub fn watcher_refcount(&self, item: &T) -> usize {
        item.tracking_key()
            .map_or(0, |key| lock(&self.core.watchers).refcount(key))
    }

    /// Number of distinct items currently watched.
    #[must_use]
    pub fn watched_items(&self) -> usize {
        lock(&self.core.watchers).len()
    }

    #[must_use]
    pub fn suppression_depth(&self) -> usize {
        self.core.suppressor.depth()
    }

    /// Live subscribers to [`should_reset`](Self::should_reset).
    #[must_use]
    pub fn reset_subscriber_count(&self) -> usize {
        self.core.reset_subscribers.load(Ordering::Acquire)
    }
}
