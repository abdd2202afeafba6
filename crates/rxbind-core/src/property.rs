//! Property-change capability for items that can report their own edits.
//!
//! An object opts in by implementing [`ReactiveObject`]. A collection that
//! tracks changes subscribes to these streams and re-tags every event with the
//! item that raised it.

use std::fmt;
use std::sync::Arc;

use crate::stream::{Observable, Subject};

/// Name of a property that is about to change or has changed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PropertyChange {
    name: Arc<str>,
}

impl PropertyChange {
    /// Describe a change to `name`.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyChange").field(&&*self.name).finish()
    }
}

impl fmt::Display for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An object that announces edits to its properties.
pub trait ReactiveObject: Send + Sync {
    /// Fires before a property changes. Objects that only report after the
    /// fact can keep the default, which never emits.
    fn property_changing(&self) -> Observable<PropertyChange> {
        Observable::never()
    }

    /// Fires after a property changed.
    fn property_changed(&self) -> Observable<PropertyChange>;
}

/// Ready-made pair of property streams for implementing [`ReactiveObject`].
#[derive(Debug, Clone, Default)]
pub struct PropertyNotifier {
    changing: Subject<PropertyChange>,
    changed: Subject<PropertyChange>,
}

impl PropertyNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a change to `name`: `changing` first, then `changed`.
    pub fn raise(&self, name: &str) {
        let change = PropertyChange::new(name);
        self.changing.next(change.clone());
        self.changed.next(change);
    }

    pub fn raise_changing(&self, name: &str) {
        self.changing.next(PropertyChange::new(name));
    }

    pub fn raise_changed(&self, name: &str) {
        self.changed.next(PropertyChange::new(name));
    }

    #[must_use]
    pub fn changing(&self) -> Observable<PropertyChange> {
        self.changing.observable()
    }

    #[must_use]
    pub fn changed(&self) -> Observable<PropertyChange> {
        self.changed.observable()
    }

    /// Whether anything is listening on either stream.
    #[must_use]
    pub fn has_observers(&self) -> bool {
        self.changing.has_observers() || self.changed.has_observers()
    }
}
