//! Hot multicast sources.
//!
//! A [`Subject`] forwards whatever is pushed into it to every current
//! subscriber. Once terminated it replays the terminal notification to late
//! subscribers and ignores further input.
//!
//! A [`BehaviorSubject`] additionally remembers its latest value and hands it
//! to each new subscriber before anything else.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use arc_swap::ArcSwap;

use super::{Notification, Observable, Sink, Subscription};
use crate::error::StreamError;
use crate::sync::lock;

enum Terminal {
    Completed,
    Errored(StreamError),
}

struct SubjectState<T> {
    observers: Vec<(u64, Sink<T>)>,
    terminal: Option<Terminal>,
}

struct SubjectInner<T> {
    state: Mutex<SubjectState<T>>,
    next_id: AtomicU64,
}

impl<T> SubjectInner<T> {
    fn remove(&self, id: u64) {
        let removed = {
            let mut state = lock(&self.state);
            state
                .observers
                .iter()
                .position(|(oid, _)| *oid == id)
                .map(|pos| state.observers.remove(pos))
        };
        // The sink may own captured subscriptions; drop it outside the lock.
        drop(removed);
    }
}

/// Hot, multicast stream that subscribers attach to and producers push into.
///
/// Cloning a `Subject` creates a new handle to the **same** stream.
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Subject")
            .field("observers", &state.observers.len())
            .field("terminated", &state.terminal.is_some())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    /// Create a subject with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                state: Mutex::new(SubjectState {
                    observers: Vec::new(),
                    terminal: None,
                }),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Push a value to every current subscriber.
    ///
    /// Subscribers are notified in registration order, from a snapshot taken
    /// before the first callback runs.
    pub fn next(&self, value: T) {
        let snapshot = self.snapshot();
        for sink in snapshot {
            sink(Notification::Next(value.clone()));
        }
    }

    /// Fail the stream. Later input is ignored.
    pub fn error(&self, error: StreamError) {
        for sink in self.terminate(Terminal::Errored(error.clone())) {
            sink(Notification::Error(error.clone()));
        }
    }

    /// Complete the stream. Later input is ignored.
    pub fn complete(&self) {
        for sink in self.terminate(Terminal::Completed) {
            sink(Notification::Completed);
        }
    }

    /// Route a notification to the matching method.
    pub fn dispatch(&self, notification: Notification<T>) {
        match notification {
            Notification::Next(value) => self.next(value),
            Notification::Error(error) => self.error(error),
            Notification::Completed => self.complete(),
        }
    }

    /// Attach a sink directly.
    pub fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        let replay = {
            let mut state = lock(&self.inner.state);
            let replay = state.terminal.as_ref().map(|terminal| match terminal {
                Terminal::Completed => Notification::Completed,
                Terminal::Errored(e) => Notification::Error(e.clone()),
            });
            if replay.is_none() {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                state.observers.push((id, Arc::clone(&sink)));
                let weak: Weak<SubjectInner<T>> = Arc::downgrade(&self.inner);
                return Subscription::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.remove(id);
                    }
                });
            }
            replay
        };
        if let Some(notification) = replay {
            sink(notification);
        }
        Subscription::empty()
    }

    /// View this subject as an [`Observable`].
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let subject = self.clone();
        Observable::create(move |sink| subject.subscribe_sink(sink))
    }

    /// Number of current subscribers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        lock(&self.inner.state).observers.len()
    }

    /// Whether anyone is subscribed.
    #[must_use]
    pub fn has_observers(&self) -> bool {
        self.observer_count() > 0
    }

    /// Whether the subject has completed or failed.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        lock(&self.inner.state).terminal.is_some()
    }

    fn snapshot(&self) -> Vec<Sink<T>> {
        let state = lock(&self.inner.state);
        if state.terminal.is_some() {
            return Vec::new();
        }
        state.observers.iter().map(|(_, s)| Arc::clone(s)).collect()
    }

    fn terminate(&self, terminal: Terminal) -> Vec<Sink<T>> {
        let mut state = lock(&self.inner.state);
        if state.terminal.is_some() {
            return Vec::new();
        }
        state.terminal = Some(terminal);
        std::mem::take(&mut state.observers)
            .into_iter()
            .map(|(_, s)| s)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// BehaviorSubject
// ---------------------------------------------------------------------------

/// A [`Subject`] that remembers its latest value.
///
/// New subscribers receive the current value first, then live updates.
pub struct BehaviorSubject<T> {
    current: Arc<ArcSwap<T>>,
    subject: Subject<T>,
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            subject: self.subject.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BehaviorSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorSubject")
            .field("value", &**self.current.load())
            .field("subject", &self.subject)
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> BehaviorSubject<T> {
    /// Create with an initial value.
    pub fn new(initial: T) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
            subject: Subject::new(),
        }
    }

    /// The latest value.
    #[must_use]
    pub fn value(&self) -> T {
        (**self.current.load()).clone()
    }

    /// Store and broadcast a new value.
    pub fn next(&self, value: T) {
        self.current.store(Arc::new(value.clone()));
        self.subject.next(value);
    }

    /// View as an [`Observable`] that starts with the current value.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let current = Arc::clone(&self.current);
        let subject = self.subject.clone();
        Observable::create(move |sink: Sink<T>| {
            if !subject.is_terminated() {
                sink(Notification::Next((**current.load()).clone()));
            }
            subject.subscribe_sink(sink)
        })
    }

    /// Number of current subscribers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }

    /// Complete the stream.
    pub fn complete(&self) {
        self.subject.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::tests::{record, values};

    #[test]
    fn multicasts_to_all_subscribers() {
        let subject = Subject::new();
        let (a, _sa) = record(&subject.observable());
        let (b, _sb) = record(&subject.observable());
        subject.next(1);
        subject.next(2);
        assert_eq!(values(&a), vec![1, 2]);
        assert_eq!(values(&b), vec![1, 2]);
    }

    #[test]
    fn unsubscribe_removes_observer() {
        let subject = Subject::<u8>::new();
        let sub = subject.observable().subscribe(|_| {});
        assert_eq!(subject.observer_count(), 1);
        drop(sub);
        assert_eq!(subject.observer_count(), 0);
        assert!(!subject.has_observers());
    }

    #[test]
    fn terminal_is_replayed_and_sticky() {
        let subject = Subject::<u8>::new();
        subject.complete();
        subject.next(9);
        let (log, sub) = record(&subject.observable());
        assert!(matches!(lock(&log).as_slice(), [Notification::Completed]));
        assert!(sub.is_closed());
        assert!(subject.is_terminated());
    }

    #[test]
    fn subscribing_from_callback_does_not_deadlock() {
        let subject = Subject::<u8>::new();
        let inner = subject.clone();
        let nested = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&nested);
        let _sub = subject.observable().subscribe(move |_| {
            lock(&keep).push(inner.observable().subscribe(|_| {}));
        });
        subject.next(1);
        assert_eq!(subject.observer_count(), 2);
    }

    #[test]
    fn behavior_replays_current_value() {
        let subject = BehaviorSubject::new(false);
        subject.next(true);
        let (log, _sub) = record(&subject.observable());
        subject.next(false);
        assert_eq!(values(&log), vec![true, false]);
        assert!(!subject.value());
    }
}
