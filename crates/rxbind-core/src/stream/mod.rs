//! Push-based streams.
//!
//! # Model
//!
//! An [`Observable<T>`] is a recipe: nothing happens until it is subscribed,
//! and every subscription runs the recipe independently ("cold"). Hot,
//! multicast sources are [`Subject`] and [`BehaviorSubject`]; a cold stream is
//! shared between subscribers with [`Observable::publish`] /
//! [`Observable::share`].
//!
//! Every subscriber receives a sequence of [`Notification`]s obeying the
//! grammar `Next* (Error | Completed)?`.
//!
//! # Invariants
//!
//! 1. Nothing is delivered to a subscriber after a terminal notification.
//! 2. Nothing is delivered to a subscriber after its [`Subscription`] closes.
//! 3. A terminal notification closes the subscription and runs its teardown,
//!    so finished streams release upstream resources without the handle.
//! 4. No internal lock is held while a subscriber callback runs.

mod connectable;
mod operators;
mod subject;
mod subscription;

use std::fmt;
use std::sync::Arc;

pub use connectable::ConnectableObservable;
pub use subject::{BehaviorSubject, Subject};
pub use subscription::Subscription;

use crate::error::StreamError;
use crate::scheduler::SharedScheduler;
use subscription::SubscriptionState;

/// One event delivered to a subscriber.
#[derive(Debug, Clone)]
pub enum Notification<T> {
    /// A value.
    Next(T),
    /// Terminal failure.
    Error(StreamError),
    /// Terminal success.
    Completed,
}

impl<T> Notification<T> {
    /// Whether this notification ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

/// Callback receiving notifications.
pub type Sink<T> = Arc<dyn Fn(Notification<T>) + Send + Sync>;

type SubscribeFn<T> = dyn Fn(Sink<T>) -> Subscription + Send + Sync;

/// A lazily-started, push-based stream of `T`.
///
/// Cloning an `Observable` clones the recipe, not any running subscription.
pub struct Observable<T> {
    subscribe_fn: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe_fn: Arc::clone(&self.subscribe_fn),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Build a stream from a subscribe function.
    ///
    /// `subscribe` runs once per subscriber. It receives the subscriber's
    /// sink and returns the teardown for whatever it started.
    pub fn create<F>(subscribe: F) -> Self
    where
        F: Fn(Sink<T>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            subscribe_fn: Arc::new(subscribe),
        }
    }

    /// A stream that emits `value` and completes.
    pub fn just(value: T) -> Self {
        Self::create(move |sink| {
            sink(Notification::Next(value.clone()));
            sink(Notification::Completed);
            Subscription::empty()
        })
    }

    /// A stream that emits every item of `values` and completes.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        let values: Arc<[T]> = values.into_iter().collect();
        Self::create(move |sink| {
            for value in values.iter() {
                sink(Notification::Next(value.clone()));
            }
            sink(Notification::Completed);
            Subscription::empty()
        })
    }

    /// A stream that completes immediately.
    pub fn empty() -> Self {
        Self::create(|sink| {
            sink(Notification::Completed);
            Subscription::empty()
        })
    }

    /// A stream that never emits anything.
    pub fn never() -> Self {
        Self::create(|_sink| Subscription::empty())
    }

    /// A stream that fails immediately with `error`.
    pub fn throw(error: StreamError) -> Self {
        Self::create(move |sink| {
            sink(Notification::Error(error.clone()));
            Subscription::empty()
        })
    }

    /// Run `work` on `scheduler` for each subscriber, emitting its result
    /// and completing, or failing with its error.
    pub fn start_on<F>(scheduler: SharedScheduler, work: F) -> Self
    where
        F: Fn() -> Result<T, StreamError> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        Self::create(move |sink| {
            let work = Arc::clone(&work);
            scheduler.schedule(Box::new(move || match work() {
                Ok(value) => {
                    sink(Notification::Next(value));
                    sink(Notification::Completed);
                }
                Err(error) => sink(Notification::Error(error)),
            }));
            Subscription::empty()
        })
    }

    /// Subscribe with a raw notification callback.
    pub fn subscribe_notifications<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Notification<T>) + Send + Sync + 'static,
    {
        let state = Arc::new(SubscriptionState::new());
        let guard = Arc::clone(&state);
        let sink: Sink<T> = Arc::new(move |notification: Notification<T>| {
            if guard.is_closed() {
                return;
            }
            let terminal = notification.is_terminal();
            observer(notification);
            if terminal {
                guard.close();
            }
        });
        let upstream = (self.subscribe_fn)(sink);
        state.set_teardown(Box::new(move || drop(upstream)));
        Subscription::from_state(state)
    }

    /// Subscribe to values. Errors are logged and otherwise ignored.
    pub fn subscribe<F>(&self, on_next: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe_notifications(move |notification| match notification {
            Notification::Next(value) => on_next(value),
            Notification::Error(error) => {
                tracing::error!(error = %error, "stream error reached a subscriber without an error handler");
            }
            Notification::Completed => {}
        })
    }

    /// Subscribe with separate value, error, and completion callbacks.
    pub fn subscribe_with<N, E, C>(&self, on_next: N, on_error: E, on_completed: C) -> Subscription
    where
        N: Fn(T) + Send + Sync + 'static,
        E: Fn(StreamError) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        self.subscribe_notifications(move |notification| match notification {
            Notification::Next(value) => on_next(value),
            Notification::Error(error) => on_error(error),
            Notification::Completed => on_completed(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scheduler::QueueScheduler;
    use crate::sync::lock;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn record<T: Clone + Send + Sync + 'static>(
        source: &Observable<T>,
    ) -> (Arc<Mutex<Vec<Notification<T>>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let sub = source.subscribe_notifications(move |n| lock(&sink).push(n));
        (log, sub)
    }

    pub(crate) fn values<T: Clone>(log: &Mutex<Vec<Notification<T>>>) -> Vec<T> {
        lock(log)
            .iter()
            .filter_map(|n| match n {
                Notification::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn just_emits_and_completes() {
        let (log, sub) = record(&Observable::just(7));
        assert_eq!(values(&log), vec![7]);
        assert!(matches!(lock(&log).last(), Some(Notification::Completed)));
        assert!(sub.is_closed());
    }

    #[test]
    fn cold_streams_rerun_per_subscriber() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let source = Observable::create(move |sink: Sink<u32>| {
            counter.fetch_add(1, Ordering::SeqCst);
            sink(Notification::Next(1));
            Subscription::empty()
        });
        let _a = source.subscribe(|_| {});
        let _b = source.subscribe(|_| {});
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nothing_after_terminal() {
        let source = Observable::create(|sink: Sink<u32>| {
            sink(Notification::Next(1));
            sink(Notification::Completed);
            sink(Notification::Next(2));
            sink(Notification::Error(StreamError::msg("late")));
            Subscription::empty()
        });
        let (log, _sub) = record(&source);
        assert_eq!(lock(&log).len(), 2);
    }

    #[test]
    fn terminal_runs_upstream_teardown() {
        let torn_down = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&torn_down);
        let source = Observable::create(move |sink: Sink<u32>| {
            let flag = Arc::clone(&flag);
            sink(Notification::Completed);
            Subscription::new(move || {
                flag.fetch_add(1, Ordering::SeqCst);
            })
        });
        let sub = source.subscribe(|_| {});
        assert_eq!(torn_down.load(Ordering::SeqCst), 1);
        drop(sub);
        assert_eq!(torn_down.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn throw_reaches_error_callback() {
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        let _sub = Observable::<u8>::throw(StreamError::msg("nope")).subscribe_with(
            |_| {},
            move |e| *lock(&slot) = Some(e.to_string()),
            || {},
        );
        assert_eq!(lock(&seen).as_deref(), Some("nope"));
    }

    #[test]
    fn start_on_runs_on_scheduler() {
        let scheduler = Arc::new(QueueScheduler::new());
        let source = Observable::start_on(scheduler.clone(), || Ok::<_, StreamError>(42));
        let (log, _sub) = record(&source);
        assert!(lock(&log).is_empty());
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(values(&log), vec![42]);
    }

    #[test]
    fn from_values_emits_in_order() {
        let (log, _sub) = record(&Observable::from_values(vec![1, 2, 3]));
        assert_eq!(values(&log), vec![1, 2, 3]);
    }
}
