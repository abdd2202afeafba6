//! Combinators on [`Observable`].
//!
//! Each operator subscribes to its source through
//! [`Observable::subscribe_notifications`], so every stage enforces the
//! notification grammar on its own and tears its upstream down on terminal.

use std::sync::{Arc, Mutex};

use super::{ConnectableObservable, Notification, Observable, Sink, Subscription};
use crate::error::StreamError;
use crate::scheduler::SharedScheduler;
use crate::sync::lock;

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Transform each value.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Observable::create(move |sink: Sink<U>| {
            let f = Arc::clone(&f);
            source.subscribe_notifications(move |n| match n {
                Notification::Next(v) => sink(Notification::Next(f(v))),
                Notification::Error(e) => sink(Notification::Error(e)),
                Notification::Completed => sink(Notification::Completed),
            })
        })
    }

    /// Keep only values matching `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let source = self.clone();
        let predicate = Arc::new(predicate);
        Self::create(move |sink: Sink<T>| {
            let predicate = Arc::clone(&predicate);
            source.subscribe_notifications(move |n| match n {
                Notification::Next(v) if !predicate(&v) => {}
                other => sink(other),
            })
        })
    }

    /// Run `f` on each value before passing it on unchanged.
    pub fn tap<F>(&self, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let source = self.clone();
        let f = Arc::new(f);
        Self::create(move |sink: Sink<T>| {
            let f = Arc::clone(&f);
            source.subscribe_notifications(move |n| {
                if let Notification::Next(v) = &n {
                    f(v);
                }
                sink(n);
            })
        })
    }

    /// Drop values equal to the previous one seen by the same subscriber.
    pub fn distinct_until_changed(&self) -> Self
    where
        T: PartialEq,
    {
        let source = self.clone();
        Self::create(move |sink: Sink<T>| {
            let last: Mutex<Option<T>> = Mutex::new(None);
            source.subscribe_notifications(move |n| match n {
                Notification::Next(v) => {
                    let fresh = {
                        let mut last = lock(&last);
                        if last.as_ref() == Some(&v) {
                            false
                        } else {
                            *last = Some(v.clone());
                            true
                        }
                    };
                    if fresh {
                        sink(Notification::Next(v));
                    }
                }
                other => sink(other),
            })
        })
    }

    /// Emit `value` to each subscriber before the source's values.
    pub fn start_with(&self, value: T) -> Self {
        self.start_with_fn(move || value.clone())
    }

    /// Emit `f()`, evaluated at subscribe time, before the source's values.
    pub fn start_with_fn<F>(&self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let source = self.clone();
        Self::create(move |sink: Sink<T>| {
            sink(Notification::Next(f()));
            source.subscribe_notifications(move |n| sink(n))
        })
    }

    /// On error, switch to the stream returned by `handler`.
    pub fn catch_error<F>(&self, handler: F) -> Self
    where
        F: Fn(StreamError) -> Observable<T> + Send + Sync + 'static,
    {
        let source = self.clone();
        let handler = Arc::new(handler);
        Self::create(move |sink: Sink<T>| {
            let fallback: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
            let slot = Arc::clone(&fallback);
            let handler = Arc::clone(&handler);
            let upstream = source.subscribe_notifications(move |n| match n {
                Notification::Error(error) => {
                    let replacement = handler(error);
                    let downstream = Arc::clone(&sink);
                    let sub = replacement.subscribe_notifications(move |n| downstream(n));
                    let previous = lock(&slot).replace(sub);
                    drop(previous);
                }
                other => sink(other),
            });
            Subscription::new(move || {
                drop(upstream);
                let fallback = lock(&fallback).take();
                drop(fallback);
            })
        })
    }

    /// Combine the latest values of `self` and `other` with `f`.
    ///
    /// Emits once both sides have produced a value, then on every value from
    /// either side. Fails when either side fails. Completes when both sides
    /// complete, or as soon as one side completes without ever emitting.
    pub fn combine_latest<U, R, F>(&self, other: &Observable<U>, f: F) -> Observable<R>
    where
        U: Clone + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
        F: Fn(&T, &U) -> R + Send + Sync + 'static,
    {
        let left = self.clone();
        let right = other.clone();
        let f = Arc::new(f);
        Observable::create(move |sink: Sink<R>| {
            let state = Arc::new(Mutex::new(PairState::<T, U>::default()));

            let emit = {
                let f = Arc::clone(&f);
                let sink = Arc::clone(&sink);
                move |pair: Option<(T, U)>| {
                    if let Some((a, b)) = pair {
                        sink(Notification::Next(f(&a, &b)));
                    }
                }
            };
            let emit = Arc::new(emit);

            let left_sub = {
                let state = Arc::clone(&state);
                let sink = Arc::clone(&sink);
                let emit = Arc::clone(&emit);
                left.subscribe_notifications(move |n| match n {
                    Notification::Next(a) => {
                        let pair = {
                            let mut s = lock(&state);
                            s.left = Some(a);
                            s.pair()
                        };
                        emit(pair);
                    }
                    Notification::Error(e) => sink(Notification::Error(e)),
                    Notification::Completed => {
                        let done = {
                            let mut s = lock(&state);
                            s.left_done = true;
                            s.finished(s.left.is_none())
                        };
                        if done {
                            sink(Notification::Completed);
                        }
                    }
                })
            };
            let right_sub = right.subscribe_notifications(move |n| match n {
                Notification::Next(b) => {
                    let pair = {
                        let mut s = lock(&state);
                        s.right = Some(b);
                        s.pair()
                    };
                    emit(pair);
                }
                Notification::Error(e) => sink(Notification::Error(e)),
                Notification::Completed => {
                    let done = {
                        let mut s = lock(&state);
                        s.right_done = true;
                        s.finished(s.right.is_none())
                    };
                    if done {
                        sink(Notification::Completed);
                    }
                }
            });
            Subscription::from_many(vec![left_sub, right_sub])
        })
    }

    /// Combine the latest values of every source into a vector, in source
    /// order.
    ///
    /// Emits once every source has produced a value. An empty input emits one
    /// empty vector and completes.
    pub fn combine_latest_all(sources: Vec<Observable<T>>) -> Observable<Vec<T>> {
        if sources.is_empty() {
            return Observable::just(Vec::new());
        }
        let sources: Arc<[Observable<T>]> = sources.into();
        Observable::create(move |sink: Sink<Vec<T>>| {
            let state = Arc::new(Mutex::new(AllState {
                latest: vec![None; sources.len()],
                completed: 0,
            }));
            let subs = sources
                .iter()
                .enumerate()
                .map(|(index, source)| {
                    let state = Arc::clone(&state);
                    let sink = Arc::clone(&sink);
                    source.subscribe_notifications(move |n| match n {
                        Notification::Next(v) => {
                            let snapshot = {
                                let mut s = lock(&state);
                                s.latest[index] = Some(v);
                                s.latest.iter().cloned().collect::<Option<Vec<T>>>()
                            };
                            if let Some(all) = snapshot {
                                sink(Notification::Next(all));
                            }
                        }
                        Notification::Error(e) => sink(Notification::Error(e)),
                        Notification::Completed => {
                            let done = {
                                let mut s = lock(&state);
                                s.completed += 1;
                                s.completed == s.latest.len() || s.latest[index].is_none()
                            };
                            if done {
                                sink(Notification::Completed);
                            }
                        }
                    })
                })
                .collect();
            Subscription::from_many(subs)
        })
    }

    /// Deliver every notification through `scheduler`.
    pub fn observe_on(&self, scheduler: SharedScheduler) -> Self {
        let source = self.clone();
        Self::create(move |sink: Sink<T>| {
            let scheduler = Arc::clone(&scheduler);
            source.subscribe_notifications(move |n| {
                let sink = Arc::clone(&sink);
                scheduler.schedule(Box::new(move || sink(n)));
            })
        })
    }

    /// Share one upstream subscription between many subscribers, started
    /// explicitly with [`ConnectableObservable::connect`].
    #[must_use]
    pub fn publish(&self) -> ConnectableObservable<T> {
        ConnectableObservable::new(self.clone())
    }

    /// Share one upstream subscription while at least one subscriber exists.
    #[must_use]
    pub fn share(&self) -> Self {
        self.publish().ref_count()
    }
}

struct PairState<A, B> {
    left: Option<A>,
    right: Option<B>,
    left_done: bool,
    right_done: bool,
}

impl<A, B> Default for PairState<A, B> {
    fn default() -> Self {
        Self {
            left: None,
            right: None,
            left_done: false,
            right_done: false,
        }
    }
}

impl<A: Clone, B: Clone> PairState<A, B> {
    fn pair(&self) -> Option<(A, B)> {
        Some((self.left.clone()?, self.right.clone()?))
    }

    fn finished(&self, side_never_emitted: bool) -> bool {
        side_never_emitted || (self.left_done && self.right_done)
    }
}

struct AllState<T> {
    latest: Vec<Option<T>>,
    completed: usize,
}
