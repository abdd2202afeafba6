//! Shared subscriptions to a cold source.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Observable, Sink, Subject, Subscription};
use crate::sync::lock;

struct ConnectableInner<T> {
    source: Observable<T>,
    subject: Subject<T>,
    connected: AtomicBool,
    connection: Mutex<Option<Subscription>>,
    subscribers: AtomicUsize,
}

/// A stream whose subscribers share one upstream subscription.
///
/// Subscribers attach to an internal [`Subject`]; the upstream is only
/// subscribed by [`connect`](Self::connect). Cloning shares the connection.
pub struct ConnectableObservable<T> {
    inner: Arc<ConnectableInner<T>>,
}

impl<T> Clone for ConnectableObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ConnectableObservable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectableObservable")
            .field("connected", &self.inner.connected.load(Ordering::Acquire))
            .field("subscribers", &self.inner.subscribers.load(Ordering::Acquire))
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> ConnectableObservable<T> {
    pub(crate) fn new(source: Observable<T>) -> Self {
        Self {
            inner: Arc::new(ConnectableInner {
                source,
                subject: Subject::new(),
                connected: AtomicBool::new(false),
                connection: Mutex::new(None),
                subscribers: AtomicUsize::new(0),
            }),
        }
    }

    /// Subscribe the upstream. Returns `false` if already connected.
    pub fn connect(&self) -> bool {
        if self
            .inner
            .connected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let subject = self.inner.subject.clone();
        let sub = self
            .inner
            .source
            .subscribe_notifications(move |n| subject.dispatch(n));
        // A disconnect may have raced the subscribe above.
        let stale = {
            let mut slot = lock(&self.inner.connection);
            if self.inner.connected.load(Ordering::Acquire) {
                *slot = Some(sub);
                None
            } else {
                Some(sub)
            }
        };
        drop(stale);
        true
    }

    /// Drop the upstream subscription. Subscribers stay attached and receive
    /// values again after the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        if self.inner.connected.swap(false, Ordering::AcqRel) {
            let connection = lock(&self.inner.connection).take();
            drop(connection);
        }
    }

    /// Whether [`connect`](Self::connect) has been called without a matching
    /// [`disconnect`](Self::disconnect).
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Subscribe to the shared stream without affecting the connection.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        self.inner.subject.observable()
    }

    /// A stream that connects on its first subscriber and disconnects when
    /// the last one leaves.
    #[must_use]
    pub fn ref_count(&self) -> Observable<T> {
        let this = self.clone();
        Observable::create(move |sink: Sink<T>| {
            let sub = this.inner.subject.subscribe_sink(sink);
            let first = this.inner.subscribers.fetch_add(1, Ordering::AcqRel) == 0;
            if first && !this.inner.subject.is_terminated() {
                this.connect();
            }
            let owner = this.clone();
            Subscription::new(move || {
                drop(sub);
                if owner.inner.subscribers.fetch_sub(1, Ordering::AcqRel) == 1 {
                    owner.disconnect();
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Notification;
    use crate::stream::tests::{record, values};
    use std::sync::atomic::AtomicUsize;

    fn counted_source(subject: &Subject<u32>) -> (Observable<u32>, Arc<AtomicUsize>) {
        let subscribes = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&subscribes);
        let subject = subject.clone();
        let source = Observable::create(move |sink: Sink<u32>| {
            count.fetch_add(1, Ordering::SeqCst);
            subject.subscribe_sink(sink)
        });
        (source, subscribes)
    }

    #[test]
    fn publish_waits_for_connect() {
        let upstream = Subject::new();
        let (source, subscribes) = counted_source(&upstream);
        let published = source.publish();
        let (a, _sa) = record(&published.observable());
        let (b, _sb) = record(&published.observable());
        upstream.next(1);
        assert!(values(&a).is_empty());

        assert!(published.connect());
        assert!(!published.connect());
        upstream.next(2);
        assert_eq!(values(&a), vec![2]);
        assert_eq!(values(&b), vec![2]);
        assert_eq!(subscribes.load(Ordering::SeqCst), 1);

        published.disconnect();
        assert!(!published.is_connected());
        assert_eq!(upstream.observer_count(), 0);
    }

    #[test]
    fn ref_count_connects_once_and_releases() {
        let upstream = Subject::new();
        let (source, subscribes) = counted_source(&upstream);
        let shared = source.share();
        let (a, sa) = record(&shared);
        let (b, sb) = record(&shared);
        upstream.next(7);
        assert_eq!(values(&a), vec![7]);
        assert_eq!(values(&b), vec![7]);
        assert_eq!(subscribes.load(Ordering::SeqCst), 1);

        drop(sa);
        assert_eq!(upstream.observer_count(), 1);
        drop(sb);
        assert_eq!(upstream.observer_count(), 0);
    }

    #[test]
    fn shared_cold_work_runs_once_per_connection() {
        let runs = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&runs);
        let shared = Observable::create(move |sink: Sink<u32>| {
            r.fetch_add(1, Ordering::SeqCst);
            sink(Notification::Next(1));
            sink(Notification::Completed);
            Subscription::empty()
        })
        .share();
        let (a, sa) = record(&shared);
        assert_eq!(values(&a), vec![1]);
        assert!(sa.is_closed());
        // Late subscribers see the terminal only.
        let (b, _sb) = record(&shared);
        assert!(matches!(lock(&b).as_slice(), [Notification::Completed]));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
