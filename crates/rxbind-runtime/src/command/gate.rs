//! Lazily connected enablement signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rxbind_core::{ConnectableObservable, ErrorChannel, Observable, Sink, Subject};

/// `gate && !busy`, shared and cached.
///
/// Nothing is subscribed upstream until the first query or subscriber. The
/// connection then stays up until [`disconnect`](Self::disconnect).
pub(crate) struct EnablementGate {
    connectable: ConnectableObservable<bool>,
    latest: Arc<AtomicBool>,
    changed: Subject<()>,
}

impl EnablementGate {
    pub(crate) fn new(gate: Observable<bool>, busy: Observable<bool>, errors: ErrorChannel) -> Self {
        let latest = Arc::new(AtomicBool::new(false));
        let changed = Subject::new();
        let connectable = {
            let latest = Arc::clone(&latest);
            let changed = changed.clone();
            gate.combine_latest(&busy, |can, busy| *can && !*busy)
                .catch_error(move |error| {
                    errors.publish(error);
                    Observable::never().start_with(false)
                })
                .tap(move |&value| {
                    if latest.swap(value, Ordering::AcqRel) != value {
                        tracing::trace!(can_execute = value, "command enablement flipped");
                        changed.next(());
                    }
                })
                .publish()
        };
        Self {
            connectable,
            latest,
            changed,
        }
    }

    pub(crate) fn ensure_connected(&self) {
        if !self.connectable.is_connected() {
            self.connectable.connect();
        }
    }

    pub(crate) fn can_execute(&self) -> bool {
        self.ensure_connected();
        self.latest.load(Ordering::Acquire)
    }

    /// Subscribing connects, then replays the cached value.
    pub(crate) fn observable(&self) -> Observable<bool> {
        let connectable = self.connectable.clone();
        let latest = Arc::clone(&self.latest);
        Observable::create(move |sink: Sink<bool>| {
            if !connectable.is_connected() {
                connectable.connect();
            }
            let latest = Arc::clone(&latest);
            connectable
                .observable()
                .start_with_fn(move || latest.load(Ordering::Acquire))
                .distinct_until_changed()
                .subscribe_notifications(move |n| sink(n))
        })
    }

    /// Fires on every flip of the cached value.
    pub(crate) fn changed(&self) -> Observable<()> {
        self.changed.observable()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connectable.is_connected()
    }

    pub(crate) fn disconnect(&self) {
        self.connectable.disconnect();
    }
}
