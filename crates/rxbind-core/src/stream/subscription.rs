//! RAII subscription handles.
//!
//! A [`Subscription`] owns a shared [`SubscriptionState`]. Closing the state
//! runs the teardown exactly once, whether the close comes from the handle
//! being dropped or from the stream delivering a terminal notification.
//!
//! [`Subscription::detach`] gives up the handle without closing: the stream
//! keeps running and releases its resources when it terminates on its own.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::sync::lock;

type Teardown = Box<dyn FnOnce() + Send + 'static>;

/// Shared open/closed flag plus the teardown to run on close.
pub(crate) struct SubscriptionState {
    closed: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
}

impl SubscriptionState {
    pub(crate) fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            teardown: Mutex::new(None),
        }
    }

    pub(crate) fn with_teardown(teardown: Teardown) -> Self {
        Self {
            closed: AtomicBool::new(false),
            teardown: Mutex::new(Some(teardown)),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Install the teardown. Runs it immediately if already closed.
    pub(crate) fn set_teardown(&self, teardown: Teardown) {
        let run_now = {
            let mut slot = lock(&self.teardown);
            if self.closed.load(Ordering::Acquire) {
                Some(teardown)
            } else {
                *slot = Some(teardown);
                None
            }
        };
        if let Some(teardown) = run_now {
            teardown();
        }
    }

    /// Close and run the teardown outside the lock. Idempotent.
    pub(crate) fn close(&self) {
        let teardown = {
            let mut slot = lock(&self.teardown);
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            slot.take()
        };
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

/// Handle to an active subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately; use detach() to keep it running"]
pub struct Subscription {
    state: Option<Arc<SubscriptionState>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Subscription {
    /// Create a subscription that runs `teardown` when closed.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            state: Some(Arc::new(SubscriptionState::with_teardown(Box::new(
                teardown,
            )))),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { state: None }
    }

    /// Combine several subscriptions; closing the result closes all of them
    /// in order.
    pub fn from_many(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || drop(subscriptions))
    }

    pub(crate) fn from_state(state: Arc<SubscriptionState>) -> Self {
        Self { state: Some(state) }
    }

    /// Whether the subscription has been closed (by drop, unsubscribe, or a
    /// terminal notification).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.as_ref().is_none_or(|s| s.is_closed())
    }

    /// Unsubscribe now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Give up the handle but keep the subscription running until the stream
    /// terminates on its own.
    pub fn detach(mut self) {
        self.state = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn drop_runs_teardown_once() {
        let (count, teardown) = counter();
        let sub = Subscription::new(teardown);
        assert!(!sub.is_closed());
        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detach_skips_teardown() {
        let (count, teardown) = counter();
        let state = Arc::new(SubscriptionState::with_teardown(Box::new(teardown)));
        let sub = Subscription::from_state(Arc::clone(&state));
        sub.detach();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        // The producer side can still close it later.
        state.close();
        state.close();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_teardown_runs_immediately_when_closed() {
        let state = SubscriptionState::new();
        state.close();
        let (count, teardown) = counter();
        state.set_teardown(Box::new(teardown));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn from_many_closes_all() {
        let (a, ta) = counter();
        let (b, tb) = counter();
        let combined = Subscription::from_many(vec![Subscription::new(ta), Subscription::new(tb)]);
        combined.unsubscribe();
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_is_closed() {
        assert!(Subscription::empty().is_closed());
    }
}
