//! Reentrant suppression of granular change notifications.
//!
//! While at least one [`SuppressionGuard`] is alive, mutations skip their
//! changing/changed pairs and only mark the owner dirty. When the last guard
//! goes away, a dirty owner publishes exactly one reset.
//!
//! # Invariants
//!
//! 1. The depth never underflows; every guard decrements exactly once.
//! 2. At most one reset is published per outermost scope, and only if
//!    something changed inside it.
//! 3. Release runs on every exit path, including unwinding.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

static WARNED_NO_RESET_SUBSCRIBER: AtomicBool = AtomicBool::new(false);

/// Nesting depth plus a "something changed" flag.
#[derive(Debug, Default)]
pub(crate) struct Suppressor {
    depth: AtomicUsize,
    pending_reset: AtomicBool,
}

impl Suppressor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&self) -> usize {
        self.depth.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Leave one level. Returns whether this closed the outermost scope with
    /// a pending reset; the flag is consumed.
    pub(crate) fn exit(&self) -> bool {
        let previous = self
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1));
        match previous {
            Ok(1) => self.pending_reset.swap(false, Ordering::AcqRel),
            _ => false,
        }
    }

    pub(crate) fn is_suppressed(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }

    pub(crate) fn mark_dirty(&self) {
        self.pending_reset.store(true, Ordering::Release);
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }
}

/// The owner of a [`Suppressor`], as seen by its guards.
pub(crate) trait SuppressionHost: Send + Sync {
    fn suppressor(&self) -> &Suppressor;

    /// Publish the single reset that ends a dirty scope.
    fn publish_reset(&self);

    /// Number of subscribers to the owner's reset stream.
    fn reset_subscribers(&self) -> usize;
}

/// Scoped suppression of change notifications.
///
/// Dropping the guard ends the scope.
#[must_use = "notifications are only suppressed while the guard is alive"]
pub struct SuppressionGuard {
    host: Option<Arc<dyn SuppressionHost>>,
}

impl fmt::Debug for SuppressionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppressionGuard")
            .field(
                "depth",
                &self.host.as_ref().map(|h| h.suppressor().depth()),
            )
            .finish()
    }
}

impl SuppressionGuard {
    pub(crate) fn acquire(host: Arc<dyn SuppressionHost>) -> Self {
        let depth = host.suppressor().enter();
        if host.reset_subscribers() == 0
            && !WARNED_NO_RESET_SUBSCRIBER.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                depth,
                "change notifications suppressed but nothing subscribes to should_reset; \
                 item-level streams will appear to miss the suppressed changes"
            );
        }
        Self { host: Some(host) }
    }

    /// End the scope now. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        if let Some(host) = self.host.take()
            && host.suppressor().exit()
        {
            tracing::debug!("suppression scope closed dirty; publishing reset");
            host.publish_reset();
        }
    }
}
