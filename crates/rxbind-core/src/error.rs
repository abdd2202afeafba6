//! Stream failures and the side channel they are routed through.
//!
//! Streams carry failures as [`StreamError`], a cheaply clonable handle around
//! any `std::error::Error`. Background failures never unwind into an unrelated
//! caller; they are published on an [`ErrorChannel`]. A channel nobody listens
//! to still hands every error to its [`ErrorPolicy`], so failures stay visible
//! by default.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use crate::stream::{Observable, Subject};

/// Failure payload shared by every stream in the runtime.
///
/// Cloning is an `Arc` bump; the same error can be delivered to any number of
/// subscribers and to the side channel at once.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct StreamError(Arc<ErrorKind>);

#[derive(Debug, Error)]
enum ErrorKind {
    #[error("{0}")]
    Message(String),
    #[error("work panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Source(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StreamError {
    /// Wrap an arbitrary error.
    pub fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(ErrorKind::Source(Box::new(error))))
    }

    /// Create an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Arc::new(ErrorKind::Message(message.into())))
    }

    /// Convert a caught panic payload into an error.
    #[must_use]
    pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self(Arc::new(ErrorKind::Panicked(message)))
    }

    /// Whether this error was produced from a caught panic.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(*self.0, ErrorKind::Panicked(_))
    }

    /// Downcast to the wrapped error type, if this error wraps one.
    #[must_use]
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match &*self.0 {
            ErrorKind::Source(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Whether two handles point at the same underlying error.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ---------------------------------------------------------------------------
// Unhandled-error policy
// ---------------------------------------------------------------------------

/// What happens to an error published while nobody observes the channel.
pub trait ErrorPolicy: Send + Sync {
    /// Handle an error that has no subscriber.
    fn on_unhandled(&self, error: &StreamError);
}

/// Default policy: log at `ERROR` level through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrors;

impl ErrorPolicy for LogErrors {
    fn on_unhandled(&self, error: &StreamError) {
        tracing::error!(error = %error, "unobserved stream error");
    }
}

/// Crash policy: panic on the publishing thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicOnError;

impl ErrorPolicy for PanicOnError {
    fn on_unhandled(&self, error: &StreamError) {
        panic!("unobserved stream error: {error}");
    }
}

/// Drop unobserved errors silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreErrors;

impl ErrorPolicy for IgnoreErrors {
    fn on_unhandled(&self, _error: &StreamError) {}
}

// ---------------------------------------------------------------------------
// ErrorChannel
// ---------------------------------------------------------------------------

/// Side channel for failures that must not terminate their producer.
///
/// Errors go to subscribers when there are any, otherwise to the policy.
#[derive(Clone)]
pub struct ErrorChannel {
    subject: Subject<StreamError>,
    policy: Arc<dyn ErrorPolicy>,
}

impl std::fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("observers", &self.subject.observer_count())
            .finish_non_exhaustive()
    }
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new(Arc::new(LogErrors))
    }
}

impl ErrorChannel {
    /// Create a channel with the given fallback policy.
    #[must_use]
    pub fn new(policy: Arc<dyn ErrorPolicy>) -> Self {
        Self {
            subject: Subject::new(),
            policy,
        }
    }

    /// Publish an error to subscribers, or to the policy if there are none.
    pub fn publish(&self, error: StreamError) {
        if self.subject.has_observers() {
            self.subject.next(error);
        } else {
            self.policy.on_unhandled(&error);
        }
    }

    /// Stream of published errors. The stream itself never errors.
    #[must_use]
    pub fn observable(&self) -> Observable<StreamError> {
        self.subject.observable()
    }

    /// Number of current subscribers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::lock;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    struct Counting(AtomicUsize);

    impl ErrorPolicy for Counting {
        fn on_unhandled(&self, _error: &StreamError) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn display_and_downcast() {
        let err = StreamError::new(DiskFull);
        assert_eq!(err.to_string(), "disk full");
        assert!(err.downcast_ref::<DiskFull>().is_some());
        assert!(!err.is_panic());

        let msg = StreamError::msg("boom");
        assert_eq!(msg.to_string(), "boom");
        assert!(msg.downcast_ref::<DiskFull>().is_none());
    }

    #[test]
    fn panic_payloads_are_captured() {
        let caught = std::panic::catch_unwind(|| panic!("kaboom")).unwrap_err();
        let err = StreamError::panicked(caught);
        assert!(err.is_panic());
        assert!(err.to_string().contains("kaboom"));
    }

    #[test]
    fn clones_share_identity() {
        let err = StreamError::msg("x");
        let copy = err.clone();
        assert!(err.ptr_eq(&copy));
        assert!(!err.ptr_eq(&StreamError::msg("x")));
    }

    #[test]
    fn unobserved_errors_reach_policy() {
        let policy = Arc::new(Counting(AtomicUsize::new(0)));
        let channel = ErrorChannel::new(policy.clone());
        channel.publish(StreamError::msg("first"));
        assert_eq!(policy.0.load(Ordering::SeqCst), 1);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = channel
            .observable()
            .subscribe(move |e: StreamError| lock(&sink).push(e.to_string()));
        channel.publish(StreamError::msg("second"));
        assert_eq!(policy.0.load(Ordering::SeqCst), 1);
        assert_eq!(*lock(&seen), vec!["second".to_string()]);

        drop(sub);
        channel.publish(StreamError::msg("third"));
        assert_eq!(policy.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn default_policy_logs() {
        let channel = ErrorChannel::default();
        channel.publish(StreamError::msg("nobody listening"));
        assert!(logs_contain("unobserved stream error"));
        assert!(logs_contain("nobody listening"));
    }

    #[test]
    #[should_panic(expected = "unobserved stream error")]
    fn panic_policy_panics() {
        ErrorChannel::new(Arc::new(PanicOnError)).publish(StreamError::msg("fatal"));
    }
}
