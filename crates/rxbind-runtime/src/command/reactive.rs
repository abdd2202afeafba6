//! The command engine.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rxbind_core::sync::lock;
use rxbind_core::{
    BehaviorSubject, ErrorChannel, Notification, Observable, SharedScheduler, Sink, StreamError,
    Subject, Subscription,
};

use super::gate::EnablementGate;
use super::{Command, CommandConfig};

type Factory<P, T> = dyn Fn(P) -> Result<Observable<T>, StreamError> + Send + Sync;

/// Busy edges not yet delivered, in transition order.
#[derive(Default)]
struct EdgeQueue {
    pending: VecDeque<bool>,
    draining: bool,
}

/// Counts overlapping invocations and publishes the busy edge transitions.
///
/// Transitions are queued under the same lock that orders the count change,
/// and exactly one caller at a time delivers them. An edge raised from inside
/// a busy callback, or on another thread mid-delivery, waits its turn, so
/// subscribers always see `true` and `false` alternate.
struct InflightTracker {
    count: AtomicUsize,
    edges: Mutex<EdgeQueue>,
    busy: BehaviorSubject<bool>,
}

impl InflightTracker {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            edges: Mutex::new(EdgeQueue::default()),
            busy: BehaviorSubject::new(false),
        }
    }

    fn begin(self: &Arc<Self>) -> InflightSlot {
        {
            let mut edges = lock(&self.edges);
            if self.count.fetch_add(1, Ordering::AcqRel) == 0 {
                edges.pending.push_back(true);
            }
        }
        // Built before delivery so a panicking subscriber still releases it.
        let slot = InflightSlot {
            tracker: Arc::clone(self),
            released: AtomicBool::new(false),
        };
        self.deliver();
        slot
    }

    fn end(&self) {
        {
            let mut edges = lock(&self.edges);
            if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
                edges.pending.push_back(false);
            }
        }
        self.deliver();
    }

    /// Emit queued edges unless someone up the stack (or on another thread)
    /// already is.
    fn deliver(&self) {
        {
            let mut edges = lock(&self.edges);
            if edges.draining {
                return;
            }
            edges.draining = true;
        }
        let mut guard = DrainGuard {
            edges: &self.edges,
            armed: true,
        };
        loop {
            let next = {
                let mut edges = lock(&self.edges);
                match edges.pending.pop_front() {
                    Some(busy) => busy,
                    None => {
                        edges.draining = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            if next {
                tracing::trace!("command busy");
            } else {
                tracing::trace!("command idle");
            }
            self.busy.next(next);
        }
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

/// Clears the draining flag if a busy subscriber panics mid-delivery.
struct DrainGuard<'a> {
    edges: &'a Mutex<EdgeQueue>,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.edges).draining = false;
        }
    }
}

/// One invocation's share of the in-flight count.
struct InflightSlot {
    tracker: Arc<InflightTracker>,
    released: AtomicBool,
}

impl InflightSlot {
    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.tracker.end();
        }
    }
}

impl Drop for InflightSlot {
    fn drop(&mut self) {
        self.release();
    }
}

struct CommandCore<P, T> {
    factory: Box<Factory<P, T>>,
    results: Subject<T>,
    inflight: Arc<InflightTracker>,
    errors: ErrorChannel,
    gate: EnablementGate,
    scheduler: SharedScheduler,
}

impl<P, T> CommandCore<P, T>
where
    P: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Start one invocation for `sink`. The returned subscription cancels it.
    fn run(&self, param: P, sink: Sink<T>) -> Subscription {
        let slot = Arc::new(self.inflight.begin());

        let work = match catch_unwind(AssertUnwindSafe(|| (self.factory)(param))) {
            Ok(Ok(stream)) => stream,
            Ok(Err(error)) => Observable::throw(error),
            Err(payload) => Observable::throw(StreamError::panicked(payload)),
        };

        let results = self.results.clone();
        let errors = self.errors.clone();
        let held = Arc::clone(&slot);
        let upstream = work
            .observe_on(Arc::clone(&self.scheduler))
            .subscribe_notifications(move |n| match n {
                Notification::Next(value) => {
                    results.next(value.clone());
                    sink(Notification::Next(value));
                }
                Notification::Error(error) => {
                    held.release();
                    errors.publish(error.clone());
                    sink(Notification::Error(error));
                }
                Notification::Completed => {
                    held.release();
                    sink(Notification::Completed);
                }
            });

        Subscription::new(move || {
            drop(upstream);
            slot.release();
        })
    }
}

/// An invocable unit of work with a live enablement signal.
///
/// `P` is the parameter passed to each invocation, `T` the values it
/// produces. Cloning yields another handle to the same command.
pub struct ReactiveCommand<P, T> {
    core: Arc<CommandCore<P, T>>,
}

impl<P, T> Clone for ReactiveCommand<P, T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<P, T> fmt::Debug for ReactiveCommand<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveCommand")
            .field("in_flight", &self.core.inflight.count())
            .field("connected", &self.core.gate.is_connected())
            .finish_non_exhaustive()
    }
}

impl<P, T> ReactiveCommand<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Build a command whose work is the stream returned by `factory`.
    ///
    /// `can_execute` is the caller's gate; the command is enabled while the
    /// gate's latest value is `true` and no invocation is in flight. An `Err`
    /// or a panic from `factory` fails that invocation.
    pub fn new<F>(can_execute: Observable<bool>, factory: F, config: CommandConfig) -> Self
    where
        F: Fn(P) -> Result<Observable<T>, StreamError> + Send + Sync + 'static,
    {
        let inflight = Arc::new(InflightTracker::new());
        let errors = ErrorChannel::new(config.error_policy);
        let gate = EnablementGate::new(can_execute, inflight.busy.observable(), errors.clone());
        Self {
            core: Arc::new(CommandCore {
                factory: Box::new(factory),
                results: Subject::new(),
                inflight,
                errors,
                gate,
                scheduler: config.scheduler,
            }),
        }
    }

    /// Build a command from synchronous work producing one value.
    pub fn from_fn<F>(can_execute: Observable<bool>, work: F, config: CommandConfig) -> Self
    where
        F: Fn(P) -> Result<T, StreamError> + Send + Sync + 'static,
    {
        Self::new(can_execute, move |param| work(param).map(Observable::just), config)
    }

    /// Start an invocation.
    ///
    /// Nothing runs until the returned stream is subscribed. Subscribers
    /// share one run; when the last one leaves before it finishes, the run is
    /// cancelled and its in-flight slot released.
    pub fn execute(&self, param: P) -> Observable<T> {
        let core = Arc::clone(&self.core);
        Observable::create(move |sink: Sink<T>| core.run(param.clone(), sink)).share()
    }

    /// Run once and forget. The error, if any, still reaches
    /// [`thrown_errors`](Self::thrown_errors).
    pub fn invoke(&self, param: P) {
        self.execute(param)
            .catch_error(|_| Observable::empty())
            .subscribe(|_| {})
            .detach();
    }

    /// Last known enablement. `param` is not consulted; the first query
    /// starts the enablement signal.
    #[must_use]
    pub fn can_execute(&self, _param: &P) -> bool {
        self.core.gate.can_execute()
    }

    /// Enablement, starting with the current value and skipping repeats.
    #[must_use]
    pub fn can_execute_observable(&self) -> Observable<bool> {
        self.core.gate.observable()
    }

    /// Fires whenever enablement flips.
    #[must_use]
    pub fn can_execute_changed(&self) -> Observable<()> {
        self.core.gate.changed()
    }

    /// Busy state, starting with the current value.
    #[must_use]
    pub fn is_executing(&self) -> Observable<bool> {
        self.core.inflight.busy.observable()
    }

    /// Number of invocations currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.core.inflight.count()
    }

    /// Every value produced by every invocation.
    #[must_use]
    pub fn results(&self) -> Observable<T> {
        self.core.results.observable()
    }

    /// Errors from the gate and from failed invocations.
    #[must_use]
    pub fn thrown_errors(&self) -> Observable<StreamError> {
        self.core.errors.observable()
    }

    /// Drop the enablement connection. A later query reconnects.
    pub fn dispose(&self) {
        self.core.gate.disconnect();
    }
}

impl<P> ReactiveCommand<P, P>
where
    P: Clone + Send + Sync + 'static,
{
    /// A command with no work of its own: each invocation emits its
    /// parameter.
    pub fn create(can_execute: Observable<bool>, config: CommandConfig) -> Self {
        Self::new(can_execute, |param| Ok(Observable::just(param)), config)
    }
}

impl<P, T> Command<P> for ReactiveCommand<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn can_execute(&self, param: &P) -> bool {
        ReactiveCommand::can_execute(self, param)
    }

    fn can_execute_observable(&self) -> Observable<bool> {
        ReactiveCommand::can_execute_observable(self)
    }

    fn is_executing(&self) -> Observable<bool> {
        ReactiveCommand::is_executing(self)
    }

    fn thrown_errors(&self) -> Observable<StreamError> {
        ReactiveCommand::thrown_errors(self)
    }

    fn invoke(&self, param: P) {
        ReactiveCommand::invoke(self, param);
    }
}
