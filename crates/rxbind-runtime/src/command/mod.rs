//! Reactive commands.
//!
//! A [`ReactiveCommand`] wraps a unit of work behind a live "can execute"
//! signal. The signal is the caller's gate combined with "not currently
//! executing", so a command disables itself while any invocation is in
//! flight and re-enables when the last one finishes.
//!
//! # Invariants
//!
//! 1. The busy stream emits `true` on the 0→1 in-flight transition and
//!    `false` on 1→0, once each, however many invocations overlap.
//! 2. An invocation releases its in-flight slot exactly once: on completion,
//!    on error, or when its last subscriber leaves.
//! 3. Failures of the work never escape `execute`; they terminate that
//!    invocation's stream and are published on the error channel.
//! 4. Failures of the gate stream turn into `false` plus a published error;
//!    the enablement signal itself never terminates.
//!
//! # Failure Modes
//!
//! - **Work never completes**: the command stays disabled until every
//!   subscriber of that invocation unsubscribes.
//! - **Nobody listens to `thrown_errors`**: errors go to the configured
//!   [`ErrorPolicy`], which logs by default.

mod combined;
mod gate;
mod invoke;
mod reactive;

use std::fmt;
use std::sync::Arc;

use rxbind_core::scheduler::immediate;
use rxbind_core::{ErrorPolicy, LogErrors, Observable, SharedScheduler, StreamError};

pub use invoke::invoke_command;
pub use reactive::ReactiveCommand;

/// Configuration for a [`ReactiveCommand`].
#[derive(Clone)]
pub struct CommandConfig {
    /// Where invocation results, errors and completions are delivered.
    pub scheduler: SharedScheduler,
    /// What happens to errors nobody subscribes to.
    pub error_policy: Arc<dyn ErrorPolicy>,
}

impl fmt::Debug for CommandConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandConfig").finish_non_exhaustive()
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            scheduler: immediate(),
            error_policy: Arc::new(LogErrors),
        }
    }
}

impl CommandConfig {
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: SharedScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn with_error_policy(mut self, policy: Arc<dyn ErrorPolicy>) -> Self {
        self.error_policy = policy;
        self
    }
}

/// The invocable surface shared by commands of any result type.
///
/// Lets a combined command or [`invoke_command`] drive commands whose
/// results differ.
pub trait Command<P>: Send + Sync {
    /// Last known enablement. Starts the enablement signal if needed.
    fn can_execute(&self, param: &P) -> bool;

    /// Enablement, starting with the current value, skipping repeats.
    fn can_execute_observable(&self) -> Observable<bool>;

    /// Busy state, starting with the current value.
    fn is_executing(&self) -> Observable<bool>;

    /// Errors raised by the gate or by any invocation.
    fn thrown_errors(&self) -> Observable<StreamError>;

    /// Run once, fire-and-forget.
    fn invoke(&self, param: P);
}
