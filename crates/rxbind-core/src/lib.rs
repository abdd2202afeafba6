#![forbid(unsafe_code)]

//! Core stream runtime for rxbind.
//!
//! This crate is the small reactive substrate the collection and command
//! engines are built on:
//!
//! - [`Observable`]: a lazily-subscribed, push-based stream with the handful
//!   of combinators the engines need (`map`, `filter`, `combine_latest`,
//!   `distinct_until_changed`, `catch_error`, `start_with`, `observe_on`).
//! - [`Subject`] / [`BehaviorSubject`]: hot multicast streams, the latter
//!   replaying its current value to new subscribers.
//! - [`ConnectableObservable`]: a shared, explicitly connected stream with a
//!   ref-counted variant.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Scheduler`]: pluggable delivery target for callbacks.
//! - [`StreamError`] / [`ErrorChannel`]: clonable failures and a side channel
//!   with an injectable fallback [`ErrorPolicy`].
//!
//! Everything here is `Send + Sync`; callbacks are invoked without holding
//! any internal lock, so subscribers may freely subscribe, unsubscribe, or
//! emit from inside a callback.

pub mod error;
pub mod property;
pub mod scheduler;
pub mod stream;
pub mod sync;

pub use error::{ErrorChannel, ErrorPolicy, IgnoreErrors, LogErrors, PanicOnError, StreamError};
pub use property::{PropertyChange, PropertyNotifier, ReactiveObject};
pub use scheduler::{
    ImmediateScheduler, Job, QueueScheduler, Scheduler, SharedScheduler, ThreadScheduler,
};
pub use stream::{
    BehaviorSubject, ConnectableObservable, Notification, Observable, Sink, Subject, Subscription,
};
