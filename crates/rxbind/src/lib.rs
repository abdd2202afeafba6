#![forbid(unsafe_code)]

//! rxbind public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use rxbind_core::{
    BehaviorSubject, ErrorPolicy, Observable, PropertyChange, PropertyNotifier, ReactiveObject,
    StreamError, Subject, Subscription,
};
pub use rxbind_runtime::{
    ChangeAction, CollectionChange, Command, CommandConfig, ListConfig, ListError, ReactiveCommand,
    ReactiveList, invoke_command,
};

pub mod prelude {
    pub use rxbind_core as core;
    pub use rxbind_runtime as runtime;

    pub use rxbind_core::{Observable, ReactiveObject, Subject, Subscription};
    pub use rxbind_runtime::{Command, ReactiveCommand, ReactiveList, invoke_command};
}
