#![forbid(unsafe_code)]

//! Observable collections and reactive commands.
//!
//! Two engines built on the `rxbind-core` stream runtime:
//!
//! - [`collection`]: [`ReactiveList`], an ordered sequence that announces
//!   every mutation as a paired changing/changed notification, switches to a
//!   single reset for large bulk edits, and fans in property changes from
//!   the items it holds.
//! - [`command`]: [`ReactiveCommand`], an invocable unit of work with a live
//!   "can execute" stream, race-free in-flight accounting, and a side channel
//!   for failures.

pub mod collection;
pub mod command;

pub use collection::{
    ChangeAction, CollectionChange, ItemChange, ItemKey, ListConfig, ListError, ListItem,
    MoveInfo, ReactiveList, SuppressionGuard,
};
pub use command::{Command, CommandConfig, ReactiveCommand, invoke_command};

/// Result alias for fallible collection operations.
pub type Result<T> = std::result::Result<T, ListError>;
