//! Observable list.
//!
//! [`ReactiveList`] is an ordered sequence that announces every structural
//! change before and after it happens, echoes its own `Count` / `IsEmpty`
//! properties, and can forward property changes raised by the items it holds.
//!
//! Pieces:
//!
//! - [`change`]: the descriptors emitted on the change streams.
//! - [`config`]: bulk policy and delivery knobs.
//! - `watcher`: the refcounted table of per-item subscriptions.
//! - `suppress`: reentrant suppression scopes that end in one reset.

pub mod change;
pub mod config;
mod list;
mod suppress;
mod watcher;

pub use change::{ChangeAction, CollectionChange, ItemChange, ListError, MoveInfo};
pub use config::{DEFAULT_RESET_CHANGE_THRESHOLD, ListConfig, RESET_MIN_AFFECTED};
pub use list::{COUNT_PROPERTY, INDEXER_PROPERTY, IS_EMPTY_PROPERTY, ReactiveList};
pub use suppress::SuppressionGuard;
pub use watcher::{ItemKey, ListItem, PropertyStreams};
