//! Tuning knobs for [`ReactiveList`](super::ReactiveList).

use std::fmt;

use rxbind_core::SharedScheduler;
use rxbind_core::scheduler::immediate;

/// Bulk operations touching this many items or fewer never fall back to a
/// reset, whatever the ratio.
pub const RESET_MIN_AFFECTED: usize = 10;

/// Default share of the list a bulk operation may touch before it is
/// announced as a single reset.
pub const DEFAULT_RESET_CHANGE_THRESHOLD: f64 = 0.3;

/// Configuration for a [`ReactiveList`](super::ReactiveList).
#[derive(Clone)]
pub struct ListConfig {
    /// Ratio of affected items to current length above which a bulk
    /// operation (affecting more than [`RESET_MIN_AFFECTED`] items) is
    /// announced as one reset instead of granular changes.
    pub reset_change_threshold: f64,
    /// Announce bulk operations below the threshold as one changing/changed
    /// pair carrying every item. When off they decompose into single-item
    /// operations.
    pub range_notifications: bool,
    /// Raise an `"Item[]"` property change on every structural change, for
    /// binding layers that expect the indexer to be announced.
    pub item_indexer_echo: bool,
    /// Start with item property tracking enabled.
    pub change_tracking: bool,
    /// Where item property changes are delivered.
    pub scheduler: SharedScheduler,
}

impl fmt::Debug for ListConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListConfig")
            .field("reset_change_threshold", &self.reset_change_threshold)
            .field("range_notifications", &self.range_notifications)
            .field("item_indexer_echo", &self.item_indexer_echo)
            .field("change_tracking", &self.change_tracking)
            .finish_non_exhaustive()
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            reset_change_threshold: DEFAULT_RESET_CHANGE_THRESHOLD,
            range_notifications: true,
            item_indexer_echo: true,
            change_tracking: false,
            scheduler: immediate(),
        }
    }
}

impl ListConfig {
    #[must_use]
    pub fn with_reset_change_threshold(mut self, threshold: f64) -> Self {
        self.reset_change_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_range_notifications(mut self, enabled: bool) -> Self {
        self.range_notifications = enabled;
        self
    }

    #[must_use]
    pub fn with_item_indexer_echo(mut self, enabled: bool) -> Self {
        self.item_indexer_echo = enabled;
        self
    }

    #[must_use]
    pub fn with_change_tracking(mut self, enabled: bool) -> Self {
        self.change_tracking = enabled;
        self
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: SharedScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Whether a bulk operation touching `affected` items of a list currently
    /// holding `len` items should be announced as a single reset.
    #[must_use]
    pub fn should_reset(&self, affected: usize, len: usize) -> bool {
        affected > RESET_MIN_AFFECTED
            && affected as f64 / len as f64 > self.reset_change_threshold
    }
}
