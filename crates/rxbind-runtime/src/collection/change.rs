//! Values emitted by a [`ReactiveList`](super::ReactiveList).

use rxbind_core::PropertyChange;
use thiserror::Error;

/// Kind of structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Add,
    Remove,
    Replace,
    Move,
    /// The contents changed too much to describe; re-read everything.
    Reset,
}

/// Description of one structural change.
///
/// Emitted twice per mutation: once on `changing` before the sequence is
/// touched and once on `changed` after.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionChange<T> {
    pub action: ChangeAction,
    /// Items entering the sequence (or the moved items for [`ChangeAction::Move`]).
    pub new_items: Vec<T>,
    /// Items leaving the sequence.
    pub old_items: Vec<T>,
    /// Index of the first new item, if any.
    pub new_index: Option<usize>,
    /// Index of the first old item, if any.
    pub old_index: Option<usize>,
}

impl<T> CollectionChange<T> {
    /// Items inserted starting at `index`.
    #[must_use]
    pub fn add(items: Vec<T>, index: usize) -> Self {
        Self {
            action: ChangeAction::Add,
            new_items: items,
            old_items: Vec::new(),
            new_index: Some(index),
            old_index: None,
        }
    }

    /// Items removed starting at `index`.
    #[must_use]
    pub fn remove(items: Vec<T>, index: usize) -> Self {
        Self {
            action: ChangeAction::Remove,
            new_items: Vec::new(),
            old_items: items,
            new_index: None,
            old_index: Some(index),
        }
    }

    /// `old` replaced by `new` at `index`.
    #[must_use]
    pub fn replace(new: T, old: T, index: usize) -> Self {
        Self {
            action: ChangeAction::Replace,
            new_items: vec![new],
            old_items: vec![old],
            new_index: Some(index),
            old_index: Some(index),
        }
    }

    /// `item` moved from `old_index` to `new_index`.
    #[must_use]
    pub fn moved(item: T, new_index: usize, old_index: usize) -> Self
    where
        T: Clone,
    {
        Self {
            action: ChangeAction::Move,
            new_items: vec![item.clone()],
            old_items: vec![item],
            new_index: Some(new_index),
            old_index: Some(old_index),
        }
    }

    #[must_use]
    pub fn reset() -> Self {
        Self {
            action: ChangeAction::Reset,
            new_items: Vec::new(),
            old_items: Vec::new(),
            new_index: None,
            old_index: None,
        }
    }

    /// Whether this is a reset.
    #[must_use]
    pub fn is_reset(&self) -> bool {
        self.action == ChangeAction::Reset
    }
}

/// Items that moved as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveInfo<T> {
    pub moved_items: Vec<T>,
    pub from: usize,
    pub to: usize,
}

/// A property change raised by an item inside a tracked list.
#[derive(Debug, Clone)]
pub struct ItemChange<T> {
    /// The item that raised the change.
    pub sender: T,
    pub property: PropertyChange,
}

/// Usage errors reported synchronously by list operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("range {index}..{index}+{count} out of bounds for list of length {len}")]
    RangeOutOfBounds {
        index: usize,
        count: usize,
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_fill_indices() {
        let add = CollectionChange::add(vec![1, 2], 3);
        assert_eq!(add.new_index, Some(3));
        assert!(add.old_items.is_empty());

        let moved = CollectionChange::moved('x', 5, 2);
        assert_eq!(moved.action, ChangeAction::Move);
        assert_eq!((moved.old_index, moved.new_index), (Some(2), Some(5)));
        assert_eq!(moved.new_items, moved.old_items);

        assert!(CollectionChange::<u8>::reset().is_reset());
    }

    #[test]
    fn errors_render_context() {
        let err = ListError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "index 4 out of range for list of length 2");
        let err = ListError::RangeOutOfBounds {
            index: 1,
            count: 5,
            len: 3,
        };
        assert!(err.to_string().contains("length 3"));
    }
}
